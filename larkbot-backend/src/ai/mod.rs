pub mod openai;

pub use openai::OpenAIClient;

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use strum::AsRefStr;

/// Model tier for a completion call. Small for cheap classification, Large
/// for reply generation, Image for attachment description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ModelClass {
    Small,
    Large,
    Image,
}

/// Error from a completion call.
#[derive(Debug, Clone)]
pub struct AiError {
    pub message: String,
}

impl AiError {
    pub fn new(message: impl Into<String>) -> Self {
        AiError {
            message: message.into(),
        }
    }
}

impl fmt::Display for AiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AiError {}

/// Mock AI client for tests — returns pre-configured responses from a queue
/// and records every call for auditing.
#[derive(Clone, Default)]
pub struct MockAiClient {
    responses: Arc<Mutex<VecDeque<Result<String, AiError>>>>,
    calls: Arc<Mutex<Vec<(ModelClass, String)>>>,
}

impl MockAiClient {
    pub fn new(responses: Vec<Result<String, AiError>>) -> Self {
        MockAiClient {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn next_response(&self, class: ModelClass, prompt: &str) -> Result<String, AiError> {
        self.calls
            .lock()
            .unwrap()
            .push((class, prompt.to_string()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("(mock exhausted)".to_string()))
    }

    /// Every `(model class, prompt)` pair seen so far.
    pub fn calls(&self) -> Vec<(ModelClass, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Responses still queued (to assert a stage was never reached).
    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

/// Unified AI client over the configured provider.
#[derive(Clone)]
pub enum AiClient {
    OpenAI(OpenAIClient),
    Mock(MockAiClient),
}

impl AiClient {
    /// Run a single-prompt completion against the model class.
    pub async fn complete(&self, class: ModelClass, prompt: &str) -> Result<String, AiError> {
        log::debug!("AI: {} completion, prompt {} chars", class.as_ref(), prompt.len());
        match self {
            AiClient::OpenAI(client) => client.complete(class, prompt).await,
            AiClient::Mock(client) => client.next_response(class, prompt),
        }
    }

    /// Describe one attached image. Best-effort enrichment; callers degrade
    /// gracefully on error.
    pub async fn describe_image(&self, url: &str) -> Result<String, AiError> {
        match self {
            AiClient::OpenAI(client) => client.describe_image(url).await,
            AiClient::Mock(client) => client.next_response(ModelClass::Image, url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_queued_responses_in_order() {
        let mock = MockAiClient::new(vec![Ok("first".to_string()), Ok("second".to_string())]);
        let client = AiClient::Mock(mock.clone());

        assert_eq!(
            client.complete(ModelClass::Small, "a").await.unwrap(),
            "first"
        );
        assert_eq!(
            client.complete(ModelClass::Large, "b").await.unwrap(),
            "second"
        );
        assert_eq!(mock.remaining(), 0);

        let calls = mock.calls();
        assert_eq!(calls[0].0, ModelClass::Small);
        assert_eq!(calls[1].0, ModelClass::Large);
    }

    #[tokio::test]
    async fn test_mock_propagates_errors() {
        let mock = MockAiClient::new(vec![Err(AiError::new("boom"))]);
        let client = AiClient::Mock(mock);
        let err = client.complete(ModelClass::Small, "p").await.unwrap_err();
        assert_eq!(err.message, "boom");
    }
}
