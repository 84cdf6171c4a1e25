//! OpenAI-compatible chat-completions client.
//!
//! One endpoint, three model names keyed by [`ModelClass`]. No streaming and
//! no tool calls; the interaction pipeline only needs single-shot
//! completions and image description.

use crate::ai::{AiError, ModelClass};
use crate::config::AiSettings;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    auth_headers: header::HeaderMap,
    endpoint: String,
    small_model: String,
    large_model: String,
    image_model: String,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAIClient {
    pub fn new(settings: &AiSettings) -> Result<Self, String> {
        let mut auth_headers = header::HeaderMap::new();
        auth_headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        if !settings.api_key.is_empty() {
            let auth_value =
                header::HeaderValue::from_str(&format!("Bearer {}", settings.api_key))
                    .map_err(|e| format!("Invalid API key format: {}", e))?;
            auth_headers.insert(header::AUTHORIZATION, auth_value);
        }

        Ok(Self {
            client: crate::http::shared_client().clone(),
            auth_headers,
            endpoint: settings.endpoint.clone(),
            small_model: settings.small_model.clone(),
            large_model: settings.large_model.clone(),
            image_model: settings.image_model.clone(),
            max_tokens: settings.max_tokens,
        })
    }

    fn model_for(&self, class: ModelClass) -> &str {
        match class {
            ModelClass::Small => &self.small_model,
            ModelClass::Large => &self.large_model,
            ModelClass::Image => &self.image_model,
        }
    }

    /// Run a single-prompt completion.
    pub async fn complete(&self, class: ModelClass, prompt: &str) -> Result<String, AiError> {
        let messages = vec![json!({ "role": "user", "content": prompt })];
        self.request(class, messages).await
    }

    /// Describe an image by URL using the image model.
    pub async fn describe_image(&self, url: &str) -> Result<String, AiError> {
        let messages = vec![json!({
            "role": "user",
            "content": [
                {
                    "type": "text",
                    "text": "Describe this image in one or two sentences. \
                             Mention any visible text verbatim."
                },
                { "type": "image_url", "image_url": { "url": url } }
            ]
        })];
        self.request(ModelClass::Image, messages).await
    }

    async fn request(&self, class: ModelClass, messages: Vec<Value>) -> Result<String, AiError> {
        let body = json!({
            "model": self.model_for(class),
            "messages": messages,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.auth_headers.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::new(format!("Request failed: {}", e)))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            // Prefer the provider's error message when it parses
            if let Ok(err) = serde_json::from_str::<ErrorResponse>(&text) {
                return Err(AiError::new(format!(
                    "API error ({}): {}",
                    status, err.error.message
                )));
            }
            return Err(AiError::new(format!("API error ({}): {}", status, text)));
        }

        let parsed: CompletionResponse = serde_json::from_str(&text)
            .map_err(|e| AiError::new(format!("Failed to parse response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AiError::new("No completion content returned"))
    }
}
