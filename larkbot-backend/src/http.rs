//! Shared HTTP client.
//!
//! One pooled client for every outbound call (Twitter API, LLM endpoint).

use once_cell::sync::Lazy;
use std::time::Duration;

static CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

pub fn shared_client() -> &'static reqwest::Client {
    &CLIENT
}
