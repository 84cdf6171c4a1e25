//! Social platform client.
//!
//! [`SocialPlatform`] is the seam between the interaction pipeline and the
//! network: a live Twitter API v2 implementation ([`TwitterClient`]) and a
//! scripted [`MockPlatform`] for tests.

mod client;
mod oauth;

pub use client::{split_for_post, TwitterClient, POST_MAX_CHARS};
pub use oauth::{generate_oauth_header, percent_encode, TwitterCredentials};

use crate::models::Post;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Error from a platform call.
#[derive(Debug, Clone)]
pub struct PlatformError {
    pub message: String,
    /// Set when the platform reported rate limiting; seconds until the
    /// limit window resets, when the response carried that header.
    pub retry_after_secs: Option<u64>,
}

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        PlatformError {
            message: message.into(),
            retry_after_secs: None,
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after_secs: Option<u64>) -> Self {
        PlatformError {
            message: message.into(),
            retry_after_secs: retry_after_secs.or(Some(300)),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.retry_after_secs.is_some()
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PlatformError {}

/// Read and write access to the social platform.
#[async_trait]
pub trait SocialPlatform: Send + Sync {
    /// Most recent posts matching `query`, newest first, at most `limit`.
    async fn search_posts(&self, query: &str, limit: usize) -> Result<Vec<Post>, PlatformError>;

    /// Fetch one post by id. `Ok(None)` when the post does not exist or is
    /// not visible.
    async fn get_post(&self, id: &str) -> Result<Option<Post>, PlatformError>;

    /// Publish `text` as a reply to `in_reply_to`. Long text is split into a
    /// numbered thread. Returns the posts that were created, in order.
    async fn publish_reply(&self, text: &str, in_reply_to: &str)
        -> Result<Vec<Post>, PlatformError>;
}

/// Scripted platform for tests: posts and search results are pre-loaded,
/// publishes are recorded instead of sent.
#[derive(Clone)]
pub struct MockPlatform {
    self_user_id: String,
    self_handle: String,
    posts: Arc<Mutex<HashMap<String, Post>>>,
    searches: Arc<Mutex<HashMap<String, Vec<Post>>>>,
    failing_searches: Arc<Mutex<HashSet<String>>>,
    published: Arc<Mutex<Vec<(String, String)>>>,
    next_post_id: Arc<Mutex<u64>>,
}

impl MockPlatform {
    pub fn new(self_user_id: &str, self_handle: &str) -> Self {
        MockPlatform {
            self_user_id: self_user_id.to_string(),
            self_handle: self_handle.to_string(),
            posts: Arc::new(Mutex::new(HashMap::new())),
            searches: Arc::new(Mutex::new(HashMap::new())),
            failing_searches: Arc::new(Mutex::new(HashSet::new())),
            published: Arc::new(Mutex::new(Vec::new())),
            next_post_id: Arc::new(Mutex::new(900_000_000_000)),
        }
    }

    /// Register a post for `get_post` lookups.
    pub fn add_post(&self, post: Post) {
        self.posts.lock().unwrap().insert(post.id.clone(), post);
    }

    /// Script the result list for a search query. The posts are also
    /// registered for id lookups.
    pub fn set_search(&self, query: &str, posts: Vec<Post>) {
        for post in &posts {
            self.add_post(post.clone());
        }
        self.searches
            .lock()
            .unwrap()
            .insert(query.to_string(), posts);
    }

    /// Make a search query fail with a transient error.
    pub fn fail_search(&self, query: &str) {
        self.failing_searches
            .lock()
            .unwrap()
            .insert(query.to_string());
    }

    /// Every `(text, in_reply_to)` pair published so far.
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl SocialPlatform for MockPlatform {
    async fn search_posts(&self, query: &str, limit: usize) -> Result<Vec<Post>, PlatformError> {
        if self.failing_searches.lock().unwrap().contains(query) {
            return Err(PlatformError::new(format!(
                "scripted failure for query {}",
                query
            )));
        }
        let posts = self
            .searches
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default();
        Ok(posts.into_iter().take(limit).collect())
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, PlatformError> {
        Ok(self.posts.lock().unwrap().get(id).cloned())
    }

    async fn publish_reply(
        &self,
        text: &str,
        in_reply_to: &str,
    ) -> Result<Vec<Post>, PlatformError> {
        self.published
            .lock()
            .unwrap()
            .push((text.to_string(), in_reply_to.to_string()));

        let id = {
            let mut next = self.next_post_id.lock().unwrap();
            *next += 1;
            next.to_string()
        };
        let post = Post {
            id,
            author_id: self.self_user_id.clone(),
            author_handle: self.self_handle.clone(),
            text: text.to_string(),
            created_at_epoch: chrono::Utc::now().timestamp(),
            conversation_id: None,
            in_reply_to_id: Some(in_reply_to.to_string()),
            is_reply: true,
            is_retweet: false,
            image_urls: Vec::new(),
        };
        self.add_post(post.clone());
        Ok(vec![post])
    }
}
