use serde::{Deserialize, Serialize};

/// A platform-native social post. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Platform id. Numeric-comparable string (snowflake-style).
    pub id: String,
    pub author_id: String,
    pub author_handle: String,
    pub text: String,
    pub created_at_epoch: i64,
    /// Root id of the conversation this post belongs to, when known.
    pub conversation_id: Option<String>,
    /// Id of the post this one replies to, when it is a reply.
    pub in_reply_to_id: Option<String>,
    pub is_reply: bool,
    pub is_retweet: bool,
    /// Attached photo URLs, in attachment order.
    pub image_urls: Vec<String>,
}

impl Post {
    /// The conversation id, falling back to the post's own id for
    /// standalone posts.
    pub fn conversation_or_self(&self) -> &str {
        self.conversation_id.as_deref().unwrap_or(&self.id)
    }
}

/// Root-to-leaf reconstruction of a reply chain.
pub type Thread = Vec<Post>;

#[cfg(test)]
pub mod test_support {
    use super::Post;

    /// A minimal post for tests; override fields as needed.
    pub fn post(id: &str, author_id: &str, author_handle: &str, text: &str) -> Post {
        Post {
            id: id.to_string(),
            author_id: author_id.to_string(),
            author_handle: author_handle.to_string(),
            text: text.to_string(),
            created_at_epoch: 1_700_000_000,
            conversation_id: None,
            in_reply_to_id: None,
            is_reply: false,
            is_retweet: false,
            image_urls: Vec::new(),
        }
    }
}
