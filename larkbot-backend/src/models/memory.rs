use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable record of one observed or produced post.
///
/// Keyed by a deterministic id derived from `(agent, post id)`, so creation
/// is idempotent. Rows are never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionMemory {
    pub id: Uuid,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    /// Source tag, e.g. "twitter".
    pub source: String,
    /// Deterministic id of the post this one replies to, when known.
    pub in_reply_to: Option<Uuid>,
    pub image_urls: Vec<String>,
    pub created_at_epoch: i64,
}
