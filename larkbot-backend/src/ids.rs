//! Deterministic identifier derivation.
//!
//! Every durable record is keyed by a UUID derived purely from the agent id
//! and a natural key, so re-ingesting the same post always targets the same
//! row and writes can be made idempotent without a storage lookup.

use uuid::Uuid;

/// Derive a stable UUID from `(agent_id, natural_key)`.
pub fn derive_id(agent_id: &str, natural_key: &str) -> Uuid {
    let input = format!("{}:{}", agent_id, natural_key);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, input.as_bytes())
}

/// Memory id for a platform post.
pub fn memory_id(agent_id: &str, post_id: &str) -> Uuid {
    derive_id(agent_id, &format!("post:{}", post_id))
}

/// Memory id for a reply the agent generated to a platform post.
pub fn reply_memory_id(agent_id: &str, post_id: &str) -> Uuid {
    derive_id(agent_id, &format!("post:{}:reply", post_id))
}

/// Room id for a conversation.
pub fn room_id(agent_id: &str, conversation_id: &str) -> Uuid {
    derive_id(agent_id, &format!("room:{}", conversation_id))
}

/// Identity for a platform user.
pub fn participant_id(agent_id: &str, platform_user_id: &str) -> Uuid {
    derive_id(agent_id, &format!("user:{}", platform_user_id))
}

/// The agent's own identity. Self-authored posts map here instead of to a
/// participant id.
pub fn agent_identity(agent_id: &str) -> Uuid {
    derive_id(agent_id, "agent")
}
