//! The interaction core: polling loop, thread reconstruction, and the reply
//! pipeline.

mod error;
mod poller;
mod prompts;
mod reply;
mod response;
mod thread;

pub use error::{ErrorKind, PipelineError};
pub use poller::{poll_once, start_interaction_listener};
pub use reply::{handle_candidate, ReplyOutcome};
pub use thread::build_thread;

use crate::config::AgentConfig;
use crate::db::Database;
use crate::ids;
use crate::models::{InteractionMemory, Post};

/// Cache key for the last-checked marker.
pub fn last_checked_key(config: &AgentConfig) -> String {
    format!("twitter/{}/last_checked", config.agent_handle)
}

/// Cache key for the debug transcript of one candidate.
pub fn transcript_key(config: &AgentConfig, post_id: &str) -> String {
    format!("twitter/{}/{}/response", config.agent_handle, post_id)
}

/// Idempotently persist one post as an interaction memory, creating the
/// conversation context first. Returns true if a new row was written.
pub(crate) fn remember_post(
    db: &Database,
    config: &AgentConfig,
    post: &Post,
) -> Result<bool, PipelineError> {
    let agent = config.agent_handle.as_str();
    let memory_id = ids::memory_id(agent, &post.id);
    if db.get_memory(&memory_id)?.is_some() {
        return Ok(false);
    }

    let room_id = ids::room_id(agent, post.conversation_or_self());
    let user_id = if post.author_id == config.agent_user_id {
        ids::agent_identity(agent)
    } else {
        ids::participant_id(agent, &post.author_id)
    };

    db.ensure_conversation_context(
        &user_id,
        &room_id,
        &post.author_handle,
        &post.author_handle,
        "twitter",
    )?;

    let created = db.create_memory(&InteractionMemory {
        id: memory_id,
        room_id,
        user_id,
        text: post.text.clone(),
        source: "twitter".to_string(),
        in_reply_to: post
            .in_reply_to_id
            .as_deref()
            .map(|parent| ids::memory_id(agent, parent)),
        image_urls: post.image_urls.clone(),
        created_at_epoch: post.created_at_epoch,
    })?;
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::test_config;
    use crate::db::test_support::temp_db;
    use crate::models::test_support::post;

    #[test]
    fn test_remember_post_is_idempotent() {
        let (_dir, db) = temp_db();
        let config = test_config();
        let candidate = post("100", "42", "alice", "hello @larkbot");

        assert!(remember_post(&db, &config, &candidate).unwrap());
        assert!(!remember_post(&db, &config, &candidate).unwrap());
        assert_eq!(db.count_memories().unwrap(), 1);
    }

    #[test]
    fn test_self_authored_post_maps_to_agent_identity() {
        let (_dir, db) = temp_db();
        let config = test_config();
        let own = post("200", &config.agent_user_id, "larkbot", "my own post");

        remember_post(&db, &config, &own).unwrap();
        let memory = db
            .get_memory(&ids::memory_id(&config.agent_handle, "200"))
            .unwrap()
            .expect("memory exists");
        assert_eq!(memory.user_id, ids::agent_identity(&config.agent_handle));
    }

    #[test]
    fn test_reply_link_uses_deterministic_parent_id() {
        let (_dir, db) = temp_db();
        let config = test_config();
        let mut reply = post("300", "42", "alice", "a reply");
        reply.in_reply_to_id = Some("299".to_string());
        reply.is_reply = true;

        remember_post(&db, &config, &reply).unwrap();
        let memory = db
            .get_memory(&ids::memory_id(&config.agent_handle, "300"))
            .unwrap()
            .expect("memory exists");
        assert_eq!(
            memory.in_reply_to,
            Some(ids::memory_id(&config.agent_handle, "299"))
        );
    }
}
