//! Conversation thread reconstruction.
//!
//! Walks the reply-parent chain upward from a leaf post. Each visited post
//! is persisted as an interaction memory as a side effect of traversal, so
//! the store converges on the full conversation even when posts arrive out
//! of order.

use crate::config::AgentConfig;
use crate::db::Database;
use crate::interactions::remember_post;
use crate::models::{Post, Thread};
use crate::twitter::SocialPlatform;
use std::collections::HashSet;

/// Rebuild the thread above `leaf`, root first, visiting at most
/// `max_depth` ancestors. Missing or unfetchable parents end the walk;
/// this never fails outright.
pub async fn build_thread(
    platform: &dyn SocialPlatform,
    db: &Database,
    config: &AgentConfig,
    leaf: &Post,
    max_depth: usize,
) -> Thread {
    let mut thread: Thread = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = Some(leaf.clone());
    let mut depth = 0usize;

    while let Some(post) = current.take() {
        // Cycle guard
        if !visited.insert(post.id.clone()) {
            log::debug!("Thread: already visited {}, stopping", post.id);
            break;
        }

        if let Err(e) = remember_post(db, config, &post) {
            log::warn!("Thread: failed to persist {}: {}", post.id, e);
        }
        thread.insert(0, post.clone());

        if depth >= max_depth {
            log::debug!("Thread: reached max depth {} at {}", max_depth, post.id);
            break;
        }

        let parent_id = match &post.in_reply_to_id {
            Some(id) => id.clone(),
            None => break,
        };

        match platform.get_post(&parent_id).await {
            Ok(Some(parent)) => {
                depth += 1;
                current = Some(parent);
            }
            Ok(None) => {
                log::debug!("Thread: parent {} not found, stopping", parent_id);
                break;
            }
            Err(e) => {
                log::warn!("Thread: failed to fetch parent {}: {}", parent_id, e);
                break;
            }
        }
    }

    thread
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::test_config;
    use crate::db::test_support::temp_db;
    use crate::models::test_support::post;
    use crate::twitter::MockPlatform;

    /// Build a reply chain `base .. base+len-1` where each post replies to
    /// the previous one. Returns the leaf.
    fn chain(platform: &MockPlatform, base: u64, len: u64) -> Post {
        let mut leaf = None;
        for i in 0..len {
            let id = (base + i).to_string();
            let mut p = post(&id, "42", "alice", &format!("post {}", id));
            if i > 0 {
                p.in_reply_to_id = Some((base + i - 1).to_string());
                p.is_reply = true;
            }
            p.conversation_id = Some(base.to_string());
            platform.add_post(p.clone());
            leaf = Some(p);
        }
        leaf.expect("non-empty chain")
    }

    #[tokio::test]
    async fn test_thread_is_root_first() {
        let platform = MockPlatform::new("1000", "larkbot");
        let (_dir, db) = temp_db();
        let config = test_config();
        let leaf = chain(&platform, 100, 4);

        let thread = build_thread(&platform, &db, &config, &leaf, 10).await;
        let ids: Vec<&str> = thread.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["100", "101", "102", "103"]);
    }

    #[tokio::test]
    async fn test_thread_depth_is_bounded() {
        let platform = MockPlatform::new("1000", "larkbot");
        let (_dir, db) = temp_db();
        let config = test_config();
        // 16 posts: the leaf plus 15 linked parents
        let leaf = chain(&platform, 100, 16);

        let thread = build_thread(&platform, &db, &config, &leaf, 10).await;
        // 10 ancestors plus the leaf, not all 16
        assert_eq!(thread.len(), 11);
        assert_eq!(thread.last().expect("leaf").id, leaf.id);
    }

    #[tokio::test]
    async fn test_missing_parent_ends_walk_without_error() {
        let platform = MockPlatform::new("1000", "larkbot");
        let (_dir, db) = temp_db();
        let config = test_config();
        let mut leaf = post("500", "42", "alice", "orphan reply");
        leaf.in_reply_to_id = Some("499".to_string()); // never registered
        leaf.is_reply = true;
        platform.add_post(leaf.clone());

        let thread = build_thread(&platform, &db, &config, &leaf, 10).await;
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].id, "500");
    }

    #[tokio::test]
    async fn test_cycle_is_broken_by_visited_set() {
        let platform = MockPlatform::new("1000", "larkbot");
        let (_dir, db) = temp_db();
        let config = test_config();
        let mut a = post("600", "42", "alice", "a");
        a.in_reply_to_id = Some("601".to_string());
        let mut b = post("601", "42", "alice", "b");
        b.in_reply_to_id = Some("600".to_string());
        platform.add_post(a.clone());
        platform.add_post(b);

        let thread = build_thread(&platform, &db, &config, &a, 10).await;
        assert_eq!(thread.len(), 2);
    }

    #[tokio::test]
    async fn test_traversal_persists_every_visited_post() {
        let platform = MockPlatform::new("1000", "larkbot");
        let (_dir, db) = temp_db();
        let config = test_config();
        let leaf = chain(&platform, 700, 3);

        build_thread(&platform, &db, &config, &leaf, 10).await;
        assert_eq!(db.count_memories().unwrap(), 3);

        // Re-walking the same thread writes nothing new
        build_thread(&platform, &db, &config, &leaf, 10).await;
        assert_eq!(db.count_memories().unwrap(), 3);
    }
}
