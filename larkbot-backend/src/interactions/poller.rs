//! Fixed-interval interaction polling.
//!
//! One cycle: fetch mention candidates and one random fresh post per target
//! user, order them, run each unseen candidate through the reply pipeline,
//! advance the last-checked marker, and flush it to the cache.

use crate::ai::AiClient;
use crate::config::AgentConfig;
use crate::db::Database;
use crate::ids;
use crate::interactions::reply::handle_candidate;
use crate::interactions::{last_checked_key, ErrorKind, PipelineError};
use crate::models::{LastCheckedMarker, Post};
use crate::twitter::SocialPlatform;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{interval, MissedTickBehavior};

/// Mentions fetched per cycle.
const MENTION_FETCH_LIMIT: usize = 20;

/// Recent posts fetched per target user per cycle.
const TARGET_FETCH_LIMIT: usize = 3;

/// Target-user posts older than this are never selected.
const TARGET_MAX_AGE_SECS: i64 = 2 * 60 * 60;

/// A target-user post qualifies when it is unprocessed, original (not a
/// reply or repost), and fresh.
fn is_valid_target_post(post: &Post, marker: &LastCheckedMarker, now_epoch: i64) -> bool {
    !marker.covers(&post.id)
        && !post.is_reply
        && !post.is_retweet
        && now_epoch - post.created_at_epoch <= TARGET_MAX_AGE_SECS
}

/// Run one polling cycle. Takes the marker by value and returns the
/// (possibly advanced) marker; a mention-fetch failure aborts the cycle and
/// returns it unchanged.
pub async fn poll_once(
    platform: &dyn SocialPlatform,
    ai: &AiClient,
    db: &Database,
    config: &AgentConfig,
    mut marker: LastCheckedMarker,
) -> LastCheckedMarker {
    let mention_query = format!("@{}", config.agent_handle);
    let mut candidates = match platform.search_posts(&mention_query, MENTION_FETCH_LIMIT).await {
        Ok(posts) => posts,
        Err(e) => {
            log::error!(
                "Poll: aborting cycle: {}",
                PipelineError::new(ErrorKind::Fetch, &e)
            );
            if e.is_rate_limited() {
                let wait_secs = e.retry_after_secs.unwrap_or(300).max(60);
                log::warn!("Poll: rate limited, backing off for {}s", wait_secs);
                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
            }
            return marker;
        }
    };

    // One random fresh post per target user; per-user failures are isolated
    let now_epoch = chrono::Utc::now().timestamp();
    for user in &config.target_users {
        let query = format!("from:{}", user);
        match platform.search_posts(&query, TARGET_FETCH_LIMIT).await {
            Ok(posts) => {
                let valid: Vec<Post> = posts
                    .into_iter()
                    .filter(|p| is_valid_target_post(p, &marker, now_epoch))
                    .collect();
                if let Some(pick) = valid.choose(&mut rand::thread_rng()) {
                    candidates.push(pick.clone());
                }
            }
            Err(e) => {
                log::warn!("Poll: error fetching posts for target @{}: {}", user, e);
            }
        }
    }

    // Drop the agent's own posts unless the agent is itself a target
    candidates.retain(|p| {
        p.author_id != config.agent_user_id || config.is_target_user(&p.author_handle)
    });

    // Ordered by id string. Ids are same-length snowflakes in practice, so
    // this approximates chronological order.
    candidates.sort_by(|a, b| a.id.cmp(&b.id));

    for candidate in candidates {
        if marker.covers(&candidate.id) {
            log::debug!("Poll: {} already processed, skipping", candidate.id);
            continue;
        }

        let memory_id = ids::memory_id(&config.agent_handle, &candidate.id);
        match db.get_memory(&memory_id) {
            Ok(Some(_)) => {
                log::debug!("Poll: {} already ingested, skipping", candidate.id);
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                log::error!("Poll: store lookup failed for {}: {}", candidate.id, e);
                continue;
            }
        }

        log::info!(
            "Poll: processing candidate {} by @{}",
            candidate.id,
            candidate.author_handle
        );
        match handle_candidate(platform, ai, db, config, &candidate).await {
            Ok(outcome) => {
                log::info!("Poll: candidate {} -> {:?}", candidate.id, outcome);
            }
            Err(e) => {
                // Per-candidate isolation: log and move to the next one
                log::error!("Poll: candidate {} failed ({}), moving on", candidate.id, e);
            }
        }

        // The marker advances whether or not a reply was produced
        marker.advance(&candidate.id);
    }

    if let Some(value) = marker.to_cache_value() {
        if let Err(e) = db.set_cached_value(&last_checked_key(config), &value) {
            log::error!("Poll: failed to persist last-checked marker: {}", e);
        }
    }

    marker
}

/// Start the polling loop. Runs until the shutdown receiver fires. The
/// interval is measured with delayed ticks, so a slow cycle pushes the next
/// one back instead of overlapping it.
pub async fn start_interaction_listener(
    platform: Arc<dyn SocialPlatform>,
    ai: AiClient,
    db: Arc<Database>,
    config: AgentConfig,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    log::info!(
        "Starting interaction listener for @{} (poll interval {}s, {} target user(s), dry_run={})",
        config.agent_handle,
        config.poll_interval_secs,
        config.target_users.len(),
        config.dry_run
    );

    let cached = db.get_cached_value(&last_checked_key(&config)).unwrap_or_else(|e| {
        log::warn!("Failed to load last-checked marker: {}", e);
        None
    });
    let mut marker = LastCheckedMarker::from_cached(cached);
    log::info!("Interaction listener starting from marker {:?}", marker.get());

    let mut poll_interval = interval(Duration::from_secs(config.poll_interval_secs));
    poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                log::info!("Interaction listener received shutdown signal");
                break;
            }
            _ = poll_interval.tick() => {
                marker = poll_once(platform.as_ref(), &ai, &db, &config, marker).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiError, MockAiClient};
    use crate::config::test_support::test_config;
    use crate::db::test_support::temp_db;
    use crate::models::test_support::post;
    use crate::twitter::MockPlatform;

    fn mock_ai(responses: Vec<Result<String, AiError>>) -> (MockAiClient, AiClient) {
        let mock = MockAiClient::new(responses);
        (mock.clone(), AiClient::Mock(mock))
    }

    fn fresh_post(id: &str, author_id: &str, handle: &str, text: &str) -> Post {
        let mut p = post(id, author_id, handle, text);
        p.created_at_epoch = chrono::Utc::now().timestamp();
        p
    }

    #[test]
    fn test_target_filter_rejects_stale_replies_and_reposts() {
        let marker = LastCheckedMarker::default();
        let now = chrono::Utc::now().timestamp();

        let fresh = fresh_post("100", "42", "alice", "new idea");
        assert!(is_valid_target_post(&fresh, &marker, now));

        let mut stale = fresh.clone();
        stale.created_at_epoch = now - TARGET_MAX_AGE_SECS - 1;
        assert!(!is_valid_target_post(&stale, &marker, now));

        let mut reply = fresh.clone();
        reply.is_reply = true;
        assert!(!is_valid_target_post(&reply, &marker, now));

        let mut repost = fresh.clone();
        repost.is_retweet = true;
        assert!(!is_valid_target_post(&repost, &marker, now));

        let covered = LastCheckedMarker::new(Some(100));
        assert!(!is_valid_target_post(&fresh, &covered, now));
    }

    #[tokio::test]
    async fn test_candidates_dispatch_in_lexicographic_id_order() {
        let platform = MockPlatform::new("1000", "larkbot");
        let (_dir, db) = temp_db();
        let config = test_config();
        // Lexicographically "10" sorts before "9", the documented ordering
        platform.set_search(
            "@larkbot",
            vec![
                fresh_post("9", "42", "alice", "post nine"),
                fresh_post("10", "43", "bob", "post ten"),
            ],
        );
        let (mock, ai) = mock_ai(vec![Ok("IGNORE".to_string()), Ok("IGNORE".to_string())]);

        poll_once(&platform, &ai, &db, &config, LastCheckedMarker::default()).await;

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].1.contains("post ten"));
        assert!(calls[1].1.contains("post nine"));
    }

    #[tokio::test]
    async fn test_marker_advances_past_failing_candidate_and_is_flushed() {
        let platform = MockPlatform::new("1000", "larkbot");
        let (_dir, db) = temp_db();
        let config = test_config();
        platform.set_search(
            "@larkbot",
            vec![fresh_post("200", "42", "alice", "@larkbot hello")],
        );
        let (_mock, ai) = mock_ai(vec![Err(AiError::new("model down"))]);

        let marker = poll_once(&platform, &ai, &db, &config, LastCheckedMarker::default()).await;

        assert_eq!(marker.get(), Some(200));
        assert_eq!(
            db.get_cached_value(&last_checked_key(&config)).unwrap(),
            Some("200".to_string())
        );
    }

    #[tokio::test]
    async fn test_pipeline_failure_does_not_abort_remaining_candidates() {
        let platform = MockPlatform::new("1000", "larkbot");
        let (_dir, db) = temp_db();
        let config = test_config();
        platform.set_search(
            "@larkbot",
            vec![
                fresh_post("300", "42", "alice", "first"),
                fresh_post("301", "43", "bob", "second"),
            ],
        );
        let (mock, ai) = mock_ai(vec![
            Err(AiError::new("model down")),
            Ok("IGNORE".to_string()),
        ]);

        let marker = poll_once(&platform, &ai, &db, &config, LastCheckedMarker::default()).await;

        // Both candidates were attempted and the marker covers both
        assert_eq!(mock.calls().len(), 2);
        assert_eq!(marker.get(), Some(301));
    }

    #[tokio::test]
    async fn test_mention_fetch_failure_aborts_cycle() {
        let platform = MockPlatform::new("1000", "larkbot");
        let (_dir, db) = temp_db();
        let mut config = test_config();
        config.target_users = vec!["alice".to_string()];
        platform.fail_search("@larkbot");
        platform.set_search(
            "from:alice",
            vec![fresh_post("400", "42", "alice", "fresh post")],
        );
        let (mock, ai) = mock_ai(vec![Ok("IGNORE".to_string())]);

        let marker = poll_once(&platform, &ai, &db, &config, LastCheckedMarker::default()).await;

        assert!(mock.calls().is_empty());
        assert_eq!(marker.get(), None);
        assert_eq!(db.get_cached_value(&last_checked_key(&config)).unwrap(), None);
    }

    #[tokio::test]
    async fn test_target_user_fetch_failure_is_isolated() {
        let platform = MockPlatform::new("1000", "larkbot");
        let (_dir, db) = temp_db();
        let mut config = test_config();
        config.target_users = vec!["alice".to_string(), "bob".to_string()];
        platform.set_search("@larkbot", vec![]);
        platform.fail_search("from:alice");
        platform.set_search(
            "from:bob",
            vec![fresh_post("500", "43", "bob", "bob's fresh post")],
        );
        let (mock, ai) = mock_ai(vec![Ok("IGNORE".to_string())]);

        let marker = poll_once(&platform, &ai, &db, &config, LastCheckedMarker::default()).await;

        assert_eq!(mock.calls().len(), 1);
        assert!(mock.calls()[0].1.contains("bob's fresh post"));
        assert_eq!(marker.get(), Some(500));
    }

    #[tokio::test]
    async fn test_exactly_one_post_picked_per_target_user() {
        let platform = MockPlatform::new("1000", "larkbot");
        let (_dir, db) = temp_db();
        let mut config = test_config();
        config.target_users = vec!["alice".to_string()];
        platform.set_search("@larkbot", vec![]);
        platform.set_search(
            "from:alice",
            vec![
                fresh_post("600", "42", "alice", "option one"),
                fresh_post("601", "42", "alice", "option two"),
                fresh_post("602", "42", "alice", "option three"),
            ],
        );
        let (mock, ai) = mock_ai(vec![Ok("IGNORE".to_string())]);

        poll_once(&platform, &ai, &db, &config, LastCheckedMarker::default()).await;

        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_own_posts_are_never_dispatched() {
        let platform = MockPlatform::new("1000", "larkbot");
        let (_dir, db) = temp_db();
        let config = test_config();
        platform.set_search(
            "@larkbot",
            vec![
                fresh_post("700", &config.agent_user_id, "larkbot", "my own post"),
                fresh_post("701", "42", "alice", "someone else"),
            ],
        );
        let (mock, ai) = mock_ai(vec![Ok("IGNORE".to_string())]);

        poll_once(&platform, &ai, &db, &config, LastCheckedMarker::default()).await;

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1.contains("someone else"));
    }

    #[tokio::test]
    async fn test_already_ingested_candidate_is_skipped() {
        let platform = MockPlatform::new("1000", "larkbot");
        let (_dir, db) = temp_db();
        let config = test_config();
        let candidate = fresh_post("800", "42", "alice", "seen before");
        platform.set_search("@larkbot", vec![candidate.clone()]);
        crate::interactions::remember_post(&db, &config, &candidate).unwrap();
        let (mock, ai) = mock_ai(vec![Ok("IGNORE".to_string())]);

        let marker = poll_once(&platform, &ai, &db, &config, LastCheckedMarker::default()).await;

        assert!(mock.calls().is_empty());
        // The skip happens before dispatch, so the marker is left alone
        assert_eq!(marker.get(), None);
    }

    #[tokio::test]
    async fn test_candidates_at_or_below_marker_are_skipped() {
        let platform = MockPlatform::new("1000", "larkbot");
        let (_dir, db) = temp_db();
        let config = test_config();
        platform.set_search(
            "@larkbot",
            vec![
                fresh_post("900", "42", "alice", "old news"),
                fresh_post("901", "43", "bob", "new post"),
            ],
        );
        let (mock, ai) = mock_ai(vec![Ok("IGNORE".to_string())]);

        let marker =
            poll_once(&platform, &ai, &db, &config, LastCheckedMarker::new(Some(900))).await;

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1.contains("new post"));
        assert_eq!(marker.get(), Some(901));
    }
}
