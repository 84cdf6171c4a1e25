//! The reply pipeline: one candidate post in, at most one published reply
//! out.

use crate::ai::{AiClient, ModelClass};
use crate::config::AgentConfig;
use crate::db::Database;
use crate::ids;
use crate::interactions::response::{parse_reply, parse_should_respond};
use crate::interactions::thread::build_thread;
use crate::interactions::{prompts, remember_post, transcript_key, ErrorKind, PipelineError};
use crate::models::{InteractionMemory, Post, ReplyDecision};
use crate::twitter::SocialPlatform;
use rand::Rng;
use std::time::Duration;

/// Terminal state of one candidate.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Self-authored and not a target user; nothing was done.
    Skipped,
    Ignored,
    Stopped,
    /// Dry-run mode: the reply that would have been published.
    DryRun(String),
    /// Live mode: number of posts actually published (0 when the publish
    /// call failed).
    Replied { posted: usize },
}

pub async fn handle_candidate(
    platform: &dyn SocialPlatform,
    ai: &AiClient,
    db: &Database,
    config: &AgentConfig,
    candidate: &Post,
) -> Result<ReplyOutcome, PipelineError> {
    // Own posts are only considered when the agent itself is a target user
    if candidate.author_id == config.agent_user_id
        && !config.is_target_user(&candidate.author_handle)
    {
        log::debug!("Reply: skipping own post {}", candidate.id);
        return Ok(ReplyOutcome::Skipped);
    }

    if candidate.text.trim().is_empty() {
        log::debug!("Reply: post {} has no text, ignoring", candidate.id);
        return Ok(ReplyOutcome::Ignored);
    }

    // Rebuilding the thread also persists every visited post, the candidate
    // included
    let thread = build_thread(platform, db, config, candidate, config.max_thread_depth).await;

    // Best-effort enrichment; a failed description is dropped, not fatal
    let mut image_descriptions = Vec::new();
    for url in &candidate.image_urls {
        match ai.describe_image(url).await {
            Ok(description) => image_descriptions.push(description),
            Err(e) => {
                let err = PipelineError::new(ErrorKind::Enrichment, e);
                log::warn!("Reply: dropping image {}: {}", url, err);
            }
        }
    }

    remember_post(db, config, candidate)?;

    let decision_prompt =
        prompts::should_respond_prompt(config, candidate, &thread, &image_descriptions);
    let verdict = ai
        .complete(ModelClass::Small, &decision_prompt)
        .await
        .map_err(PipelineError::decision)?;

    match parse_should_respond(&verdict) {
        ReplyDecision::Ignore => {
            log::info!("Reply: ignoring post {}", candidate.id);
            return Ok(ReplyOutcome::Ignored);
        }
        ReplyDecision::Stop => {
            log::info!("Reply: standing down on post {}", candidate.id);
            return Ok(ReplyOutcome::Stopped);
        }
        ReplyDecision::Respond { .. } => {}
    }

    let generation_prompt =
        prompts::generation_prompt(config, candidate, &thread, &image_descriptions);
    let raw = ai
        .complete(ModelClass::Large, &generation_prompt)
        .await
        .map_err(PipelineError::generation)?;

    let (text, action) = match parse_reply(&raw)? {
        ReplyDecision::Respond { text, action } => (text, action),
        ReplyDecision::Ignore => {
            log::info!("Reply: generation produced no text for {}", candidate.id);
            return Ok(ReplyOutcome::Ignored);
        }
        ReplyDecision::Stop => return Ok(ReplyOutcome::Stopped),
    };

    if let Some(action) = &action {
        log::info!("Reply: action tag for {}: {}", candidate.id, action);
    }

    if config.dry_run {
        log::info!(
            "Reply (dry run): would reply to {} by @{}: {}",
            candidate.id,
            candidate.author_handle,
            text
        );
        return Ok(ReplyOutcome::DryRun(text));
    }

    publish_response(platform, db, config, candidate, &generation_prompt, text).await
}

/// Persist the reply, publish it, record what was published, cache the
/// debug transcript, then pause briefly. Publish failures are logged and
/// swallowed.
async fn publish_response(
    platform: &dyn SocialPlatform,
    db: &Database,
    config: &AgentConfig,
    candidate: &Post,
    prompt: &str,
    text: String,
) -> Result<ReplyOutcome, PipelineError> {
    let agent = config.agent_handle.as_str();
    let room_id = ids::room_id(agent, candidate.conversation_or_self());
    let agent_id = ids::agent_identity(agent);

    db.ensure_conversation_context(
        &agent_id,
        &room_id,
        &config.agent_name,
        &config.agent_handle,
        "twitter",
    )?;
    db.create_memory(&InteractionMemory {
        id: ids::reply_memory_id(agent, &candidate.id),
        room_id,
        user_id: agent_id,
        text: text.clone(),
        source: "twitter".to_string(),
        in_reply_to: Some(ids::memory_id(agent, &candidate.id)),
        image_urls: Vec::new(),
        created_at_epoch: chrono::Utc::now().timestamp(),
    })?;

    let posted = match platform.publish_reply(&text, &candidate.id).await {
        Ok(posts) => {
            for post in &posts {
                if let Err(e) = remember_post(db, config, post) {
                    log::warn!("Reply: failed to persist published post {}: {}", post.id, e);
                }
            }
            posts.len()
        }
        Err(e) => {
            let err = PipelineError::new(ErrorKind::Publish, e);
            log::error!("Reply: could not publish reply to {}: {}", candidate.id, err);
            0
        }
    };

    let transcript = serde_json::json!({ "prompt": prompt, "response": text });
    if let Err(e) = db.set_cached_value(&transcript_key(config, &candidate.id), &transcript.to_string())
    {
        log::warn!("Reply: failed to cache transcript for {}: {}", candidate.id, e);
    }

    // Courtesy pause between publishes
    let (delay_min, delay_max) = config.reply_delay_secs;
    if delay_max > 0 {
        let secs = rand::thread_rng().gen_range(delay_min..=delay_max);
        log::debug!("Reply: pausing {}s after publish", secs);
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    Ok(ReplyOutcome::Replied { posted })
}
