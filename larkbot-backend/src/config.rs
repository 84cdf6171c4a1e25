use crate::twitter::TwitterCredentials;
use std::env;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const AGENT_HANDLE: &str = "LARKBOT_HANDLE";
    pub const AGENT_USER_ID: &str = "LARKBOT_USER_ID";
    pub const AGENT_NAME: &str = "LARKBOT_NAME";
    pub const AGENT_BIO: &str = "LARKBOT_BIO";
    pub const TARGET_USERS: &str = "LARKBOT_TARGET_USERS";
    pub const DRY_RUN: &str = "LARKBOT_DRY_RUN";
    pub const POLL_INTERVAL_SECS: &str = "LARKBOT_POLL_INTERVAL_SECS";
    pub const MAX_THREAD_DEPTH: &str = "LARKBOT_MAX_THREAD_DEPTH";
    pub const REPLY_DELAY_MIN_SECS: &str = "LARKBOT_REPLY_DELAY_MIN_SECS";
    pub const REPLY_DELAY_MAX_SECS: &str = "LARKBOT_REPLY_DELAY_MAX_SECS";

    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const OPENAI_ENDPOINT: &str = "OPENAI_ENDPOINT";
    pub const SMALL_MODEL: &str = "LARKBOT_SMALL_MODEL";
    pub const LARGE_MODEL: &str = "LARKBOT_LARGE_MODEL";
    pub const IMAGE_MODEL: &str = "LARKBOT_IMAGE_MODEL";
    pub const MAX_RESPONSE_TOKENS: &str = "LARKBOT_MAX_RESPONSE_TOKENS";

    pub const TWITTER_CONSUMER_KEY: &str = "TWITTER_CONSUMER_KEY";
    pub const TWITTER_CONSUMER_SECRET: &str = "TWITTER_CONSUMER_SECRET";
    pub const TWITTER_ACCESS_TOKEN: &str = "TWITTER_ACCESS_TOKEN";
    pub const TWITTER_ACCESS_TOKEN_SECRET: &str = "TWITTER_ACCESS_TOKEN_SECRET";
}

/// Default values
pub mod defaults {
    pub const DATABASE_URL: &str = "./.db/larkbot.db";
    pub const POLL_INTERVAL_SECS: u64 = 120;
    pub const MIN_POLL_INTERVAL_SECS: u64 = 60;
    pub const MAX_THREAD_DEPTH: usize = 10;
    pub const REPLY_DELAY_MIN_SECS: u64 = 2;
    pub const REPLY_DELAY_MAX_SECS: u64 = 8;
    pub const AGENT_BIO: &str =
        "A curious, even-keeled agent that replies to mentions with something worth reading.";

    pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
    pub const SMALL_MODEL: &str = "gpt-4o-mini";
    pub const LARGE_MODEL: &str = "gpt-4o";
    pub const IMAGE_MODEL: &str = "gpt-4o-mini";
    pub const MAX_RESPONSE_TOKENS: u32 = 1024;
}

/// Resolved agent configuration. Built once at startup; every option's
/// effective value is decided here, not re-resolved on each access.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Platform handle, without the leading '@'.
    pub agent_handle: String,
    /// The agent's own platform user id, used for self-authorship checks.
    pub agent_user_id: String,
    pub agent_name: String,
    pub agent_bio: String,
    /// Handles whose posts are always considered, regardless of topic.
    pub target_users: Vec<String>,
    /// Log would-be replies instead of publishing them.
    pub dry_run: bool,
    pub poll_interval_secs: u64,
    /// Maximum ancestors walked above a candidate when rebuilding a thread.
    pub max_thread_depth: usize,
    /// Post-publish pause, drawn uniformly from this inclusive range.
    pub reply_delay_secs: (u64, u64),
    pub database_url: String,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, String> {
        let agent_handle = require(env_vars::AGENT_HANDLE)?
            .trim_start_matches('@')
            .to_string();
        let agent_user_id = require(env_vars::AGENT_USER_ID)?;

        let agent_name = env::var(env_vars::AGENT_NAME).unwrap_or_else(|_| agent_handle.clone());
        let agent_bio =
            env::var(env_vars::AGENT_BIO).unwrap_or_else(|_| defaults::AGENT_BIO.to_string());

        let target_users = env::var(env_vars::TARGET_USERS)
            .map(|raw| parse_target_users(&raw))
            .unwrap_or_default();

        let dry_run = env::var(env_vars::DRY_RUN)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let poll_interval_secs = env::var(env_vars::POLL_INTERVAL_SECS)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults::POLL_INTERVAL_SECS)
            .max(defaults::MIN_POLL_INTERVAL_SECS);

        let max_thread_depth = env::var(env_vars::MAX_THREAD_DEPTH)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults::MAX_THREAD_DEPTH);

        let delay_min = env::var(env_vars::REPLY_DELAY_MIN_SECS)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults::REPLY_DELAY_MIN_SECS);
        let delay_max = env::var(env_vars::REPLY_DELAY_MAX_SECS)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults::REPLY_DELAY_MAX_SECS)
            .max(delay_min);

        Ok(Self {
            agent_handle,
            agent_user_id,
            agent_name,
            agent_bio,
            target_users,
            dry_run,
            poll_interval_secs,
            max_thread_depth,
            reply_delay_secs: (delay_min, delay_max),
            database_url: env::var(env_vars::DATABASE_URL)
                .unwrap_or_else(|_| defaults::DATABASE_URL.to_string()),
        })
    }

    pub fn is_target_user(&self, handle: &str) -> bool {
        let handle = handle.trim_start_matches('@');
        self.target_users
            .iter()
            .any(|t| t.eq_ignore_ascii_case(handle))
    }
}

/// LLM endpoint settings.
#[derive(Debug, Clone)]
pub struct AiSettings {
    pub api_key: String,
    pub endpoint: String,
    pub small_model: String,
    pub large_model: String,
    pub image_model: String,
    pub max_tokens: u32,
}

impl AiSettings {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            api_key: require(env_vars::OPENAI_API_KEY)?,
            endpoint: env::var(env_vars::OPENAI_ENDPOINT)
                .unwrap_or_else(|_| defaults::OPENAI_ENDPOINT.to_string()),
            small_model: env::var(env_vars::SMALL_MODEL)
                .unwrap_or_else(|_| defaults::SMALL_MODEL.to_string()),
            large_model: env::var(env_vars::LARGE_MODEL)
                .unwrap_or_else(|_| defaults::LARGE_MODEL.to_string()),
            image_model: env::var(env_vars::IMAGE_MODEL)
                .unwrap_or_else(|_| defaults::IMAGE_MODEL.to_string()),
            max_tokens: env::var(env_vars::MAX_RESPONSE_TOKENS)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::MAX_RESPONSE_TOKENS),
        })
    }
}

/// Load Twitter OAuth credentials from the environment.
pub fn twitter_credentials_from_env() -> Result<TwitterCredentials, String> {
    Ok(TwitterCredentials::new(
        require(env_vars::TWITTER_CONSUMER_KEY)?,
        require(env_vars::TWITTER_CONSUMER_SECRET)?,
        require(env_vars::TWITTER_ACCESS_TOKEN)?,
        require(env_vars::TWITTER_ACCESS_TOKEN_SECRET)?,
    ))
}

fn require(var: &str) -> Result<String, String> {
    match env::var(var) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(format!("{} not configured", var)),
    }
}

fn parse_target_users(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_start_matches('@').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_users() {
        assert_eq!(
            parse_target_users("@alice, bob ,,@Carol"),
            vec!["alice", "bob", "Carol"]
        );
        assert!(parse_target_users("").is_empty());
    }

    #[test]
    fn test_is_target_user_is_case_insensitive() {
        let mut config = test_support::test_config();
        config.target_users = vec!["Alice".to_string()];
        assert!(config.is_target_user("alice"));
        assert!(config.is_target_user("@ALICE"));
        assert!(!config.is_target_user("bob"));
    }
}
