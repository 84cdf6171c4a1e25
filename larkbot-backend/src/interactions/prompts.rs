//! Prompt templates and context formatting for the reply pipeline.

use crate::config::AgentConfig;
use crate::models::Post;
use chrono::DateTime;

/// Actions the generation model may tag a reply with. Tags are recorded,
/// not executed.
pub const AVAILABLE_ACTIONS: &[(&str, &str)] = &[
    ("NONE", "Reply with no further action."),
    ("FOLLOW", "The author is consistently worth hearing from."),
    ("MUTE", "Stop watching this conversation after replying."),
];

/// One formatted line per post: timestamp, author, text.
pub fn format_post(post: &Post) -> String {
    let when = DateTime::from_timestamp(post.created_at_epoch, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown time".to_string());
    format!("[{}] @{}: {}", when, post.author_handle, post.text)
}

/// Chronological thread block, root first. Empty string for a bare thread.
pub fn format_thread(thread: &[Post]) -> String {
    if thread.len() <= 1 {
        return String::new();
    }
    let lines: Vec<String> = thread.iter().map(format_post).collect();
    format!("Conversation so far:\n{}", lines.join("\n"))
}

pub fn format_image_descriptions(descriptions: &[String]) -> String {
    if descriptions.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = descriptions
        .iter()
        .enumerate()
        .map(|(i, d)| format!("{}. {}", i + 1, d))
        .collect();
    format!("Attached images:\n{}", lines.join("\n"))
}

/// Classification prompt. The completion must contain RESPOND, IGNORE, or
/// STOP.
pub fn should_respond_prompt(
    config: &AgentConfig,
    candidate: &Post,
    thread: &[Post],
    image_descriptions: &[String],
) -> String {
    let targets = if config.target_users.is_empty() {
        "(none)".to_string()
    } else {
        config
            .target_users
            .iter()
            .map(|t| format!("@{}", t))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut sections = vec![format!(
        "You are {} (@{}), deciding whether to reply to a post directed at you.",
        config.agent_name, config.agent_handle
    )];
    sections.push(format!(
        "Rules:\n\
         - Reply to direct questions and mentions that invite conversation.\n\
         - Posts from target accounts ({targets}) ALWAYS warrant a reply, regardless of topic.\n\
         - Do not reply to spam, bare mentions with no content, or conversations that have run their course.\n\
         - If the author asks you to stop replying, stand down."
    ));

    let thread_block = format_thread(thread);
    if !thread_block.is_empty() {
        sections.push(thread_block);
    }
    sections.push(format!("Post directed at you:\n{}", format_post(candidate)));
    let image_block = format_image_descriptions(image_descriptions);
    if !image_block.is_empty() {
        sections.push(image_block);
    }

    sections.push(
        "Answer with exactly one word: RESPOND, IGNORE, or STOP.".to_string(),
    );
    sections.join("\n\n")
}

/// Generation prompt: persona, context, and the structured-output contract.
pub fn generation_prompt(
    config: &AgentConfig,
    candidate: &Post,
    thread: &[Post],
    image_descriptions: &[String],
) -> String {
    let actions: Vec<String> = AVAILABLE_ACTIONS
        .iter()
        .map(|(name, desc)| format!("- {}: {}", name, desc))
        .collect();

    let mut sections = vec![format!(
        "You are {} (@{}).\n{}",
        config.agent_name, config.agent_handle, config.agent_bio
    )];
    sections.push(
        "Voice: concise, concrete, no hashtags, no emoji unless the other \
         person used them first. One to three sentences."
            .to_string(),
    );

    let thread_block = format_thread(thread);
    if !thread_block.is_empty() {
        sections.push(thread_block);
    }
    sections.push(format!(
        "You are replying to this post:\n{}",
        format_post(candidate)
    ));
    let image_block = format_image_descriptions(image_descriptions);
    if !image_block.is_empty() {
        sections.push(image_block);
    }

    sections.push(format!(
        "Available actions:\n{}\n\nRespond with a JSON object:\n\
         {{\"text\": \"your reply\", \"action\": \"NONE\"}}",
        actions.join("\n")
    ));
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::test_config;
    use crate::models::test_support::post;

    #[test]
    fn test_format_post_has_timestamp_and_author() {
        let p = post("1", "2", "alice", "hello");
        let line = format_post(&p);
        assert!(line.contains("@alice: hello"));
        assert!(line.contains("2023-11-14")); // 1_700_000_000 epoch
    }

    #[test]
    fn test_format_thread_empty_for_single_post() {
        let p = post("1", "2", "alice", "hello");
        assert_eq!(format_thread(&[p]), "");
    }

    #[test]
    fn test_should_respond_prompt_mentions_targets_and_tokens() {
        let mut config = test_config();
        config.target_users = vec!["alice".to_string()];
        let candidate = post("1", "2", "alice", "what do you think?");
        let prompt = should_respond_prompt(&config, &candidate, &[candidate.clone()], &[]);
        assert!(prompt.contains("@alice"));
        assert!(prompt.contains("RESPOND"));
        assert!(prompt.contains("IGNORE"));
        assert!(prompt.contains("STOP"));
        assert!(prompt.contains("what do you think?"));
    }

    #[test]
    fn test_generation_prompt_includes_persona_and_contract() {
        let config = test_config();
        let candidate = post("1", "2", "bob", "gm");
        let descriptions = vec!["A sunrise over water.".to_string()];
        let prompt = generation_prompt(&config, &candidate, &[candidate.clone()], &descriptions);
        assert!(prompt.contains(&config.agent_bio));
        assert!(prompt.contains("\"text\""));
        assert!(prompt.contains("Attached images:"));
        assert!(prompt.contains("A sunrise over water."));
    }
}
