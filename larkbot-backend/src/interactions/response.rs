//! Parsing of model output: the should-respond token and the structured
//! reply object.

use crate::interactions::PipelineError;
use crate::models::ReplyDecision;
use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a fenced code block, with or without a language tag.
static CODE_FENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:[a-zA-Z]+)?\s*([\s\S]*?)```").unwrap());

/// Map a classification completion to a decision. The output is scanned for
/// the literal tokens; RESPOND wins over the others, anything unrecognized
/// is an ignore.
pub fn parse_should_respond(raw: &str) -> ReplyDecision {
    let upper = raw.to_uppercase();
    if upper.contains("RESPOND") {
        ReplyDecision::Respond {
            text: String::new(),
            action: None,
        }
    } else if upper.contains("STOP") {
        ReplyDecision::Stop
    } else {
        ReplyDecision::Ignore
    }
}

/// Extract the first JSON object from a completion. Tolerates fenced code
/// blocks and surrounding prose.
pub fn extract_json_object(raw: &str) -> Option<serde_json::Value> {
    let body = CODE_FENCE_PATTERN
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw);

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&body[start..=end]).ok()
}

/// Strip one layer of surrounding matching quote characters.
pub fn strip_surrounding_quotes(s: &str) -> &str {
    let trimmed = s.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), trimmed.chars().last()) {
        (Some(first), Some(last))
            if first == last && trimmed.len() >= 2 && matches!(first, '"' | '\'' | '`') =>
        {
            &trimmed[first.len_utf8()..trimmed.len() - last.len_utf8()]
        }
        _ => trimmed,
    }
}

/// Parse a generation completion into a reply decision. A missing or
/// malformed object is a generation error; an empty `text` is an ignore.
pub fn parse_reply(raw: &str) -> Result<ReplyDecision, PipelineError> {
    let object = extract_json_object(raw)
        .ok_or_else(|| PipelineError::generation("completion contained no JSON object"))?;

    let text = object
        .get("text")
        .and_then(|v| v.as_str())
        .ok_or_else(|| PipelineError::generation("completion object has no text field"))?;
    let text = strip_surrounding_quotes(text).to_string();

    if text.is_empty() {
        return Ok(ReplyDecision::Ignore);
    }

    let action = object
        .get("action")
        .and_then(|v| v.as_str())
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    Ok(ReplyDecision::Respond { text, action })
}
