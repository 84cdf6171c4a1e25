/// Outcome of the should-respond / generation protocol for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyDecision {
    /// No reply; the post does not warrant one.
    Ignore,
    /// No reply; the author asked the agent to stand down.
    Stop,
    /// Reply with `text`, optionally tagged with an action.
    Respond {
        text: String,
        action: Option<String>,
    },
}
