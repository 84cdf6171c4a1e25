//! Typed failure taxonomy for the interaction pipeline.
//!
//! The poller decides per kind whether to skip one unit of work or abort the
//! cycle; nothing in this module retries.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Search or lookup against the platform failed.
    Fetch,
    /// Best-effort enrichment (image description) failed.
    Enrichment,
    /// The should-respond classification failed.
    Decision,
    /// Reply generation or parsing its output failed.
    Generation,
    /// Publishing the reply failed.
    Publish,
    /// The memory store rejected a read or write.
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Fetch => "fetch",
            ErrorKind::Enrichment => "enrichment",
            ErrorKind::Decision => "decision",
            ErrorKind::Generation => "generation",
            ErrorKind::Publish => "publish",
            ErrorKind::Storage => "storage",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct PipelineError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, message: impl fmt::Display) -> Self {
        PipelineError {
            kind,
            message: message.to_string(),
        }
    }

    pub fn decision(message: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Decision, message)
    }

    pub fn generation(message: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Generation, message)
    }

    pub fn storage(message: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Storage, message)
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for PipelineError {}

impl From<rusqlite::Error> for PipelineError {
    fn from(e: rusqlite::Error) -> Self {
        PipelineError::storage(e)
    }
}
