use thiserror::Error;

/// Failures surfaced by the session engine and the catalog
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TetherError {
    /// A session is already running; only one may exist at a time
    #[error("⚠️ Tether already running\n\nYou can't run more than one tether at a time. Please end your current tether session before starting a new one.")]
    SessionConflict,

    /// A live edit would leave the current task unresolvable
    #[error("Cannot apply task edit: {0}")]
    InvalidEditState(String),

    #[error("Tether not found: {0}")]
    TetherNotFound(String),

    #[error("Tether '{0}' has no tasks")]
    EmptyTether(String),

    #[error("Task '{0}' must last between 1 and 1440 minutes")]
    InvalidDuration(String),

    #[error("Invalid start time '{0}'. Use HH:MM (24-hour)")]
    InvalidStartTime(String),

    /// More than one catalog entry matches a reference
    #[error("Ambiguous reference '{reference}'. Candidates: {candidates}")]
    AmbiguousRef { reference: String, candidates: String },
}

impl TetherError {
    pub fn invalid_edit(reason: impl Into<String>) -> Self {
        Self::InvalidEditState(reason.into())
    }

    pub fn ambiguous(reference: &str, candidates: &[String]) -> Self {
        Self::AmbiguousRef {
            reference: reference.to_string(),
            candidates: candidates.join(", "),
        }
    }
}
