//! Error types for the runner module.

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while driving an external tool.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Tool not available: {0}")]
    ToolUnavailable(String),

    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Process timed out after {seconds} seconds; last output:\n{tail}")]
    Timeout { seconds: u64, tail: String },

    #[error("Process was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunnerError {
    /// Whether the error means the tool itself could not be used at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ToolUnavailable(_) | Self::SpawnFailed { .. })
    }
}
