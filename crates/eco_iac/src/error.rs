//! Error types for the IaC crate.

use thiserror::Error;

use crate::validator::ValidationError;

/// Result type alias for IaC operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur during synthesis or Terraform execution.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Terraform init failed (exit {exit_code}): {tail}")]
    InitFailed { exit_code: i64, tail: String },

    #[error("Terraform apply failed (exit {exit_code}): {tail}")]
    ApplyFailed { exit_code: i64, tail: String },

    #[error("Terraform destroy failed (exit {exit_code}): {tail}")]
    DestroyFailed { exit_code: i64, tail: String },

    #[error("Runner error: {0}")]
    Runner(#[from] eco_runner::RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IacError {
    /// True when the caller supplied bad input; such errors are never retried.
    pub fn is_validation(&self) -> bool {
        matches!(self, IacError::Validation(_) | IacError::InvalidConfig(_))
    }
}
