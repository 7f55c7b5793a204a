//! Error types for provisioning.

use thiserror::Error;

use eco_iac::{IacError, ValidationError};

/// Result type alias for provisioning operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors that can occur while deploying or destroying a cart.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Terraform {step} failed (exit {exit_code}): {tail}")]
    Provisioning {
        step: &'static str,
        exit_code: i64,
        tail: String,
    },

    #[error("Pipeline trigger failed: {0}")]
    RemoteTrigger(String),

    #[error("Runner error: {0}")]
    Runner(#[from] eco_runner::RunnerError),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Estimated cost {cost:.2} exceeds the budget of {budget:.2}")]
    BudgetExceeded { cost: f64, budget: f64 },

    #[error("Comment rejected: {0}")]
    CommentRejected(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Audit entry not found: {0}")]
    AuditEntryNotFound(u64),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    /// True when the request itself was bad; nothing external was touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DeployError::Validation(_)
                | DeployError::InvalidConfig(_)
                | DeployError::EmptyCart
        )
    }
}

impl From<IacError> for DeployError {
    fn from(err: IacError) -> Self {
        match err {
            IacError::Validation(e) => DeployError::Validation(e),
            IacError::InvalidConfig(msg) => DeployError::InvalidConfig(msg),
            IacError::InitFailed { exit_code, tail } => DeployError::Provisioning {
                step: "init",
                exit_code,
                tail,
            },
            IacError::ApplyFailed { exit_code, tail } => DeployError::Provisioning {
                step: "apply",
                exit_code,
                tail,
            },
            IacError::DestroyFailed { exit_code, tail } => DeployError::Provisioning {
                step: "destroy",
                exit_code,
                tail,
            },
            IacError::Runner(eco_runner::RunnerError::Cancelled) => DeployError::Cancelled,
            IacError::Runner(e) => DeployError::Runner(e),
            IacError::Io(e) => DeployError::Io(e),
            IacError::Json(e) => DeployError::Json(e),
        }
    }
}
