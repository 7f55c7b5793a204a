//! Error types for cost estimation.

use thiserror::Error;

/// Result type alias for cost operations.
pub type CostResult<T> = Result<T, CostError>;

/// Errors that can occur while estimating or gating costs.
#[derive(Error, Debug)]
pub enum CostError {
    #[error("Invalid resource: {0}")]
    Validation(#[from] eco_iac::ValidationError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Report not found: {0}")]
    ReportNotFound(String),

    #[error("Malformed report: {0}")]
    MalformedReport(String),

    #[error("Budget exceeded: {cost:.2} {currency} > {budget:.2} {currency}")]
    BudgetExceeded {
        cost: f64,
        budget: f64,
        currency: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<eco_iac::IacError> for CostError {
    fn from(err: eco_iac::IacError) -> Self {
        match err {
            eco_iac::IacError::Validation(e) => CostError::Validation(e),
            other => CostError::InvalidConfig(other.to_string()),
        }
    }
}
