//! # eco_cost
//!
//! Monthly cost estimation for EcoArch carts.
//!
//! ## Features
//!
//! - `infracost breakdown` over a synthesized, state-less workspace
//! - Offline price table whenever the tool fails, times out or returns nothing
//! - Lenient Infracost report parsing, categorisation and Markdown summaries
//! - Budget gate for CI pipelines
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use eco_cost::{CostConfig, CostEstimator};
//! use eco_iac::{RawResource, ResourceValidator};
//! use eco_runner::LocalRunner;
//!
//! # async fn example() -> eco_cost::CostResult<()> {
//! let estimator = CostEstimator::new(Arc::new(LocalRunner::new()), CostConfig::from_env())?;
//! let cart = ResourceValidator::validate_all(&[RawResource::compute("e2-small", 20)])?;
//! let result = estimator.simulate(&cart).await?;
//! println!("{:.2} USD/month", result.monthly_cost);
//! # Ok(())
//! # }
//! ```

pub mod budget;
pub mod config;
pub mod error;
pub mod fallback;
pub mod report;
pub mod simulator;

pub use budget::{check_budget, BudgetOutcome};
pub use config::{BudgetConfig, CostConfig};
pub use error::{CostError, CostResult};
pub use fallback::{fallback_estimate, PriceTable, FALLBACK_SOURCE};
pub use report::{CostCategory, CostMetrics, InfracostReport, ReportResource};
pub use simulator::{CostEstimator, SimulationResult};
