//! # eco_deploy
//!
//! Provisioning for EcoArch carts.
//!
//! The [`Orchestrator`] takes a validated cart and a deployment id and
//! carries out an apply or destroy on the first available path:
//!
//! - **CI pipeline**: a GitLab pipeline is triggered with the cart as JSON
//! - **Local Terraform**: the cart is synthesized against per-deployment
//!   remote state and applied on this host, streaming every output line
//! - **Demo**: progress lines are simulated without any cloud call
//!
//! Status changes and log lines are published on an event channel. Every
//! request is recorded in an injected [`AuditLog`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use eco_deploy::{DeployConfig, MemoryAuditLog, Orchestrator};
//! use eco_iac::{ComputeSpec, DeploymentId, Resource};
//! use eco_runner::LocalRunner;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = Orchestrator::new(
//!         DeployConfig::from_env(),
//!         Arc::new(LocalRunner::new()),
//!         Arc::new(MemoryAuditLog::new()),
//!     )?;
//!
//!     let cart = vec![Resource::Compute(ComputeSpec::new("e2-micro", 20))];
//!     let outcome = orchestrator.deploy(DeploymentId::generate(), cart).await?;
//!     println!("{:?} via {:?}", outcome.status, outcome.path);
//!
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod comment;
pub mod config;
pub mod demo;
pub mod error;
pub mod local;
pub mod orchestrator;
pub mod pipeline;

pub use audit::{
    resources_summary, sync_statuses, AuditAction, AuditEntry, AuditLog, AuditStatus,
    MemoryAuditLog, NewAuditEntry,
};
pub use comment::{post_merge_request_comment, validate_server_url, CommentConfig};
pub use config::DeployConfig;
pub use demo::demo_steps;
pub use error::{DeployError, DeployResult};
pub use local::LocalProvisioner;
pub use orchestrator::{
    DeployEvent, DeployOutcome, DeployPath, DeployRequest, DeployStatus, EventReceiver,
    EventSender, Orchestrator, LOG_BUFFER_LINES, MAX_TRACKED_DEPLOYMENTS,
};
pub use pipeline::{
    extract_pipeline_id, parse_trigger_response, GitLabPipelines, PipelineAction,
    PipelineBackend, PipelineResult, PipelineStatus,
};
