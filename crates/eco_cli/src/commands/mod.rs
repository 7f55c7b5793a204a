//! CLI command definitions.
//!
//! Each subcommand maps to one EcoArch operation.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;

use eco_iac::{RawResource, Resource, ResourceValidator};

pub mod budget_gate;
pub mod deploy;
pub mod recommend;
pub mod simulate;
pub mod status;
pub mod validate;

/// EcoArch - infrastructure synthesis with cost and carbon estimates
#[derive(Parser)]
#[command(name = "ecoarch")]
#[command(version, about = "EcoArch - infrastructure synthesis with cost and carbon estimates")]
#[command(long_about = r#"
EcoArch turns a cart of cloud resources into validated Terraform, prices it,
scores its carbon footprint and provisions it.

COMMANDS:
  recommend     → Suggest a cart from sizing answers
  validate      → Validate a cart file
  simulate      → Estimate the monthly cost of a cart
  deploy        → Provision a cart (CI pipeline, local Terraform or demo)
  destroy       → Destroy a deployment
  status        → Show the status of a CI pipeline
  budget-gate   → Fail when an Infracost report exceeds the budget

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  5 - IaC error
  6 - Budget exceeded
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recommend a cart from sizing answers
    Recommend(recommend::RecommendArgs),

    /// Validate a cart file and print its normalized form
    Validate(validate::ValidateArgs),

    /// Estimate the monthly cost of a cart
    Simulate(simulate::SimulateArgs),

    /// Deploy a cart
    Deploy(deploy::DeployArgs),

    /// Destroy a deployment
    Destroy(deploy::DestroyArgs),

    /// Show the status of a CI pipeline
    Status(status::StatusArgs),

    /// Check an Infracost report against the budget
    #[command(name = "budget-gate")]
    BudgetGate(budget_gate::BudgetGateArgs),
}

/// Bad command-line input that clap could not catch.
#[derive(Debug, Error)]
#[error("Invalid argument: {0}")]
pub struct UsageError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Read and validate a JSON cart file.
pub fn load_cart(path: &Path) -> Result<Vec<Resource>> {
    let raws = read_raw_cart(path)?;
    Ok(ResourceValidator::validate_all(&raws)?)
}

/// Read a JSON cart file without validating it.
pub fn read_raw_cart(path: &Path) -> Result<Vec<RawResource>> {
    if !path.exists() {
        return Err(UsageError(format!("cart file not found: {}", path.display())).into());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let raws: Vec<RawResource> = serde_json::from_str(&content)
        .map_err(|e| UsageError(format!("{} is not a JSON list of resources: {}", path.display(), e)))?;
    Ok(raws)
}

/// Parse a choice with the domain parser, reporting the bad value.
pub fn parse_choice<T>(name: &str, value: &str, parse: fn(&str) -> Option<T>) -> Result<T> {
    parse(value).ok_or_else(|| UsageError(format!("unknown {} '{}'", name, value)).into())
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}
