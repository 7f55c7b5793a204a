//! EcoArch CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 5: IaC error
//! - 6: Budget exceeded

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use eco_cost::CostError;
use eco_deploy::DeployError;
use eco_iac::{IacError, ValidationError};

mod commands;

use commands::{Cli, Commands, UsageError};

const CRATES: [&str; 6] = [
    "ecoarch",
    "eco_runner",
    "eco_iac",
    "eco_advisor",
    "eco_cost",
    "eco_deploy",
];

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const IAC_ERROR: u8 = 5;
    pub const BUDGET_EXCEEDED: u8 = 6;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let default_filter = CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, level))
        .chain(std::iter::once("warn".to_string()))
        .collect::<Vec<_>>()
        .join(",");

    // RUST_LOG wins over the defaults
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Recommend(args) => commands::recommend::execute(args).await,
        Commands::Validate(args) => commands::validate::execute(args).await,
        Commands::Simulate(args) => commands::simulate::execute(args).await,
        Commands::Deploy(args) => commands::deploy::execute_deploy(args).await,
        Commands::Destroy(args) => commands::deploy::execute_destroy(args).await,
        Commands::Status(args) => commands::status::execute(args).await,
        Commands::BudgetGate(args) => commands::budget_gate::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if e.downcast_ref::<UsageError>().is_some() {
        return ExitCodes::INVALID_ARGS;
    }
    if e.downcast_ref::<ValidationError>().is_some() {
        return ExitCodes::VALIDATION_FAILURE;
    }
    if let Some(err) = e.downcast_ref::<CostError>() {
        return match err {
            CostError::BudgetExceeded { .. } => ExitCodes::BUDGET_EXCEEDED,
            CostError::Validation(_) | CostError::InvalidConfig(_) => ExitCodes::VALIDATION_FAILURE,
            CostError::ReportNotFound(_) => ExitCodes::INVALID_ARGS,
            _ => ExitCodes::GENERAL_ERROR,
        };
    }
    if let Some(err) = e.downcast_ref::<DeployError>() {
        return match err {
            DeployError::BudgetExceeded { .. } => ExitCodes::BUDGET_EXCEEDED,
            err if err.is_validation() => ExitCodes::VALIDATION_FAILURE,
            DeployError::Provisioning { .. } | DeployError::Runner(_) => ExitCodes::IAC_ERROR,
            _ => ExitCodes::GENERAL_ERROR,
        };
    }
    if let Some(err) = e.downcast_ref::<IacError>() {
        return if err.is_validation() {
            ExitCodes::VALIDATION_FAILURE
        } else {
            ExitCodes::IAC_ERROR
        };
    }
    ExitCodes::GENERAL_ERROR
}
