//! Deploy and destroy commands.
//!
//! Both stream orchestrator events to the terminal as they happen.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::mpsc;
use tracing::{info, warn};

use eco_cost::{BudgetConfig, CostConfig, CostEstimator};
use eco_deploy::{
    DeployConfig, DeployEvent, DeployOutcome, DeployRequest, EventReceiver, MemoryAuditLog,
    Orchestrator,
};
use eco_iac::{DeploymentId, Resource};
use eco_runner::LocalRunner;

use super::{load_cart, print_json, OutputFormat};

#[derive(Args)]
pub struct DeployArgs {
    /// JSON file with the list of resources
    #[arg(short, long)]
    file: PathBuf,

    /// Deployment id; generated when omitted
    #[arg(long)]
    deployment_id: Option<String>,

    /// User recorded in the audit trail
    #[arg(long, env = "USER", default_value = "anonymous")]
    user: String,

    /// Monthly budget; defaults to ECOARCH_BUDGET_LIMIT
    #[arg(long)]
    budget: Option<f64>,

    /// Skip the cost estimate and budget check
    #[arg(long)]
    skip_estimate: bool,

    /// Output format of the final outcome
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Args)]
pub struct DestroyArgs {
    /// Deployment to destroy
    #[arg(long)]
    deployment_id: String,

    /// Cart that was deployed, forwarded to the CI pipeline
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// User recorded in the audit trail
    #[arg(long, env = "USER", default_value = "anonymous")]
    user: String,

    /// Output format of the final outcome
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

pub async fn execute_deploy(args: DeployArgs) -> Result<()> {
    let deployment_id = match &args.deployment_id {
        Some(id) => DeploymentId::parse(id)?,
        None => DeploymentId::generate(),
    };
    let resources = load_cart(&args.file)?;
    let config = DeployConfig::from_env();

    let mut request = DeployRequest::apply(deployment_id, resources).with_user(&args.user);
    if !args.skip_estimate {
        let budget = args.budget.unwrap_or_else(|| BudgetConfig::from_env().limit);
        let cost = estimate(&config, &request.resources).await?;
        info!("Estimated {:.2} USD/month against a budget of {:.2}", cost, budget);
        request = request.with_estimate(cost, budget);
    }

    let outcome = run(config, request).await?;
    report(&outcome, args.format)
}

pub async fn execute_destroy(args: DestroyArgs) -> Result<()> {
    let deployment_id = DeploymentId::parse(&args.deployment_id)?;
    let resources = match &args.file {
        Some(path) => load_cart(path)?,
        None => Vec::new(),
    };

    let request = DeployRequest::destroy(deployment_id, resources).with_user(&args.user);
    let outcome = run(DeployConfig::from_env(), request).await?;
    report(&outcome, args.format)
}

async fn estimate(config: &DeployConfig, resources: &[Resource]) -> Result<f64> {
    let cost_config = CostConfig::from_env()
        .with_project_id(&config.project_id)
        .with_region(&config.region);
    let estimator = CostEstimator::new(Arc::new(LocalRunner::new()), cost_config)?;
    Ok(estimator.simulate(resources).await?.monthly_cost)
}

async fn run(config: DeployConfig, request: DeployRequest) -> Result<DeployOutcome> {
    let deployment_id = request.deployment_id.clone();
    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx));

    let orchestrator = Orchestrator::new(
        config,
        Arc::new(LocalRunner::new()),
        Arc::new(MemoryAuditLog::new()),
    )?
    .with_events(tx);

    let result = orchestrator.run(request).await;
    drop(orchestrator);
    if let Err(e) = printer.await {
        warn!("Event printer stopped: {}", e);
    }

    result.with_context(|| format!("Deployment {} failed", deployment_id))
}

async fn print_events(mut rx: EventReceiver) {
    while let Some(event) = rx.recv().await {
        match event {
            DeployEvent::Log { line, .. } => println!("{}", line.message),
            DeployEvent::Status { deployment_id, status } => {
                info!("Deployment {} is {}", deployment_id, status)
            }
        }
    }
}

fn report(outcome: &DeployOutcome, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(outcome);
    }

    println!();
    println!(
        "{} {}: {} via {:?}",
        outcome.action, outcome.deployment_id, outcome.status, outcome.path
    );
    if let Some(url) = outcome.pipeline.as_ref().and_then(|p| p.pipeline_url.as_ref()) {
        println!("Pipeline: {}", url);
    }
    Ok(())
}
