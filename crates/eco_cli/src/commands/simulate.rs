//! Simulate command - Estimate the monthly cost of a cart.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use eco_advisor::CarbonModel;
use eco_cost::{CostConfig, CostEstimator, InfracostReport};
use eco_runner::LocalRunner;

use super::{load_cart, print_json, OutputFormat};

#[derive(Args)]
pub struct SimulateArgs {
    /// JSON file with the list of resources
    #[arg(short, long)]
    file: PathBuf,

    /// GCP project written into the simulated workspace
    #[arg(long)]
    project_id: Option<String>,

    /// GCP region
    #[arg(long)]
    region: Option<String>,

    /// Infracost binary
    #[arg(long)]
    infracost_bin: Option<String>,

    /// Infracost timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Write the full report (Infracost JSON or offline equivalent) here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl SimulateArgs {
    fn config(&self) -> CostConfig {
        let mut config = CostConfig::from_env();
        if let Some(project) = &self.project_id {
            config = config.with_project_id(project);
        }
        if let Some(region) = &self.region {
            config = config.with_region(region);
        }
        if let Some(bin) = &self.infracost_bin {
            config = config.with_infracost_bin(bin);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        config
    }
}

pub async fn execute(args: SimulateArgs) -> Result<()> {
    let resources = load_cart(&args.file)?;
    let config = args.config();
    info!("Simulating {} resource(s) in {}", resources.len(), config.region);

    let estimator = CostEstimator::new(Arc::new(LocalRunner::new()), config.clone())?;
    let result = estimator.simulate(&resources).await?;

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&result.details)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Report written to {:?}", path);
    }

    if args.format == OutputFormat::Json {
        return print_json(&result);
    }

    let model = CarbonModel::default();
    let source = if result.is_fallback() {
        "offline price table"
    } else {
        "Infracost"
    };

    println!("Estimated monthly cost: {:.2} USD ({})", result.monthly_cost, source);
    for (category, cost) in InfracostReport::from_value(result.details.clone()).cost_by_category() {
        println!("  {:<8} {:>10.2}", category.to_string(), cost);
    }
    println!(
        "Estimated emissions:    {:.2} kgCO2eq/month",
        model.total_emissions(&resources, &config.region)
    );

    Ok(())
}
