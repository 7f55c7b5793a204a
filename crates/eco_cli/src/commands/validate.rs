//! Validate command - Validate a cart file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use eco_iac::ResourceValidator;

use super::{load_cart, print_json};

#[derive(Args)]
pub struct ValidateArgs {
    /// JSON file with the list of resources
    #[arg(short, long)]
    file: PathBuf,

    /// Deployment id to check as well
    #[arg(long)]
    deployment_id: Option<String>,
}

pub async fn execute(args: ValidateArgs) -> Result<()> {
    info!("Validating cart: {:?}", args.file);

    if let Some(id) = &args.deployment_id {
        ResourceValidator::validate_deployment_id(id)?;
    }

    let resources = load_cart(&args.file)?;
    print_json(&resources)?;

    eprintln!("{} resource(s) valid", resources.len());
    Ok(())
}
