//! Status command - Show the status of a CI pipeline.

use anyhow::Result;
use clap::Args;

use eco_deploy::{extract_pipeline_id, DeployConfig, GitLabPipelines, PipelineBackend};

use super::UsageError;

#[derive(Args)]
pub struct StatusArgs {
    /// Pipeline id
    #[arg(long, conflicts_with = "url")]
    pipeline_id: Option<u64>,

    /// Pipeline web URL, as printed by `deploy`
    #[arg(long)]
    url: Option<String>,
}

pub async fn execute(args: StatusArgs) -> Result<()> {
    let pipeline_id = match (args.pipeline_id, &args.url) {
        (Some(id), _) => id,
        (None, Some(url)) => extract_pipeline_id(url)
            .ok_or_else(|| UsageError(format!("no pipeline id in '{}'", url)))?,
        (None, None) => return Err(UsageError("pass --pipeline-id or --url".to_string()).into()),
    };

    let client = GitLabPipelines::from_config(&DeployConfig::from_env())?;
    match client.status(pipeline_id).await? {
        Some(status) => println!("Pipeline {}: {}", pipeline_id, status),
        None => println!("Pipeline {}: UNKNOWN", pipeline_id),
    }

    Ok(())
}
