//! Budget-gate command - Fail CI when a report exceeds the budget.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use eco_cost::{check_budget, BudgetConfig, InfracostReport};
use eco_deploy::{post_merge_request_comment, CommentConfig};

#[derive(Args)]
pub struct BudgetGateArgs {
    /// Infracost JSON report
    #[arg(short, long, default_value = "infracost-report.json")]
    report: PathBuf,

    /// Monthly budget; defaults to ECOARCH_BUDGET_LIMIT
    #[arg(long)]
    limit: Option<f64>,

    /// Post the cost summary on the merge request
    #[arg(long)]
    comment: bool,

    /// Print the Markdown summary
    #[arg(long)]
    markdown: bool,
}

pub async fn execute(args: BudgetGateArgs) -> Result<()> {
    let report = InfracostReport::load(&args.report)?;

    let mut config = BudgetConfig::from_env();
    if let Some(limit) = args.limit {
        config = config.with_limit(limit);
    }

    let summary = report.markdown();
    if args.markdown {
        println!("{}", summary);
    }

    if args.comment {
        // A failed comment never blocks the gate
        match post_merge_request_comment(&CommentConfig::from_env(), &summary).await {
            Ok(true) => info!("Cost summary posted"),
            Ok(false) => {}
            Err(e) => warn!("Cost summary not posted: {}", e),
        }
    }

    let outcome = check_budget(&report, &config)?;
    println!(
        "Within budget: {:.2} / {:.2} {}",
        outcome.cost, outcome.budget, outcome.currency
    );
    Ok(())
}
