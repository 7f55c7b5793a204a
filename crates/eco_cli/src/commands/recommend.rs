//! Recommend command - Suggest a cart from sizing answers.

use anyhow::Result;
use clap::Args;
use tracing::info;

use eco_advisor::{
    AppType, CarbonModel, Criticality, Environment, Recommendation, Traffic, WizardAnswers,
    Workload,
};
use eco_iac::ResourceValidator;

use super::{parse_choice, print_json, OutputFormat};

#[derive(Args)]
pub struct RecommendArgs {
    /// Target environment (dev, prod)
    #[arg(long, default_value = "dev")]
    environment: String,

    /// Expected traffic (low, medium, high)
    #[arg(long, default_value = "low")]
    traffic: String,

    /// Workload profile (general, cpu, memory)
    #[arg(long, default_value = "general")]
    workload: String,

    /// Business criticality (low, high)
    #[arg(long, default_value = "low")]
    criticality: String,

    /// Application type (web, api, backend, batch, microservices)
    #[arg(long = "type", default_value = "web")]
    app_type: String,

    /// GCP region
    #[arg(long, env = "ECOARCH_REGION", default_value = eco_iac::catalog::DEFAULT_REGION)]
    region: String,

    /// Leave out the managed database
    #[arg(long)]
    no_database: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

pub async fn execute(args: RecommendArgs) -> Result<()> {
    ResourceValidator::validate_region(&args.region)?;

    let answers = WizardAnswers::default()
        .with_environment(parse_choice("environment", &args.environment, Environment::parse)?)
        .with_traffic(parse_choice("traffic", &args.traffic, Traffic::parse)?)
        .with_workload(parse_choice("workload", &args.workload, Workload::parse)?)
        .with_criticality(parse_choice("criticality", &args.criticality, Criticality::parse)?)
        .with_app_type(parse_choice("type", &args.app_type, AppType::parse)?)
        .with_region(&args.region);

    info!("Recommending a cart for {:?}", answers);

    let model = CarbonModel::default();
    let mut recommendation = Recommendation::build(answers, &model);
    if args.no_database {
        recommendation = recommendation.without_database(&model);
    }

    match args.format {
        OutputFormat::Json => print_json(&recommendation)?,
        OutputFormat::Text => print_text(&recommendation),
    }

    Ok(())
}

fn print_text(rec: &Recommendation) {
    println!(
        "Recommended cart ({}{}):",
        rec.answers.environment.as_str(),
        if rec.high_availability { ", high availability" } else { "" }
    );
    for resource in &rec.resources {
        println!("  - {}", resource.label());
    }
    println!();
    println!("Energy:     {:.1} kWh/month", rec.monthly_kwh);
    println!("Emissions:  {:.2} kgCO2eq/month", rec.emissions_kg);
    println!("Sobriety:   {}", rec.sobriety);
    if let Some(region) = &rec.green_alternative {
        println!("Tip: {} runs on a greener grid than {}", region, rec.answers.region);
    }
}
