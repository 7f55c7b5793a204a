//! Infracost-backed cost simulation.
//!
//! The cart is synthesized without remote state into a scratch directory
//! and priced with `infracost breakdown`. Any failure of the external tool
//! degrades to the offline [`PriceTable`]; only invalid resources are
//! reported as errors.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use eco_iac::{DeploymentId, Resource, ResourceValidator, Synthesizer};
use eco_runner::{CommandSpec, ProcessRunner, RunConfig};

use crate::config::CostConfig;
use crate::error::CostResult;
use crate::fallback::{PriceTable, FALLBACK_SOURCE};
use crate::report::parse_cost;

/// Outcome of a cost simulation.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub success: bool,
    /// USD per month
    pub monthly_cost: f64,
    /// Raw Infracost report, or the offline equivalent
    pub details: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SimulationResult {
    /// Zero-cost result for an empty cart.
    pub fn empty() -> Self {
        Self {
            success: true,
            monthly_cost: 0.0,
            details: json!({}),
            error_message: None,
        }
    }

    /// True when the figure comes from the offline price table.
    pub fn is_fallback(&self) -> bool {
        self.details.get("_source").and_then(Value::as_str) == Some(FALLBACK_SOURCE)
    }
}

/// Cost estimator over a [`ProcessRunner`].
pub struct CostEstimator {
    runner: Arc<dyn ProcessRunner>,
    synthesizer: Synthesizer,
    config: CostConfig,
    prices: PriceTable,
}

impl CostEstimator {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: CostConfig) -> CostResult<Self> {
        let synthesizer = Synthesizer::new(&config.project_id, &config.region)?;
        Ok(Self {
            runner,
            synthesizer,
            config,
            prices: PriceTable::default(),
        })
    }

    /// Use a custom offline price table.
    pub fn with_prices(mut self, prices: PriceTable) -> Self {
        self.prices = prices;
        self
    }

    pub fn config(&self) -> &CostConfig {
        &self.config
    }

    /// Estimate the monthly cost of a cart.
    pub async fn simulate(&self, resources: &[Resource]) -> CostResult<SimulationResult> {
        if resources.is_empty() {
            return Ok(SimulationResult::empty());
        }

        let validated = resources
            .iter()
            .map(ResourceValidator::revalidate)
            .collect::<Result<Vec<_>, _>>()?;

        match self.run_infracost(&validated).await {
            Ok(result) => Ok(result),
            Err(reason) => {
                warn!("Infracost unavailable ({}), using offline prices", reason);
                let mut result = self.prices.estimate(&validated);
                if let Some(details) = result.details.as_object_mut() {
                    details.insert("_fallback_reason".to_string(), Value::from(reason));
                }
                Ok(result)
            }
        }
    }

    /// Run the external tool. `Err` carries the reason to fall back.
    async fn run_infracost(&self, resources: &[Resource]) -> Result<SimulationResult, String> {
        let artifact = self
            .synthesizer
            .synthesize(resources, &DeploymentId::generate(), false)
            .map_err(|e| format!("synthesis failed: {}", e))?;

        let spec = CommandSpec::new(&self.config.infracost_bin)
            .arg("breakdown")
            .arg("--path")
            .arg(artifact.path().to_string_lossy())
            .arg("--format")
            .arg("json")
            .workdir(artifact.path());

        let run_config = RunConfig::default()
            .timeout(self.config.timeout_seconds)
            .redact(false);

        let result = self
            .runner
            .run(&spec, &run_config, None)
            .await
            .map_err(|e| e.to_string())?;

        if !result.success() {
            return Err(format!(
                "infracost exited with {}: {}",
                result.exit_code,
                result.tail(5)
            ));
        }

        let details: Value = serde_json::from_str(&result.stdout)
            .map_err(|e| format!("malformed infracost output: {}", e))?;

        let monthly_cost = parse_cost(details.get("totalMonthlyCost"));
        if monthly_cost <= 0.0 {
            let tool_error = details
                .pointer("/projects/0/metadata/errors/0/message")
                .and_then(Value::as_str)
                .unwrap_or("no error reported");
            return Err(format!(
                "infracost priced a non-empty cart at 0 ({})",
                tool_error
            ));
        }

        debug!("Infracost report has {} projects", details["projects"].as_array().map_or(0, Vec::len));
        info!("Infracost estimate: {:.2} USD/month", monthly_cost);

        Ok(SimulationResult {
            success: true,
            monthly_cost,
            details,
            error_message: None,
        })
    }
}
