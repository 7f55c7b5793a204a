//! Cost estimation and budget configuration.

use serde::{Deserialize, Serialize};

use eco_iac::catalog;

pub const DEFAULT_PROJECT_ID: &str = "simulation-project";
pub const DEFAULT_INFRACOST_TIMEOUT: u64 = 30;
pub const DEFAULT_BUDGET_LIMIT: f64 = 100.0;

/// Settings for the Infracost simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    /// GCP project written into the simulated workspace
    pub project_id: String,
    pub region: String,
    pub infracost_bin: String,
    /// Hard limit for one `infracost breakdown` run, in seconds
    pub timeout_seconds: u64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            project_id: DEFAULT_PROJECT_ID.to_string(),
            region: catalog::DEFAULT_REGION.to_string(),
            infracost_bin: "infracost".to_string(),
            timeout_seconds: DEFAULT_INFRACOST_TIMEOUT,
        }
    }
}

impl CostConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset or unparsable values keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(project) = non_empty(lookup("GCP_PROJECT_ID")) {
            config.project_id = project;
        }
        if let Some(region) = non_empty(lookup("ECOARCH_REGION")) {
            config.region = region;
        }
        if let Some(bin) = non_empty(lookup("INFRACOST_BIN")) {
            config.infracost_bin = bin;
        }
        if let Some(timeout) = lookup("INFRACOST_TIMEOUT") {
            if let Ok(value) = timeout.trim().parse::<u64>() {
                if value > 0 {
                    config.timeout_seconds = value;
                }
            }
        }

        config
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_infracost_bin(mut self, bin: impl Into<String>) -> Self {
        self.infracost_bin = bin.into();
        self
    }

    /// Infracost hard timeout, at least one second.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds.max(1);
        self
    }
}

/// Settings for the CI budget gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Maximum accepted monthly cost
    pub limit: f64,
    pub project_name: String,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_BUDGET_LIMIT,
            project_name: "unknown".to_string(),
        }
    }
}

impl BudgetConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(limit) = lookup("ECOARCH_BUDGET_LIMIT") {
            if let Ok(value) = limit.trim().parse::<f64>() {
                if value.is_finite() && value >= 0.0 {
                    config.limit = value;
                }
            }
        }
        if let Some(name) = non_empty(lookup("CI_PROJECT_NAME")) {
            config.project_name = name;
        }

        config
    }

    pub fn with_limit(mut self, limit: f64) -> Self {
        self.limit = limit;
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_cost_config_defaults() {
        let config = CostConfig::from_lookup(lookup(&[]));
        assert_eq!(config.project_id, "simulation-project");
        assert_eq!(config.region, "europe-west1");
        assert_eq!(config.infracost_bin, "infracost");
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_cost_config_overrides() {
        let config = CostConfig::from_lookup(lookup(&[
            ("GCP_PROJECT_ID", "my-project"),
            ("ECOARCH_REGION", "us-central1"),
            ("INFRACOST_BIN", "/usr/local/bin/infracost"),
            ("INFRACOST_TIMEOUT", "abc"),
        ]));
        assert_eq!(config.project_id, "my-project");
        assert_eq!(config.region, "us-central1");
        assert_eq!(config.infracost_bin, "/usr/local/bin/infracost");
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_zero_timeout_keeps_default() {
        let config = CostConfig::from_lookup(lookup(&[("INFRACOST_TIMEOUT", "0")]));
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.with_timeout(0).timeout_seconds, 1);
    }

    #[test]
    fn test_budget_config() {
        let config = BudgetConfig::from_lookup(lookup(&[
            ("ECOARCH_BUDGET_LIMIT", "42.5"),
            ("CI_PROJECT_NAME", "ecoarch"),
        ]));
        assert_eq!(config.limit, 42.5);
        assert_eq!(config.project_name, "ecoarch");

        let config = BudgetConfig::from_lookup(lookup(&[("ECOARCH_BUDGET_LIMIT", "-1")]));
        assert_eq!(config.limit, 100.0);
    }
}
