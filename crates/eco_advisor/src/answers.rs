//! Questionnaire answers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use eco_iac::catalog;

/// Target environment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl Environment {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "dev" => Some(Environment::Dev),
            "prod" => Some(Environment::Prod),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }
}

/// Expected traffic level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Traffic {
    #[default]
    Low,
    Medium,
    High,
}

impl Traffic {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Traffic::Low),
            "medium" => Some(Traffic::Medium),
            "high" => Some(Traffic::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Traffic::Low => "low",
            Traffic::Medium => "medium",
            Traffic::High => "high",
        }
    }
}

/// Dominant resource pressure of the workload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Workload {
    #[default]
    General,
    Cpu,
    Memory,
}

impl Workload {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "general" => Some(Workload::General),
            "cpu" => Some(Workload::Cpu),
            "memory" => Some(Workload::Memory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Workload::General => "general",
            Workload::Cpu => "cpu",
            Workload::Memory => "memory",
        }
    }

    /// Machine type recommended outside dev.
    pub fn machine_type(&self) -> &'static str {
        match self {
            Workload::General => "e2-medium",
            Workload::Cpu => "e2-highcpu-2",
            Workload::Memory => "e2-highmem-2",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    #[default]
    Low,
    High,
}

impl Criticality {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Criticality::Low),
            "high" => Some(Criticality::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Criticality::Low => "low",
            Criticality::High => "high",
        }
    }
}

/// Kind of application being hosted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppType {
    #[default]
    Web,
    Api,
    Backend,
    Batch,
    Microservices,
}

impl AppType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "web" => Some(AppType::Web),
            "api" => Some(AppType::Api),
            "backend" => Some(AppType::Backend),
            "batch" => Some(AppType::Batch),
            "microservices" => Some(AppType::Microservices),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppType::Web => "web",
            AppType::Api => "api",
            AppType::Backend => "backend",
            AppType::Batch => "batch",
            AppType::Microservices => "microservices",
        }
    }

    /// Software stack pre-installed on compute instances.
    pub fn software_stack(&self) -> &'static str {
        match self {
            AppType::Web => "web-nginx",
            AppType::Api => "nodejs",
            AppType::Backend => "python-django",
            AppType::Batch | AppType::Microservices => "docker",
        }
    }
}

/// Answers to the sizing questionnaire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WizardAnswers {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub traffic: Traffic,
    #[serde(default)]
    pub workload: Workload,
    #[serde(default)]
    pub criticality: Criticality,
    #[serde(rename = "type", default)]
    pub app_type: AppType,
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    catalog::DEFAULT_REGION.to_string()
}

impl Default for WizardAnswers {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            traffic: Traffic::default(),
            workload: Workload::default(),
            criticality: Criticality::default(),
            app_type: AppType::default(),
            region: default_region(),
        }
    }
}

impl WizardAnswers {
    /// Build answers from loosely-typed form values.
    ///
    /// Missing or unknown values fall back to their defaults instead of
    /// failing, as does a region outside the catalog.
    pub fn from_map(values: &HashMap<String, String>) -> Self {
        fn pick<T: Default>(values: &HashMap<String, String>, key: &str, parse: fn(&str) -> Option<T>) -> T {
            match values.get(key) {
                Some(raw) => parse(raw).unwrap_or_else(|| {
                    debug!("Unknown {} '{}', using default", key, raw);
                    T::default()
                }),
                None => T::default(),
            }
        }

        let region = values
            .get("region")
            .map(|r| r.trim())
            .filter(|r| catalog::REGIONS.contains(r))
            .map(str::to_string)
            .unwrap_or_else(default_region);

        Self {
            environment: pick(values, "environment", Environment::parse),
            traffic: pick(values, "traffic", Traffic::parse),
            workload: pick(values, "workload", Workload::parse),
            criticality: pick(values, "criticality", Criticality::parse),
            app_type: pick(values, "type", AppType::parse),
            region,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_traffic(mut self, traffic: Traffic) -> Self {
        self.traffic = traffic;
        self
    }

    pub fn with_workload(mut self, workload: Workload) -> Self {
        self.workload = workload;
        self
    }

    pub fn with_criticality(mut self, criticality: Criticality) -> Self {
        self.criticality = criticality;
        self
    }

    pub fn with_app_type(mut self, app_type: AppType) -> Self {
        self.app_type = app_type;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Production with high traffic or high criticality.
    pub fn is_high_availability(&self) -> bool {
        self.environment == Environment::Prod
            && (self.traffic == Traffic::High || self.criticality == Criticality::High)
    }
}
