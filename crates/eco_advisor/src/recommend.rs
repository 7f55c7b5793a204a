//! Recommendation engine.
//!
//! Maps questionnaire answers to a cart. Pure and deterministic: the same
//! answers always give the same resources in the same order.

use serde::Serialize;
use tracing::info;

use eco_iac::{catalog, ComputeSpec, DatabaseSpec, LoadBalancerSpec, Resource, StorageSpec};

use crate::answers::{AppType, Environment, WizardAnswers};
use crate::carbon::{CarbonModel, SobrietyGrade};

const DEV_MACHINE: &str = "e2-micro";
const DEV_DISK_GB: i64 = 20;
const PROD_DISK_GB: i64 = 50;
const DEV_DB_TIER: &str = "db-f1-micro";
const STANDARD_DB_TIER: &str = "db-g1-small";
const HA_DB_TIER: &str = "db-custom-2-3840";
const DB_VERSION: &str = "POSTGRES_15";

pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn generate(answers: &WizardAnswers) -> Vec<Resource> {
        let is_ha = answers.is_high_availability();
        let mut resources = Self::compute(answers, is_ha);

        if is_ha {
            resources.push(
                Resource::LoadBalancer(LoadBalancerSpec::default()).named("Global Load Balancer (HTTP)"),
            );
        }

        if answers.app_type != AppType::Batch {
            resources.push(Self::database(answers.environment, is_ha));
        }

        let storage_class = if is_ha {
            catalog::MULTI_REGIONAL
        } else {
            catalog::DEFAULT_STORAGE_CLASS
        };
        resources.push(
            Resource::Storage(StorageSpec::new(storage_class))
                .named(format!("Assets Bucket ({})", storage_class)),
        );

        info!(
            "Recommended {} resources (env={}, ha={})",
            resources.len(),
            answers.environment.as_str(),
            is_ha
        );
        resources
    }

    fn compute(answers: &WizardAnswers, is_ha: bool) -> Vec<Resource> {
        let (machine, disk) = match answers.environment {
            Environment::Dev => (DEV_MACHINE, DEV_DISK_GB),
            Environment::Prod => (answers.workload.machine_type(), PROD_DISK_GB),
        };
        let stack = answers.app_type.software_stack();
        let count = if is_ha { 2 } else { 1 };

        (1..=count)
            .map(|replica| {
                let name = if is_ha {
                    format!("App Server (Replica {}) [{}]", replica, machine)
                } else {
                    format!("App Server [{}]", machine)
                };
                Resource::Compute(ComputeSpec::new(machine, disk).with_stack(stack)).named(name)
            })
            .collect()
    }

    fn database(environment: Environment, is_ha: bool) -> Resource {
        let (tier, name) = match (environment, is_ha) {
            (Environment::Dev, _) => (DEV_DB_TIER, "PostgreSQL (Dev)"),
            (Environment::Prod, true) => (HA_DB_TIER, "PostgreSQL (Regional HA)"),
            (Environment::Prod, false) => (STANDARD_DB_TIER, "PostgreSQL (Standard)"),
        };
        Resource::Database(DatabaseSpec::new(tier, DB_VERSION)).named(name)
    }
}

/// Recommended cart with its footprint.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub answers: WizardAnswers,
    pub resources: Vec<Resource>,
    pub high_availability: bool,
    /// kgCO2eq per month
    pub emissions_kg: f64,
    pub monthly_kwh: f64,
    pub sobriety: SobrietyGrade,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub green_alternative: Option<String>,
}

impl Recommendation {
    pub fn build(answers: WizardAnswers, model: &CarbonModel) -> Self {
        let resources = RecommendationEngine::generate(&answers);
        Self::for_resources(answers, resources, model)
    }

    /// Score an arbitrary cart against the answers' environment and region.
    pub fn for_resources(answers: WizardAnswers, resources: Vec<Resource>, model: &CarbonModel) -> Self {
        let region = answers.region.clone();
        Self {
            high_availability: answers.is_high_availability(),
            emissions_kg: model.total_emissions(&resources, &region),
            monthly_kwh: model.total_monthly_kwh(&resources),
            sobriety: model.sobriety_score(&resources, answers.environment, &region),
            green_alternative: model.green_alternative(&region).map(str::to_string),
            answers,
            resources,
        }
    }

    /// Drop managed databases from the cart.
    pub fn without_database(mut self, model: &CarbonModel) -> Self {
        self.resources.retain(|r| !matches!(r, Resource::Database(_)));
        Self::for_resources(self.answers, self.resources, model)
    }
}

/// Recommend a cart with the default rules.
pub fn generate(answers: &WizardAnswers) -> Vec<Resource> {
    RecommendationEngine::generate(answers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::{Criticality, Traffic, Workload};
    use eco_iac::ResourceKind;

    fn count(resources: &[Resource], kind: ResourceKind) -> usize {
        resources.iter().filter(|r| r.kind() == kind).count()
    }

    #[test]
    fn test_dev_web_cart() {
        let resources = generate(&WizardAnswers::default());
        assert_eq!(resources.len(), 3);

        match &resources[0] {
            Resource::Compute(c) => {
                assert_eq!(c.machine_type, "e2-micro");
                assert_eq!(c.disk_size_gb, 20);
                assert_eq!(c.software_stack, "web-nginx");
                assert_eq!(c.display_name.as_deref(), Some("App Server [e2-micro]"));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &resources[1] {
            Resource::Database(d) => {
                assert_eq!(d.db_tier, "db-f1-micro");
                assert_eq!(d.db_version, "POSTGRES_15");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(resources[2].display_name(), Some("Assets Bucket (STANDARD)"));
    }

    #[test]
    fn test_prod_machine_follows_workload() {
        for (workload, machine) in [
            (Workload::General, "e2-medium"),
            (Workload::Cpu, "e2-highcpu-2"),
            (Workload::Memory, "e2-highmem-2"),
        ] {
            let answers = WizardAnswers::default()
                .with_environment(Environment::Prod)
                .with_workload(workload);
            match &generate(&answers)[0] {
                Resource::Compute(c) => {
                    assert_eq!(c.machine_type, machine);
                    assert_eq!(c.disk_size_gb, 50);
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_ha_cart() {
        let answers = WizardAnswers::default()
            .with_environment(Environment::Prod)
            .with_criticality(Criticality::High);
        let resources = generate(&answers);

        assert_eq!(count(&resources, ResourceKind::Compute), 2);
        assert_eq!(count(&resources, ResourceKind::LoadBalancer), 1);
        assert_eq!(resources[1].display_name(), Some("App Server (Replica 2) [e2-medium]"));
        assert!(resources.iter().any(|r| matches!(
            r,
            Resource::Database(d) if d.db_tier == "db-custom-2-3840"
        )));
        assert!(resources.iter().any(|r| matches!(
            r,
            Resource::Storage(s) if s.storage_class == "MULTI_REGIONAL"
        )));
    }

    #[test]
    fn test_batch_has_no_database() {
        let answers = WizardAnswers::default().with_app_type(AppType::Batch);
        let resources = generate(&answers);
        assert_eq!(count(&resources, ResourceKind::Database), 0);
        match &resources[0] {
            Resource::Compute(c) => assert_eq!(c.software_stack, "docker"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_dev_never_ha() {
        let answers = WizardAnswers::default()
            .with_traffic(Traffic::High)
            .with_criticality(Criticality::High);
        let resources = generate(&answers);
        assert_eq!(count(&resources, ResourceKind::Compute), 1);
        assert_eq!(count(&resources, ResourceKind::LoadBalancer), 0);
    }

    #[test]
    fn test_recommendation_scores() {
        let answers = WizardAnswers::default().with_region("us-east4");
        let rec = Recommendation::build(answers, &CarbonModel::default());
        assert_eq!(rec.emissions_kg, 3.5);
        assert_eq!(rec.sobriety, SobrietyGrade::A);
        assert_eq!(rec.green_alternative.as_deref(), Some("canada-central1"));

        let rec = rec.without_database(&CarbonModel::default());
        assert!(rec.resources.iter().all(|r| !matches!(r, Resource::Database(_))));
    }
}
