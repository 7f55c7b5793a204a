//! Energy, carbon and sobriety scoring.
//!
//! Figures are order-of-magnitude estimates for comparing carts, not
//! certified carbon accounting. All constants live in [`CarbonModel`] so
//! they can be tuned without touching the scoring code.

use std::fmt;

use serde::{Deserialize, Serialize};

use eco_iac::Resource;

use crate::answers::Environment;

/// Grid carbon-intensity tier of a region.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CarbonTier {
    Low,
    Medium,
    High,
}

impl CarbonTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarbonTier::Low => "low",
            CarbonTier::Medium => "medium",
            CarbonTier::High => "high",
        }
    }
}

/// Sobriety grade, A (frugal) to E (greedy).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SobrietyGrade {
    A,
    B,
    C,
    D,
    E,
}

impl SobrietyGrade {
    fn from_score(score: f64) -> Self {
        if score <= 1.0 {
            SobrietyGrade::A
        } else if score <= 2.0 {
            SobrietyGrade::B
        } else if score <= 3.0 {
            SobrietyGrade::C
        } else if score <= 4.0 {
            SobrietyGrade::D
        } else {
            SobrietyGrade::E
        }
    }
}

impl fmt::Display for SobrietyGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            SobrietyGrade::A => "A",
            SobrietyGrade::B => "B",
            SobrietyGrade::C => "C",
            SobrietyGrade::D => "D",
            SobrietyGrade::E => "E",
        };
        write!(f, "{}", letter)
    }
}

/// Approximate vCPU and RAM (GB) of a machine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineProfile {
    pub vcpu: u32,
    pub ram_gb: u32,
}

/// Tunable constants behind every carbon figure.
#[derive(Debug, Clone)]
pub struct CarbonModel {
    /// Monthly energy per machine type, in match order
    pub instance_kwh_month: Vec<(String, f64)>,
    pub default_kwh_month: f64,
    pub region_tiers: Vec<(String, CarbonTier)>,
    /// Tier used for regions missing from `region_tiers`
    pub unknown_region_tier: CarbonTier,
    pub low_g_per_kwh: f64,
    pub medium_g_per_kwh: f64,
    pub high_g_per_kwh: f64,
    pub low_factor: f64,
    pub medium_factor: f64,
    pub high_factor: f64,
}

impl Default for CarbonModel {
    fn default() -> Self {
        let kwh = [
            ("e2-micro", 5.0),
            ("e2-small", 8.0),
            ("e2-medium", 15.0),
            ("e2-standard-2", 25.0),
            ("e2-standard-4", 35.0),
            ("e2-highcpu-2", 15.0),
            ("e2-highmem-2", 18.0),
            ("n1-standard-1", 22.0),
            ("n2-standard-2", 30.0),
            ("n2-standard-4", 45.0),
            ("c2-standard-4", 45.0),
        ];
        let tiers = [
            ("europe-west1", CarbonTier::Low),
            ("europe-north1", CarbonTier::Low),
            ("europe-west9", CarbonTier::Low),
            ("northamerica-northeast1", CarbonTier::Low),
            ("canada-central1", CarbonTier::Low),
            ("europe-west4", CarbonTier::Medium),
            ("us-central1", CarbonTier::Medium),
            ("europe-central2", CarbonTier::High),
            ("us-east4", CarbonTier::High),
        ];

        Self {
            instance_kwh_month: kwh.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            default_kwh_month: 15.0,
            region_tiers: tiers.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            unknown_region_tier: CarbonTier::Medium,
            low_g_per_kwh: 50.0,
            medium_g_per_kwh: 380.0,
            high_g_per_kwh: 700.0,
            low_factor: 0.8,
            medium_factor: 1.0,
            high_factor: 1.2,
        }
    }
}

impl CarbonModel {
    pub fn region_tier(&self, region: &str) -> CarbonTier {
        self.region_tiers
            .iter()
            .find(|(name, _)| name == region)
            .map(|(_, tier)| *tier)
            .unwrap_or(self.unknown_region_tier)
    }

    /// Grid intensity in gCO2eq/kWh.
    pub fn intensity(&self, region: &str) -> f64 {
        match self.region_tier(region) {
            CarbonTier::Low => self.low_g_per_kwh,
            CarbonTier::Medium => self.medium_g_per_kwh,
            CarbonTier::High => self.high_g_per_kwh,
        }
    }

    pub fn regional_factor(&self, region: &str) -> f64 {
        match self.region_tier(region) {
            CarbonTier::Low => self.low_factor,
            CarbonTier::Medium => self.medium_factor,
            CarbonTier::High => self.high_factor,
        }
    }

    /// Exact key first, then substring match either way, then the default.
    pub fn kwh_for_machine(&self, machine_type: &str) -> f64 {
        let mt = machine_type.trim().to_lowercase();
        if let Some((_, kwh)) = self.instance_kwh_month.iter().find(|(k, _)| *k == mt) {
            return *kwh;
        }
        self.instance_kwh_month
            .iter()
            .find(|(k, _)| mt.contains(k.as_str()) || k.contains(mt.as_str()))
            .map(|(_, kwh)| *kwh)
            .unwrap_or(self.default_kwh_month)
    }

    /// Monthly energy of all compute instances in a cart.
    pub fn total_monthly_kwh(&self, resources: &[Resource]) -> f64 {
        resources
            .iter()
            .filter_map(|r| match r {
                Resource::Compute(c) => Some(self.kwh_for_machine(&c.machine_type)),
                _ => None,
            })
            .sum()
    }

    /// Monthly emissions in kgCO2eq, rounded to 2 decimals.
    pub fn total_emissions(&self, resources: &[Resource], region: &str) -> f64 {
        let kwh = self.total_monthly_kwh(resources);
        if kwh <= 0.0 {
            return 0.0;
        }
        round2(kwh * self.intensity(region) / 1000.0)
    }

    /// Raw hardware impact before environment and region adjustments.
    pub fn hardware_impact(&self, resources: &[Resource]) -> f64 {
        let mut vcpu = 0u32;
        let mut ram_gb = 0u32;
        let mut storage_penalty = 0.0;

        for resource in resources {
            match resource {
                Resource::Compute(c) => {
                    let profile = machine_profile(&c.machine_type);
                    vcpu += profile.vcpu;
                    ram_gb += profile.ram_gb;
                }
                Resource::Storage(s) if s.is_multi_regional() => storage_penalty += 1.0,
                _ => {}
            }
        }

        let vcpu_score = match vcpu {
            0..=2 => 0.0,
            3..=4 => 1.0,
            5..=8 => 2.0,
            _ => 3.0,
        };
        let ram_score = match ram_gb {
            0..=8 => 0.0,
            9..=32 => 1.0,
            _ => 2.0,
        };

        vcpu_score + ram_score + storage_penalty
    }

    pub fn sobriety_score(
        &self,
        resources: &[Resource],
        environment: Environment,
        region: &str,
    ) -> SobrietyGrade {
        if resources.is_empty() {
            return SobrietyGrade::A;
        }

        let mut score = self.hardware_impact(resources);
        if environment == Environment::Dev {
            score = (score - 1.0).max(0.0);
        }
        score *= self.regional_factor(region);

        SobrietyGrade::from_score(score)
    }

    pub fn is_high_carbon_region(&self, region: &str) -> bool {
        self.region_tier(region) == CarbonTier::High
    }

    /// Lower-carbon neighbour for high-tier regions.
    pub fn green_alternative(&self, region: &str) -> Option<&'static str> {
        if !self.is_high_carbon_region(region) {
            return None;
        }
        Some(match region {
            "us-east4" => "canada-central1",
            "europe-central2" => "europe-west1",
            _ => "europe-west9",
        })
    }
}

/// Approximate hardware of a machine type.
pub fn machine_profile(machine_type: &str) -> MachineProfile {
    let mt = machine_type.to_lowercase();
    let (vcpu, ram_gb) = if mt.starts_with("e2-micro") {
        (0, 1)
    } else if mt.starts_with("e2-small") {
        (1, 2)
    } else if mt.starts_with("e2-medium") {
        (2, 4)
    } else if mt.contains("highcpu") {
        (2, 2)
    } else if mt.contains("highmem") {
        (2, 8)
    } else if mt.starts_with("n1-") || mt.starts_with("n2-") || mt.starts_with("c2-") {
        (4, 16)
    } else {
        (2, 4)
    };
    MachineProfile { vcpu, ram_gb }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Monthly emissions in kgCO2eq with the default model.
pub fn calculate_total_emissions(resources: &[Resource], region: &str) -> f64 {
    CarbonModel::default().total_emissions(resources, region)
}

/// Sobriety grade with the default model.
pub fn calculate_sobriety_score(
    resources: &[Resource],
    environment: Environment,
    region: &str,
) -> SobrietyGrade {
    CarbonModel::default().sobriety_score(resources, environment, region)
}

pub fn get_green_alternative(region: &str) -> Option<&'static str> {
    CarbonModel::default().green_alternative(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_iac::{ComputeSpec, StorageSpec};

    fn vm(machine: &str) -> Resource {
        Resource::Compute(ComputeSpec::new(machine, 20))
    }

    #[test]
    fn test_micro_in_paris_emits_quarter_kilo() {
        assert_eq!(calculate_total_emissions(&[vm("e2-micro")], "europe-west9"), 0.25);
    }

    #[test]
    fn test_emissions_by_tier() {
        let cart = vec![vm("e2-medium"), vm("e2-medium")];
        assert_eq!(calculate_total_emissions(&cart, "europe-west1"), 1.5);
        assert_eq!(calculate_total_emissions(&cart, "us-central1"), 11.4);
        assert_eq!(calculate_total_emissions(&cart, "us-east4"), 21.0);
        assert_eq!(calculate_total_emissions(&cart, "nowhere-1"), 11.4);
    }

    #[test]
    fn test_emissions_ignore_non_compute() {
        let cart = vec![Resource::Storage(StorageSpec::new("STANDARD"))];
        assert_eq!(calculate_total_emissions(&cart, "us-east4"), 0.0);
    }

    #[test]
    fn test_kwh_lookup_order() {
        let model = CarbonModel::default();
        assert_eq!(model.kwh_for_machine("E2-Small"), 8.0);
        assert_eq!(model.kwh_for_machine("e2-micro-custom"), 5.0);
        assert_eq!(model.kwh_for_machine("n2-standard-8"), 15.0);
    }

    #[test]
    fn test_empty_cart_scores_a() {
        assert_eq!(
            calculate_sobriety_score(&[], Environment::Prod, "us-east4"),
            SobrietyGrade::A
        );
    }

    #[test]
    fn test_sobriety_grades() {
        let small = vec![vm("e2-micro")];
        assert_eq!(
            calculate_sobriety_score(&small, Environment::Dev, "us-central1"),
            SobrietyGrade::A
        );

        // 4 x n2: 16 vCPU (3) + 64 GB (2) = 5, x1.2 in a high region
        let big = vec![
            vm("n2-standard-4"),
            vm("n2-standard-4"),
            vm("n2-standard-4"),
            vm("n2-standard-4"),
        ];
        assert_eq!(
            calculate_sobriety_score(&big, Environment::Prod, "europe-central2"),
            SobrietyGrade::E
        );

        // 2 x e2-medium + multi-regional: 4 vCPU (1) + 8 GB (0) + 1 = 2
        let ha = vec![
            vm("e2-medium"),
            vm("e2-medium"),
            Resource::Storage(StorageSpec::new("MULTI_REGIONAL")),
        ];
        assert_eq!(
            calculate_sobriety_score(&ha, Environment::Prod, "us-central1"),
            SobrietyGrade::B
        );
        assert_eq!(
            calculate_sobriety_score(&ha, Environment::Dev, "europe-west1"),
            SobrietyGrade::A
        );
    }

    #[test]
    fn test_machine_profiles() {
        assert_eq!(machine_profile("e2-highcpu-2"), MachineProfile { vcpu: 2, ram_gb: 2 });
        assert_eq!(machine_profile("e2-highmem-2"), MachineProfile { vcpu: 2, ram_gb: 8 });
        assert_eq!(machine_profile("c2-standard-4"), MachineProfile { vcpu: 4, ram_gb: 16 });
        assert_eq!(machine_profile("e2-standard-4"), MachineProfile { vcpu: 2, ram_gb: 4 });
    }

    #[test]
    fn test_green_alternative() {
        assert_eq!(get_green_alternative("us-east4"), Some("canada-central1"));
        assert_eq!(get_green_alternative("europe-central2"), Some("europe-west1"));
        assert_eq!(get_green_alternative("europe-west1"), None);
        assert_eq!(get_green_alternative("us-central1"), None);

        let mut model = CarbonModel::default();
        model.region_tiers.push(("asia-east1".to_string(), CarbonTier::High));
        assert_eq!(model.green_alternative("asia-east1"), Some("europe-west9"));
    }

    #[test]
    fn test_grade_display() {
        assert_eq!(SobrietyGrade::C.to_string(), "C");
    }
}
