//! Offline price table used when Infracost is unavailable.
//!
//! Prices are approximate public GCP list prices in USD per month.

use serde_json::json;
use tracing::{debug, info};

use eco_iac::Resource;

use crate::simulator::SimulationResult;

/// Marker placed in `details._source` for offline estimates.
pub const FALLBACK_SOURCE: &str = "offline-fallback";

/// Smallest total reported for a non-empty cart.
pub const SAFETY_NET_COST: f64 = 0.01;

/// Monthly prices by catalog key.
#[derive(Debug, Clone)]
pub struct PriceTable {
    pub compute: Vec<(String, f64)>,
    pub default_compute: f64,
    pub disk_per_gb: f64,
    pub sql: Vec<(String, f64)>,
    pub default_sql: f64,
    pub storage: Vec<(String, f64)>,
    pub default_storage: f64,
    pub load_balancer: f64,
}

impl Default for PriceTable {
    fn default() -> Self {
        fn table(entries: &[(&str, f64)]) -> Vec<(String, f64)> {
            entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
        }

        Self {
            compute: table(&[
                ("e2-micro", 7.12),
                ("e2-small", 14.23),
                ("e2-medium", 29.38),
                ("e2-standard-2", 58.76),
                ("e2-standard-4", 117.51),
                ("n1-standard-1", 24.27),
                ("n2-standard-2", 65.64),
                ("c2-standard-4", 141.24),
            ]),
            default_compute: 29.38,
            disk_per_gb: 0.04,
            sql: table(&[
                ("db-f1-micro", 7.67),
                ("db-g1-small", 25.55),
                ("db-custom-1-3840", 50.34),
                ("db-custom-2-3840", 79.49),
                ("db-custom-2-7680", 100.67),
                ("db-custom-4-15360", 201.34),
            ]),
            default_sql: 7.67,
            storage: table(&[
                ("STANDARD", 2.60),
                ("NEARLINE", 1.30),
                ("COLDLINE", 0.70),
                ("ARCHIVE", 0.15),
                ("MULTI_REGIONAL", 3.25),
            ]),
            default_storage: 2.60,
            load_balancer: 18.26,
        }
    }
}

impl PriceTable {
    /// Monthly price of one resource.
    pub fn price(&self, resource: &Resource) -> f64 {
        match resource {
            Resource::Compute(c) => {
                let vm = lookup(&self.compute, &c.machine_type, self.default_compute, "machine type");
                vm + c.disk_size_gb.max(0) as f64 * self.disk_per_gb
            }
            Resource::Database(d) => lookup(&self.sql, &d.db_tier, self.default_sql, "db tier"),
            Resource::Storage(s) => lookup(
                &self.storage,
                &s.storage_class,
                self.default_storage,
                "storage class",
            ),
            Resource::LoadBalancer(_) => self.load_balancer,
        }
    }

    /// Estimate a whole cart. Always succeeds.
    pub fn estimate(&self, resources: &[Resource]) -> SimulationResult {
        if resources.is_empty() {
            return SimulationResult::empty();
        }

        let mut total = 0.0;
        let mut breakdown = Vec::with_capacity(resources.len());

        for resource in resources {
            let cost = self.price(resource);
            total += cost;
            breakdown.push(json!({
                "name": resource.label(),
                "resourceType": terraform_type(resource),
                "monthlyCost": format!("{:.2}", cost),
            }));
        }

        let mut total = round2(total);
        if total <= 0.0 {
            debug!("Offline estimate priced a non-empty cart at 0, applying safety net");
            total = SAFETY_NET_COST;
        }

        info!(
            "Offline estimate: {:.2} USD/month for {} resources",
            total,
            resources.len()
        );

        SimulationResult {
            success: true,
            monthly_cost: total,
            details: json!({
                "totalMonthlyCost": format!("{:.2}", total),
                "currency": "USD",
                "projects": [{
                    "name": "offline-estimate",
                    "breakdown": {
                        "resources": breakdown,
                        "totalMonthlyCost": format!("{:.2}", total),
                    }
                }],
                "_source": FALLBACK_SOURCE,
            }),
            error_message: None,
        }
    }
}

/// Estimate a cart with the default price table.
pub fn fallback_estimate(resources: &[Resource]) -> SimulationResult {
    PriceTable::default().estimate(resources)
}

/// Exact key, then substring match either way, then the default.
fn lookup(table: &[(String, f64)], key: &str, default: f64, what: &str) -> f64 {
    if let Some((_, price)) = table.iter().find(|(k, _)| k == key) {
        return *price;
    }
    if let Some((matched, price)) = table
        .iter()
        .find(|(k, _)| key.contains(k.as_str()) || k.contains(key))
    {
        info!("No exact price for {} '{}', using '{}'", what, key, matched);
        return *price;
    }
    info!("No price for {} '{}', using default {:.2}", what, key, default);
    default
}

fn terraform_type(resource: &Resource) -> &'static str {
    match resource {
        Resource::Compute(_) => "google_compute_instance",
        Resource::Database(_) => "google_sql_database_instance",
        Resource::Storage(_) => "google_storage_bucket",
        Resource::LoadBalancer(_) => "google_compute_global_forwarding_rule",
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_iac::{ComputeSpec, DatabaseSpec, LoadBalancerSpec, StorageSpec};

    #[test]
    fn test_known_prices() {
        let cart = vec![
            Resource::Compute(ComputeSpec::new("e2-medium", 50)),
            Resource::Database(DatabaseSpec::new("db-f1-micro", "POSTGRES_14")),
            Resource::Storage(StorageSpec::new("STANDARD")),
            Resource::LoadBalancer(LoadBalancerSpec::default()),
        ];
        let result = fallback_estimate(&cart);

        // 29.38 + 2.00 + 7.67 + 2.60 + 18.26
        assert!(result.success);
        assert_eq!(result.monthly_cost, 59.91);
        assert_eq!(result.details["_source"], FALLBACK_SOURCE);
        assert_eq!(result.details["totalMonthlyCost"], "59.91");

        let rows = result.details["projects"][0]["breakdown"]["resources"]
            .as_array()
            .unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0]["monthlyCost"], "31.38");
        assert_eq!(rows[3]["resourceType"], "google_compute_global_forwarding_rule");
    }

    #[test]
    fn test_unknown_keys_use_defaults() {
        let table = PriceTable::default();
        let vm = Resource::Compute(ComputeSpec::new("e2-highcpu-2", 10));
        assert!((table.price(&vm) - (29.38 + 0.4)).abs() < 1e-9);
    }

    #[test]
    fn test_substring_match() {
        let table = PriceTable::default();
        let vm = Resource::Compute(ComputeSpec::new("e2-micro-custom", 10));
        assert!((table.price(&vm) - (7.12 + 0.4)).abs() < 1e-9);
    }

    #[test]
    fn test_empty_cart_is_zero() {
        let result = fallback_estimate(&[]);
        assert!(result.success);
        assert_eq!(result.monthly_cost, 0.0);
    }

    #[test]
    fn test_safety_net_for_free_prices() {
        let table = PriceTable {
            storage: vec![("ARCHIVE".to_string(), 0.0)],
            ..PriceTable::default()
        };
        let result = table.estimate(&[Resource::Storage(StorageSpec::new("ARCHIVE"))]);
        assert_eq!(result.monthly_cost, SAFETY_NET_COST);
    }

    #[test]
    fn test_breakdown_uses_display_names() {
        let cart = vec![Resource::Storage(StorageSpec::new("NEARLINE")).named("Backups")];
        let result = fallback_estimate(&cart);
        assert_eq!(
            result.details["projects"][0]["breakdown"]["resources"][0]["name"],
            "Backups"
        );
    }
}
