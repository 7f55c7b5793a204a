//! Infracost JSON report parsing.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{CostError, CostResult};

/// Parse a cost that may be a number, a numeric string or null.
pub fn parse_cost(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// One priced resource from a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportResource {
    pub name: String,
    pub resource_type: String,
    pub monthly_cost: f64,
    /// Change against the previous run
    pub diff_monthly_cost: f64,
}

/// Headline figures of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostMetrics {
    pub total_monthly_cost: f64,
    pub diff_monthly_cost: f64,
    pub currency: String,
}

/// Chart bucket for a priced resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CostCategory {
    Sql,
    Compute,
    Storage,
    Network,
    Other,
}

impl CostCategory {
    /// Bucket a resource by its name and Terraform type.
    pub fn categorize(name: &str, resource_type: &str) -> Self {
        let haystack = format!("{} {}", name, resource_type).to_lowercase();
        if haystack.contains("sql") {
            CostCategory::Sql
        } else if haystack.contains("instance") {
            CostCategory::Compute
        } else if haystack.contains("storage") {
            CostCategory::Storage
        } else if haystack.contains("address") || haystack.contains("forwarding") {
            CostCategory::Network
        } else {
            CostCategory::Other
        }
    }

    pub fn all() -> [CostCategory; 5] {
        [
            CostCategory::Sql,
            CostCategory::Compute,
            CostCategory::Storage,
            CostCategory::Network,
            CostCategory::Other,
        ]
    }
}

impl fmt::Display for CostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CostCategory::Sql => "SQL",
            CostCategory::Compute => "Compute",
            CostCategory::Storage => "Storage",
            CostCategory::Network => "Network",
            CostCategory::Other => "Other",
        };
        write!(f, "{}", label)
    }
}

/// Parsed Infracost report.
///
/// Parsing is lenient: missing sections read as empty and unparsable costs
/// read as zero.
#[derive(Debug, Clone)]
pub struct InfracostReport {
    data: Value,
    resources: Vec<ReportResource>,
}

impl InfracostReport {
    pub fn from_value(data: Value) -> Self {
        let resources = flatten_resources(&data);
        Self { data, resources }
    }

    pub fn from_json(json: &str) -> CostResult<Self> {
        let data: Value =
            serde_json::from_str(json).map_err(|e| CostError::MalformedReport(e.to_string()))?;
        Ok(Self::from_value(data))
    }

    /// Load a report file.
    pub fn load(path: impl AsRef<Path>) -> CostResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CostError::ReportNotFound(path.display().to_string()));
        }
        debug!("Loading Infracost report from {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn raw(&self) -> &Value {
        &self.data
    }

    pub fn resources(&self) -> &[ReportResource] {
        &self.resources
    }

    pub fn metrics(&self) -> CostMetrics {
        CostMetrics {
            total_monthly_cost: parse_cost(self.data.get("totalMonthlyCost")),
            diff_monthly_cost: parse_cost(self.data.get("diffTotalMonthlyCost")),
            currency: self
                .data
                .get("currency")
                .and_then(Value::as_str)
                .unwrap_or("USD")
                .to_string(),
        }
    }

    /// Positive costs summed per category, in chart order; empty buckets omitted.
    pub fn cost_by_category(&self) -> Vec<(CostCategory, f64)> {
        CostCategory::all()
            .into_iter()
            .filter_map(|category| {
                let total: f64 = self
                    .resources
                    .iter()
                    .filter(|r| r.monthly_cost > 0.0)
                    .filter(|r| CostCategory::categorize(&r.name, &r.resource_type) == category)
                    .map(|r| r.monthly_cost)
                    .sum();
                (total > 0.0).then_some((category, total))
            })
            .collect()
    }

    /// Markdown summary for merge request comments.
    pub fn markdown(&self) -> String {
        let metrics = self.metrics();
        let currency = &metrics.currency;
        let diff = metrics.diff_monthly_cost;

        let mut lines = vec![
            "## EcoArch FinOps Analysis".to_string(),
            format!(
                "**Estimated monthly total:** `{:.2} {}`",
                metrics.total_monthly_cost, currency
            ),
        ];

        if diff > 0.0 {
            lines.push(format!("**Change:** `+{:.2} {}` (increase)", diff, currency));
        } else if diff < 0.0 {
            lines.push(format!("**Change:** `{:.2} {}` (savings)", diff, currency));
        } else {
            lines.push(format!("**Change:** `0.00 {}` (stable)", currency));
        }

        if !self.resources.is_empty() {
            lines.push(String::new());
            lines.push("| Resource | Type | Monthly |".to_string());
            lines.push("|---|---|---:|".to_string());
            for res in &self.resources {
                lines.push(format!(
                    "| {} | {} | {:.2} |",
                    escape_cell(&res.name),
                    escape_cell(&res.resource_type),
                    res.monthly_cost
                ));
            }
        }

        lines.join("\n")
    }
}

fn flatten_resources(data: &Value) -> Vec<ReportResource> {
    let projects = match data.get("projects").and_then(Value::as_array) {
        Some(projects) => projects,
        None => return Vec::new(),
    };

    projects
        .iter()
        .filter_map(|project| project.pointer("/breakdown/resources").and_then(Value::as_array))
        .flatten()
        .map(|res| ReportResource {
            name: res
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("Unnamed")
                .to_string(),
            resource_type: res
                .get("resourceType")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string(),
            monthly_cost: parse_cost(res.get("monthlyCost")),
            diff_monthly_cost: parse_cost(res.get("diffMonthlyCost")),
        })
        .collect()
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> InfracostReport {
        InfracostReport::from_value(json!({
            "totalMonthlyCost": "75.50",
            "diffTotalMonthlyCost": "-4.5",
            "currency": "EUR",
            "projects": [{
                "breakdown": {
                    "resources": [
                        {"name": "google_compute_instance.vm[\"res-0\"]", "resourceType": "google_compute_instance", "monthlyCost": "30.10"},
                        {"name": "google_sql_database_instance.db[\"res-1\"]", "resourceType": "google_sql_database_instance", "monthlyCost": 25.4, "diffMonthlyCost": "1"},
                        {"name": "google_storage_bucket.bucket[\"res-2\"]", "monthlyCost": null},
                        {"name": "google_compute_global_address.lb[0]", "monthlyCost": "not-a-number"},
                        {"monthlyCost": "20"}
                    ]
                }
            }, {
                "breakdown": null
            }]
        }))
    }

    #[test]
    fn test_parse_cost_is_tolerant() {
        assert_eq!(parse_cost(Some(&json!("12.5"))), 12.5);
        assert_eq!(parse_cost(Some(&json!(3))), 3.0);
        assert_eq!(parse_cost(Some(&json!(null))), 0.0);
        assert_eq!(parse_cost(Some(&json!("abc"))), 0.0);
        assert_eq!(parse_cost(None), 0.0);
    }

    #[test]
    fn test_flatten_resources() {
        let report = sample();
        let resources = report.resources();
        assert_eq!(resources.len(), 5);
        assert_eq!(resources[1].monthly_cost, 25.4);
        assert_eq!(resources[1].diff_monthly_cost, 1.0);
        assert_eq!(resources[2].resource_type, "Unknown");
        assert_eq!(resources[3].monthly_cost, 0.0);
        assert_eq!(resources[4].name, "Unnamed");
    }

    #[test]
    fn test_metrics() {
        let metrics = sample().metrics();
        assert_eq!(metrics.total_monthly_cost, 75.5);
        assert_eq!(metrics.diff_monthly_cost, -4.5);
        assert_eq!(metrics.currency, "EUR");

        let empty = InfracostReport::from_value(json!({})).metrics();
        assert_eq!(empty.total_monthly_cost, 0.0);
        assert_eq!(empty.currency, "USD");
    }

    #[test]
    fn test_categories() {
        assert_eq!(CostCategory::categorize("db", "google_sql_database_instance"), CostCategory::Sql);
        assert_eq!(CostCategory::categorize("vm", "google_compute_instance"), CostCategory::Compute);
        assert_eq!(CostCategory::categorize("google_storage_bucket.b", ""), CostCategory::Storage);
        assert_eq!(CostCategory::categorize("google_compute_global_address.lb", ""), CostCategory::Network);
        assert_eq!(CostCategory::categorize("mystery", "Unknown"), CostCategory::Other);

        let buckets = sample().cost_by_category();
        assert_eq!(
            buckets,
            vec![
                (CostCategory::Sql, 25.4),
                (CostCategory::Compute, 30.1),
                (CostCategory::Other, 20.0),
            ]
        );
    }

    #[test]
    fn test_markdown() {
        let md = sample().markdown();
        assert!(md.contains("`75.50 EUR`"));
        assert!(md.contains("`-4.50 EUR` (savings)"));
        assert!(md.contains("| google_compute_instance.vm[\"res-0\"] | google_compute_instance | 30.10 |"));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            InfracostReport::from_json("{not json"),
            Err(CostError::MalformedReport(_))
        ));
    }
}
