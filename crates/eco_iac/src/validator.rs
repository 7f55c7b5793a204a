//! Resource validation.
//!
//! Every user-controlled field is checked against the closed sets in
//! [`crate::catalog`] before it can reach templating. Validation is pure and
//! is the only error class that aborts before any external call.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::catalog;
use crate::resource::{
    ComputeSpec, DatabaseSpec, LoadBalancerSpec, RawResource, Resource, ResourceKind, StorageSpec,
};

/// Longest cosmetic label kept on a resource.
const MAX_DISPLAY_NAME: usize = 80;

/// A rejected field. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid {field} '{value}', accepted: {accepted}")]
    NotAllowed {
        field: &'static str,
        value: String,
        accepted: String,
    },

    #[error("{field} {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("{field} must be an integer, got '{value}'")]
    NotAnInteger { field: &'static str, value: String },

    #[error("invalid deployment id '{0}': expected ^[a-z0-9][a-z0-9-]{{1,30}}$")]
    DeploymentId(String),
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::NotAllowed { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::NotAnInteger { field, .. } => field,
            ValidationError::DeploymentId(_) => "deployment_id",
        }
    }

    fn not_allowed(field: &'static str, value: &str, accepted: &[&str]) -> Self {
        ValidationError::NotAllowed {
            field,
            value: value.to_string(),
            accepted: accepted.join(", "),
        }
    }
}

fn deployment_id_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9-]{1,30}$").ok())
        .as_ref()
}

/// Validator for cart resources and identifiers.
pub struct ResourceValidator;

impl ResourceValidator {
    /// Validate one raw resource, filling catalog defaults for missing fields.
    pub fn validate(raw: &RawResource) -> Result<Resource, ValidationError> {
        let kind = ResourceKind::parse(&raw.kind).ok_or_else(|| {
            ValidationError::not_allowed("type", &raw.kind, &["compute", "sql", "storage", "load_balancer"])
        })?;

        let display_name = raw.display_name.as_deref().and_then(clean_display_name);

        let resource = match kind {
            ResourceKind::Compute => {
                let machine_type = raw
                    .machine_type
                    .as_deref()
                    .unwrap_or(catalog::DEFAULT_INSTANCE);
                check_member("machine_type", machine_type, catalog::INSTANCE_TYPES)?;

                let disk_size_gb = parse_disk_size(raw.disk_size.as_ref())?;

                let disk_type = raw.disk_type.as_deref().unwrap_or(catalog::DEFAULT_DISK_TYPE);
                check_member("disk_type", disk_type, catalog::DISK_TYPES)?;

                let stack = raw.software_stack.as_deref().unwrap_or(catalog::DEFAULT_STACK);
                check_member("software_stack", stack, &catalog::stack_names())?;

                Resource::Compute(ComputeSpec {
                    machine_type: machine_type.to_string(),
                    disk_size_gb,
                    disk_type: disk_type.to_string(),
                    software_stack: stack.to_string(),
                    display_name,
                })
            }
            ResourceKind::Database => {
                let tier = raw.db_tier.as_deref().unwrap_or(catalog::DEFAULT_DB_TIER);
                check_member("db_tier", tier, catalog::DB_TIERS)?;

                let version = raw.db_version.as_deref().unwrap_or(catalog::DEFAULT_DB_VERSION);
                check_member("db_version", version, catalog::DB_VERSIONS)?;

                Resource::Database(DatabaseSpec {
                    db_tier: tier.to_string(),
                    db_version: version.to_string(),
                    display_name,
                })
            }
            ResourceKind::Storage => {
                let class = raw
                    .storage_class
                    .as_deref()
                    .unwrap_or(catalog::DEFAULT_STORAGE_CLASS);
                check_member("storage_class", class, catalog::STORAGE_CLASSES)?;

                Resource::Storage(StorageSpec {
                    storage_class: class.to_string(),
                    display_name,
                })
            }
            ResourceKind::LoadBalancer => Resource::LoadBalancer(LoadBalancerSpec { display_name }),
        };

        debug!("Validated {} resource", resource.kind());
        Ok(resource)
    }

    /// Validate a whole cart; the first failure aborts.
    pub fn validate_all(raws: &[RawResource]) -> Result<Vec<Resource>, ValidationError> {
        raws.iter().map(Self::validate).collect()
    }

    /// Re-check an already-built resource.
    pub fn revalidate(resource: &Resource) -> Result<Resource, ValidationError> {
        Self::validate(&resource.to_raw())
    }

    /// Enforce the deployment identifier pattern.
    pub fn validate_deployment_id(value: &str) -> Result<&str, ValidationError> {
        if deployment_id_regex().is_some_and(|re| re.is_match(value)) {
            Ok(value)
        } else {
            Err(ValidationError::DeploymentId(value.to_string()))
        }
    }

    pub fn validate_region(region: &str) -> Result<&str, ValidationError> {
        check_member("region", region, catalog::REGIONS)?;
        Ok(region)
    }
}

fn check_member(field: &'static str, value: &str, accepted: &[&str]) -> Result<(), ValidationError> {
    if accepted.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::not_allowed(field, value, accepted))
    }
}

fn parse_disk_size(value: Option<&serde_json::Value>) -> Result<i64, ValidationError> {
    let size = match value {
        None | Some(serde_json::Value::Null) => catalog::DEFAULT_DISK_SIZE_GB,
        Some(serde_json::Value::Number(n)) => n.as_i64().ok_or_else(|| ValidationError::NotAnInteger {
            field: "disk_size",
            value: n.to_string(),
        })?,
        Some(serde_json::Value::String(s)) => {
            s.trim()
                .parse::<i64>()
                .map_err(|_| ValidationError::NotAnInteger {
                    field: "disk_size",
                    value: s.clone(),
                })?
        }
        Some(other) => {
            return Err(ValidationError::NotAnInteger {
                field: "disk_size",
                value: other.to_string(),
            })
        }
    };

    if !(catalog::MIN_DISK_GB..=catalog::MAX_DISK_GB).contains(&size) {
        return Err(ValidationError::OutOfRange {
            field: "disk_size",
            value: size,
            min: catalog::MIN_DISK_GB,
            max: catalog::MAX_DISK_GB,
        });
    }
    Ok(size)
}

/// Labels are cosmetic; drop control characters and cap the length.
fn clean_display_name(name: &str) -> Option<String> {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_DISPLAY_NAME)
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
