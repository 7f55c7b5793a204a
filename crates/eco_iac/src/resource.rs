//! Cart resource model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog;
use crate::validator::{ResourceValidator, ValidationError};

/// Resource discriminator as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Compute,
    #[serde(rename = "sql")]
    Database,
    Storage,
    LoadBalancer,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Compute => "compute",
            ResourceKind::Database => "sql",
            ResourceKind::Storage => "storage",
            ResourceKind::LoadBalancer => "load_balancer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "compute" => Some(ResourceKind::Compute),
            "sql" => Some(ResourceKind::Database),
            "storage" => Some(ResourceKind::Storage),
            "load_balancer" => Some(ResourceKind::LoadBalancer),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            ResourceKind::Compute,
            ResourceKind::Database,
            ResourceKind::Storage,
            ResourceKind::LoadBalancer,
        ]
    }

    /// Short form used in generated resource names.
    pub fn name_segment(&self) -> &'static str {
        match self {
            ResourceKind::Compute => "compute",
            ResourceKind::Database => "sql",
            ResourceKind::Storage => "storage",
            ResourceKind::LoadBalancer => "lb",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Virtual machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputeSpec {
    pub machine_type: String,
    #[serde(rename = "disk_size")]
    pub disk_size_gb: i64,
    pub disk_type: String,
    pub software_stack: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ComputeSpec {
    pub fn new(machine_type: impl Into<String>, disk_size_gb: i64) -> Self {
        Self {
            machine_type: machine_type.into(),
            disk_size_gb,
            disk_type: catalog::DEFAULT_DISK_TYPE.to_string(),
            software_stack: catalog::DEFAULT_STACK.to_string(),
            display_name: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.software_stack = stack.into();
        self
    }

    pub fn with_disk_type(mut self, disk_type: impl Into<String>) -> Self {
        self.disk_type = disk_type.into();
        self
    }
}

/// Managed Cloud SQL instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSpec {
    pub db_tier: String,
    pub db_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl DatabaseSpec {
    pub fn new(db_tier: impl Into<String>, db_version: impl Into<String>) -> Self {
        Self {
            db_tier: db_tier.into(),
            db_version: db_version.into(),
            display_name: None,
        }
    }
}

/// Object storage bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageSpec {
    pub storage_class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl StorageSpec {
    pub fn new(storage_class: impl Into<String>) -> Self {
        Self {
            storage_class: storage_class.into(),
            display_name: None,
        }
    }

    pub fn is_multi_regional(&self) -> bool {
        self.storage_class == catalog::MULTI_REGIONAL
    }
}

/// HTTP load balancer. Carries no user-controlled fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadBalancerSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// One item of a cart.
///
/// A `Resource` is a plain value; it owns no infrastructure state. Values
/// coming from outside are built through [`ResourceValidator`], and the
/// synthesizer re-validates everything it is handed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resource {
    Compute(ComputeSpec),
    #[serde(rename = "sql")]
    Database(DatabaseSpec),
    Storage(StorageSpec),
    LoadBalancer(LoadBalancerSpec),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Compute(_) => ResourceKind::Compute,
            Resource::Database(_) => ResourceKind::Database,
            Resource::Storage(_) => ResourceKind::Storage,
            Resource::LoadBalancer(_) => ResourceKind::LoadBalancer,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Resource::Compute(c) => c.display_name.as_deref(),
            Resource::Database(d) => d.display_name.as_deref(),
            Resource::Storage(s) => s.display_name.as_deref(),
            Resource::LoadBalancer(l) => l.display_name.as_deref(),
        }
    }

    /// Attach a cosmetic label.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        let name = Some(name.into());
        match &mut self {
            Resource::Compute(c) => c.display_name = name,
            Resource::Database(d) => d.display_name = name,
            Resource::Storage(s) => s.display_name = name,
            Resource::LoadBalancer(l) => l.display_name = name,
        }
        self
    }

    /// Label for logs and cost breakdowns.
    pub fn label(&self) -> String {
        if let Some(name) = self.display_name() {
            return name.to_string();
        }
        match self {
            Resource::Compute(c) => format!("compute [{}]", c.machine_type),
            Resource::Database(d) => format!("sql [{}]", d.db_tier),
            Resource::Storage(s) => format!("storage [{}]", s.storage_class),
            Resource::LoadBalancer(_) => "load_balancer".to_string(),
        }
    }

    /// Convert back to the unvalidated wire shape.
    pub fn to_raw(&self) -> RawResource {
        let mut raw = RawResource::of_kind(self.kind().as_str());
        raw.display_name = self.display_name().map(str::to_string);
        match self {
            Resource::Compute(c) => {
                raw.machine_type = Some(c.machine_type.clone());
                raw.disk_size = Some(serde_json::Value::from(c.disk_size_gb));
                raw.disk_type = Some(c.disk_type.clone());
                raw.software_stack = Some(c.software_stack.clone());
            }
            Resource::Database(d) => {
                raw.db_tier = Some(d.db_tier.clone());
                raw.db_version = Some(d.db_version.clone());
            }
            Resource::Storage(s) => {
                raw.storage_class = Some(s.storage_class.clone());
            }
            Resource::LoadBalancer(_) => {}
        }
        raw
    }
}

/// Unvalidated resource as received from a caller (UI, CLI file, pipeline).
///
/// Missing fields take catalog defaults during validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResource {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
    /// Integer or numeric string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

fn default_kind() -> String {
    ResourceKind::Compute.as_str().to_string()
}

impl RawResource {
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn compute(machine_type: impl Into<String>, disk_size: i64) -> Self {
        Self {
            machine_type: Some(machine_type.into()),
            disk_size: Some(serde_json::Value::from(disk_size)),
            ..Self::of_kind("compute")
        }
    }

    pub fn sql(db_tier: impl Into<String>, db_version: impl Into<String>) -> Self {
        Self {
            db_tier: Some(db_tier.into()),
            db_version: Some(db_version.into()),
            ..Self::of_kind("sql")
        }
    }

    pub fn storage(storage_class: impl Into<String>) -> Self {
        Self {
            storage_class: Some(storage_class.into()),
            ..Self::of_kind("storage")
        }
    }

    pub fn load_balancer() -> Self {
        Self::of_kind("load_balancer")
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.software_stack = Some(stack.into());
        self
    }

    pub fn with_disk_type(mut self, disk_type: impl Into<String>) -> Self {
        self.disk_type = Some(disk_type.into());
        self
    }
}

/// Identifier scoping one Terraform workspace and its remote state.
///
/// Always matches `^[a-z0-9][a-z0-9-]{1,30}$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeploymentId(String);

impl DeploymentId {
    /// Validate a user-supplied identifier.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        ResourceValidator::validate_deployment_id(value).map(|v| Self(v.to_string()))
    }

    /// Generate a fresh random identifier for a new session.
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(simple[..8].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Remote state object prefix for this workspace.
    pub fn state_prefix(&self) -> String {
        format!("terraform/state/{}", self.0)
    }
}

impl TryFrom<String> for DeploymentId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeploymentId> for String {
    fn from(id: DeploymentId) -> Self {
        id.0
    }
}

impl std::fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DeploymentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_serializes_with_type_tag() {
        let res = Resource::Compute(ComputeSpec::new("e2-medium", 20).with_stack("docker"));
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["type"], "compute");
        assert_eq!(json["machine_type"], "e2-medium");
        assert_eq!(json["disk_size"], 20);
        assert!(json.get("display_name").is_none());

        let db = serde_json::to_value(Resource::Database(DatabaseSpec::new("db-f1-micro", "POSTGRES_15"))).unwrap();
        assert_eq!(db["type"], "sql");
    }

    #[test]
    fn test_raw_resource_defaults_to_compute() {
        let raw: RawResource = serde_json::from_str(r#"{"machine_type": "e2-small"}"#).unwrap();
        assert_eq!(raw.kind, "compute");
        assert_eq!(raw.machine_type.as_deref(), Some("e2-small"));
    }

    #[test]
    fn test_to_raw_round_trips_fields() {
        let res = Resource::Storage(StorageSpec::new("NEARLINE")).named("Backups");
        let raw = res.to_raw();
        assert_eq!(raw.kind, "storage");
        assert_eq!(raw.storage_class.as_deref(), Some("NEARLINE"));
        assert_eq!(raw.display_name.as_deref(), Some("Backups"));
    }

    #[test]
    fn test_generated_deployment_id_is_valid() {
        for _ in 0..20 {
            let id = DeploymentId::generate();
            assert_eq!(id.as_str().len(), 8);
            assert!(DeploymentId::parse(id.as_str()).is_ok());
        }
    }

    #[test]
    fn test_deployment_id_state_prefix() {
        let id = DeploymentId::parse("abc-123").unwrap();
        assert_eq!(id.state_prefix(), "terraform/state/abc-123");
    }

    #[test]
    fn test_deployment_id_deserialize_validates() {
        assert!(serde_json::from_str::<DeploymentId>("\"abc-123\"").is_ok());
        assert!(serde_json::from_str::<DeploymentId>("\"ABC\"").is_err());
    }

    #[test]
    fn test_label_prefers_display_name() {
        let res = Resource::LoadBalancer(LoadBalancerSpec::default());
        assert_eq!(res.label(), "load_balancer");
        assert_eq!(res.named("Global LB").label(), "Global LB");
    }
}
