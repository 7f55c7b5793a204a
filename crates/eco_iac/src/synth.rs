//! Infrastructure synthesis.
//!
//! The structure file is static text compiled into the binary. Everything a
//! user can influence goes into `terraform.tfvars.json`, produced by
//! `serde_json`, so no cart value is ever interpolated into HCL.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::catalog;
use crate::error::{IacError, IacResult};
use crate::resource::{DeploymentId, Resource};
use crate::validator::ResourceValidator;

/// Terraform structure file.
pub const MAIN_TF: &str = include_str!("../templates/main.tf");

/// Partial GCS backend; bucket and prefix arrive through `-backend-config`.
pub const BACKEND_TF: &str = include_str!("../templates/backend.tf");

pub const MAIN_TF_FILE: &str = "main.tf";
pub const BACKEND_TF_FILE: &str = "backend.tf";
pub const VALUES_FILE: &str = "terraform.tfvars.json";

/// Remote state location for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteState {
    pub bucket: String,
    pub deployment_id: DeploymentId,
}

impl RemoteState {
    pub fn new(bucket: impl Into<String>, deployment_id: DeploymentId) -> Self {
        Self {
            bucket: bucket.into(),
            deployment_id,
        }
    }

    pub fn prefix(&self) -> String {
        self.deployment_id.state_prefix()
    }

    /// `-backend-config` arguments for `terraform init`.
    pub fn backend_args(&self) -> Vec<String> {
        vec![
            format!("-backend-config=bucket={}", self.bucket),
            format!("-backend-config=prefix={}", self.prefix()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceValues {
    pub machine_type: String,
    pub disk_size_gb: i64,
    pub disk_type: String,
    pub startup_script: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseValues {
    pub tier: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketValues {
    pub storage_class: String,
    pub location: String,
}

/// Content of `terraform.tfvars.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerraformValues {
    pub project_id: String,
    pub region: String,
    pub deployment_id: String,
    pub instances: BTreeMap<String, InstanceValues>,
    pub databases: BTreeMap<String, DatabaseValues>,
    pub buckets: BTreeMap<String, BucketValues>,
    pub load_balancer_count: usize,
}

impl TerraformValues {
    pub fn resource_count(&self) -> usize {
        self.instances.len() + self.databases.len() + self.buckets.len() + self.load_balancer_count
    }
}

/// A synthesized workspace in a single-use scratch directory.
///
/// The directory is removed when the artifact is dropped.
#[derive(Debug)]
pub struct SynthesizedArtifact {
    dir: TempDir,
    values: TerraformValues,
    remote_state: bool,
}

impl SynthesizedArtifact {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn values(&self) -> &TerraformValues {
        &self.values
    }

    pub fn main_tf(&self) -> &'static str {
        MAIN_TF
    }

    pub fn values_json(&self) -> IacResult<String> {
        Ok(serde_json::to_string_pretty(&self.values)?)
    }

    pub fn has_remote_state(&self) -> bool {
        self.remote_state
    }
}

fn project_id_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9-]{4,28}[a-z0-9]$").ok())
        .as_ref()
}

/// Compiles validated carts into Terraform workspaces.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    project_id: String,
    region: String,
}

impl Synthesizer {
    pub fn new(project_id: impl Into<String>, region: impl Into<String>) -> IacResult<Self> {
        let project_id = project_id.into();
        let region = region.into();

        if !project_id_regex().is_some_and(|re| re.is_match(&project_id)) {
            return Err(IacError::InvalidConfig(format!(
                "invalid GCP project id '{}'",
                project_id
            )));
        }
        ResourceValidator::validate_region(&region)?;

        Ok(Self { project_id, region })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Build the values document. Every resource is re-validated first.
    pub fn render_values(
        &self,
        resources: &[Resource],
        deployment_id: &DeploymentId,
    ) -> IacResult<TerraformValues> {
        let validated = resources
            .iter()
            .map(ResourceValidator::revalidate)
            .collect::<Result<Vec<_>, _>>()?;

        let mut values = TerraformValues {
            project_id: self.project_id.clone(),
            region: self.region.clone(),
            deployment_id: deployment_id.to_string(),
            instances: BTreeMap::new(),
            databases: BTreeMap::new(),
            buckets: BTreeMap::new(),
            load_balancer_count: 0,
        };

        for (index, resource) in validated.iter().enumerate() {
            let name = resource_name(index, resource, deployment_id);
            match resource {
                Resource::Compute(c) => {
                    let script = catalog::startup_script(&c.software_stack).unwrap_or_default();
                    values.instances.insert(
                        name,
                        InstanceValues {
                            machine_type: c.machine_type.clone(),
                            disk_size_gb: c.disk_size_gb,
                            disk_type: c.disk_type.clone(),
                            startup_script: script.to_string(),
                        },
                    );
                }
                Resource::Database(d) => {
                    values.databases.insert(
                        name,
                        DatabaseValues {
                            tier: d.db_tier.clone(),
                            version: d.db_version.clone(),
                        },
                    );
                }
                Resource::Storage(s) => {
                    let location = if s.is_multi_regional() {
                        catalog::multi_region_location(&self.region).to_string()
                    } else {
                        self.region.to_uppercase()
                    };
                    values.buckets.insert(
                        name,
                        BucketValues {
                            storage_class: s.storage_class.clone(),
                            location,
                        },
                    );
                }
                Resource::LoadBalancer(_) => values.load_balancer_count += 1,
            }
        }

        Ok(values)
    }

    /// Write a complete workspace into a fresh scratch directory.
    ///
    /// Validation happens before anything touches the filesystem.
    pub fn synthesize(
        &self,
        resources: &[Resource],
        deployment_id: &DeploymentId,
        include_remote_state: bool,
    ) -> IacResult<SynthesizedArtifact> {
        let values = self.render_values(resources, deployment_id)?;

        let dir = tempfile::Builder::new().prefix("ecoarch-").tempdir()?;
        Self::write_workspace(dir.path(), &values, include_remote_state)?;

        info!(
            "Synthesized {} resources for deployment {} in {:?}",
            values.resource_count(),
            deployment_id,
            dir.path()
        );

        Ok(SynthesizedArtifact {
            dir,
            values,
            remote_state: include_remote_state,
        })
    }

    /// Write the workspace files into an existing directory.
    pub fn write_workspace(
        dir: &Path,
        values: &TerraformValues,
        include_remote_state: bool,
    ) -> IacResult<()> {
        fs::write(dir.join(MAIN_TF_FILE), MAIN_TF)?;
        if include_remote_state {
            fs::write(dir.join(BACKEND_TF_FILE), BACKEND_TF)?;
        }
        fs::write(dir.join(VALUES_FILE), serde_json::to_string_pretty(values)?)?;
        debug!("Wrote workspace files to {:?}", dir);
        Ok(())
    }
}

/// `res-{index}-{type}-{deployment_id}`
pub fn resource_name(index: usize, resource: &Resource, deployment_id: &DeploymentId) -> String {
    format!(
        "res-{}-{}-{}",
        index,
        resource.kind().name_segment(),
        deployment_id
    )
}

/// Cart as sent to a remote pipeline: validated resources with the trusted
/// startup script attached to compute entries. Display names are dropped.
pub fn architecture_json(resources: &[Resource]) -> IacResult<String> {
    let mut entries = Vec::with_capacity(resources.len());
    for resource in resources {
        let validated = ResourceValidator::revalidate(resource)?;
        let mut value = serde_json::to_value(&validated)?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("display_name");
            if let Resource::Compute(c) = &validated {
                let script = catalog::startup_script(&c.software_stack).unwrap_or_default();
                obj.insert("startup_script".to_string(), serde_json::Value::from(script));
            }
        }
        entries.push(value);
    }
    Ok(serde_json::to_string(&entries)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ComputeSpec, DatabaseSpec, LoadBalancerSpec, StorageSpec};

    fn synth() -> Synthesizer {
        Synthesizer::new("simulation-project", "europe-west1").unwrap()
    }

    fn id() -> DeploymentId {
        DeploymentId::parse("abc-123").unwrap()
    }

    #[test]
    fn test_invalid_project_id_rejected() {
        assert!(Synthesizer::new("Bad Project", "europe-west1").is_err());
        assert!(Synthesizer::new("good-project", "mars-1").is_err());
    }

    #[test]
    fn test_render_values_names_and_groups() {
        let resources = vec![
            Resource::Compute(ComputeSpec::new("e2-micro", 20).with_stack("web-nginx")),
            Resource::Database(DatabaseSpec::new("db-f1-micro", "POSTGRES_15")),
            Resource::Storage(StorageSpec::new("STANDARD")),
            Resource::LoadBalancer(LoadBalancerSpec::default()),
        ];
        let values = synth().render_values(&resources, &id()).unwrap();

        let vm = &values.instances["res-0-compute-abc-123"];
        assert_eq!(vm.machine_type, "e2-micro");
        assert!(vm.startup_script.contains("nginx"));
        assert!(values.databases.contains_key("res-1-sql-abc-123"));
        assert_eq!(values.buckets["res-2-storage-abc-123"].location, "EUROPE-WEST1");
        assert_eq!(values.load_balancer_count, 1);
        assert_eq!(values.resource_count(), 4);
    }

    #[test]
    fn test_multi_regional_bucket_location() {
        let resources = vec![Resource::Storage(StorageSpec::new("MULTI_REGIONAL"))];
        let values = synth().render_values(&resources, &id()).unwrap();
        assert_eq!(values.buckets["res-0-storage-abc-123"].location, "EU");
    }

    #[test]
    fn test_render_rejects_tampered_resource() {
        let mut spec = ComputeSpec::new("e2-micro", 20);
        spec.machine_type = "e2-micro\"\n}".to_string();
        let err = synth()
            .render_values(&[Resource::Compute(spec)], &id())
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_architecture_json_drops_display_names() {
        let resources = vec![
            Resource::Compute(ComputeSpec::new("e2-small", 30).with_stack("docker")).named("App"),
        ];
        let json: serde_json::Value = serde_json::from_str(&architecture_json(&resources).unwrap()).unwrap();
        assert_eq!(json[0]["type"], "compute");
        assert!(json[0].get("display_name").is_none());
        assert!(json[0]["startup_script"].as_str().unwrap().contains("docker"));
    }

    #[test]
    fn test_backend_args() {
        let state = RemoteState::new("tf-state-bucket", id());
        assert_eq!(
            state.backend_args(),
            vec![
                "-backend-config=bucket=tf-state-bucket".to_string(),
                "-backend-config=prefix=terraform/state/abc-123".to_string(),
            ]
        );
    }
}
