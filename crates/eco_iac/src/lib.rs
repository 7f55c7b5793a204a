//! # eco_iac
//!
//! Resource validation and injection-safe Terraform synthesis for EcoArch.
//!
//! This crate turns a cart of abstract resource descriptors into a Terraform
//! workspace and drives the Terraform CLI against it.
//!
//! ## Features
//!
//! - Closed GCP catalog (machine types, tiers, classes, regions, stacks)
//! - Validation of every user-controlled field before templating
//! - Static `main.tf` plus a `serde_json` values file, never string templating
//! - Optional GCS remote state scoped by deployment id
//! - Streamed, cancellable `terraform init/apply/destroy`
//!
//! ## Example
//!
//! ```rust,no_run
//! use eco_iac::{DeploymentId, RawResource, ResourceValidator, Synthesizer};
//!
//! let cart = vec![
//!     RawResource::compute("e2-micro", 20).with_stack("web-nginx"),
//!     RawResource::storage("STANDARD"),
//! ];
//! let resources = ResourceValidator::validate_all(&cart).unwrap();
//!
//! let synth = Synthesizer::new("my-project", "europe-west1").unwrap();
//! let artifact = synth
//!     .synthesize(&resources, &DeploymentId::generate(), false)
//!     .unwrap();
//! println!("workspace at {:?}", artifact.path());
//! ```

pub mod catalog;
pub mod error;
pub mod resource;
pub mod synth;
pub mod terraform;
pub mod validator;

pub use error::{IacError, IacResult};
pub use resource::{
    ComputeSpec, DatabaseSpec, DeploymentId, LoadBalancerSpec, RawResource, Resource, ResourceKind,
    StorageSpec,
};
pub use synth::{architecture_json, RemoteState, SynthesizedArtifact, Synthesizer, TerraformValues};
pub use terraform::{TerraformResult, TerraformRunner};
pub use validator::{ResourceValidator, ValidationError};
