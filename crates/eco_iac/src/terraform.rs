//! Terraform runner.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use eco_runner::{CommandSpec, LogSender, ProcessRunner, RunConfig};

use crate::error::{IacError, IacResult};
use crate::synth::RemoteState;

/// Result of a Terraform operation.
#[derive(Debug)]
pub struct TerraformResult {
    pub success: bool,
    pub output: String,
    pub exit_code: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Init,
    Apply,
    Destroy,
}

/// Terraform runner driving the CLI through a [`ProcessRunner`].
pub struct TerraformRunner {
    runner: Arc<dyn ProcessRunner>,
    binary: String,
    timeout_seconds: u64,
    tail_lines: usize,
}

impl TerraformRunner {
    /// Create a new Terraform runner.
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            binary: "terraform".to_string(),
            timeout_seconds: 300,
            tail_lines: 20,
        }
    }

    /// Use a specific Terraform binary.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Hard timeout per command, at least one second.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds.max(1);
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Check that `terraform version` succeeds.
    pub async fn is_available(&self) -> bool {
        self.runner.is_available(&self.binary).await
    }

    /// Run terraform init, optionally against remote state.
    pub async fn init(
        &self,
        working_dir: &Path,
        remote_state: Option<&RemoteState>,
        cancel: &CancellationToken,
        events: Option<LogSender>,
    ) -> IacResult<TerraformResult> {
        info!("Running terraform init in {:?}", working_dir);
        let mut args = vec!["init".to_string(), "-input=false".to_string(), "-no-color".to_string()];
        if let Some(state) = remote_state {
            args.extend(state.backend_args());
        }
        self.run_step(Step::Init, working_dir, args, cancel, events).await
    }

    /// Run terraform apply without prompting.
    pub async fn apply(
        &self,
        working_dir: &Path,
        cancel: &CancellationToken,
        events: Option<LogSender>,
    ) -> IacResult<TerraformResult> {
        info!("Running terraform apply in {:?}", working_dir);
        let args = ["apply", "-auto-approve", "-input=false", "-no-color"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.run_step(Step::Apply, working_dir, args, cancel, events).await
    }

    /// Run terraform destroy without prompting.
    pub async fn destroy(
        &self,
        working_dir: &Path,
        cancel: &CancellationToken,
        events: Option<LogSender>,
    ) -> IacResult<TerraformResult> {
        info!("Running terraform destroy in {:?}", working_dir);
        let args = ["destroy", "-auto-approve", "-input=false", "-no-color"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.run_step(Step::Destroy, working_dir, args, cancel, events).await
    }

    async fn run_step(
        &self,
        step: Step,
        working_dir: &Path,
        args: Vec<String>,
        cancel: &CancellationToken,
        events: Option<LogSender>,
    ) -> IacResult<TerraformResult> {
        let spec = CommandSpec::new(&self.binary)
            .args(args)
            .workdir(working_dir)
            .env("TF_IN_AUTOMATION", "1");

        let run_config = RunConfig::default()
            .timeout(self.timeout_seconds)
            .tail(self.tail_lines)
            .cancel_with(cancel.clone());

        debug!("Executing {}", spec.display());

        let result = self.runner.run(&spec, &run_config, events).await?;

        if !result.success() {
            let exit_code = result.exit_code;
            let tail = result.tail(self.tail_lines);
            return Err(match step {
                Step::Init => IacError::InitFailed { exit_code, tail },
                Step::Apply => IacError::ApplyFailed { exit_code, tail },
                Step::Destroy => IacError::DestroyFailed { exit_code, tail },
            });
        }

        Ok(TerraformResult {
            success: true,
            output: result.combined_output(),
            exit_code: result.exit_code,
        })
    }
}
