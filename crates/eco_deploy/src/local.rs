//! Local Terraform provisioning path.

use tokio_util::sync::CancellationToken;
use tracing::info;

use eco_iac::{RemoteState, Resource, Synthesizer, TerraformRunner};
use eco_runner::{LogLine, LogSender};

use crate::error::DeployResult;
use crate::pipeline::PipelineAction;

/// Runs Terraform on this host against per-deployment remote state.
pub struct LocalProvisioner<'a> {
    synthesizer: &'a Synthesizer,
    terraform: &'a TerraformRunner,
}

impl<'a> LocalProvisioner<'a> {
    pub fn new(synthesizer: &'a Synthesizer, terraform: &'a TerraformRunner) -> Self {
        Self {
            synthesizer,
            terraform,
        }
    }

    /// Apply or destroy `resources`, streaming every output line to `events`.
    ///
    /// Destroy synthesizes an empty cart so only the remote state decides
    /// what gets removed; destroying an already empty deployment succeeds.
    pub async fn run(
        &self,
        resources: &[Resource],
        remote_state: &RemoteState,
        action: PipelineAction,
        cancel: &CancellationToken,
        events: LogSender,
    ) -> DeployResult<()> {
        let cart: &[Resource] = match action {
            PipelineAction::Apply => resources,
            PipelineAction::Destroy => &[],
        };

        let artifact = self
            .synthesizer
            .synthesize(cart, &remote_state.deployment_id, true)?;
        info!(
            "Local {} of {} in {:?}",
            action,
            remote_state.deployment_id,
            artifact.path()
        );

        let _ = events.send(LogLine::system(format!(
            "terraform init (state: gs://{}/{})",
            remote_state.bucket,
            remote_state.prefix()
        )));
        self.terraform
            .init(artifact.path(), Some(remote_state), cancel, Some(events.clone()))
            .await?;

        match action {
            PipelineAction::Apply => {
                let _ = events.send(LogLine::system("terraform apply"));
                self.terraform
                    .apply(artifact.path(), cancel, Some(events))
                    .await?;
            }
            PipelineAction::Destroy => {
                let _ = events.send(LogLine::system("terraform destroy"));
                self.terraform
                    .destroy(artifact.path(), cancel, Some(events))
                    .await?;
            }
        }

        Ok(())
    }
}
