//! Provisioning orchestrator.
//!
//! Picks one path per request, in order:
//!
//! 1. **Pipeline**: trigger the CI pipeline and stop at `pipeline_sent`
//! 2. **Local Terraform**: when the binary answers, a state bucket is set
//!    and the host is not Cloud Run
//! 3. **Demo**: realistic progress lines without any cloud call
//!
//! A failed trigger is logged and falls through to the next path.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use eco_iac::{
    architecture_json, DeploymentId, RemoteState, Resource, ResourceValidator, Synthesizer,
    TerraformRunner,
};
use eco_runner::{sanitize_line, LogLine, LogReceiver, ProcessRunner};

use crate::audit::{
    resources_summary, sync_statuses, AuditAction, AuditLog, AuditStatus, NewAuditEntry,
};
use crate::config::DeployConfig;
use crate::demo::demo_steps;
use crate::error::{DeployError, DeployResult};
use crate::local::LocalProvisioner;
use crate::pipeline::{
    GitLabPipelines, PipelineAction, PipelineBackend, PipelineResult, PipelineStatus,
};

/// Lines kept in each deployment's console buffer.
pub const LOG_BUFFER_LINES: usize = 100;

/// Deployments tracked before finished ones are evicted.
pub const MAX_TRACKED_DEPLOYMENTS: usize = 64;

/// State of one deployment id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStatus {
    Idle,
    Queued,
    PipelineSent,
    Running,
    Success,
    Error,
}

impl DeployStatus {
    /// No further transition happens without a new request.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            DeployStatus::PipelineSent | DeployStatus::Success | DeployStatus::Error
        )
    }
}

impl fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeployStatus::Idle => "idle",
            DeployStatus::Queued => "queued",
            DeployStatus::PipelineSent => "pipeline_sent",
            DeployStatus::Running => "running",
            DeployStatus::Success => "success",
            DeployStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Which path carried out a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployPath {
    Pipeline,
    LocalTerraform,
    Demo,
}

/// Event streamed to observers of the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeployEvent {
    Status {
        deployment_id: String,
        status: DeployStatus,
    },
    Log {
        deployment_id: String,
        line: LogLine,
    },
}

pub type EventSender = mpsc::UnboundedSender<DeployEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<DeployEvent>;

/// Status and console of one deployment id.
#[derive(Debug)]
struct Tracked {
    status: DeployStatus,
    logs: VecDeque<String>,
    /// Last update, for eviction order
    seq: u64,
}

/// Deployments seen by one orchestrator.
#[derive(Debug, Default)]
struct Registry {
    entries: HashMap<String, Tracked>,
    seq: u64,
}

impl Registry {
    fn entry(&mut self, deployment_id: &str) -> &mut Tracked {
        self.seq += 1;
        let seq = self.seq;
        if !self.entries.contains_key(deployment_id) {
            self.evict_finished();
        }
        let tracked = self
            .entries
            .entry(deployment_id.to_string())
            .or_insert_with(|| Tracked {
                status: DeployStatus::Idle,
                logs: VecDeque::with_capacity(LOG_BUFFER_LINES),
                seq,
            });
        tracked.seq = seq;
        tracked
    }

    /// Drop the least recently updated finished deployments to make room.
    fn evict_finished(&mut self) {
        while self.entries.len() >= MAX_TRACKED_DEPLOYMENTS {
            let oldest = self
                .entries
                .iter()
                .filter(|(_, t)| t.status.is_finished())
                .min_by_key(|(_, t)| t.seq)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    debug!("Evicting finished deployment {}", id);
                    self.entries.remove(&id);
                }
                None => break,
            }
        }
    }
}

/// A deploy or destroy request.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub deployment_id: DeploymentId,
    pub action: PipelineAction,
    pub resources: Vec<Resource>,
    pub user: String,
    /// Monthly estimate checked against `budget_limit` before applying
    pub estimated_cost: Option<f64>,
    pub budget_limit: Option<f64>,
}

impl DeployRequest {
    pub fn apply(deployment_id: DeploymentId, resources: Vec<Resource>) -> Self {
        Self::new(deployment_id, PipelineAction::Apply, resources)
    }

    pub fn destroy(deployment_id: DeploymentId, resources: Vec<Resource>) -> Self {
        Self::new(deployment_id, PipelineAction::Destroy, resources)
    }

    fn new(deployment_id: DeploymentId, action: PipelineAction, resources: Vec<Resource>) -> Self {
        Self {
            deployment_id,
            action,
            resources,
            user: "anonymous".to_string(),
            estimated_cost: None,
            budget_limit: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_estimate(mut self, cost: f64, budget_limit: f64) -> Self {
        self.estimated_cost = Some(cost);
        self.budget_limit = Some(budget_limit);
        self
    }
}

/// What happened to a request that did not fail.
#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    pub deployment_id: String,
    pub action: PipelineAction,
    pub path: DeployPath,
    pub status: DeployStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<PipelineResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_id: Option<u64>,
}

/// Drives deploy and destroy requests through the available path.
pub struct Orchestrator {
    config: DeployConfig,
    synthesizer: Synthesizer,
    terraform: TerraformRunner,
    pipelines: Option<Arc<dyn PipelineBackend>>,
    audit: Arc<dyn AuditLog>,
    events: Option<EventSender>,
    cancel: CancellationToken,
    deployments: Mutex<Registry>,
}

impl Orchestrator {
    /// Build an orchestrator; the GitLab backend is wired when configured.
    pub fn new(
        config: DeployConfig,
        runner: Arc<dyn ProcessRunner>,
        audit: Arc<dyn AuditLog>,
    ) -> DeployResult<Self> {
        let synthesizer = Synthesizer::new(&config.project_id, &config.region)?;
        let terraform = TerraformRunner::new(runner)
            .with_binary(&config.terraform_bin)
            .with_timeout(config.terraform_timeout);

        let pipelines: Option<Arc<dyn PipelineBackend>> = if config.pipeline_configured() {
            Some(Arc::new(GitLabPipelines::from_config(&config)?))
        } else {
            None
        };

        Ok(Self {
            config,
            synthesizer,
            terraform,
            pipelines,
            audit,
            events: None,
            cancel: CancellationToken::new(),
            deployments: Mutex::new(Registry::default()),
        })
    }

    /// Replace the pipeline backend.
    pub fn with_pipeline_backend(mut self, backend: Arc<dyn PipelineBackend>) -> Self {
        self.pipelines = Some(backend);
        self
    }

    pub fn without_pipeline_backend(mut self) -> Self {
        self.pipelines = None;
        self
    }

    /// Stream status changes and log lines to `events`.
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Cancelling `token` stops a running local or demo path.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn status(&self, deployment_id: &DeploymentId) -> DeployStatus {
        self.deployments
            .lock()
            .entries
            .get(deployment_id.as_str())
            .map_or(DeployStatus::Idle, |t| t.status)
    }

    /// Console lines of the latest request for `deployment_id`, oldest first.
    pub fn logs(&self, deployment_id: &DeploymentId) -> Vec<String> {
        self.deployments
            .lock()
            .entries
            .get(deployment_id.as_str())
            .map(|t| t.logs.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Stop tracking a deployment; its status reads as idle afterwards.
    pub fn forget(&self, deployment_id: &DeploymentId) {
        self.deployments.lock().entries.remove(deployment_id.as_str());
    }

    /// Number of deployments currently tracked.
    pub fn tracked(&self) -> usize {
        self.deployments.lock().entries.len()
    }

    /// Status of a pipeline started earlier.
    pub async fn pipeline_status(&self, pipeline_id: u64) -> DeployResult<Option<PipelineStatus>> {
        let backend = self
            .pipelines
            .as_ref()
            .ok_or_else(|| DeployError::NotConfigured("pipeline backend".to_string()))?;
        backend.status(pipeline_id).await
    }

    /// Refresh audit entries still waiting on a pipeline.
    pub async fn sync_audit(&self, limit: usize) -> DeployResult<usize> {
        match &self.pipelines {
            Some(backend) => {
                sync_statuses(self.audit.as_ref(), backend.as_ref(), limit).await
            }
            None => Ok(0),
        }
    }

    /// Deploy a cart.
    pub async fn deploy(
        &self,
        deployment_id: DeploymentId,
        resources: Vec<Resource>,
    ) -> DeployResult<DeployOutcome> {
        self.run(DeployRequest::apply(deployment_id, resources)).await
    }

    /// Destroy everything recorded for `deployment_id`.
    pub async fn destroy(
        &self,
        deployment_id: DeploymentId,
        resources: Vec<Resource>,
    ) -> DeployResult<DeployOutcome> {
        self.run(DeployRequest::destroy(deployment_id, resources)).await
    }

    /// Carry out a request on the first available path.
    pub async fn run(&self, request: DeployRequest) -> DeployResult<DeployOutcome> {
        let resources = request
            .resources
            .iter()
            .map(ResourceValidator::revalidate)
            .collect::<Result<Vec<_>, _>>()?;

        if request.action == PipelineAction::Apply {
            if resources.is_empty() {
                return Err(DeployError::EmptyCart);
            }
            if let (Some(cost), Some(budget)) = (request.estimated_cost, request.budget_limit) {
                if cost > budget {
                    return Err(DeployError::BudgetExceeded { cost, budget });
                }
            }
        }

        let id = &request.deployment_id;
        let banner = match request.action {
            PipelineAction::Apply => "DEPLOY",
            PipelineAction::Destroy => "DESTROY",
        };
        self.deployments.lock().entry(id.as_str()).logs.clear();
        self.set_status(id, DeployStatus::Queued);
        self.log(id, format!("--- {}: {} ---", banner, id));

        let audit_id = self.open_audit(&request, &resources).await;

        match self.dispatch(&request, &resources, audit_id).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => Err(self.fail(&request, audit_id, e).await),
        }
    }

    /// Record a failure of a queued request and hand the error back.
    async fn fail(
        &self,
        request: &DeployRequest,
        audit_id: Option<u64>,
        err: DeployError,
    ) -> DeployError {
        let id = &request.deployment_id;
        error!("{} of {} failed: {}", request.action, id, err);
        self.log(id, format!("ERROR: {}", err));
        self.set_status(id, DeployStatus::Error);
        let audit_status = match err {
            DeployError::Cancelled => AuditStatus::Cancelled,
            _ => AuditStatus::Error,
        };
        self.close_audit(audit_id, audit_status, None).await;
        err
    }

    async fn dispatch(
        &self,
        request: &DeployRequest,
        resources: &[Resource],
        audit_id: Option<u64>,
    ) -> DeployResult<DeployOutcome> {
        let id = &request.deployment_id;

        if let Some(backend) = &self.pipelines {
            let json = architecture_json(resources)?;
            self.log(id, "Sending to the CI pipeline...");

            let result = backend.trigger(&json, id, request.action).await;
            if result.success {
                let url = result.pipeline_url.clone().unwrap_or_default();
                self.log(
                    id,
                    format!("Pipeline triggered (ID: {})", result.pipeline_id.unwrap_or_default()),
                );
                self.log(id, url.clone());
                self.set_status(id, DeployStatus::PipelineSent);
                self.close_audit(audit_id, AuditStatus::PipelineSent, Some(url)).await;
                return Ok(self.outcome(
                    request,
                    DeployPath::Pipeline,
                    DeployStatus::PipelineSent,
                    Some(result),
                    audit_id,
                ));
            }

            let reason = DeployError::RemoteTrigger(result.error.unwrap_or_default());
            warn!("{}, falling back", reason);
            self.log(id, format!("{}", reason));
        }

        if let Some(remote_state) = self.local_state(id).await {
            self.log(id, "Running Terraform locally");
            return self
                .run_local(request, resources, &remote_state, audit_id)
                .await;
        }

        self.log(id, "Demo mode: simulating the run");
        self.run_demo(request, resources, audit_id).await
    }

    /// Remote state for the local path, or `None` when it is not usable here.
    async fn local_state(&self, deployment_id: &DeploymentId) -> Option<RemoteState> {
        if self.config.cloud_run {
            info!("Cloud Run detected, local Terraform disabled");
            return None;
        }
        let Some(bucket) = &self.config.state_bucket else {
            info!("No Terraform state bucket configured, local Terraform disabled");
            return None;
        };
        if !self.terraform.is_available().await {
            info!("{} is not available on this host", self.terraform.binary());
            return None;
        }
        Some(RemoteState::new(bucket.clone(), deployment_id.clone()))
    }

    async fn run_local(
        &self,
        request: &DeployRequest,
        resources: &[Resource],
        remote_state: &RemoteState,
        audit_id: Option<u64>,
    ) -> DeployResult<DeployOutcome> {
        let id = &request.deployment_id;
        self.set_status(id, DeployStatus::Running);
        self.close_audit(audit_id, AuditStatus::Running, None).await;

        let (tx, rx) = mpsc::unbounded_channel();
        let provisioner = LocalProvisioner::new(&self.synthesizer, &self.terraform);
        let (result, ()) = tokio::join!(
            provisioner.run(resources, remote_state, request.action, &self.cancel, tx),
            self.forward_logs(id, rx)
        );

        result?;
        self.log(id, "SUCCESS");
        self.set_status(id, DeployStatus::Success);
        self.close_audit(audit_id, AuditStatus::Success, None).await;
        Ok(self.outcome(
            request,
            DeployPath::LocalTerraform,
            DeployStatus::Success,
            None,
            audit_id,
        ))
    }

    async fn run_demo(
        &self,
        request: &DeployRequest,
        resources: &[Resource],
        audit_id: Option<u64>,
    ) -> DeployResult<DeployOutcome> {
        let id = &request.deployment_id;
        self.set_status(id, DeployStatus::Running);

        let delay = Duration::from_millis(self.config.demo_delay_ms);
        let steps = demo_steps(resources, id, request.action, request.estimated_cost);

        for step in steps {
            if !delay.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(DeployError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            self.log(id, step);
        }

        self.log(id, "SUCCESS (demo mode)");
        self.set_status(id, DeployStatus::Success);
        self.close_audit(audit_id, AuditStatus::Success, None).await;
        Ok(self.outcome(request, DeployPath::Demo, DeployStatus::Success, None, audit_id))
    }

    async fn forward_logs(&self, deployment_id: &DeploymentId, mut rx: LogReceiver) {
        while let Some(line) = rx.recv().await {
            self.record(deployment_id, line);
        }
    }

    fn log(&self, deployment_id: &DeploymentId, message: impl Into<String>) {
        self.record(deployment_id, LogLine::system(message));
    }

    fn record(&self, deployment_id: &DeploymentId, mut line: LogLine) {
        line.message = sanitize_line(&line.message);

        {
            let mut deployments = self.deployments.lock();
            let logs = &mut deployments.entry(deployment_id.as_str()).logs;
            logs.push_back(line.message.clone());
            while logs.len() > LOG_BUFFER_LINES {
                logs.pop_front();
            }
        }

        if let Some(events) = &self.events {
            let _ = events.send(DeployEvent::Log {
                deployment_id: deployment_id.to_string(),
                line,
            });
        }
    }

    fn set_status(&self, deployment_id: &DeploymentId, status: DeployStatus) {
        debug!("Deployment {} -> {}", deployment_id, status);
        self.deployments.lock().entry(deployment_id.as_str()).status = status;

        if let Some(events) = &self.events {
            let _ = events.send(DeployEvent::Status {
                deployment_id: deployment_id.to_string(),
                status,
            });
        }
    }

    async fn open_audit(&self, request: &DeployRequest, resources: &[Resource]) -> Option<u64> {
        let (action, total_cost) = match request.action {
            PipelineAction::Apply => (AuditAction::Deploy, request.estimated_cost.unwrap_or(0.0)),
            PipelineAction::Destroy => (AuditAction::Destroy, 0.0),
        };
        let entry = NewAuditEntry {
            user: request.user.clone(),
            action,
            deployment_id: request.deployment_id.to_string(),
            resources_summary: resources_summary(resources),
            total_cost,
        };
        match self.audit.create(entry).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Could not open audit entry for {}: {}", request.deployment_id, e);
                None
            }
        }
    }

    async fn close_audit(
        &self,
        audit_id: Option<u64>,
        status: AuditStatus,
        pipeline_url: Option<String>,
    ) {
        let Some(audit_id) = audit_id else {
            return;
        };
        if let Err(e) = self.audit.update_status(audit_id, status, pipeline_url).await {
            warn!("Could not update audit entry #{} to {}: {}", audit_id, status, e);
        }
    }

    fn outcome(
        &self,
        request: &DeployRequest,
        path: DeployPath,
        status: DeployStatus,
        pipeline: Option<PipelineResult>,
        audit_id: Option<u64>,
    ) -> DeployOutcome {
        info!(
            "{} of {} finished via {:?} ({})",
            request.action, request.deployment_id, path, status
        );
        DeployOutcome {
            deployment_id: request.deployment_id.to_string(),
            action: request.action,
            path,
            status,
            pipeline,
            audit_id,
        }
    }
}
