//! CI pipeline backend.
//!
//! The production backend triggers a GitLab pipeline through the trigger API
//! and polls its status through the REST API. Response handling lives in
//! free functions so it can be checked without a server.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use eco_iac::DeploymentId;

use crate::config::DeployConfig;
use crate::error::{DeployError, DeployResult};

/// Hard limit for one trigger call.
pub const TRIGGER_TIMEOUT: Duration = Duration::from_secs(15);

const ERROR_BODY_LIMIT: usize = 200;

/// What the pipeline should do with the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineAction {
    Apply,
    Destroy,
}

impl PipelineAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineAction::Apply => "apply",
            PipelineAction::Destroy => "destroy",
        }
    }
}

impl fmt::Display for PipelineAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a trigger call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub success: bool,
    pub pipeline_id: Option<u64>,
    pub pipeline_url: Option<String>,
    pub error: Option<String>,
}

impl PipelineResult {
    pub fn sent(pipeline_id: u64, pipeline_url: impl Into<String>) -> Self {
        Self {
            success: true,
            pipeline_id: Some(pipeline_id),
            pipeline_url: Some(pipeline_url.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            pipeline_id: None,
            pipeline_url: None,
            error: Some(error.into()),
        }
    }
}

/// Pipeline state as tracked by EcoArch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PipelineStatus {
    Running,
    Success,
    Failed,
    Cancelled,
}

impl PipelineStatus {
    /// Map a GitLab pipeline status. Unknown values yield `None`.
    pub fn from_gitlab(status: &str) -> Option<Self> {
        match status {
            "created" | "pending" | "running" | "waiting_for_resource" | "preparing"
            | "scheduled" | "manual" => Some(PipelineStatus::Running),
            "success" => Some(PipelineStatus::Success),
            "failed" => Some(PipelineStatus::Failed),
            "canceled" => Some(PipelineStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Running => "RUNNING",
            PipelineStatus::Success => "SUCCESS",
            PipelineStatus::Failed => "FAILED",
            PipelineStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote pipeline that provisions a cart.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PipelineBackend: Send + Sync {
    /// Start a pipeline. Failures are reported in the result, never retried.
    async fn trigger(
        &self,
        architecture_json: &str,
        deployment_id: &DeploymentId,
        action: PipelineAction,
    ) -> PipelineResult;

    /// Current status of a pipeline; `None` when the status is not recognized.
    async fn status(&self, pipeline_id: u64) -> DeployResult<Option<PipelineStatus>>;
}

/// GitLab trigger and pipelines API client.
pub struct GitLabPipelines {
    client: reqwest::Client,
    api_url: String,
    project_id: String,
    trigger_token: String,
    git_ref: String,
    project_url: String,
    api_token: Option<String>,
}

impl GitLabPipelines {
    /// Build a client from the deploy settings.
    pub fn from_config(config: &DeployConfig) -> DeployResult<Self> {
        let trigger_token = config
            .trigger_token
            .clone()
            .ok_or_else(|| DeployError::NotConfigured("GITLAB_TRIGGER_TOKEN".to_string()))?;
        let project_id = config
            .gitlab_project_id
            .clone()
            .ok_or_else(|| DeployError::NotConfigured("GITLAB_PROJECT_ID".to_string()))?;

        let client = reqwest::Client::builder().timeout(TRIGGER_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            project_id,
            trigger_token,
            git_ref: config.git_ref.clone(),
            project_url: config.project_web_url(),
            api_token: config.api_token.clone(),
        })
    }

    pub fn trigger_url(&self) -> String {
        format!("{}/projects/{}/trigger/pipeline", self.api_url, self.project_id)
    }

    pub fn pipeline_url(&self, pipeline_id: u64) -> String {
        format!(
            "{}/projects/{}/pipelines/{}",
            self.api_url, self.project_id, pipeline_id
        )
    }

    /// Form fields sent to the trigger endpoint.
    pub fn trigger_form(
        &self,
        architecture_json: &str,
        deployment_id: &DeploymentId,
        action: PipelineAction,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("token", self.trigger_token.clone()),
            ("ref", self.git_ref.clone()),
            ("variables[TF_VAR_architecture_json]", architecture_json.to_string()),
            ("variables[ECOARCH_DEPLOYMENT_ID]", deployment_id.to_string()),
            ("variables[ECOARCH_ACTION]", action.as_str().to_string()),
        ]
    }
}

#[async_trait]
impl PipelineBackend for GitLabPipelines {
    async fn trigger(
        &self,
        architecture_json: &str,
        deployment_id: &DeploymentId,
        action: PipelineAction,
    ) -> PipelineResult {
        info!(
            "Triggering pipeline: project={}, ref={}, action={}, deployment={}",
            self.project_id, self.git_ref, action, deployment_id
        );

        let form = self.trigger_form(architecture_json, deployment_id, action);
        let response = match self.client.post(self.trigger_url()).form(&form).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                error!("Pipeline trigger timed out");
                return PipelineResult::failed("Timeout calling the GitLab API");
            }
            Err(e) => {
                error!("Pipeline trigger failed: {}", e);
                return PipelineResult::failed(format!("Cannot reach GitLab: {}", e));
            }
        };

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let result = parse_trigger_response(status, &body, &self.project_url);

        match &result.error {
            None => info!(
                "Pipeline triggered: id={:?}, url={:?}",
                result.pipeline_id, result.pipeline_url
            ),
            Some(err) => error!("Pipeline trigger rejected: {}", err),
        }
        result
    }

    async fn status(&self, pipeline_id: u64) -> DeployResult<Option<PipelineStatus>> {
        let mut request = self.client.get(self.pipeline_url(pipeline_id));
        if let Some(token) = &self.api_token {
            request = request.header("PRIVATE-TOKEN", token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(DeployError::RemoteTrigger(format!(
                "GitLab API {}: {}",
                status.as_u16(),
                truncate(&body, ERROR_BODY_LIMIT)
            )));
        }

        let data: Value = serde_json::from_str(&body)?;
        let raw = data.get("status").and_then(Value::as_str).unwrap_or_default();
        debug!("Pipeline {} reports status '{}'", pipeline_id, raw);
        Ok(PipelineStatus::from_gitlab(raw))
    }
}

/// Interpret a trigger response. Only `201 Created` with an id counts as sent.
pub fn parse_trigger_response(status: u16, body: &str, project_url: &str) -> PipelineResult {
    if status != 201 {
        return PipelineResult::failed(format!(
            "GitLab API {}: {}",
            status,
            truncate(body, ERROR_BODY_LIMIT)
        ));
    }

    let data: Value = match serde_json::from_str(body) {
        Ok(data) => data,
        Err(e) => return PipelineResult::failed(format!("Unreadable GitLab response: {}", e)),
    };

    let Some(pipeline_id) = data.get("id").and_then(Value::as_u64) else {
        return PipelineResult::failed("GitLab response has no pipeline id");
    };

    let pipeline_url = data
        .get("web_url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!("{}/-/pipelines/{}", project_url.trim_end_matches('/'), pipeline_id)
        });

    PipelineResult::sent(pipeline_id, pipeline_url)
}

/// Pipeline id at the end of a `.../pipelines/{id}` URL.
pub fn extract_pipeline_id(url: &str) -> Option<u64> {
    let trimmed = url.trim().trim_end_matches('/');
    let (_, tail) = trimmed.rsplit_once("/pipelines/")?;
    tail.parse::<u64>().ok()
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
