//! Provisioning configuration.

use serde::{Deserialize, Serialize};

use eco_iac::catalog;

pub const DEFAULT_GITLAB_API_URL: &str = "https://gitlab.com/api/v4";
pub const DEFAULT_GIT_REF: &str = "main";
pub const DEFAULT_TERRAFORM_TIMEOUT: u64 = 300;
pub const DEFAULT_DEMO_DELAY_MS: u64 = 500;

/// Settings for the provisioning orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// GCP project the cart is deployed into
    pub project_id: String,
    pub region: String,

    /// Pipeline trigger token; the pipeline path is skipped without it
    #[serde(skip_serializing)]
    pub trigger_token: Option<String>,
    /// Numeric id of the CI project
    pub gitlab_project_id: Option<String>,
    pub git_ref: String,
    pub api_url: String,
    /// Web URL of the CI project, used to build pipeline links
    pub project_url: Option<String>,
    /// Read token for pipeline status polling
    #[serde(skip_serializing)]
    pub api_token: Option<String>,

    pub terraform_bin: String,
    /// GCS bucket holding per-deployment Terraform state
    pub state_bucket: Option<String>,
    pub terraform_timeout: u64,

    /// Pause between demo progress lines
    pub demo_delay_ms: u64,
    /// Running on Cloud Run, where no local Terraform is allowed
    pub cloud_run: bool,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            project_id: "simulation-project".to_string(),
            region: catalog::DEFAULT_REGION.to_string(),
            trigger_token: None,
            gitlab_project_id: None,
            git_ref: DEFAULT_GIT_REF.to_string(),
            api_url: DEFAULT_GITLAB_API_URL.to_string(),
            project_url: None,
            api_token: None,
            terraform_bin: "terraform".to_string(),
            state_bucket: None,
            terraform_timeout: DEFAULT_TERRAFORM_TIMEOUT,
            demo_delay_ms: DEFAULT_DEMO_DELAY_MS,
            cloud_run: false,
        }
    }
}

impl DeployConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset or unparsable values keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(project) = non_empty(lookup("GCP_PROJECT_ID")) {
            config.project_id = project;
        }
        if let Some(region) = non_empty(lookup("ECOARCH_REGION")) {
            config.region = region;
        }

        config.trigger_token = non_empty(lookup("GITLAB_TRIGGER_TOKEN"));
        config.gitlab_project_id = non_empty(lookup("GITLAB_PROJECT_ID"));
        if let Some(git_ref) = non_empty(lookup("GITLAB_REF")) {
            config.git_ref = git_ref;
        }
        if let Some(api_url) = non_empty(lookup("GITLAB_API_URL")) {
            config.api_url = api_url.trim_end_matches('/').to_string();
        }
        config.project_url =
            non_empty(lookup("GITLAB_PROJECT_URL")).map(|u| u.trim_end_matches('/').to_string());
        config.api_token = non_empty(lookup("GITLAB_API_TOKEN"));

        if let Some(bin) = non_empty(lookup("TERRAFORM_BIN")) {
            config.terraform_bin = bin;
        }
        config.state_bucket = non_empty(lookup("TERRAFORM_STATE_BUCKET"));
        if let Some(value) = parse_u64(lookup("TERRAFORM_TIMEOUT")).filter(|v| *v > 0) {
            config.terraform_timeout = value;
        }
        if let Some(value) = parse_u64(lookup("ECOARCH_DEMO_DELAY_MS")) {
            config.demo_delay_ms = value;
        }
        config.cloud_run = non_empty(lookup("K_SERVICE")).is_some();

        config
    }

    /// Token and project id are both set.
    pub fn pipeline_configured(&self) -> bool {
        self.trigger_token.is_some() && self.gitlab_project_id.is_some()
    }

    /// Web URL of the CI project, derived from the API URL when unset.
    pub fn project_web_url(&self) -> String {
        if let Some(url) = &self.project_url {
            return url.clone();
        }
        let base = self.api_url.trim_end_matches("/api/v4");
        format!(
            "{}/projects/{}",
            base,
            self.gitlab_project_id.as_deref().unwrap_or("unknown")
        )
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_pipeline(
        mut self,
        trigger_token: impl Into<String>,
        gitlab_project_id: impl Into<String>,
    ) -> Self {
        self.trigger_token = Some(trigger_token.into());
        self.gitlab_project_id = Some(gitlab_project_id.into());
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_project_url(mut self, project_url: impl Into<String>) -> Self {
        self.project_url = Some(project_url.into());
        self
    }

    pub fn with_terraform_bin(mut self, bin: impl Into<String>) -> Self {
        self.terraform_bin = bin.into();
        self
    }

    pub fn with_state_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.state_bucket = Some(bucket.into());
        self
    }

    /// Terraform hard timeout, at least one second.
    pub fn with_terraform_timeout(mut self, seconds: u64) -> Self {
        self.terraform_timeout = seconds.max(1);
        self
    }

    pub fn with_demo_delay_ms(mut self, ms: u64) -> Self {
        self.demo_delay_ms = ms;
        self
    }

    pub fn with_cloud_run(mut self, cloud_run: bool) -> Self {
        self.cloud_run = cloud_run;
        self
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_u64(value: Option<String>) -> Option<u64> {
    value.and_then(|v| v.trim().parse::<u64>().ok())
}
