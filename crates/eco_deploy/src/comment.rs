//! Merge request cost comment.
//!
//! Posts the Markdown cost report as a note on the merge request that
//! triggered the CI job. The server URL comes from the CI environment, so
//! it is checked against a host allow-list before any request is made.

use std::time::Duration;

use reqwest::Url;
use serde_json::json;
use tracing::{error, info};

use crate::config::non_empty;
use crate::error::{DeployError, DeployResult};

pub const DEFAULT_GITLAB_HOST: &str = "gitlab.com";
pub const COMMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// CI variables needed to post a comment.
#[derive(Debug, Clone, Default)]
pub struct CommentConfig {
    pub server_url: Option<String>,
    pub project_id: Option<String>,
    /// Unset outside merge request pipelines
    pub merge_request_iid: Option<String>,
    pub token: Option<String>,
    /// Self-hosted GitLab host accepted besides gitlab.com
    pub extra_host: Option<String>,
}

impl CommentConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            server_url: non_empty(lookup("CI_SERVER_URL")),
            project_id: non_empty(lookup("CI_PROJECT_ID")),
            merge_request_iid: non_empty(lookup("CI_MERGE_REQUEST_IID")),
            token: non_empty(lookup("GITLAB_TOKEN")),
            extra_host: non_empty(lookup("ECOARCH_GITLAB_HOST")).map(|h| h.to_lowercase()),
        }
    }

    pub fn allowed_hosts(&self) -> Vec<String> {
        let mut hosts = vec![DEFAULT_GITLAB_HOST.to_string()];
        hosts.extend(self.extra_host.clone());
        hosts
    }
}

/// Parse `url` and accept it only for http(s) on an allowed host.
pub fn validate_server_url(url: &str, allowed_hosts: &[String]) -> DeployResult<Url> {
    let parsed = Url::parse(url)
        .map_err(|e| DeployError::CommentRejected(format!("invalid server URL '{}': {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DeployError::CommentRejected(format!(
            "scheme '{}' is not allowed",
            parsed.scheme()
        )));
    }

    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    if !allowed_hosts.iter().any(|allowed| *allowed == host) {
        return Err(DeployError::CommentRejected(format!(
            "host '{}' is not allowed",
            host
        )));
    }

    Ok(parsed)
}

/// Notes endpoint of a merge request.
pub fn notes_url(server: &Url, project_id: &str, merge_request_iid: &str) -> String {
    format!(
        "{}/api/v4/projects/{}/merge_requests/{}/notes",
        server.as_str().trim_end_matches('/'),
        project_id,
        merge_request_iid
    )
}

/// Post `markdown` on the merge request. Returns `false` outside a merge request.
pub async fn post_merge_request_comment(
    config: &CommentConfig,
    markdown: &str,
) -> DeployResult<bool> {
    let Some(iid) = &config.merge_request_iid else {
        info!("No merge request, skipping cost comment");
        return Ok(false);
    };

    let (Some(server_url), Some(project_id), Some(token)) =
        (&config.server_url, &config.project_id, &config.token)
    else {
        return Err(DeployError::NotConfigured(
            "CI_SERVER_URL, CI_PROJECT_ID and GITLAB_TOKEN are required".to_string(),
        ));
    };

    let server = validate_server_url(server_url, &config.allowed_hosts()).map_err(|e| {
        error!("Blocked cost comment: {}", e);
        e
    })?;

    let client = reqwest::Client::builder().timeout(COMMENT_TIMEOUT).build()?;
    let response = client
        .post(notes_url(&server, project_id, iid))
        .header("PRIVATE-TOKEN", token)
        .json(&json!({ "body": markdown }))
        .send()
        .await?;

    let status = response.status();
    if status.as_u16() != 201 {
        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(200)
            .collect();
        return Err(DeployError::CommentRejected(format!(
            "GitLab API {}: {}",
            status.as_u16(),
            body
        )));
    }

    info!("Cost comment posted on merge request !{}", iid);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts() -> Vec<String> {
        vec!["gitlab.com".to_string(), "gitlab.acme.io".to_string()]
    }

    #[test]
    fn test_allowed_urls() {
        assert!(validate_server_url("https://gitlab.com", &hosts()).is_ok());
        assert!(validate_server_url("http://GitLab.Acme.io/", &hosts()).is_ok());
    }

    #[test]
    fn test_rejected_urls() {
        for url in [
            "file:///etc/passwd",
            "ftp://gitlab.com",
            "http://169.254.169.254/latest/meta-data",
            "https://gitlab.com.evil.net",
            "not a url",
        ] {
            assert!(
                matches!(validate_server_url(url, &hosts()), Err(DeployError::CommentRejected(_))),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn test_notes_url() {
        let server = validate_server_url("https://gitlab.com/", &hosts()).unwrap();
        assert_eq!(
            notes_url(&server, "42", "7"),
            "https://gitlab.com/api/v4/projects/42/merge_requests/7/notes"
        );
    }

    #[test]
    fn test_config_from_lookup() {
        let config = CommentConfig::from_lookup(|key| match key {
            "ECOARCH_GITLAB_HOST" => Some(" Git.Internal ".to_string()),
            "CI_MERGE_REQUEST_IID" => Some("".to_string()),
            _ => None,
        });
        assert_eq!(config.allowed_hosts(), vec!["gitlab.com", "git.internal"]);
        assert!(config.merge_request_iid.is_none());
    }

    #[tokio::test]
    async fn test_no_merge_request_is_a_no_op() {
        let posted = post_merge_request_comment(&CommentConfig::default(), "## report")
            .await
            .unwrap();
        assert!(!posted);
    }

    #[tokio::test]
    async fn test_missing_variables() {
        let config = CommentConfig {
            merge_request_iid: Some("3".to_string()),
            ..CommentConfig::default()
        };
        assert!(matches!(
            post_merge_request_comment(&config, "x").await,
            Err(DeployError::NotConfigured(_))
        ));
    }
}
