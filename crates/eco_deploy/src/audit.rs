//! Audit trail of deploy and destroy requests.
//!
//! The orchestrator receives an [`AuditLog`] handle; failures to write the
//! trail are logged and never abort a deployment.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use eco_iac::Resource;

use crate::error::{DeployError, DeployResult};
use crate::pipeline::{extract_pipeline_id, PipelineBackend, PipelineStatus};

/// Lifecycle status of an audited request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Pending,
    PipelineSent,
    Running,
    Success,
    Failed,
    Cancelled,
    Error,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Pending => "PENDING",
            AuditStatus::PipelineSent => "PIPELINE_SENT",
            AuditStatus::Running => "RUNNING",
            AuditStatus::Success => "SUCCESS",
            AuditStatus::Failed => "FAILED",
            AuditStatus::Cancelled => "CANCELLED",
            AuditStatus::Error => "ERROR",
        }
    }

    /// Still waiting on a remote pipeline.
    pub fn awaits_pipeline(&self) -> bool {
        matches!(self, AuditStatus::Pending | AuditStatus::PipelineSent)
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PipelineStatus> for AuditStatus {
    fn from(status: PipelineStatus) -> Self {
        match status {
            PipelineStatus::Running => AuditStatus::Running,
            PipelineStatus::Success => AuditStatus::Success,
            PipelineStatus::Failed => AuditStatus::Failed,
            PipelineStatus::Cancelled => AuditStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Deploy,
    Destroy,
}

/// One audited request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: u64,
    pub user: String,
    pub action: AuditAction,
    pub deployment_id: String,
    pub resources_summary: String,
    pub total_cost: f64,
    pub status: AuditStatus,
    pub pipeline_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when opening an entry.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user: String,
    pub action: AuditAction,
    pub deployment_id: String,
    pub resources_summary: String,
    pub total_cost: f64,
}

/// Storage for audit entries.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Open an entry in `PENDING` and return its id.
    async fn create(&self, entry: NewAuditEntry) -> DeployResult<u64>;

    async fn update_status(
        &self,
        id: u64,
        status: AuditStatus,
        pipeline_url: Option<String>,
    ) -> DeployResult<()>;

    /// Newest entries first.
    async fn recent(&self, limit: usize) -> DeployResult<Vec<AuditEntry>>;
}

/// In-process audit log.
#[derive(Default)]
pub struct MemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
    next_id: AtomicU64,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u64) -> Option<AuditEntry> {
        self.entries.read().iter().find(|e| e.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn create(&self, entry: NewAuditEntry) -> DeployResult<u64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.entries.write().push(AuditEntry {
            id,
            user: entry.user,
            action: entry.action,
            deployment_id: entry.deployment_id,
            resources_summary: entry.resources_summary,
            total_cost: entry.total_cost,
            status: AuditStatus::Pending,
            pipeline_url: None,
            created_at: Utc::now(),
        });
        debug!("Audit entry #{} created", id);
        Ok(id)
    }

    async fn update_status(
        &self,
        id: u64,
        status: AuditStatus,
        pipeline_url: Option<String>,
    ) -> DeployResult<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(DeployError::AuditEntryNotFound(id))?;
        entry.status = status;
        if let Some(url) = pipeline_url.filter(|u| !u.is_empty()) {
            entry.pipeline_url = Some(url);
        }
        debug!("Audit entry #{} -> {}", id, status);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> DeployResult<Vec<AuditEntry>> {
        let mut entries = self.entries.read().clone();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        entries.truncate(limit);
        Ok(entries)
    }
}

/// Short human-readable description of a cart.
pub fn resources_summary(resources: &[Resource]) -> String {
    if resources.is_empty() {
        return "(empty)".to_string();
    }
    resources
        .iter()
        .map(Resource::label)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Refresh entries still waiting on a pipeline. Returns how many changed.
///
/// Unreadable URLs and status lookup failures leave the entry untouched.
pub async fn sync_statuses(
    audit: &dyn AuditLog,
    backend: &dyn PipelineBackend,
    limit: usize,
) -> DeployResult<usize> {
    let mut changed = 0;

    for entry in audit.recent(limit).await? {
        if !entry.status.awaits_pipeline() {
            continue;
        }
        let Some(pipeline_id) = entry.pipeline_url.as_deref().and_then(extract_pipeline_id) else {
            continue;
        };

        let status = match backend.status(pipeline_id).await {
            Ok(Some(status)) => AuditStatus::from(status),
            Ok(None) => continue,
            Err(e) => {
                warn!("Status lookup for pipeline {} failed: {}", pipeline_id, e);
                continue;
            }
        };

        if status != entry.status {
            audit.update_status(entry.id, status, None).await?;
            changed += 1;
        }
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::MockPipelineBackend;
    use eco_iac::{ComputeSpec, StorageSpec};

    fn new_entry(deployment_id: &str) -> NewAuditEntry {
        NewAuditEntry {
            user: "alice@example.com".to_string(),
            action: AuditAction::Deploy,
            deployment_id: deployment_id.to_string(),
            resources_summary: "e2-micro".to_string(),
            total_cost: 7.92,
        }
    }

    #[tokio::test]
    async fn test_create_and_update() {
        let log = MemoryAuditLog::new();
        let id = log.create(new_entry("abc-123")).await.unwrap();

        assert_eq!(log.get(id).unwrap().status, AuditStatus::Pending);

        log.update_status(
            id,
            AuditStatus::PipelineSent,
            Some("https://gitlab.com/g/p/-/pipelines/77".to_string()),
        )
        .await
        .unwrap();

        let entry = log.get(id).unwrap();
        assert_eq!(entry.status, AuditStatus::PipelineSent);
        assert_eq!(entry.pipeline_url.as_deref(), Some("https://gitlab.com/g/p/-/pipelines/77"));

        assert!(matches!(
            log.update_status(999, AuditStatus::Success, None).await,
            Err(DeployError::AuditEntryNotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let log = MemoryAuditLog::new();
        for id in ["aa-1", "aa-2", "aa-3"] {
            log.create(new_entry(id)).await.unwrap();
        }
        let recent = log.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].deployment_id, "aa-3");
        assert_eq!(recent[1].deployment_id, "aa-2");
    }

    #[tokio::test]
    async fn test_sync_statuses_updates_pending_entries() {
        let log = MemoryAuditLog::new();
        let sent = log.create(new_entry("aa-1")).await.unwrap();
        log.update_status(sent, AuditStatus::PipelineSent, Some("https://gitlab.com/g/p/-/pipelines/10".into()))
            .await
            .unwrap();

        let unchanged = log.create(new_entry("aa-2")).await.unwrap();
        log.update_status(unchanged, AuditStatus::PipelineSent, Some("https://gitlab.com/g/p/-/pipelines/11".into()))
            .await
            .unwrap();

        let done = log.create(new_entry("aa-3")).await.unwrap();
        log.update_status(done, AuditStatus::Success, Some("https://gitlab.com/g/p/-/pipelines/12".into()))
            .await
            .unwrap();

        // No URL: skipped without a lookup
        log.create(new_entry("aa-4")).await.unwrap();

        let mut backend = MockPipelineBackend::new();
        backend
            .expect_status()
            .withf(|id| *id == 10)
            .returning(|_| Ok(Some(PipelineStatus::Success)));
        backend
            .expect_status()
            .withf(|id| *id == 11)
            .returning(|_| Ok(None));

        let changed = sync_statuses(&log, &backend, 50).await.unwrap();

        assert_eq!(changed, 1);
        assert_eq!(log.get(sent).unwrap().status, AuditStatus::Success);
        assert_eq!(log.get(unchanged).unwrap().status, AuditStatus::PipelineSent);
    }

    #[tokio::test]
    async fn test_sync_statuses_tolerates_lookup_errors() {
        let log = MemoryAuditLog::new();
        let id = log.create(new_entry("aa-1")).await.unwrap();
        log.update_status(id, AuditStatus::PipelineSent, Some("https://gitlab.com/g/p/-/pipelines/5/".into()))
            .await
            .unwrap();

        let mut backend = MockPipelineBackend::new();
        backend
            .expect_status()
            .times(1)
            .returning(|_| Err(DeployError::RemoteTrigger("GitLab API 503".into())));

        assert_eq!(sync_statuses(&log, &backend, 50).await.unwrap(), 0);
        assert_eq!(log.get(id).unwrap().status, AuditStatus::PipelineSent);
    }

    #[test]
    fn test_resources_summary() {
        let cart = vec![
            Resource::Compute(ComputeSpec::new("e2-micro", 20)).named("Web Server"),
            Resource::Storage(StorageSpec::new("STANDARD")),
        ];
        let summary = resources_summary(&cart);
        assert!(summary.starts_with("Web Server, "));
        assert_eq!(resources_summary(&[]), "(empty)");
    }
}
