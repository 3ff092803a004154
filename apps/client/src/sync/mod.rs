//! Sync engine for the shared cloud table.
//!
//! Every failure on the network side is caught here and turned into a
//! [`SyncOutcome`] or an offline [`SyncReport`]. Local progress is always
//! committed before any network call, so a failed sync never loses reviews.

pub mod http;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tango_core::legacy::to_cloud;
use tango_core::{merge_states, CloudSyncRecord};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::db::{DbError, KeyValueStore};
use crate::store::LocalStateStore;

pub use http::HttpCloudStore;

/// Sync errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error: {status} - {message}")]
    Backend { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Cloud sync is not configured")]
    NotConfigured,
}

/// Remote table of cloud rows, partitioned by device id.
#[async_trait]
pub trait CloudStore: Send + Sync {
    /// Every row stored under `device_id`.
    async fn pull(&self, device_id: &str) -> Result<HashMap<i64, CloudSyncRecord>, SyncError>;

    /// Upsert `records`, returning the number of rows written.
    async fn push(
        &self,
        device_id: &str,
        records: &HashMap<i64, CloudSyncRecord>,
    ) -> Result<usize, SyncError>;

    async fn push_one(
        &self,
        device_id: &str,
        card_id: i64,
        record: &CloudSyncRecord,
    ) -> Result<(), SyncError>;
}

/// Best-effort indicator for the UI.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Completed { synced_at: String },
    Failed { error: String },
}

/// Success flag plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub message: String,
}

impl SyncOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn failed(error: &SyncError) -> Self {
        Self {
            success: false,
            message: format!("sync failed, continuing offline: {error}"),
        }
    }
}

/// Summary of a full sync pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Remote rows pulled. Zero when the pull failed.
    pub pulled: usize,
    pub merged: usize,
    pub kept_local: usize,
    pub taken_remote: usize,
    pub local_only: usize,
    pub remote_only: usize,
    pub pushed: usize,
    /// True when the pull failed and the merge ran against no remote data.
    pub offline: bool,
    pub push_succeeded: bool,
    pub message: String,
}

struct SyncEngineInner {
    cloud: Box<dyn CloudStore>,
    status: Mutex<SyncStatus>,
}

/// Clone-able handle around a [`CloudStore`]. Clones share status.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<SyncEngineInner>,
}

impl SyncEngine {
    pub fn new(cloud: impl CloudStore + 'static) -> Self {
        Self {
            inner: Arc::new(SyncEngineInner {
                cloud: Box::new(cloud),
                status: Mutex::new(SyncStatus::Idle),
            }),
        }
    }

    pub async fn status(&self) -> SyncStatus {
        self.inner.status.lock().await.clone()
    }

    async fn set_status(&self, status: SyncStatus) {
        *self.inner.status.lock().await = status;
    }

    async fn record_result(&self, outcome: &SyncOutcome) {
        let status = if outcome.success {
            SyncStatus::Completed {
                synced_at: Utc::now().to_rfc3339(),
            }
        } else {
            SyncStatus::Failed {
                error: outcome.message.clone(),
            }
        };
        self.set_status(status).await;
    }

    /// Remote rows for `device_id`, or `None` if the pull failed.
    pub async fn pull(&self, device_id: &str) -> Option<HashMap<i64, CloudSyncRecord>> {
        match self.inner.cloud.pull(device_id).await {
            Ok(records) => {
                tracing::debug!(device_id, count = records.len(), "pulled cloud rows");
                Some(records)
            }
            Err(e) => {
                tracing::warn!(device_id, error = %e, "cloud pull failed, treating as empty");
                None
            }
        }
    }

    pub async fn push(
        &self,
        device_id: &str,
        records: &HashMap<i64, CloudSyncRecord>,
    ) -> SyncOutcome {
        match self.inner.cloud.push(device_id, records).await {
            Ok(count) => SyncOutcome::ok(format!("pushed {count} records")),
            Err(e) => {
                tracing::warn!(device_id, error = %e, "cloud push failed");
                SyncOutcome::failed(&e)
            }
        }
    }

    pub async fn push_one(
        &self,
        device_id: &str,
        card_id: i64,
        record: &CloudSyncRecord,
    ) -> SyncOutcome {
        let outcome = match self.inner.cloud.push_one(device_id, card_id, record).await {
            Ok(()) => SyncOutcome::ok(format!("pushed card {card_id}")),
            Err(e) => {
                tracing::warn!(device_id, card_id, error = %e, "cloud push failed");
                SyncOutcome::failed(&e)
            }
        };
        self.record_result(&outcome).await;
        outcome
    }

    /// Mirror one card in a detached task. No retries.
    ///
    /// `on_complete` only sees the outcome; nothing waits on it for control
    /// flow. The handle is returned so a short-lived process can let the
    /// request finish before exiting.
    pub fn push_one_in_background<F>(
        &self,
        device_id: String,
        card_id: i64,
        record: CloudSyncRecord,
        on_complete: F,
    ) -> JoinHandle<SyncOutcome>
    where
        F: FnOnce(&SyncOutcome) + Send + 'static,
    {
        let engine = self.clone();
        tokio::spawn(async move {
            let outcome = engine.push_one(&device_id, card_id, &record).await;
            on_complete(&outcome);
            outcome
        })
    }

    /// Pull, merge by stability, replace the local store, push everything back.
    ///
    /// Only a local storage failure is returned as an error.
    pub async fn full_sync<K: KeyValueStore>(
        &self,
        device_id: &str,
        store: &LocalStateStore<K>,
    ) -> Result<SyncReport, DbError> {
        self.set_status(SyncStatus::Syncing).await;

        let remote = self.pull(device_id).await;
        let offline = remote.is_none();
        let remote = remote.unwrap_or_default();

        let local = store.get_all();
        let outcome = merge_states(&local, &remote);
        if let Err(e) = store.put_all(&outcome.states) {
            self.set_status(SyncStatus::Failed {
                error: e.to_string(),
            })
            .await;
            return Err(e);
        }

        let records: HashMap<i64, CloudSyncRecord> = outcome
            .states
            .iter()
            .map(|(&id, state)| (id, to_cloud(state)))
            .collect();
        let push = self.push(device_id, &records).await;
        self.record_result(&push).await;

        let report = SyncReport {
            pulled: remote.len(),
            merged: outcome.states.len(),
            kept_local: outcome.kept_local,
            taken_remote: outcome.taken_remote,
            local_only: outcome.local_only,
            remote_only: outcome.remote_only,
            pushed: if push.success { records.len() } else { 0 },
            offline,
            push_succeeded: push.success,
            message: push.message,
        };
        tracing::info!(
            device_id,
            pulled = report.pulled,
            merged = report.merged,
            taken_remote = report.taken_remote,
            pushed = report.pushed,
            offline = report.offline,
            "full sync finished"
        );
        Ok(report)
    }
}
