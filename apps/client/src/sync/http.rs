//! [`CloudStore`] over the progress HTTP API.

use super::{CloudStore, SyncError};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tango_core::CloudSyncRecord;

#[derive(Debug, Serialize, Deserialize)]
struct ProgressBody {
    records: HashMap<i64, CloudSyncRecord>,
}

#[derive(Debug, Deserialize)]
struct UpsertResponse {
    upserted: usize,
}

pub struct HttpCloudStore {
    client: Client,
    base_url: Url,
}

impl HttpCloudStore {
    pub fn new(base_url: &str) -> Result<Self, SyncError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| SyncError::Parse(format!("invalid cloud url {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::Parse(format!("invalid cloud url {base_url}")));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    /// Build a store from an optional configured URL.
    pub fn from_config(base_url: Option<&str>) -> Result<Self, SyncError> {
        match base_url {
            Some(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Err(SyncError::NotConfigured),
        }
    }

    fn progress_url(&self, device_id: &str, card_id: Option<i64>) -> Result<Url, SyncError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SyncError::Parse("cloud url cannot be a base".to_string()))?;
            segments.pop_if_empty().extend(["api", "progress", device_id]);
            if let Some(card_id) = card_id {
                segments.push(&card_id.to_string());
            }
        }
        Ok(url)
    }

    async fn check(resp: Response) -> Result<Response, SyncError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        Err(SyncError::Backend { status, message })
    }
}

#[async_trait]
impl CloudStore for HttpCloudStore {
    async fn pull(&self, device_id: &str) -> Result<HashMap<i64, CloudSyncRecord>, SyncError> {
        let url = self.progress_url(device_id, None)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        let body: ProgressBody = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Parse(e.to_string()))?;
        Ok(body.records)
    }

    async fn push(
        &self,
        device_id: &str,
        records: &HashMap<i64, CloudSyncRecord>,
    ) -> Result<usize, SyncError> {
        let url = self.progress_url(device_id, None)?;
        let body = ProgressBody {
            records: records.clone(),
        };
        let resp = self
            .client
            .put(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        let response: UpsertResponse = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Parse(e.to_string()))?;
        Ok(response.upserted)
    }

    async fn push_one(
        &self,
        device_id: &str,
        card_id: i64,
        record: &CloudSyncRecord,
    ) -> Result<(), SyncError> {
        let url = self.progress_url(device_id, Some(card_id))?;
        let resp = self
            .client
            .put(url)
            .json(record)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Self::check(resp).await?;
        Ok(())
    }
}
