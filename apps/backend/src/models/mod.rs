//! Database rows and API bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;

use crate::error::{ApiError, Result};

pub use tango_core::CloudSyncRecord;

/// Row of `cloud_progress`
#[derive(Debug, Clone, FromRow)]
pub struct ProgressRow {
    pub device_id: String,
    pub card_id: i64,
    pub interval: i32,
    pub ease_factor: f64,
    pub next_review: DateTime<Utc>,
    pub reps: i32,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRow {
    pub fn into_record(self) -> (i64, CloudSyncRecord) {
        (
            self.card_id,
            CloudSyncRecord {
                interval: self.interval.max(0) as u32,
                ease_factor: self.ease_factor,
                next_review: self.next_review,
                reps: self.reps.max(0) as u32,
            },
        )
    }
}

/// Body of `GET` and bulk `PUT` on `/api/progress/:device_id`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressBody {
    pub records: HashMap<i64, CloudSyncRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertResponse {
    pub upserted: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

// === Validation ===

pub fn validate_device_id(device_id: &str) -> Result<()> {
    if device_id.trim().is_empty() {
        return Err(ApiError::BadRequest("device id must not be blank".to_string()));
    }
    Ok(())
}

pub fn validate_record(card_id: i64, record: &CloudSyncRecord) -> Result<()> {
    if !record.ease_factor.is_finite() || record.ease_factor < 0.0 {
        return Err(ApiError::BadRequest(format!(
            "card {card_id}: ease factor must be a non-negative number"
        )));
    }
    if i32::try_from(record.interval).is_err() || i32::try_from(record.reps).is_err() {
        return Err(ApiError::BadRequest(format!(
            "card {card_id}: interval and reps must fit in 32 bits"
        )));
    }
    Ok(())
}
