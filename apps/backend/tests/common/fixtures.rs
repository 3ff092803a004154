//! Test fixtures and factory functions for creating test data.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};

use tango_backend::models::CloudSyncRecord;

static NEXT_DEVICE: AtomicUsize = AtomicUsize::new(0);

/// A device id no other test run is using.
pub fn unique_device_id(label: &str) -> String {
    format!(
        "test-{label}-{}-{}-{}",
        std::process::id(),
        Utc::now().timestamp_micros(),
        NEXT_DEVICE.fetch_add(1, Ordering::SeqCst)
    )
}

/// A well-formed cloud record `interval` days after a fixed date.
pub fn record(interval: u32, ease_factor: f64, reps: u32) -> CloudSyncRecord {
    CloudSyncRecord {
        interval,
        ease_factor,
        next_review: Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap()
            + Duration::days(i64::from(interval)),
        reps,
    }
}

/// Bulk upsert request body.
pub fn progress_body(records: &[(i64, CloudSyncRecord)]) -> Value {
    let records: HashMap<String, &CloudSyncRecord> = records
        .iter()
        .map(|(id, record)| (id.to_string(), record))
        .collect();
    json!({ "records": records })
}
