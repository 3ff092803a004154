//! SQLite schema and storage keys.

/// Current schema version of the SQLite file itself.
pub const SCHEMA_VERSION: i32 = 1;

/// Browser-style key/value storage. Each key holds one serialized blob.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Current scheduling-state blob.
pub const STATE_KEY: &str = "tango.srs_state";
/// Blob written by the legacy SM-2 scheduler.
pub const LEGACY_KEY: &str = "tango.srs_legacy";
/// Opaque device identity used as the cloud partition key.
pub const DEVICE_ID_KEY: &str = "tango.device_id";
/// Append-only review history.
pub const REVIEW_LOG_KEY: &str = "tango.review_log";
