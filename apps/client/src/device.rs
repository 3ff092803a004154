//! Opaque device identity used to partition cloud rows.

use crate::db::schema::DEVICE_ID_KEY;
use crate::db::{DbError, KeyValueStore};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    /// Load the persisted token, generating and storing a new one on first use.
    pub fn load_or_create<K: KeyValueStore + ?Sized>(kv: &K) -> Result<Self, DbError> {
        if let Some(existing) = kv.get_item(DEVICE_ID_KEY)? {
            let trimmed = existing.trim();
            if !trimmed.is_empty() {
                return Ok(Self(trimmed.to_string()));
            }
        }

        let token = Uuid::new_v4().to_string();
        kv.set_item(DEVICE_ID_KEY, &token)?;
        tracing::info!(device_id = %token, "generated new device identity");
        Ok(Self(token))
    }

    /// Overwrite the stored token to take over another device's history.
    pub fn adopt<K: KeyValueStore + ?Sized>(kv: &K, token: &str) -> Result<Self, DbError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(DbError::InvalidData("device id must not be empty".to_string()));
        }
        kv.set_item(DEVICE_ID_KEY, token)?;
        tracing::info!(device_id = %token, "adopted device identity");
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
