//! Versioned JSON blobs on top of the key/value store.
//!
//! Blobs are written as `{"schemaVersion": N, "records": ...}`. Reads never
//! fail: missing, unparseable or future-versioned blobs degrade to the
//! default value with a warning.

use crate::db::repository::{KeyValueStore, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a, T> {
    schema_version: u32,
    records: &'a T,
}

/// Read the blob under `key`, or `T::default()` if it is absent or unusable.
pub fn read_versioned<K, T>(kv: &K, key: &str, current_version: u32) -> T
where
    K: KeyValueStore + ?Sized,
    T: DeserializeOwned + Default,
{
    let raw = match kv.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read stored blob, treating as empty");
            return T::default();
        }
    };

    match decode(&raw, current_version) {
        Ok(value) => value,
        Err(reason) => {
            tracing::warn!(key, %reason, "discarding unreadable blob");
            T::default()
        }
    }
}

/// Serialize `records` under `key` with the given schema version.
pub fn write_versioned<K, T>(kv: &K, key: &str, version: u32, records: &T) -> Result<()>
where
    K: KeyValueStore + ?Sized,
    T: Serialize,
{
    let json = serde_json::to_string(&Envelope {
        schema_version: version,
        records,
    })?;
    kv.set_item(key, &json)
}

fn decode<T: DeserializeOwned>(raw: &str, current_version: u32) -> std::result::Result<T, String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;

    match value {
        Value::Object(mut map) if map.contains_key("schemaVersion") => {
            let version = map
                .get("schemaVersion")
                .and_then(Value::as_u64)
                .ok_or_else(|| "schemaVersion is not a number".to_string())?;
            if version > u64::from(current_version) {
                return Err(format!(
                    "schema version {version} is newer than supported {current_version}"
                ));
            }
            let records = map.remove("records").unwrap_or(Value::Null);
            serde_json::from_value(records).map_err(|e| e.to_string())
        }
        // Pre-envelope blobs stored the records directly.
        bare => serde_json::from_value(bare).map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::MemoryStore;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    type Records = BTreeMap<i64, String>;

    #[test]
    fn writes_envelope_and_reads_it_back() {
        let kv = MemoryStore::new();
        let records = Records::from([(1, "a".to_string()), (2, "b".to_string())]);
        write_versioned(&kv, "k", 2, &records).unwrap();

        let raw = kv.get_item("k").unwrap().unwrap();
        assert!(raw.contains("\"schemaVersion\":2"));

        let back: Records = read_versioned(&kv, "k", 2);
        assert_eq!(back, records);
    }

    #[test]
    fn accepts_bare_records() {
        let kv = MemoryStore::new();
        kv.set_item("k", r#"{"5":"x"}"#).unwrap();
        let back: Records = read_versioned(&kv, "k", 2);
        assert_eq!(back, Records::from([(5, "x".to_string())]));
    }

    #[test]
    fn garbage_reads_as_empty() {
        let kv = MemoryStore::new();
        kv.set_item("k", "{not json").unwrap();
        let back: Records = read_versioned(&kv, "k", 2);
        assert!(back.is_empty());

        kv.set_item("k", r#"{"schemaVersion":2,"records":[1,2,3]}"#)
            .unwrap();
        let back: Records = read_versioned(&kv, "k", 2);
        assert!(back.is_empty());
    }

    #[test]
    fn newer_schema_reads_as_empty() {
        let kv = MemoryStore::new();
        kv.set_item("k", r#"{"schemaVersion":9,"records":{"1":"a"}}"#)
            .unwrap();
        let back: Records = read_versioned(&kv, "k", 2);
        assert!(back.is_empty());
    }

    #[test]
    fn missing_key_reads_as_empty() {
        let kv = MemoryStore::new();
        let back: Records = read_versioned(&kv, "absent", 1);
        assert!(back.is_empty());
    }
}
