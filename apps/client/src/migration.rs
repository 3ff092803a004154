//! One-time conversion of the legacy SM-2 store into scheduling states.

use crate::db::blob::read_versioned;
use crate::db::schema::LEGACY_KEY;
use crate::db::{DbError, KeyValueStore};
use crate::store::LocalStateStore;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tango_core::legacy::migrate_record;
use tango_core::LegacyRecord;

/// The legacy blob was never versioned; any envelope is accepted.
const LEGACY_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub migrated: usize,
    pub skipped: usize,
}

/// Copy every legacy record whose id is not yet in `store`.
///
/// Safe to run on every start: ids already present are skipped, and the
/// legacy blob is left in place.
pub fn migrate_if_needed<L, K>(
    legacy: &L,
    store: &LocalStateStore<K>,
) -> Result<MigrationReport, DbError>
where
    L: KeyValueStore + ?Sized,
    K: KeyValueStore,
{
    let raw: BTreeMap<String, Value> = read_versioned(legacy, LEGACY_KEY, LEGACY_SCHEMA_VERSION);
    if raw.is_empty() {
        return Ok(MigrationReport::default());
    }

    let mut states = store.get_all();
    let mut report = MigrationReport::default();

    for (key, value) in raw {
        let Ok(card_id) = key.parse::<i64>() else {
            tracing::warn!(key = %key, "skipping legacy record with non-numeric id");
            report.skipped += 1;
            continue;
        };

        if states.contains_key(&card_id) {
            report.skipped += 1;
            continue;
        }

        match serde_json::from_value::<LegacyRecord>(value) {
            Ok(record) => {
                states.insert(card_id, migrate_record(card_id, &record));
                report.migrated += 1;
            }
            Err(e) => {
                tracing::warn!(card_id, error = %e, "skipping malformed legacy record");
                report.skipped += 1;
            }
        }
    }

    if report.migrated > 0 {
        store.put_all(&states)?;
        tracing::info!(
            migrated = report.migrated,
            skipped = report.skipped,
            "migrated legacy scheduling records"
        );
    }

    Ok(report)
}

/// Delete the legacy blob. Never called by [`migrate_if_needed`].
pub fn purge_legacy<L: KeyValueStore + ?Sized>(legacy: &L) -> Result<(), DbError> {
    legacy.remove_item(LEGACY_KEY)?;
    tracing::info!("purged legacy scheduling store");
    Ok(())
}
