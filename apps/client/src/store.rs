//! Device-local scheduling state and review history.

use crate::db::blob::{read_versioned, write_versioned};
use crate::db::schema::{REVIEW_LOG_KEY, STATE_KEY};
use crate::db::{DbError, KeyValueStore};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tango_core::{ReviewLogEntry, SchedulingState};

/// Schema version written into the state blob.
pub const STATE_SCHEMA_VERSION: u32 = 2;

/// Schema version written into the review-log blob.
pub const REVIEW_LOG_SCHEMA_VERSION: u32 = 1;

/// One scheduling record per card id, kept in a single serialized blob.
///
/// Reads never fail. A blob that cannot be decoded is treated as empty, and
/// individual records that break the state invariants are dropped.
pub struct LocalStateStore<K> {
    kv: K,
}

impl<K: KeyValueStore> LocalStateStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    fn load(&self) -> BTreeMap<i64, SchedulingState> {
        let mut records: BTreeMap<i64, SchedulingState> =
            read_versioned(&self.kv, STATE_KEY, STATE_SCHEMA_VERSION);
        // The map key is authoritative for the card id.
        for (id, state) in records.iter_mut() {
            state.card_id = *id;
        }
        records.retain(|_, state| match state.validate() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "dropping invalid stored state");
                false
            }
        });
        records
    }

    fn save(&self, records: &BTreeMap<i64, SchedulingState>) -> Result<(), DbError> {
        write_versioned(&self.kv, STATE_KEY, STATE_SCHEMA_VERSION, records)
    }

    /// Stored state for `card_id`, or `None` if the card has never been reviewed.
    pub fn get(&self, card_id: i64) -> Option<SchedulingState> {
        self.load().remove(&card_id)
    }

    /// Stored state, or the implicit New record.
    pub fn get_or_new(&self, card_id: i64, now: DateTime<Utc>) -> SchedulingState {
        self.get(card_id)
            .unwrap_or_else(|| SchedulingState::new(card_id, now))
    }

    pub fn get_all(&self) -> HashMap<i64, SchedulingState> {
        self.load().into_iter().collect()
    }

    pub fn put(&self, card_id: i64, state: &SchedulingState) -> Result<(), DbError> {
        let mut records = self.load();
        let mut state = state.clone();
        state.card_id = card_id;
        records.insert(card_id, state);
        self.save(&records)
    }

    /// Replace the whole store with `states`.
    pub fn put_all(&self, states: &HashMap<i64, SchedulingState>) -> Result<(), DbError> {
        let records: BTreeMap<i64, SchedulingState> = states
            .iter()
            .map(|(&id, state)| {
                let mut state = state.clone();
                state.card_id = id;
                (id, state)
            })
            .collect();
        self.save(&records)
    }

    /// Bulk-clear every stored state.
    pub fn clear(&self) -> Result<(), DbError> {
        self.kv.remove_item(STATE_KEY)
    }

    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Append-only history of reviews, used for statistics.
pub struct ReviewLog<K> {
    kv: K,
}

impl<K: KeyValueStore> ReviewLog<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn entries(&self) -> Vec<ReviewLogEntry> {
        read_versioned(&self.kv, REVIEW_LOG_KEY, REVIEW_LOG_SCHEMA_VERSION)
    }

    pub fn append(&self, entry: ReviewLogEntry) -> Result<(), DbError> {
        let mut entries = self.entries();
        entries.push(entry);
        write_versioned(&self.kv, REVIEW_LOG_KEY, REVIEW_LOG_SCHEMA_VERSION, &entries)
    }

    pub fn clear(&self) -> Result<(), DbError> {
        self.kv.remove_item(REVIEW_LOG_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, SqliteRepository};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use tango_core::{CardStatus, Rating};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn reviewed(card_id: i64, stability: f64) -> SchedulingState {
        SchedulingState {
            stability,
            reps: 3,
            status: CardStatus::Review,
            due: now() + Duration::days(4),
            last_review: Some(now()),
            ..SchedulingState::new(card_id, now())
        }
    }

    #[test]
    fn get_missing_returns_none() {
        let store = LocalStateStore::new(MemoryStore::new());
        assert_eq!(store.get(42), None);
        assert_eq!(store.get_or_new(42, now()), SchedulingState::new(42, now()));
        assert!(store.is_empty());
    }

    #[test]
    fn put_then_get() {
        let store = LocalStateStore::new(SqliteRepository::open_in_memory().unwrap());
        let state = reviewed(7, 12.5);
        store.put(7, &state).unwrap();

        assert_eq!(store.get(7), Some(state));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn put_uses_key_as_card_id() {
        let store = LocalStateStore::new(MemoryStore::new());
        store.put(9, &reviewed(1, 3.0)).unwrap();
        assert_eq!(store.get(9).map(|s| s.card_id), Some(9));
        assert_eq!(store.get(1), None);
    }

    #[test]
    fn put_all_replaces_everything() {
        let store = LocalStateStore::new(MemoryStore::new());
        store.put(1, &reviewed(1, 2.0)).unwrap();

        let replacement = HashMap::from([(2, reviewed(2, 5.0)), (3, reviewed(3, 8.0))]);
        store.put_all(&replacement).unwrap();

        assert_eq!(store.get(1), None);
        assert_eq!(store.get_all(), replacement);
    }

    #[test]
    fn clear_empties_store() {
        let store = LocalStateStore::new(MemoryStore::new());
        store.put(1, &reviewed(1, 2.0)).unwrap();
        store.clear().unwrap();
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn corrupted_blob_reads_as_empty() {
        let kv = MemoryStore::new();
        kv.set_item(STATE_KEY, "][ definitely not json").unwrap();
        let store = LocalStateStore::new(&kv);

        assert!(store.get_all().is_empty());
        assert_eq!(store.get(1), None);

        // Writing recovers the blob.
        store.put(1, &reviewed(1, 4.0)).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn invalid_records_are_dropped_on_read() {
        let kv = MemoryStore::new();
        let broken = SchedulingState {
            difficulty: 42.0,
            ..reviewed(2, 5.0)
        };
        let records = BTreeMap::from([(1_i64, reviewed(1, 6.0)), (2, broken)]);
        write_versioned(&kv, STATE_KEY, STATE_SCHEMA_VERSION, &records).unwrap();

        let store = LocalStateStore::new(&kv);
        assert_eq!(store.get(1), Some(reviewed(1, 6.0)));
        assert_eq!(store.get(2), None);
        assert_eq!(store.get_or_new(2, now()), SchedulingState::new(2, now()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn reads_pre_envelope_blob() {
        let kv = MemoryStore::new();
        let bare = serde_json::to_string(&BTreeMap::from([(5_i64, reviewed(5, 6.0))])).unwrap();
        kv.set_item(STATE_KEY, &bare).unwrap();

        let store = LocalStateStore::new(&kv);
        assert_eq!(store.get(5), Some(reviewed(5, 6.0)));
    }

    #[test]
    fn review_log_appends_in_order() {
        let kv = MemoryStore::new();
        let log = ReviewLog::new(&kv);
        log.append(ReviewLogEntry {
            card_id: 1,
            rating: Rating::Good,
            reviewed_at: now(),
        })
        .unwrap();
        log.append(ReviewLogEntry {
            card_id: 2,
            rating: Rating::Again,
            reviewed_at: now() + Duration::minutes(1),
        })
        .unwrap();

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].card_id, 2);

        log.clear().unwrap();
        assert!(log.entries().is_empty());
    }
}
