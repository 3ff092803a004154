//! Local/cloud merge policy.
//!
//! Merges operate on whole records. For an id present on both sides the
//! record with the larger stability wins; ties keep the local record. There
//! is no field-level merge, so a device can lose progress on a card when the
//! other side's record is further along.
//!
//! The cloud row rounds stability to whole interval days, so a device's own
//! row can come back slightly stronger than the state it was made from. The
//! local side is therefore compared at the larger of its own stability and
//! its projected one; an echo of the local record never replaces it.

use crate::legacy::{cloud_stability, from_cloud};
use crate::types::{CloudSyncRecord, SchedulingState};
use std::collections::HashMap;

/// Which side a merged record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeSource {
    Local,
    Remote,
}

/// Result of merging a local map with a pulled remote map.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub states: HashMap<i64, SchedulingState>,
    pub kept_local: usize,
    pub taken_remote: usize,
    pub local_only: usize,
    pub remote_only: usize,
}

/// `local` if `local.stability >= remote.stability`, else `remote`.
pub fn pick<'a>(
    local: &'a SchedulingState,
    remote: &'a SchedulingState,
) -> (&'a SchedulingState, MergeSource) {
    if local.stability >= remote.stability {
        (local, MergeSource::Local)
    } else {
        (remote, MergeSource::Remote)
    }
}

/// Merge the local store with a remote map of cloud rows.
pub fn merge_states(
    local: &HashMap<i64, SchedulingState>,
    remote: &HashMap<i64, CloudSyncRecord>,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for (&card_id, record) in remote {
        let translated = from_cloud(card_id, record);
        match local.get(&card_id) {
            Some(local_state) => {
                let comparable = SchedulingState {
                    stability: local_state.stability.max(cloud_stability(local_state)),
                    ..local_state.clone()
                };
                let (_, source) = pick(&comparable, &translated);
                let winner = match source {
                    MergeSource::Local => {
                        outcome.kept_local += 1;
                        local_state.clone()
                    }
                    MergeSource::Remote => {
                        outcome.taken_remote += 1;
                        translated
                    }
                };
                outcome.states.insert(card_id, winner);
            }
            None => {
                outcome.remote_only += 1;
                outcome.states.insert(card_id, translated);
            }
        }
    }

    for (&card_id, state) in local {
        if !remote.contains_key(&card_id) {
            outcome.local_only += 1;
            outcome.states.insert(card_id, state.clone());
        }
    }

    outcome
}
