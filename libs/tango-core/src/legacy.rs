//! Projections between the legacy SM-2 record shape and [`SchedulingState`].
//!
//! The same shape is used twice: once for the one-time migration of the old
//! local store, and again at the cloud boundary where the shared table still
//! carries `interval / easeFactor / nextReview / reps` columns.

use crate::types::{CardStatus, CloudSyncRecord, LegacyRecord, SchedulingState};
use chrono::Duration;

/// Ease factor that maps to the lowest difficulty.
pub const MAX_EASE: f64 = 2.5;
/// SM-2 ease floor; maps to the highest difficulty.
pub const MIN_EASE: f64 = 1.3;
/// Stability per day of legacy interval.
pub const STABILITY_PER_INTERVAL_DAY: f64 = 0.9;

const DIFFICULTY_PER_EASE: f64 = 9.0 / (MAX_EASE - MIN_EASE);

/// Inverse-linear mapping: lower ease means higher difficulty.
pub fn ease_to_difficulty(ease_factor: f64) -> f64 {
    (1.0 + (MAX_EASE - ease_factor) * DIFFICULTY_PER_EASE).clamp(1.0, 10.0)
}

/// Inverse of [`ease_to_difficulty`], rounded to two decimals.
pub fn difficulty_to_ease(difficulty: f64) -> f64 {
    let ease = MAX_EASE - (difficulty.clamp(1.0, 10.0) - 1.0) / DIFFICULTY_PER_EASE;
    (ease * 100.0).round() / 100.0
}

/// Coarse status implied by a legacy repetition count.
pub fn status_from_reps(reps: u32) -> CardStatus {
    match reps {
        0 => CardStatus::New,
        1 | 2 => CardStatus::Learning,
        _ => CardStatus::Review,
    }
}

/// Convert a legacy local record during migration.
///
/// Stability is floored at one day so migrated cards never look unreviewed
/// to the scheduler.
pub fn migrate_record(card_id: i64, record: &LegacyRecord) -> SchedulingState {
    let stability = (STABILITY_PER_INTERVAL_DAY * f64::from(record.interval)).max(1.0);
    project(card_id, record, stability)
}

/// Translate a cloud row into the local model. Lossless for well-formed rows.
pub fn from_cloud(card_id: i64, record: &CloudSyncRecord) -> SchedulingState {
    let stability = STABILITY_PER_INTERVAL_DAY * f64::from(record.interval);
    project(card_id, record, stability)
}

/// Reduce a local state to the cloud row shape.
pub fn to_cloud(state: &SchedulingState) -> CloudSyncRecord {
    CloudSyncRecord {
        interval: (state.stability.max(0.0) / STABILITY_PER_INTERVAL_DAY).round() as u32,
        ease_factor: difficulty_to_ease(state.difficulty),
        next_review: state.due,
        reps: state.reps,
    }
}

/// Stability a state carries after a trip through the cloud row shape.
pub fn cloud_stability(state: &SchedulingState) -> f64 {
    STABILITY_PER_INTERVAL_DAY * f64::from(to_cloud(state).interval)
}

fn project(card_id: i64, record: &LegacyRecord, stability: f64) -> SchedulingState {
    let status = status_from_reps(record.reps);
    let last_review = (record.reps > 0)
        .then(|| record.next_review - Duration::days(i64::from(record.interval)));

    SchedulingState {
        card_id,
        due: record.next_review,
        stability,
        difficulty: ease_to_difficulty(record.ease_factor),
        elapsed_days: 0,
        scheduled_days: record.interval,
        reps: record.reps,
        lapses: 0,
        status,
        last_review,
    }
}
