//! Review-scheduling core shared by the client and the cloud backend.
//!
//! Provides:
//! - Memory-model scheduler (stability / difficulty / retrievability)
//! - Projections between the legacy SM-2 record shape and the current state
//! - Merge policy used by cloud sync
//! - Study statistics over stored states and the review log
//! - Shared types (Card, SchedulingState, Rating, etc.)

pub mod algorithm;
pub mod error;
pub mod legacy;
pub mod merge;
pub mod stats;
pub mod types;

pub use algorithm::{fsrs::Fsrs, SchedulingResult};
pub use error::{CoreError, Result};
pub use merge::{merge_states, pick, MergeOutcome};
pub use types::{
    Card, CardKind, CardStatus, CloudSyncRecord, LegacyRecord, Rating, ReviewLogEntry,
    SchedulingState, SessionQueue, MASTERY_STABILITY_DAYS,
};
