//! Spaced repetition scheduling.

pub mod fsrs;

use crate::types::SchedulingState;
use chrono::{DateTime, Utc};

/// Result of scheduling a card after review.
#[derive(Debug, Clone)]
pub struct SchedulingResult {
    pub state: SchedulingState,
    pub next_due: DateTime<Utc>,
}
