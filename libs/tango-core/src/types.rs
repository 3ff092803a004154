//! Core types for the vocabulary scheduler.

use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Stability (in days) from which a card in review counts as mastered.
pub const MASTERY_STABILITY_DAYS: f64 = 21.0;

/// Difficulty given to a card that has never been reviewed.
pub const DEFAULT_DIFFICULTY: f64 = 5.0;

/// Card learning status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    New,
    Learning,
    Review,
    Relearning,
}

impl Default for CardStatus {
    fn default() -> Self {
        Self::New
    }
}

/// Rating for a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    /// Convert to 4-point numeric value (1-4).
    pub fn to_value(self) -> u8 {
        match self {
            Self::Again => 1,
            Self::Hard => 2,
            Self::Good => 3,
            Self::Easy => 4,
        }
    }

    /// Create from 4-point numeric value.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            _ => None,
        }
    }

    /// Map a legacy 0-5 quality score onto the four ratings.
    ///
    /// `<2` is Again, `2` Hard, `3` Good and `4..=5` Easy.
    pub fn from_quality(quality: u8) -> Result<Self, CoreError> {
        match quality {
            0 | 1 => Ok(Self::Again),
            2 => Ok(Self::Hard),
            3 => Ok(Self::Good),
            4 | 5 => Ok(Self::Easy),
            other => Err(CoreError::InvalidQuality(other)),
        }
    }

    /// Whether the card was recalled.
    pub fn is_success(self) -> bool {
        !matches!(self, Self::Again)
    }
}

impl FromStr for Rating {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "again" => Ok(Self::Again),
            "hard" => Ok(Self::Hard),
            "good" => Ok(Self::Good),
            "easy" => Ok(Self::Easy),
            _ => Err(CoreError::UnknownRating(s.to_string())),
        }
    }
}

/// Catalog partition by content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Word,
    Sentence,
}

impl CardKind {
    /// Get the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Sentence => "sentence",
        }
    }
}

impl Default for CardKind {
    fn default() -> Self {
        Self::Word
    }
}

impl FromStr for CardKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "word" | "words" => Ok(Self::Word),
            "sentence" | "sentences" => Ok(Self::Sentence),
            _ => Err(CoreError::UnknownCardKind(s.to_string())),
        }
    }
}

/// Immutable reference record supplied by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: i64,
    pub lemma: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meaning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_sentence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_meaning: Option<String>,
}

/// Per-card, per-device scheduling state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingState {
    pub card_id: i64,
    pub due: DateTime<Utc>,
    pub stability: f64,
    pub difficulty: f64,
    pub elapsed_days: u32,
    pub scheduled_days: u32,
    pub reps: u32,
    pub lapses: u32,
    #[serde(rename = "state")]
    pub status: CardStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime<Utc>>,
}

impl SchedulingState {
    /// The implicit record of a card that has never been reviewed.
    pub fn new(card_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            card_id,
            due: now,
            stability: 0.0,
            difficulty: DEFAULT_DIFFICULTY,
            elapsed_days: 0,
            scheduled_days: 0,
            reps: 0,
            lapses: 0,
            status: CardStatus::New,
            last_review: None,
        }
    }

    /// Due check against an exact instant. Never compares calendar dates.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }

    /// Mastered once stability reaches three weeks while in review.
    pub fn is_mastered(&self) -> bool {
        self.status == CardStatus::Review && self.stability >= MASTERY_STABILITY_DAYS
    }

    /// Check the invariants every stored record must hold.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |reason| {
            Err(CoreError::InvalidState {
                card_id: self.card_id,
                reason,
            })
        };
        if !self.stability.is_finite() || self.stability < 0.0 {
            return invalid("stability must be finite and non-negative");
        }
        if !self.difficulty.is_finite() || !(1.0..=10.0).contains(&self.difficulty) {
            return invalid("difficulty must be within 1-10");
        }
        if self.status == CardStatus::New && self.reps > 0 {
            return invalid("a new card cannot have reviews");
        }
        if self.lapses > self.reps {
            return invalid("lapses exceed reviews");
        }
        Ok(())
    }

    /// Estimated probability of recall at `now`: `R = e^(-t / S)`.
    pub fn retrievability(&self, now: DateTime<Utc>) -> f64 {
        if self.status == CardStatus::New || self.stability <= 0.0 {
            return 0.0;
        }
        let elapsed = match self.last_review {
            Some(last) => (now.signed_duration_since(last).num_seconds() as f64 / 86400.0).max(0.0),
            None => 0.0,
        };
        (-elapsed / self.stability).exp()
    }
}

/// Record shape of the legacy SM-2 scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRecord {
    pub interval: u32,
    pub ease_factor: f64,
    pub next_review: DateTime<Utc>,
    pub reps: u32,
}

/// Projection of [`SchedulingState`] stored in the shared cloud table.
///
/// Kept in the legacy shape for schema compatibility with older devices.
pub type CloudSyncRecord = LegacyRecord;

/// One entry of the local review history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLogEntry {
    pub card_id: i64,
    pub rating: Rating,
    pub reviewed_at: DateTime<Utc>,
}

/// Cards selected for a review session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionQueue {
    pub due_cards: Vec<Card>,
    pub new_cards: Vec<Card>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn quality_maps_onto_ratings() {
        assert_eq!(Rating::from_quality(0), Ok(Rating::Again));
        assert_eq!(Rating::from_quality(1), Ok(Rating::Again));
        assert_eq!(Rating::from_quality(2), Ok(Rating::Hard));
        assert_eq!(Rating::from_quality(3), Ok(Rating::Good));
        assert_eq!(Rating::from_quality(4), Ok(Rating::Easy));
        assert_eq!(Rating::from_quality(5), Ok(Rating::Easy));
        assert_eq!(Rating::from_quality(6), Err(CoreError::InvalidQuality(6)));
    }

    #[test]
    fn rating_parses_case_insensitively() {
        assert_eq!("Good".parse::<Rating>(), Ok(Rating::Good));
        assert_eq!(" again ".parse::<Rating>(), Ok(Rating::Again));
        assert!("perfect".parse::<Rating>().is_err());
    }

    #[test]
    fn rating_value_round_trip() {
        for value in 1..=4 {
            let rating = Rating::from_value(value).unwrap();
            assert_eq!(rating.to_value(), value);
        }
        assert_eq!(Rating::from_value(0), None);
        assert_eq!(Rating::from_value(5), None);
    }

    #[test]
    fn new_state_is_due_immediately() {
        let now = fixed_now();
        let state = SchedulingState::new(7, now);
        assert_eq!(state.status, CardStatus::New);
        assert_eq!(state.reps, 0);
        assert!(state.is_due(now));
        assert!(!state.is_mastered());
    }

    #[test]
    fn due_uses_exact_instant() {
        let now = fixed_now();
        let state = SchedulingState {
            due: now + Duration::minutes(10),
            ..SchedulingState::new(1, now)
        };
        // Later the same calendar day is still not due.
        assert!(!state.is_due(now));
        assert!(!state.is_due(now + Duration::minutes(9)));
        assert!(state.is_due(now + Duration::minutes(10)));
    }

    #[test]
    fn mastery_requires_review_state() {
        let now = fixed_now();
        let mut state = SchedulingState {
            stability: 30.0,
            status: CardStatus::Relearning,
            reps: 8,
            ..SchedulingState::new(1, now)
        };
        assert!(!state.is_mastered());
        state.status = CardStatus::Review;
        assert!(state.is_mastered());
        state.stability = 20.9;
        assert!(!state.is_mastered());
    }

    #[test]
    fn validate_rejects_broken_records() {
        let now = fixed_now();
        assert_eq!(SchedulingState::new(1, now).validate(), Ok(()));

        let cases = [
            SchedulingState {
                difficulty: 11.0,
                ..SchedulingState::new(1, now)
            },
            SchedulingState {
                stability: -2.0,
                ..SchedulingState::new(1, now)
            },
            SchedulingState {
                stability: f64::NAN,
                ..SchedulingState::new(1, now)
            },
            SchedulingState {
                reps: 3,
                ..SchedulingState::new(1, now)
            },
            SchedulingState {
                reps: 1,
                lapses: 2,
                status: CardStatus::Relearning,
                ..SchedulingState::new(1, now)
            },
        ];
        for state in cases {
            assert!(
                matches!(state.validate(), Err(CoreError::InvalidState { card_id: 1, .. })),
                "{state:?} should be rejected"
            );
        }
    }

    #[test]
    fn retrievability_decays_exponentially() {
        let now = fixed_now();
        let state = SchedulingState {
            stability: 10.0,
            status: CardStatus::Review,
            reps: 3,
            last_review: Some(now - Duration::days(10)),
            ..SchedulingState::new(1, now)
        };
        let r = state.retrievability(now);
        assert!((r - (-1.0f64).exp()).abs() < 1e-9);
        assert_eq!(SchedulingState::new(2, now).retrievability(now), 0.0);
    }

    #[test]
    fn state_serializes_with_camel_case_fields() {
        let now = fixed_now();
        let json = serde_json::to_value(SchedulingState::new(3, now)).unwrap();
        assert_eq!(json["cardId"], 3);
        assert_eq!(json["state"], "new");
        assert!(json.get("lastReview").is_none());
        assert!(json.get("scheduledDays").is_some());
    }

    #[test]
    fn legacy_record_uses_camel_case_fields() {
        let json = r#"{"interval":6,"easeFactor":2.4,"nextReview":"2026-03-01T09:00:00Z","reps":2}"#;
        let record: LegacyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.interval, 6);
        assert_eq!(record.ease_factor, 2.4);
        assert_eq!(record.next_review, fixed_now());
    }
}
