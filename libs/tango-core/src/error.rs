//! Error types for tango-core.

use thiserror::Error;

/// Result type alias using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Invalid input rejected at the scheduling API boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid rating value {0} (expected 1-4)")]
    InvalidRating(u8),

    #[error("invalid quality score {0} (expected 0-5)")]
    InvalidQuality(u8),

    #[error("unknown rating '{0}' (expected again, hard, good or easy)")]
    UnknownRating(String),

    #[error("unknown card kind '{0}' (expected word or sentence)")]
    UnknownCardKind(String),

    #[error("invalid state for card {card_id}: {reason}")]
    InvalidState { card_id: i64, reason: &'static str },
}
