//! Study session commands.

use crate::session::SessionSelector;
use crate::state::AppState;
use crate::sync::SyncOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tango_core::legacy::to_cloud;
use tango_core::{CardKind, Rating, ReviewLogEntry, SchedulingState, SessionQueue};
use tokio::task::JoinHandle;

use super::CommandError;

/// How the user graded a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewInput {
    Rating(Rating),
    /// Legacy 0-5 score.
    Quality(u8),
}

impl ReviewInput {
    pub fn rating(self) -> Result<Rating, CommandError> {
        match self {
            Self::Rating(rating) => Ok(rating),
            Self::Quality(quality) => Ok(Rating::from_quality(quality)?),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub rating: Rating,
    pub new_state: SchedulingState,
    pub next_due: String,
    pub mastered: bool,
}

/// A committed review plus the detached cloud mirror, if one was started.
pub struct SubmittedReview {
    pub response: ReviewResponse,
    pub cloud_push: Option<JoinHandle<SyncOutcome>>,
}

/// Due and new cards of `kind`.
pub fn get_study_queue(
    state: &AppState,
    kind: CardKind,
    new_limit: usize,
    now: DateTime<Utc>,
) -> Result<SessionQueue, CommandError> {
    let selector = SessionSelector::new(&state.catalog, &state.store);
    Ok(selector.build_queue(kind, new_limit, now)?)
}

/// Schedule a review and commit it locally, then mirror it to the cloud.
///
/// The cloud push runs in the background; its failure is logged and never
/// fails the review. Outside a tokio runtime the push is skipped.
pub fn submit_review(
    state: &AppState,
    card_id: i64,
    input: ReviewInput,
    now: DateTime<Utc>,
) -> Result<SubmittedReview, CommandError> {
    let rating = input.rating()?;
    let current = state.store.get_or_new(card_id, now);
    let result = state.scheduler.schedule(&current, rating, now);

    state.store.put(card_id, &result.state)?;
    state.review_log.append(ReviewLogEntry {
        card_id,
        rating,
        reviewed_at: now,
    })?;
    tracing::debug!(
        card_id,
        rating = ?rating,
        stability = result.state.stability,
        due = %result.next_due,
        "review committed"
    );

    let cloud_push = state.sync.as_ref().and_then(|engine| {
        if tokio::runtime::Handle::try_current().is_err() {
            tracing::warn!(card_id, "no async runtime, skipping cloud push");
            return None;
        }
        let device = match state.device() {
            Ok(device) => device,
            Err(e) => {
                tracing::warn!(error = %e, "no device identity, skipping cloud push");
                return None;
            }
        };
        Some(engine.push_one_in_background(
            device.as_str().to_string(),
            card_id,
            to_cloud(&result.state),
            move |outcome| {
                tracing::debug!(card_id, success = outcome.success, message = %outcome.message, "cloud push finished");
            },
        ))
    });

    Ok(SubmittedReview {
        response: ReviewResponse {
            rating,
            mastered: result.state.is_mastered(),
            next_due: result.next_due.to_rfc3339(),
            new_state: result.state,
        },
        cloud_push,
    })
}
