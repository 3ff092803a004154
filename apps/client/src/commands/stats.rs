//! Statistics commands.

use crate::catalog::CatalogProvider;
use crate::state::AppState;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tango_core::stats::{
    daily_stats, overview, streak, DailyStats, OverviewStats, StreakInfo, MAX_DAILY_WINDOW,
};
use tango_core::CardKind;

use super::CommandError;

#[derive(Debug, Serialize)]
pub struct StudyStats {
    pub overview: OverviewStats,
    pub streak: StreakInfo,
    pub daily: Vec<DailyStats>,
}

/// Card ids across both kinds, falling back to the stored ids when the
/// catalog cannot be read.
fn card_ids(state: &AppState) -> Vec<i64> {
    let from_catalog = [CardKind::Word, CardKind::Sentence]
        .into_iter()
        .map(|kind| state.catalog.cards(kind))
        .collect::<Result<Vec<_>, _>>();

    match from_catalog {
        Ok(sections) => sections.into_iter().flatten().map(|card| card.id).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "catalog unavailable, using stored states only");
            let mut ids: Vec<i64> = state.store.get_all().into_keys().collect();
            ids.sort_unstable();
            ids
        }
    }
}

pub fn get_study_stats<Tz: TimeZone>(
    state: &AppState,
    days: usize,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<StudyStats, CommandError> {
    if days == 0 || days > MAX_DAILY_WINDOW {
        return Err(CommandError::new(format!(
            "days must be between 1 and {MAX_DAILY_WINDOW}"
        )));
    }

    let states = state.store.get_all();
    let log = state.review_log.entries();
    let today = now.with_timezone(tz).date_naive();

    Ok(StudyStats {
        overview: overview(&card_ids(state), &states, now, tz),
        streak: streak(&log, today, tz),
        daily: daily_stats(&log, days, today, tz),
    })
}
