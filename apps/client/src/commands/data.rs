//! Migration, purge and reset commands.

use crate::migration::{self, MigrationReport};
use crate::state::AppState;

use super::CommandError;

/// Import any legacy records not yet in the store. Safe to run on every start.
pub fn migrate(state: &AppState) -> Result<MigrationReport, CommandError> {
    Ok(migration::migrate_if_needed(
        state.repository.as_ref(),
        &state.store,
    )?)
}

pub fn purge_legacy(state: &AppState) -> Result<(), CommandError> {
    Ok(migration::purge_legacy(state.repository.as_ref())?)
}

/// Bulk-clear every scheduling state and the review log.
pub fn reset(state: &AppState) -> Result<usize, CommandError> {
    let cleared = state.store.len();
    state.store.clear()?;
    state.review_log.clear()?;
    tracing::info!(cleared, "reset local scheduling state");
    Ok(cleared)
}
