//! Commands behind the CLI subcommands.

pub mod data;
pub mod stats;
pub mod study;
pub mod sync;

use crate::catalog::CatalogError;
use crate::db::DbError;
use crate::sync::SyncError;
use tango_core::CoreError;

/// Error surfaced to the user by a command.
#[derive(Debug, serde::Serialize)]
pub struct CommandError {
    pub message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<DbError> for CommandError {
    fn from(e: DbError) -> Self {
        Self::new(format!("Database error: {e}"))
    }
}

impl From<CatalogError> for CommandError {
    fn from(e: CatalogError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<CoreError> for CommandError {
    fn from(e: CoreError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<SyncError> for CommandError {
    fn from(e: SyncError) -> Self {
        Self::new(e.to_string())
    }
}
