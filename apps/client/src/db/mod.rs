//! Local SQLite persistence.

pub mod blob;
pub mod error;
pub mod repository;
pub mod schema;

pub use error::DbError;
pub use repository::{KeyValueStore, MemoryStore, SqliteRepository};
