//! Application state.

use crate::catalog::CatalogRepository;
use crate::config::Config;
use crate::db::{DbError, SqliteRepository};
use crate::device::DeviceIdentity;
use crate::store::{LocalStateStore, ReviewLog};
use crate::sync::{HttpCloudStore, SyncEngine, SyncError};
use std::rc::Rc;
use tango_core::Fsrs;

type Shared = Rc<SqliteRepository>;

/// Everything a command needs. Single-threaded; one logical writer.
pub struct AppState {
    pub repository: Shared,
    pub store: LocalStateStore<Shared>,
    pub review_log: ReviewLog<Shared>,
    pub catalog: CatalogRepository,
    pub scheduler: Fsrs,
    pub sync: Option<SyncEngine>,
}

impl AppState {
    pub fn new(
        repository: SqliteRepository,
        catalog: CatalogRepository,
        sync: Option<SyncEngine>,
    ) -> Self {
        let repository = Rc::new(repository);
        Self {
            store: LocalStateStore::new(Rc::clone(&repository)),
            review_log: ReviewLog::new(Rc::clone(&repository)),
            repository,
            catalog,
            scheduler: Fsrs::default(),
            sync,
        }
    }

    /// Open the database and wire up the catalog and cloud store from `config`.
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let repository = SqliteRepository::open(config.db_path())?;
        let catalog = CatalogRepository::new(&config.catalog_path);

        let sync = match HttpCloudStore::from_config(config.cloud_url.as_deref()) {
            Ok(cloud) => Some(SyncEngine::new(cloud)),
            Err(SyncError::NotConfigured) => {
                tracing::debug!("TANGO_CLOUD_URL not set, cloud sync disabled");
                None
            }
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(db = %config.db_path().display(), "opened local database");
        Ok(Self::new(repository, catalog, sync))
    }

    pub fn device(&self) -> Result<DeviceIdentity, DbError> {
        DeviceIdentity::load_or_create(self.repository.as_ref())
    }
}
