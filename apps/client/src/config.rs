//! Client configuration from the environment.

use std::path::PathBuf;

const DATA_DIR_VAR: &str = "TANGO_DATA_DIR";
const CATALOG_VAR: &str = "TANGO_CATALOG";
const CLOUD_URL_VAR: &str = "TANGO_CLOUD_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub catalog_path: PathBuf,
    /// Cloud sync is disabled when unset.
    pub cloud_url: Option<String>,
}

impl Config {
    /// Read `TANGO_DATA_DIR`, `TANGO_CATALOG` and `TANGO_CLOUD_URL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = non_empty(DATA_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let catalog_path = non_empty(CATALOG_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("catalog.json"));

        Self {
            data_dir,
            catalog_path,
            cloud_url: non_empty(CLOUD_URL_VAR),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("tango.db")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tango")
}
