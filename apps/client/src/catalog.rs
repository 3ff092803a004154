//! Read-only card catalog.
//!
//! The catalog is a JSON file partitioned by card kind and by mastery bucket:
//!
//! ```json
//! {
//!   "word": { "active": [ ... ], "mastered": { "N5": [ ... ], "N4": [ ... ] } },
//!   "sentence": { "active": [ ... ], "mastered": {} }
//! }
//! ```

use serde::Deserialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tango_core::{Card, CardKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Cards of one kind, split into the active set and per-level mastered buckets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSection {
    #[serde(default)]
    pub active: Vec<Card>,
    #[serde(default)]
    pub mastered: BTreeMap<String, Vec<Card>>,
}

impl CatalogSection {
    /// Active cards followed by each mastered bucket in level-key order.
    /// Later duplicates of an id are dropped.
    pub fn ordered(&self) -> Vec<Card> {
        let mut seen = HashSet::new();
        self.active
            .iter()
            .chain(self.mastered.values().flatten())
            .filter(|card| seen.insert(card.id))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub word: CatalogSection,
    #[serde(default)]
    pub sentence: CatalogSection,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn section(&self, kind: CardKind) -> &CatalogSection {
        match kind {
            CardKind::Word => &self.word,
            CardKind::Sentence => &self.sentence,
        }
    }
}

/// Source of reference cards. The scheduling side never writes to it.
pub trait CatalogProvider {
    /// Cards of `kind` in catalog order.
    fn cards(&self, kind: CardKind) -> Result<Vec<Card>, CatalogError>;
}

impl CatalogProvider for Catalog {
    fn cards(&self, kind: CardKind) -> Result<Vec<Card>, CatalogError> {
        Ok(self.section(kind).ordered())
    }
}

/// Lazily loaded, cached view of a catalog file.
pub struct CatalogRepository {
    path: PathBuf,
    cache: RefCell<Option<Rc<Catalog>>>,
}

impl CatalogRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RefCell::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The parsed catalog, reading the file on first access.
    pub fn load(&self) -> Result<Rc<Catalog>, CatalogError> {
        if let Some(catalog) = self.cache.borrow().as_ref() {
            return Ok(Rc::clone(catalog));
        }

        let json = std::fs::read_to_string(&self.path).map_err(|source| CatalogError::Io {
            path: self.path.clone(),
            source,
        })?;
        let catalog = Rc::new(Catalog::from_json(&json).map_err(|source| {
            CatalogError::Parse {
                path: self.path.clone(),
                source,
            }
        })?);
        tracing::debug!(
            path = %self.path.display(),
            words = catalog.word.active.len(),
            sentences = catalog.sentence.active.len(),
            "loaded catalog"
        );

        *self.cache.borrow_mut() = Some(Rc::clone(&catalog));
        Ok(catalog)
    }

    /// Drop the cached catalog; the next access re-reads the file.
    pub fn invalidate(&self) {
        self.cache.borrow_mut().take();
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.borrow().is_some()
    }
}

impl CatalogProvider for CatalogRepository {
    fn cards(&self, kind: CardKind) -> Result<Vec<Card>, CatalogError> {
        Ok(self.load()?.section(kind).ordered())
    }
}
