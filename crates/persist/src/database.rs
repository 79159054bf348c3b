//! Database - a named directory of persistent collections
//!
//! Resolves a root directory (explicit path, project-local, or under the
//! home directory), hands out cached [`PersistentCollection`] handles, one
//! subdirectory per collection.

use crate::collection::{CollectionConfig, PersistentCollection};
use folio_core::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Where a database's directory tree lives
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database name, one directory per name
    pub name: String,
    /// Resolve under `./.folio` instead of the home directory
    pub local: bool,
    /// Explicit root, overriding both other modes
    pub base_path: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            name: "default".to_string(),
            local: false,
            base_path: None,
        }
    }
}

impl DatabaseConfig {
    /// Config for a named database with default placement
    pub fn named(name: impl Into<String>) -> Self {
        DatabaseConfig {
            name: name.into(),
            ..DatabaseConfig::default()
        }
    }

    /// Place the database under `./.folio`
    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    /// Place the database under an explicit root
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Directory this config resolves to: `base_path` wins, then
    /// `./.folio/<name>`, then `~/.folio/<name>`
    pub fn resolve_dir(&self) -> PathBuf {
        if let Some(base) = &self.base_path {
            return base.join(&self.name);
        }
        if self.local {
            return PathBuf::from(".folio").join(&self.name);
        }
        let home = dirs::home_dir()
            .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));
        home.join(".folio").join(&self.name)
    }
}

/// A directory of named persistent collections
pub struct Database {
    dir: PathBuf,
    collections: Mutex<HashMap<String, PersistentCollection>>,
}

impl Database {
    /// Open (creating if needed) the database directory
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        let dir = config.resolve_dir();
        std::fs::create_dir_all(&dir)?;
        tracing::info!(target: "folio::db", dir = %dir.display(), "database open");
        Ok(Database {
            dir,
            collections: Mutex::new(HashMap::new()),
        })
    }

    /// The database root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Open (or return the cached handle for) a named collection.
    ///
    /// The first call creates the subdirectory, loads existing record files
    /// and starts watching per the config; later calls return the same
    /// collection and ignore the config.
    pub fn collection(
        &self,
        name: &str,
        config: CollectionConfig,
    ) -> Result<PersistentCollection> {
        let mut collections = self.collections.lock();
        if let Some(existing) = collections.get(name) {
            return Ok(existing.clone());
        }
        let collection = PersistentCollection::open(&self.dir.join(name), config)?;
        collections.insert(name.to_string(), collection.clone());
        Ok(collection)
    }

    /// Names of every collection directory on disk, sorted
    pub fn collection_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Close every open collection (flushing unsaved records) and drop the
    /// handles
    pub fn close(&self) {
        let mut collections = self.collections.lock();
        for (name, collection) in collections.drain() {
            tracing::debug!(target: "folio::db", collection = %name, "closing");
            collection.close();
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.close();
    }
}
