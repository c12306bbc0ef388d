//! Option record storage.
//!
//! # Design
//! - The engine never reaches for ambient global state; a store is injected at
//!   construction and addressed by option id.
//! - A record is written wholesale. Atomicity of the write belongs to the store.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Flat mapping of field id to stored string value.
pub type Record = IndexMap<String, String>;

/// Key-value store holding one record per option id.
pub trait OptionStore: Send + Sync {
    /// Fetch the record stored under `option_id`, or `None` when nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be read.
    fn get(&self, option_id: &str) -> StoreResult<Option<Record>>;

    /// Replace the record stored under `option_id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be written.
    fn set(&self, option_id: &str, record: &Record) -> StoreResult<()>;
}

/// Process-local store, useful for tests and ephemeral hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Record>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `record` under `option_id`.
    #[must_use]
    pub fn with_record(option_id: impl Into<String>, record: Record) -> Self {
        let mut records = HashMap::new();
        records.insert(option_id.into(), record);
        Self {
            records: RwLock::new(records),
        }
    }
}

impl OptionStore for MemoryStore {
    fn get(&self, option_id: &str) -> StoreResult<Option<Record>> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned {
            operation: "memory_store.get",
        })?;
        Ok(records.get(option_id).cloned())
    }

    fn set(&self, option_id: &str, record: &Record) -> StoreResult<()> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned {
            operation: "memory_store.set",
        })?;
        records.insert(option_id.to_string(), record.clone());
        Ok(())
    }
}

/// Store persisting every record into a single JSON document keyed by option id.
///
/// Writes go to a sibling temporary file that is renamed over the document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Use the document at `path`; it is created on the first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> StoreResult<HashMap<String, Record>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    operation: "json_store.read",
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&raw).map_err(|source| StoreError::Document {
            operation: "json_store.decode",
            path: self.path.clone(),
            source,
        })
    }

    fn write_all(&self, records: &HashMap<String, Record>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                operation: "json_store.create_dir",
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let encoded =
            serde_json::to_string_pretty(records).map_err(|source| StoreError::Document {
                operation: "json_store.encode",
                path: self.path.clone(),
                source,
            })?;
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, encoded).map_err(|source| StoreError::Io {
            operation: "json_store.write",
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &self.path).map_err(|source| StoreError::Io {
            operation: "json_store.rename",
            path: self.path.clone(),
            source,
        })
    }
}

impl OptionStore for JsonFileStore {
    fn get(&self, option_id: &str) -> StoreResult<Option<Record>> {
        Ok(self.read_all()?.remove(option_id))
    }

    fn set(&self, option_id: &str, record: &Record) -> StoreResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned {
            operation: "json_store.set",
        })?;
        let mut records = self.read_all()?;
        records.insert(option_id.to_string(), record.clone());
        self.write_all(&records)?;
        debug!(option_id, path = %self.path.display(), "option record written");
        Ok(())
    }
}
