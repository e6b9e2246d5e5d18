//! Durable key-value storage for client state that must survive restarts

use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, warn};

/// Raw string storage keyed by name
pub trait KeyValueStore: Send + Sync {
    fn get_raw(&self, key: &str) -> CoreResult<Option<String>>;

    fn set_raw(&self, key: &str, value: String) -> CoreResult<()>;

    fn remove(&self, key: &str) -> CoreResult<()>;
}

/// JSON helpers on top of [`KeyValueStore`]
pub trait KeyValueStoreExt: KeyValueStore {
    /// Read and deserialize `key`.
    ///
    /// Values written before JSON encoding was introduced are plain text; when
    /// the stored text does not parse as JSON it is offered to `T` as a JSON
    /// string instead. Read failures are logged and yield `None`.
    fn get_item<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.get_raw(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                error!(key, error = %err, "Failed to read storage key");
                return None;
            }
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Some(value),
            Err(parse_err) => {
                warn!(key, error = %parse_err, "Stored value is not JSON, using raw text");
                match serde_json::from_value::<T>(serde_json::Value::String(raw)) {
                    Ok(value) => Some(value),
                    Err(err) => {
                        error!(key, error = %err, "Stored value has an unexpected shape");
                        None
                    }
                }
            }
        }
    }

    /// Serialize `value` as JSON and store it under `key`
    fn set_item<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> CoreResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, raw)
    }

    fn remove_item(&self, key: &str) -> CoreResult<()> {
        self.remove(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

/// Process-local store, mainly for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> CoreResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: String) -> CoreResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk
///
/// Each write rewrites the file through a temporary sibling and a rename, so a
/// crash leaves either the old or the new contents.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> CoreResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(None),
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn load(&self) -> CoreResult<BTreeMap<String, String>> {
        match self.read()? {
            Some(contents) => serde_json::from_str(&contents).map_err(|e| {
                CoreError::storage(format!("Corrupt store {}: {e}", self.path.display()))
            }),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Like `load`, but a corrupt file is dropped so writes can proceed.
    /// The flag reports whether that happened.
    fn load_for_write(&self) -> CoreResult<(BTreeMap<String, String>, bool)> {
        let Some(contents) = self.read()? else {
            return Ok((BTreeMap::new(), false));
        };
        match serde_json::from_str(&contents) {
            Ok(entries) => Ok((entries, false)),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Replacing corrupt storage file");
                Ok((BTreeMap::new(), true))
            }
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> CoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "Storage file written");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_raw(&self, key: &str) -> CoreResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn set_raw(&self, key: &str, value: String) -> CoreResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut entries, _) = self.load_for_write()?;
        entries.insert(key.to_string(), value);
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut entries, recovered) = self.load_for_write()?;
        if entries.remove(key).is_some() || recovered {
            self.persist(&entries)?;
        }
        Ok(())
    }
}
