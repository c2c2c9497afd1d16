//! Persisted lead context
//!
//! After a guide request the visitor keeps a small record (who they are,
//! which guide, the signed token) so later guide pages can unlock without
//! putting identifiers in URLs. The record lives under one key of a
//! key/value storage; anything unreadable under that key is purged.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Storage key for the lead context
pub const LEAD_CONTEXT_KEY: &str = "guide-lead-context";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadContext {
    pub first_name: String,
    pub email: String,
    pub city: String,
    pub guide_slug: String,
    pub token: String,
}

/// Minimal string key/value storage, shaped like browser local storage
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile storage, mostly for tests and short-lived clients
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::Storage("memory storage poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Storage("memory storage poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Storage("memory storage poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }
}

/// One file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` as the storage root, creating it if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| Error::Storage(e.to_string()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::Storage(format!("invalid storage key {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read(self.path_for(key)?) {
            // Non UTF-8 bytes count as corrupt content, not as an I/O failure
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| Error::Storage(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| Error::Storage(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(e.to_string())),
        }
    }
}

/// Reads and writes the lead context in a [`KeyValueStorage`]
pub struct LeadContextStore<S> {
    storage: S,
}

impl<S: KeyValueStorage> LeadContextStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Current lead context, if any.
    ///
    /// Corrupt JSON is treated as absent and removed from storage.
    pub fn read(&self) -> Result<Option<LeadContext>> {
        let Some(raw) = self.storage.get(LEAD_CONTEXT_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str::<LeadContext>(&raw) {
            Ok(context) => Ok(Some(context)),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable lead context");
                self.storage.remove(LEAD_CONTEXT_KEY)?;
                Ok(None)
            }
        }
    }

    /// Store a new context, or clear it with `None`
    pub fn update(&self, context: Option<&LeadContext>) -> Result<()> {
        match context {
            Some(context) => self
                .storage
                .set(LEAD_CONTEXT_KEY, &serde_json::to_string(context)?),
            None => self.storage.remove(LEAD_CONTEXT_KEY),
        }
    }

    /// Whether the stored context unlocks `guide_slug`
    pub fn grants(&self, guide_slug: &str) -> Result<bool> {
        Ok(self
            .read()?
            .map(|c| c.guide_slug == guide_slug && !c.token.is_empty())
            .unwrap_or(false))
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}
