//! Persistent key-value store for applications.
//!
//! Values are serde-serialized JSON, one file per key under an optional
//! storage directory. Without a directory the store is purely in-memory,
//! which tests and ephemeral runs use. Reads always hit the in-memory map;
//! the directory is only read once at startup and written through on save.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::behavior::Value;

/// String-keyed JSON store, optionally persisted to disk.
#[derive(Debug, Default)]
pub struct KeyValueStore {
    entries: RwLock<HashMap<String, Value>>,
    storage_dir: Option<PathBuf>,
}

impl KeyValueStore {
    /// In-memory store with no persistence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store backed by one JSON file per key under `dir`. Creates the
    /// directory and loads any existing entries.
    pub fn with_storage(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating storage directory {}", dir.display()))?;

        let mut entries = HashMap::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match std::fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|text| serde_json::from_str(&text).map_err(Into::into))
            {
                Ok(value) => {
                    entries.insert(key.to_string(), value);
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping unreadable storage entry");
                }
            }
        }
        debug!(dir = %dir.display(), entries = entries.len(), "storage loaded");
        Ok(Self {
            entries: RwLock::new(entries),
            storage_dir: Some(dir),
        })
    }

    /// Serialize and store `value` under `key`, writing through to disk
    /// when persistence is configured.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        if key.is_empty() || key.contains(['/', '\\', '.']) {
            bail!("invalid storage key `{key}`");
        }
        let value = serde_json::to_value(value)?;
        if let Some(dir) = &self.storage_dir {
            let path = entry_path(dir, key);
            let text = serde_json::to_string_pretty(&value)?;
            std::fs::write(&path, text)
                .with_context(|| format!("writing storage entry {}", path.display()))?;
        }
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    /// Fetch and deserialize the value under `key`. Missing keys and
    /// type mismatches both yield `None`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.read().get(key).cloned()?;
        serde_json::from_value(value).ok()
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        if let Some(dir) = &self.storage_dir {
            let path = entry_path(dir, key);
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("removing storage entry {}", path.display()))?;
            }
        }
        self.entries.write().remove(key);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let keys: Vec<String> = self.entries.read().keys().cloned().collect();
        for key in keys {
            self.remove(&key)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn entry_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}
