//! Durable seen-flag store for one-time notices.
//!
//! Flags live in a single JSON object file (`{"notification_seen_<id>": true}`)
//! under the app data directory, so they survive daemon restarts.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait FlagStore: Send + Sync {
    fn get(&self, key: &str) -> Option<bool>;
    /// Records `value` for `key`. Fire-and-forget: write failures are logged,
    /// never returned or retried.
    fn set(&self, key: &str, value: bool);
}

/// Store key for the seen flag of notification `id`.
pub fn seen_key(id: &str) -> String {
    format!("notification_seen_{id}")
}

pub struct JsonFlagStore {
    path: PathBuf,
    flags: Mutex<BTreeMap<String, bool>>,
}

impl JsonFlagStore {
    /// Loads the store at `path`, starting empty if the file does not exist.
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let flags = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read flag store: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse flag store: {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            flags: Mutex::new(flags),
        })
    }

    /// Like [`JsonFlagStore::load`], but a broken file is logged and replaced
    /// by an empty store at the same path.
    pub fn load_or_empty(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "Seen flags unreadable; starting empty");
            Self {
                path: path.to_path_buf(),
                flags: Mutex::new(BTreeMap::new()),
            }
        })
    }

    fn persist(&self, flags: &BTreeMap<String, bool>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(flags)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write flag store: {}", self.path.display()))
    }
}

impl FlagStore for JsonFlagStore {
    fn get(&self, key: &str) -> Option<bool> {
        self.flags
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
            .copied()
    }

    fn set(&self, key: &str, value: bool) {
        let mut flags = self.flags.lock().unwrap_or_else(|p| p.into_inner());
        flags.insert(key.to_string(), value);
        if let Err(e) = self.persist(&flags) {
            tracing::warn!(key, error = %e, "Failed to persist seen flag");
        }
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryFlagStore {
    pub flags: Mutex<BTreeMap<String, bool>>,
    pub writes: Mutex<Vec<(String, bool)>>,
}

#[cfg(test)]
impl FlagStore for MemoryFlagStore {
    fn get(&self, key: &str) -> Option<bool> {
        self.flags.lock().unwrap().get(key).copied()
    }

    fn set(&self, key: &str, value: bool) {
        self.flags.lock().unwrap().insert(key.to_string(), value);
        self.writes.lock().unwrap().push((key.to_string(), value));
    }
}
