//! Durable key/value store for user-editable settings.
//!
//! Values are kept as JSON in a single file and mirrored in memory.
//! The store fails soft: unreadable or corrupt data yields defaults on `get`,
//! and write failures are logged and dropped on `set`.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub struct ConfigStore {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl ConfigStore {
    /// Opens the store backed by `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        debug!("Opened config store at {} ({} keys)", path.display(), entries.len());
        Self {
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    /// A store with no backing file; contents are lost with the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the stored value for `key`, or `default` if it is absent or does not decode.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(_) => return default,
        };
        match entries.get(key) {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                warn!("Stored value for '{key}' is unreadable ({e}); using default");
                default
            }),
            None => default,
        }
    }

    /// Stores `value` under `key` and persists the whole store.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.set_many([(key, value)]),
            Err(e) => warn!("Cannot encode value for '{key}': {e}"),
        }
    }

    /// Stores several already-encoded values with a single write of the file.
    pub fn set_many<'a>(&self, values: impl IntoIterator<Item = (&'a str, Value)>) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        for (key, value) in values {
            entries.insert(key.to_string(), value);
        }
        if let Some(path) = &self.path {
            if let Err(e) = write_atomic(path, &entries) {
                warn!("Failed to persist config store to {}: {e}", path.display());
            }
        }
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, Value> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!("Cannot read config store {}: {e}", path.display());
            return BTreeMap::new();
        }
    };
    if content.trim().is_empty() {
        return BTreeMap::new();
    }
    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!("Config store {} is corrupt ({e}); starting empty", path.display());
        BTreeMap::new()
    })
}

/// Writes to a sibling temp file, syncs it, then renames over the target.
fn write_atomic(path: &Path, entries: &BTreeMap<String, Value>) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_vec_pretty(entries)?;
    let tmp_path = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&content)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)
}
