//! String-valued key/value storage backends.
//!
//! The cache manager only needs four synchronous operations, mirroring a
//! browser-style storage API. `FileStore` keeps one file per key on disk;
//! `MemoryStore` keeps everything in a map and can enforce a byte quota.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

/// Extension used for entry files written by `FileStore`.
const ENTRY_EXTENSION: &str = "json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage quota exceeded: {needed} bytes needed, limit is {limit}")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Synchronous string storage keyed by string.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;

    fn clear(&self) -> Result<(), StoreError>;
}

// ============================================================================
// File-backed store
// ============================================================================

/// Stores each entry as `<dir>/<encoded key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create the store, making sure the directory exists.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", encode_file_name(key), ENTRY_EXTENSION))
    }
}

/// Percent-encode anything outside `[A-Za-z0-9_.-]` so every key maps to a
/// distinct, portable file name (`:` is not allowed on Windows).
fn encode_file_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' => {
                name.push(byte as char)
            }
            _ => name.push_str(&format!("%{:02X}", byte)),
        }
    }
    name
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.entry_path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if !self.dir.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "cache directory {} is missing",
                self.dir.display()
            )));
        }
        fs::write(self.entry_path(key), value)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXTENSION) {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Map-backed store, optionally limited to a total number of bytes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes once keys plus values exceed `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StoreError> {
        self.items
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut items = self.lock()?;
        if let Some(limit) = self.quota_bytes {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > limit {
                return Err(StoreError::QuotaExceeded { needed, limit });
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.lock()?.clear();
        Ok(())
    }
}
