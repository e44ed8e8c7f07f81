//! Cross-platform key-value storage.
//!
//! [`KeyValueStore`] is the durable store the engine is given. Backends:
//! - Web: `localStorage`
//! - Desktop: one JSON file per key in the platform config directory:
//!   - Linux: `~/.config/hangouts/`
//!   - macOS: `~/Library/Application Support/hangouts/`
//!   - Windows: `%APPDATA%\hangouts\`
//! - [`MemoryStore`] for tests and throwaway sessions.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::StorageError;

/// A durable string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process store. Contents are lost when it is dropped.
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
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

// =========================================
// Web (WASM) implementation
// =========================================

/// Browser `localStorage`, shared by every tab of the profile.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone)]
pub struct LocalStore;

#[cfg(target_arch = "wasm32")]
impl LocalStore {
    pub fn new() -> Result<Self, StorageError> {
        local_storage()?;
        Ok(Self)
    }
}

#[cfg(target_arch = "wasm32")]
fn local_storage() -> Result<web_sys::Storage, StorageError> {
    let window = web_sys::window().ok_or(StorageError::Unavailable("no window"))?;
    window
        .local_storage()
        .ok()
        .flatten()
        .ok_or(StorageError::Unavailable("localStorage disabled"))
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        local_storage()?
            .get_item(key)
            .map_err(|e| StorageError::Backend(format!("{:?}", e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        local_storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Backend(format!("{:?}", e)))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        local_storage()?
            .remove_item(key)
            .map_err(|e| StorageError::Backend(format!("{:?}", e)))
    }
}

// =========================================
// Desktop (native) implementation
// =========================================

/// JSON files in a directory, one per key.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl LocalStore {
    /// Store under the platform config directory.
    pub fn new() -> Result<Self, StorageError> {
        let config_dir = dirs::config_dir().ok_or(StorageError::Unavailable("no config directory"))?;
        Self::in_dir(config_dir.join("hangouts"))
    }

    /// Store under an explicit directory, creating it if needed.
    pub fn in_dir(dir: impl Into<std::path::PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    fn file_path(&self, key: &str) -> std::path::PathBuf {
        // Sanitize key to be a valid filename
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        self.dir.join(format!("{}.json", safe_key))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.file_path(key)) {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::write(self.file_path(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.file_path(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
