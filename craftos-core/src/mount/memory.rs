//! In-memory mount backing.
//!
//! Holds standalone ROM images and scratch media that have no host
//! directory behind them.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::{Arc, RwLock};

use crate::error::{CraftError, CraftResult};
use crate::path::VirtualPath;

/// Synthetic in-memory backing for a mount.
///
/// Flat map of normalized relative path to file bytes; directories are
/// implied by key prefixes. Clone is cheap (shares the map via `Arc`), so
/// one store can back several mounts.
#[derive(Debug, Default, Clone)]
pub struct MemStore {
    files: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with initial files.
    pub fn with_files<I, S>(files: I) -> CraftResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: AsRef<str>,
    {
        let store = Self::new();
        for (name, data) in files {
            store.add_file(name.as_ref(), data)?;
        }
        Ok(store)
    }

    /// Load a ROM image: a JSON object mapping relative paths to text
    /// contents.
    pub fn from_image(json: &str) -> CraftResult<Self> {
        let image: BTreeMap<String, String> = serde_json::from_str(json)?;
        Self::with_files(image.into_iter().map(|(k, v)| (k, v.into_bytes())))
    }

    /// Add a file, normalizing its relative path.
    pub fn add_file(&self, name: &str, data: impl Into<Vec<u8>>) -> CraftResult<()> {
        let key = store_key(name)?;
        if key.is_empty() {
            return Err(CraftError::InvalidPath(name.to_string()));
        }
        let mut files = self.files.write().map_err(|_| CraftError::LockPoisoned)?;
        files.insert(key, data.into());
        Ok(())
    }

    pub fn read_file(&self, name: &str) -> Option<Vec<u8>> {
        let key = store_key(name).ok()?;
        let files = self.files.read().ok()?;
        files.get(&key).cloned()
    }

    pub fn exists(&self, name: &str) -> bool {
        let Ok(key) = store_key(name) else {
            return false;
        };
        if let Ok(files) = self.files.read() {
            return files.contains_key(&key);
        }
        false
    }

    /// Whether `name` is a directory, i.e. the store root or a prefix of
    /// some stored file.
    pub fn is_dir(&self, name: &str) -> bool {
        let Ok(key) = store_key(name) else {
            return false;
        };
        if key.is_empty() {
            return true;
        }
        let prefix = format!("{key}/");
        if let Ok(files) = self.files.read() {
            return files.keys().any(|k| k.starts_with(&prefix));
        }
        false
    }

    /// List the immediate children of a directory, sorted.
    pub fn list(&self, name: &str) -> CraftResult<Vec<String>> {
        let key = store_key(name)?;
        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        };
        let files = self.files.read().map_err(|_| CraftError::LockPoisoned)?;
        let mut children = BTreeSet::new();
        for k in files.keys() {
            if let Some(rest) = k.strip_prefix(&prefix) {
                if let Some(first) = rest.split('/').next() {
                    if !first.is_empty() {
                        children.insert(first.to_string());
                    }
                }
            }
        }
        if children.is_empty() && !key.is_empty() {
            return Err(CraftError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("not a directory: {name}"),
            )));
        }
        Ok(children.into_iter().collect())
    }

    pub fn remove_file(&self, name: &str) -> bool {
        let Ok(key) = store_key(name) else {
            return false;
        };
        if key.is_empty() {
            return false;
        }
        if let Ok(mut files) = self.files.write() {
            return files.remove(&key).is_some();
        }
        false
    }
}

/// Normalize a store-relative name to its map key; the store root is the
/// empty key.
fn store_key(name: &str) -> CraftResult<String> {
    if name.trim().is_empty() {
        return Ok(String::new());
    }
    let normalized = VirtualPath::normalize(name)?;
    Ok(normalized.as_str().trim_start_matches('/').to_string())
}
