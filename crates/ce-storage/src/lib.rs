//! Durable key/value storage.
//!
//! Each key holds one JSON document. Writes replace the whole document, so readers never
//! observe a partial value.

use anyhow::{Context, Result};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Keys owned by the campus services. Each key has exactly one owning component.
pub mod keys {
    /// Booking collection, owned by the booking store.
    pub const BOOKINGS: &str = "campus:bookings";
    /// Events entered through the admin panel.
    pub const ADMIN_EVENTS: &str = "campus:events";
    /// Admin override for the "next event" countdown.
    pub const NEXT_EVENT: &str = "campus:nextEventTime";
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o failed for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed value under key {key}: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait DurableStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode the JSON document under `key`.
pub fn read_json<T: DeserializeOwned>(
    storage: &dyn DurableStorage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match storage.get(key)? {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Malformed {
                key: key.to_owned(),
                source,
            }),
    }
}

pub fn write_json<T: Serialize + ?Sized>(
    storage: &dyn DurableStorage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Malformed {
        key: key.to_owned(),
        source,
    })?;
    storage.set(key, &raw)
}

/// Process-local storage, used by tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DurableStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One file per key under a data directory. Writes go to a temp file that is renamed
/// over the target.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create data dir {}", dir.display()))?;
        debug!(dir = %dir.display(), "opened file storage");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

/// Escape anything outside `[A-Za-z0-9._-]` as `%XX` so distinct keys map to distinct
/// file names.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let target = self.path_for(key);
        let tmp = target.with_extension("json.tmp");
        let io = |source| StorageError::Io {
            key: key.to_owned(),
            source,
        };
        fs::write(&tmp, value).map_err(io)?;
        fs::rename(&tmp, &target).map_err(io)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }
}

/// Smart constructor for the in-memory backend.
pub fn memory() -> Arc<dyn DurableStorage> {
    Arc::new(MemoryStorage::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_roundtrip_and_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get(keys::BOOKINGS).unwrap(), None);
        storage.set(keys::BOOKINGS, "[]").unwrap();
        assert_eq!(storage.get(keys::BOOKINGS).unwrap().as_deref(), Some("[]"));
        storage.remove(keys::BOOKINGS).unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileStorage::open(dir.path()).unwrap();
        write_json(&first, keys::BOOKINGS, &vec![1, 2, 3]).unwrap();

        let second = FileStorage::open(dir.path()).unwrap();
        let loaded: Option<Vec<u32>> = read_json(&second, keys::BOOKINGS).unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));

        second.remove(keys::BOOKINGS).unwrap();
        second.remove(keys::BOOKINGS).unwrap();
        assert_eq!(first.get(keys::BOOKINGS).unwrap(), None);
    }

    #[test]
    fn keys_map_to_distinct_files() {
        assert_eq!(encode_key("campus:bookings"), "campus%3Abookings");
        assert_ne!(encode_key("a:b"), encode_key("a_b"));
    }

    #[test]
    fn malformed_json_is_reported() {
        let storage = MemoryStorage::new();
        storage.set(keys::ADMIN_EVENTS, "{not json").unwrap();
        let res: Result<Option<Vec<String>>, _> = read_json(&storage, keys::ADMIN_EVENTS);
        assert!(matches!(res, Err(StorageError::Malformed { .. })));
    }
}
