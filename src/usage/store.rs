//! Persistence for the usage snapshot.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use thiserror::Error;

use super::UsageSnapshot;

/// Errors raised by a [`SnapshotStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("Snapshot store I/O error at '{path}': {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The stored snapshot could not be (de)serialized.
    #[error("Snapshot store contains invalid data: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Key-value persistence for the latest [`UsageSnapshot`].
///
/// The client seeds its usage gate from [`load`](SnapshotStore::load) at
/// construction and calls [`save`](SnapshotStore::save) after every
/// subscription refresh.
pub trait SnapshotStore: Send + Sync {
    /// Returns the stored snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    fn load(&self) -> Result<Option<UsageSnapshot>, StoreError>;

    /// Replaces the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    fn save(&self, snapshot: &UsageSnapshot) -> Result<(), StoreError>;

    /// Removes the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    fn clear(&self) -> Result<(), StoreError>;
}

/// In-process store. The default when no store is configured.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshot: RwLock<Option<UsageSnapshot>>,
}

impl MemorySnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<UsageSnapshot>, StoreError> {
        Ok(self
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, snapshot: &UsageSnapshot) -> Result<(), StoreError> {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// JSON file store.
///
/// Writes go to a uniquely named sibling temporary file which is then
/// renamed over the target, so readers never observe a partial snapshot
/// and concurrent writers never share a temporary file. The last rename
/// wins.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Creates a store backed by `path`. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsStr::to_os_string)
            .unwrap_or_default();
        name.push(format!(".{:016x}.tmp", rand::random::<u64>()));
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<UsageSnapshot>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, snapshot: &UsageSnapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let data = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.temp_path();
        let written = fs::write(&tmp, data).and_then(|()| fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(self.io_error(e));
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::{Tier, UsageCounters};
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample() -> UsageSnapshot {
        UsageSnapshot {
            tier: Tier::Free,
            limits: UsageCounters {
                calls: 1000,
                products: 10,
                events: 100,
            },
            used: UsageCounters {
                calls: 12,
                products: 1,
                events: 3,
            },
            fetched_at: Utc::now(),
            resets_at: None,
        }
    }

    #[test]
    fn test_memory_store_save_load_clear() {
        let store = MemorySnapshotStore::new();
        assert!(store.load().unwrap().is_none());

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap().unwrap().used.calls, 12);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("usage.json"));

        assert!(store.load().unwrap().is_none());
        assert!(store.clear().is_ok());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("usage.json");
        let snapshot = sample();

        FileSnapshotStore::new(&path).save(&snapshot).unwrap();
        let loaded = FileSnapshotStore::new(&path).load().unwrap().unwrap();

        assert_eq!(loaded, snapshot);
        let entries: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![OsStr::new("usage.json").to_os_string()]);
    }

    #[test]
    fn test_file_store_concurrent_saves_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usage.json");
        let store = FileSnapshotStore::new(&path);

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8_u64)
                .map(|i| {
                    let store = &store;
                    scope.spawn(move || {
                        let mut snapshot = sample();
                        snapshot.used.calls = i;
                        for _ in 0..20 {
                            store.save(&snapshot).unwrap();
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        });

        let loaded = store.load().unwrap().unwrap();
        assert!(loaded.used.calls < 8);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_file_store_corrupt_data_is_serde_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usage.json");
        fs::write(&path, "not json").unwrap();

        let err = FileSnapshotStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Serde(_)));
    }
}
