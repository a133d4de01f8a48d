//! In-process object store.
//!
//! Behaves like a remote object store: no filesystem paths, no symlinks.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{copy_with_stats, validate_path, Storage, StreamStats};
use crate::error::{StorageError, StorageResult};

/// Objects held in memory.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<String, Arc<Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> MutexGuard<'_, BTreeMap<String, Arc<Vec<u8>>>> {
        // A poisoned map is still structurally valid.
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.objects().keys().cloned().collect()
    }

    /// Contents of `path`, if stored.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects().get(path).map(|data| data.as_ref().clone())
    }
}

impl Storage for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn write(&self, path: &str, reader: &mut dyn Read) -> StorageResult<StreamStats> {
        validate_path(path)?;
        let mut data = Vec::new();
        let stats = copy_with_stats(reader, &mut data).map_err(|source| StorageError::Io {
            path: path.to_string(),
            source,
        })?;
        self.objects().insert(path.to_string(), Arc::new(data));
        Ok(stats)
    }

    fn read(&self, path: &str) -> StorageResult<Box<dyn Read + Send>> {
        let data = self
            .objects()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        Ok(Box::new(Cursor::new(data.as_ref().clone())))
    }

    fn delete(&self, path: &str) -> StorageResult<()> {
        self.objects()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.objects().contains_key(path)
    }

    fn size(&self, path: &str) -> StorageResult<u64> {
        self.objects()
            .get(path)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_roundtrip_and_listing() {
        let storage = MemoryStorage::new();
        storage.write("thumb/b.jpg", &mut &b"bb"[..]).unwrap();
        storage.write("raw/a.nef", &mut &b"aaa"[..]).unwrap();

        assert_eq!(storage.paths(), vec!["raw/a.nef", "thumb/b.jpg"]);
        assert_eq!(storage.size("raw/a.nef").unwrap(), 3);
        assert_eq!(storage.get("thumb/b.jpg").unwrap(), b"bb");

        storage.delete("raw/a.nef").unwrap();
        assert!(!storage.exists("raw/a.nef"));
        assert!(matches!(
            storage.delete("raw/a.nef"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_symlink_unsupported() {
        let storage = MemoryStorage::new();
        let err = storage
            .symlink("original/x.jpg", Path::new("/tmp/x.jpg"))
            .unwrap_err();
        assert!(matches!(err, StorageError::Unsupported { .. }));
        assert!(storage.local_path("original/x.jpg").is_none());
    }
}
