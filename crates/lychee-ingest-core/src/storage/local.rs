//! Filesystem storage rooted at a directory.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{copy_with_stats, file_stats, validate_path, Storage, StreamStats};
use crate::error::{StorageError, StorageResult};

/// Stores objects as files below `root`.
///
/// Writes land in a temporary file next to the target and are renamed into
/// place, so a failed write never leaves a truncated object behind.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create a new storage rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> StorageResult<PathBuf> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }

    fn ensure_parent(&self, full_path: &Path, path: &str) -> StorageResult<PathBuf> {
        let parent = full_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&parent).map_err(|e| io_error(path, e))?;
        Ok(parent)
    }
}

fn io_error(path: &str, source: std::io::Error) -> StorageError {
    if source.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(path.to_string())
    } else {
        StorageError::Io {
            path: path.to_string(),
            source,
        }
    }
}

impl Storage for LocalStorage {
    fn name(&self) -> &'static str {
        "local"
    }

    fn write(&self, path: &str, reader: &mut dyn Read) -> StorageResult<StreamStats> {
        let full_path = self.full_path(path)?;
        let parent = self.ensure_parent(&full_path, path)?;
        tracing::trace!(storage_path = %path, full_path = %full_path.display(), "local storage: write");

        let mut tmp = NamedTempFile::new_in(&parent).map_err(|e| io_error(path, e))?;
        let stats = copy_with_stats(reader, tmp.as_file_mut()).map_err(|e| io_error(path, e))?;
        tmp.persist(&full_path)
            .map_err(|e| io_error(path, e.error))?;
        Ok(stats)
    }

    fn read(&self, path: &str) -> StorageResult<Box<dyn Read + Send>> {
        let full_path = self.full_path(path)?;
        let file = File::open(&full_path).map_err(|e| io_error(path, e))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn delete(&self, path: &str) -> StorageResult<()> {
        let full_path = self.full_path(path)?;
        fs::remove_file(&full_path).map_err(|e| io_error(path, e))
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path)
            .map(|p| p.symlink_metadata().is_ok())
            .unwrap_or(false)
    }

    fn size(&self, path: &str) -> StorageResult<u64> {
        let full_path = self.full_path(path)?;
        fs::metadata(&full_path)
            .map(|m| m.len())
            .map_err(|e| io_error(path, e))
    }

    fn local_path(&self, path: &str) -> Option<PathBuf> {
        self.full_path(path).ok()
    }

    #[cfg(unix)]
    fn symlink(&self, path: &str, target: &Path) -> StorageResult<StreamStats> {
        let full_path = self.full_path(path)?;
        self.ensure_parent(&full_path, path)?;
        let target = target.canonicalize().map_err(|e| io_error(path, e))?;
        let stats = file_stats(&target).map_err(|e| io_error(path, e))?;
        std::os::unix::fs::symlink(&target, &full_path).map_err(|e| io_error(path, e))?;
        tracing::trace!(storage_path = %path, target = %target.display(), "local storage: symlink");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let stats = storage
            .write("original/ab/cd/photo.jpg", &mut &b"jpeg bytes"[..])
            .unwrap();
        assert_eq!(stats.bytes, 10);
        assert!(storage.exists("original/ab/cd/photo.jpg"));
        assert_eq!(storage.size("original/ab/cd/photo.jpg").unwrap(), 10);

        let mut content = String::new();
        storage
            .read("original/ab/cd/photo.jpg")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "jpeg bytes");

        storage.delete("original/ab/cd/photo.jpg").unwrap();
        assert!(!storage.exists("original/ab/cd/photo.jpg"));
    }

    #[test]
    fn test_missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(matches!(
            storage.delete("thumb/none.jpg"),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.read("thumb/none.jpg"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        let result = storage.write("../outside.jpg", &mut &b"x"[..]);
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_points_at_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("upload.jpg");
        std::fs::write(&source, b"original").unwrap();

        let storage = LocalStorage::new(dir.path().join("store"));
        let stats = storage.symlink("original/x.jpg", &source).unwrap();
        assert_eq!(stats.bytes, 8);

        let link = storage.local_path("original/x.jpg").unwrap();
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read(&link).unwrap(), b"original");
    }
}
