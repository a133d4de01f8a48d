//! Byte-level storage backends keyed by relative path.
//!
//! Every stored artifact (size variants, watermarked copies, backups) goes
//! through a [`Storage`]. Writes stream through a BLAKE3 hasher so the caller
//! gets [`StreamStats`] without reading the data twice.

mod local;
mod memory;

pub use local::LocalStorage;
pub use memory::MemoryStorage;

use blake3::Hasher as Blake3Hasher;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};

use crate::error::{StorageError, StorageResult};

/// Statistics of a completed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    /// Number of bytes written
    pub bytes: u64,
    /// BLAKE3 hex digest of the written bytes
    pub checksum: String,
}

/// Storage backend.
pub trait Storage: Send + Sync {
    /// Short backend name for logs and errors.
    fn name(&self) -> &'static str;

    /// Write the whole of `reader` to `path`, replacing any existing object.
    fn write(&self, path: &str, reader: &mut dyn Read) -> StorageResult<StreamStats>;

    /// Open `path` for reading.
    fn read(&self, path: &str) -> StorageResult<Box<dyn Read + Send>>;

    /// Delete `path`.
    fn delete(&self, path: &str) -> StorageResult<()>;

    /// Whether an object exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Size in bytes of the object at `path`.
    fn size(&self, path: &str) -> StorageResult<u64>;

    /// Filesystem location of `path`, for backends that have one.
    fn local_path(&self, _path: &str) -> Option<PathBuf> {
        None
    }

    /// Store `path` as a symlink to `target` instead of a copy.
    fn symlink(&self, _path: &str, _target: &Path) -> StorageResult<StreamStats> {
        Err(StorageError::Unsupported {
            backend: self.name(),
            operation: "symlink",
        })
    }
}

/// Reject paths that would escape the storage root.
pub(crate) fn validate_path(path: &str) -> StorageResult<()> {
    if path.is_empty() {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    let ok = Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidPath(path.to_string()))
    }
}

/// Copy `reader` into `writer`, hashing on the way.
pub fn copy_with_stats(reader: &mut dyn Read, writer: &mut dyn Write) -> io::Result<StreamStats> {
    let mut hasher = Blake3Hasher::new();
    let mut bytes: u64 = 0;

    // Use 64KB buffer for efficient reading
    let mut buffer = vec![0u8; 65536];
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
        writer.write_all(&buffer[..bytes_read])?;
        bytes += bytes_read as u64;
    }
    writer.flush()?;

    Ok(StreamStats {
        bytes,
        checksum: hasher.finalize().to_hex().to_string(),
    })
}

/// BLAKE3 statistics of a file on disk, without copying it anywhere.
pub fn file_stats(path: &Path) -> io::Result<StreamStats> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    copy_with_stats(&mut reader, &mut io::sink())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_with_stats() {
        let data = b"hello lychee".to_vec();
        let mut out = Vec::new();
        let stats = copy_with_stats(&mut data.as_slice(), &mut out).unwrap();
        assert_eq!(out, data);
        assert_eq!(stats.bytes, data.len() as u64);
        assert_eq!(stats.checksum, blake3::hash(&data).to_hex().to_string());
    }

    #[test]
    fn test_file_stats_matches_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        let data = vec![7u8; 200_000];
        std::fs::write(&path, &data).unwrap();
        let stats = file_stats(&path).unwrap();
        assert_eq!(stats.bytes, 200_000);
        assert_eq!(stats.checksum, blake3::hash(&data).to_hex().to_string());
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("original/ab/cd/ef.jpg").is_ok());
        assert!(validate_path("").is_err());
        assert!(validate_path("/etc/passwd").is_err());
        assert!(validate_path("thumb/../../x").is_err());
        assert!(validate_path("./x").is_err());
    }
}
