use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use super::{basename_of, extension_of, MediaFile};

/// An uploaded file on local disk.
///
/// Upload handlers usually park the bytes under a generated name, so the name
/// the client sent is tracked separately and drives extension and title.
#[derive(Debug, Clone)]
pub struct NativeLocalFile {
    path: PathBuf,
    original_name: String,
}

impl NativeLocalFile {
    /// A file whose disk name is also its client name.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            original_name,
        }
    }

    /// A file stored at `path` that the client called `original_name`.
    pub fn with_original_name(path: impl Into<PathBuf>, original_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            original_name: original_name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MediaFile for NativeLocalFile {
    fn original_extension(&self) -> String {
        let ext = extension_of(Path::new(&self.original_name));
        if ext.is_empty() {
            extension_of(&self.path)
        } else {
            ext
        }
    }

    fn original_basename(&self) -> String {
        basename_of(Path::new(&self.original_name))
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        let file = File::open(&self.path)?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn filesize(&self) -> io::Result<u64> {
        fs::metadata(&self.path).map(|m| m.len())
    }

    fn local_path(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }

    fn delete(&self) -> io::Result<()> {
        fs::remove_file(&self.path)
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from)
    }

    fn is_native(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_name_wins_over_disk_name() {
        let dir = tempfile::tempdir().unwrap();
        let disk = dir.path().join("upload-3f9a");
        fs::write(&disk, b"bytes").unwrap();

        let file = NativeLocalFile::with_original_name(&disk, "Holiday Beach.HEIC");
        assert_eq!(file.original_extension(), ".heic");
        assert_eq!(file.original_basename(), "Holiday Beach");
        assert_eq!(file.filesize().unwrap(), 5);
        assert!(file.last_modified().is_some());
        assert!(file.is_native());

        file.delete().unwrap();
        assert!(!disk.exists());
    }

    #[test]
    fn test_new_uses_disk_name() {
        let file = NativeLocalFile::new("/photos/IMG_0001.jpg");
        assert_eq!(file.original_extension(), ".jpg");
        assert_eq!(file.original_basename(), "IMG_0001");
    }
}
