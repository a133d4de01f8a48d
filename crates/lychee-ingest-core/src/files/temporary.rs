use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{basename_of, MediaFile};
use crate::convert::normalize_extension;

/// A scratch file produced mid-pipeline. Removed from disk when dropped.
pub struct TemporaryFile {
    inner: NamedTempFile,
    extension: String,
    original_basename: Option<String>,
}

impl TemporaryFile {
    /// Create an empty temporary file with the given extension.
    pub fn new(extension: &str) -> io::Result<Self> {
        let extension = normalize_extension(extension);
        let inner = tempfile::Builder::new()
            .prefix("lychee-")
            .suffix(&extension)
            .tempfile()?;
        Ok(Self {
            inner,
            extension,
            original_basename: None,
        })
    }

    /// Carry the client name of the file this one was derived from.
    pub fn with_original_basename(mut self, basename: impl Into<String>) -> Self {
        self.original_basename = Some(basename.into());
        self
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Replace the content with everything in `reader`.
    pub fn write_from(&self, reader: &mut dyn Read) -> io::Result<u64> {
        let mut file = File::create(self.path())?;
        let written = io::copy(reader, &mut file)?;
        file.flush()?;
        Ok(written)
    }
}

impl fmt::Debug for TemporaryFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryFile")
            .field("path", &self.path())
            .finish()
    }
}

impl MediaFile for TemporaryFile {
    fn original_extension(&self) -> String {
        self.extension.clone()
    }

    fn original_basename(&self) -> String {
        self.original_basename
            .clone()
            .unwrap_or_else(|| basename_of(self.path()))
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        let file = File::open(self.path())?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn filesize(&self) -> io::Result<u64> {
        fs::metadata(self.path()).map(|m| m.len())
    }

    fn local_path(&self) -> Option<PathBuf> {
        Some(self.path().to_path_buf())
    }

    fn delete(&self) -> io::Result<()> {
        // The handle still owns the name; dropping it later tolerates the gap.
        fs::remove_file(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_on_drop() {
        let tmp = TemporaryFile::new("JPG").unwrap();
        let path = tmp.path().to_path_buf();
        assert!(path.to_string_lossy().ends_with(".jpg"));
        tmp.write_from(&mut &b"data"[..]).unwrap();
        assert_eq!(tmp.filesize().unwrap(), 4);
        drop(tmp);
        assert!(!path.exists());
    }

    #[test]
    fn test_original_basename_is_carried() {
        let tmp = TemporaryFile::new(".jpg")
            .unwrap()
            .with_original_basename("DSC_0042");
        assert_eq!(tmp.original_basename(), "DSC_0042");
        assert_eq!(tmp.original_extension(), ".jpg");
    }
}
