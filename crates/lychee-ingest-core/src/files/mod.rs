//! File abstraction: one interface over uploads, temporaries and stored objects.
//!
//! Pipeline stages only ever see a [`MediaFile`]. Handles close when dropped;
//! a [`TemporaryFile`] additionally removes its backing file, so every exit
//! path of a stage releases what it acquired.

mod native;
mod temporary;

pub use native::NativeLocalFile;
pub use temporary::TemporaryFile;

use chrono::{DateTime, Utc};
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::convert::normalize_extension;
use crate::storage::Storage;

/// A readable, deletable file, wherever it lives.
pub trait MediaFile: Send + Sync + fmt::Debug {
    /// Extension of the file as the client named it, lowercase with a leading dot.
    fn original_extension(&self) -> String;

    /// File name as the client named it, without the extension.
    fn original_basename(&self) -> String;

    /// Open the content for reading.
    fn open(&self) -> io::Result<Box<dyn Read + Send>>;

    /// Size in bytes.
    fn filesize(&self) -> io::Result<u64>;

    /// Filesystem path, when the file lives on local disk.
    fn local_path(&self) -> Option<PathBuf>;

    /// Delete the file.
    fn delete(&self) -> io::Result<()>;

    /// Modification time as seen by the backing store.
    fn last_modified(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Whether this is an upload living on local disk, eligible for symlinking.
    fn is_native(&self) -> bool {
        false
    }
}

/// A relative path inside a [`Storage`].
#[derive(Clone)]
pub struct StoredFile {
    storage: Arc<dyn Storage>,
    path: String,
}

impl StoredFile {
    pub fn new(storage: Arc<dyn Storage>, path: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
        }
    }

    pub fn relative_path(&self) -> &str {
        &self.path
    }
}

impl fmt::Debug for StoredFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredFile")
            .field("storage", &self.storage.name())
            .field("path", &self.path)
            .finish()
    }
}

impl MediaFile for StoredFile {
    fn original_extension(&self) -> String {
        extension_of(Path::new(&self.path))
    }

    fn original_basename(&self) -> String {
        basename_of(Path::new(&self.path))
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        self.storage.read(&self.path).map_err(io::Error::other)
    }

    fn filesize(&self) -> io::Result<u64> {
        self.storage.size(&self.path).map_err(io::Error::other)
    }

    fn local_path(&self) -> Option<PathBuf> {
        self.storage.local_path(&self.path)
    }

    fn delete(&self) -> io::Result<()> {
        self.storage.delete(&self.path).map_err(io::Error::other)
    }
}

/// Normalised extension of `path`, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(normalize_extension)
        .unwrap_or_default()
}

/// File stem of `path`, lossily converted.
pub fn basename_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A local filesystem view of a [`MediaFile`].
///
/// Files without a local path are copied into a temporary file that lives as
/// long as the view.
pub enum LocalView {
    Direct(PathBuf),
    Copied(TemporaryFile),
}

impl LocalView {
    pub fn acquire(file: &dyn MediaFile) -> io::Result<Self> {
        if let Some(path) = file.local_path() {
            return Ok(Self::Direct(path));
        }
        let tmp = TemporaryFile::new(&file.original_extension())?;
        let mut reader = file.open()?;
        tmp.write_from(&mut reader)?;
        Ok(Self::Copied(tmp))
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Direct(path) => path,
            Self::Copied(tmp) => tmp.path(),
        }
    }
}
