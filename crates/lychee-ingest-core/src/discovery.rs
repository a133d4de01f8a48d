//! Finding importable files on disk.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::convert::{classify, FormatClass};
use crate::files::extension_of;

/// Discovers files the pipeline accepts.
pub struct FileDiscovery {
    accepted_raw: Vec<String>,
}

/// A file found by [`FileDiscovery`].
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileDiscovery {
    pub fn new(config: &Config) -> Self {
        Self {
            accepted_raw: config.formats.accepted_raw_formats.clone(),
        }
    }

    /// Discover all importable files at a path.
    ///
    /// A file path is returned as is if importable. Directories are walked
    /// recursively, skipping hidden entries.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        if path.is_file() {
            return match std::fs::metadata(path) {
                Ok(meta) if self.is_importable(path) => vec![DiscoveredFile {
                    path: path.to_path_buf(),
                    size: meta.len(),
                }],
                _ => vec![],
            };
        }

        let mut files: Vec<DiscoveredFile> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && self.is_importable(e.path()))
            .filter_map(|e| {
                let size = e.metadata().ok()?.len();
                Some(DiscoveredFile {
                    path: e.into_path(),
                    size,
                })
            })
            .collect();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Whether the pipeline would accept a file with this name.
    pub fn is_importable(&self, path: &Path) -> bool {
        classify(&extension_of(path), &self.accepted_raw) != FormatClass::Unsupported
    }

    /// Total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_importable() {
        let discovery = FileDiscovery::new(&Config::default());

        assert!(discovery.is_importable(Path::new("test.jpg")));
        assert!(discovery.is_importable(Path::new("test.JPG")));
        assert!(discovery.is_importable(Path::new("test.tiff")));
        assert!(discovery.is_importable(Path::new("IMG_0001.CR3")));
        assert!(discovery.is_importable(Path::new("phone.heic")));
        assert!(!discovery.is_importable(Path::new("test.txt")));
        assert!(!discovery.is_importable(Path::new("README")));
    }

    #[test]
    fn test_accepted_raw_from_config() {
        let mut config = Config::default();
        config.formats.accepted_raw_formats = vec![".x3f".to_string()];
        let discovery = FileDiscovery::new(&config);
        assert!(discovery.is_importable(Path::new("sigma.x3f")));
    }

    #[test]
    fn test_discover_walks_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("2024/summer")).unwrap();
        std::fs::create_dir_all(dir.path().join(".thumbnails")).unwrap();
        std::fs::write(dir.path().join("b.png"), b"12").unwrap();
        std::fs::write(dir.path().join("2024/summer/a.nef"), b"123").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(dir.path().join(".thumbnails/c.jpg"), b"x").unwrap();

        let discovery = FileDiscovery::new(&Config::default());
        let files = discovery.discover(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![PathBuf::from("2024/summer/a.nef"), PathBuf::from("b.png")]
        );
        assert_eq!(FileDiscovery::total_size(&files), 5);
    }

    #[test]
    fn test_discover_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.jpg");
        std::fs::write(&path, b"jpeg").unwrap();
        let discovery = FileDiscovery::new(&Config::default());
        assert_eq!(discovery.discover(&path).len(), 1);
        assert!(discovery.discover(&dir.path().join("missing.jpg")).is_empty());
    }
}
