//! File-backed catalog for the command-line front end.
//!
//! The whole catalog is one JSON document. Every mutation rewrites it through
//! a temporary file in the same directory followed by a rename, so a crash
//! leaves either the old or the new catalog on disk.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tempfile::NamedTempFile;

use super::{Catalog, PhotoRepository, RepositoryResult};
use crate::error::RepositoryError;
use crate::types::{AlbumId, AlbumSizeStatistics, Photo, PhotoId, SizeVariantType};

#[derive(Debug)]
pub struct JsonCatalog {
    path: PathBuf,
    catalog: Mutex<Catalog>,
}

impl JsonCatalog {
    /// Open the catalog at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> RepositoryResult<Self> {
        let path = path.into();
        let catalog = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Catalog::default()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Catalog::default()
        };
        tracing::debug!(path = %path.display(), "Opened catalog");
        Ok(Self {
            path,
            catalog: Mutex::new(catalog),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Catalog>> {
        self.catalog.lock().map_err(|_| RepositoryError::Poisoned)
    }

    /// Apply `change` to a copy and persist it; memory only moves on success.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Catalog) -> RepositoryResult<T>,
    ) -> RepositoryResult<T> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let value = change(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(value)
    }

    fn persist(&self, catalog: &Catalog) -> RepositoryResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let tmp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, catalog)?;
            writer.flush()?;
        }
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl PhotoRepository for JsonCatalog {
    fn find_by_checksum(&self, checksum: &str) -> RepositoryResult<Option<Photo>> {
        Ok(self.lock()?.find_by_checksum(checksum))
    }

    fn find_live_partner(&self, owner_id: u32, content_id: &str) -> RepositoryResult<Option<Photo>> {
        Ok(self.lock()?.find_live_partner(owner_id, content_id))
    }

    fn insert(&self, photo: &Photo) -> RepositoryResult<()> {
        self.mutate(|c| c.insert(photo))
    }

    fn update(&self, photo: &Photo) -> RepositoryResult<()> {
        self.mutate(|c| c.update(photo))
    }

    fn get(&self, id: &PhotoId) -> RepositoryResult<Option<Photo>> {
        Ok(self.lock()?.get(id))
    }

    fn list(&self, album: Option<&AlbumId>) -> RepositoryResult<Vec<Photo>> {
        Ok(self.lock()?.list(album))
    }

    fn delete(&self, id: &PhotoId) -> RepositoryResult<Photo> {
        self.mutate(|c| c.delete(id))
    }

    fn increment_album_statistics(
        &self,
        album: &AlbumId,
        sizes: &[(SizeVariantType, u64)],
    ) -> RepositoryResult<()> {
        self.mutate(|c| {
            c.adjust(album, sizes, true);
            Ok(())
        })
    }

    fn decrement_album_statistics(
        &self,
        album: &AlbumId,
        sizes: &[(SizeVariantType, u64)],
    ) -> RepositoryResult<()> {
        self.mutate(|c| {
            c.adjust(album, sizes, false);
            Ok(())
        })
    }

    fn album_statistics(&self, album: &AlbumId) -> RepositoryResult<AlbumSizeStatistics> {
        Ok(self.lock()?.album_statistics(album))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{exercise, photo};
    use super::*;

    #[test]
    fn test_json_catalog_contract() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = JsonCatalog::open(dir.path().join("catalog.json")).unwrap();
        exercise(&catalog);
    }

    #[test]
    fn test_reopen_sees_persisted_photos() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.json");

        let catalog = JsonCatalog::open(&path).unwrap();
        catalog.insert(&photo("a", "sum-a")).unwrap();
        catalog
            .increment_album_statistics(&AlbumId::new("x"), &[(SizeVariantType::Thumb, 42)])
            .unwrap();
        drop(catalog);

        let reopened = JsonCatalog::open(&path).unwrap();
        let stored = reopened.get(&PhotoId::from("a")).unwrap().unwrap();
        assert_eq!(stored.checksum, "sum-a");
        assert_eq!(stored.size_variants.len(), 1);
        assert_eq!(
            reopened
                .album_statistics(&AlbumId::new("x"))
                .unwrap()
                .size_thumb,
            42
        );
    }

    #[test]
    fn test_failed_mutation_leaves_catalog_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = JsonCatalog::open(dir.path().join("catalog.json")).unwrap();
        catalog.insert(&photo("a", "sum-a")).unwrap();
        assert!(catalog.insert(&photo("b", "sum-a")).is_err());
        assert_eq!(catalog.list(None).unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_catalog_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonCatalog::open(&path),
            Err(RepositoryError::Corrupt(_))
        ));
    }
}
