use std::sync::{Mutex, MutexGuard};

use super::{Catalog, PhotoRepository, RepositoryResult};
use crate::error::RepositoryError;
use crate::types::{AlbumId, AlbumSizeStatistics, Photo, PhotoId, SizeVariantType};

/// Repository held entirely in memory. One lock serialises all writers.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    catalog: Mutex<Catalog>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Catalog>> {
        self.catalog.lock().map_err(|_| RepositoryError::Poisoned)
    }
}

impl PhotoRepository for MemoryRepository {
    fn find_by_checksum(&self, checksum: &str) -> RepositoryResult<Option<Photo>> {
        Ok(self.lock()?.find_by_checksum(checksum))
    }

    fn find_live_partner(&self, owner_id: u32, content_id: &str) -> RepositoryResult<Option<Photo>> {
        Ok(self.lock()?.find_live_partner(owner_id, content_id))
    }

    fn insert(&self, photo: &Photo) -> RepositoryResult<()> {
        self.lock()?.insert(photo)
    }

    fn update(&self, photo: &Photo) -> RepositoryResult<()> {
        self.lock()?.update(photo)
    }

    fn get(&self, id: &PhotoId) -> RepositoryResult<Option<Photo>> {
        Ok(self.lock()?.get(id))
    }

    fn list(&self, album: Option<&AlbumId>) -> RepositoryResult<Vec<Photo>> {
        Ok(self.lock()?.list(album))
    }

    fn delete(&self, id: &PhotoId) -> RepositoryResult<Photo> {
        self.lock()?.delete(id)
    }

    fn increment_album_statistics(
        &self,
        album: &AlbumId,
        sizes: &[(SizeVariantType, u64)],
    ) -> RepositoryResult<()> {
        self.lock()?.adjust(album, sizes, true);
        Ok(())
    }

    fn decrement_album_statistics(
        &self,
        album: &AlbumId,
        sizes: &[(SizeVariantType, u64)],
    ) -> RepositoryResult<()> {
        self.lock()?.adjust(album, sizes, false);
        Ok(())
    }

    fn album_statistics(&self, album: &AlbumId) -> RepositoryResult<AlbumSizeStatistics> {
        Ok(self.lock()?.album_statistics(album))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_repository_contract() {
        super::super::tests::exercise(&MemoryRepository::new());
    }
}
