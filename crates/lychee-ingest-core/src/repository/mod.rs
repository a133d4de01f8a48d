//! Photo persistence.
//!
//! A photo is written in one call together with all its size variants, so
//! readers never observe a half-created photo. Album size statistics are
//! adjusted with one atomic call per photo.

mod json;
mod memory;

pub use json::JsonCatalog;
pub use memory::MemoryRepository;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RepositoryError;
use crate::types::{AlbumId, AlbumSizeStatistics, Photo, PhotoId, SizeVariantType};

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

pub trait PhotoRepository: Send + Sync {
    /// A photo whose upload or stored ORIGINAL has this checksum.
    fn find_by_checksum(&self, checksum: &str) -> RepositoryResult<Option<Photo>>;

    /// The other half of a live photo pair, for the same owner.
    fn find_live_partner(&self, owner_id: u32, content_id: &str) -> RepositoryResult<Option<Photo>>;

    /// Persist a new photo. Fails on a duplicate id or checksum.
    fn insert(&self, photo: &Photo) -> RepositoryResult<()>;

    /// Replace an existing photo.
    fn update(&self, photo: &Photo) -> RepositoryResult<()>;

    fn get(&self, id: &PhotoId) -> RepositoryResult<Option<Photo>>;

    /// All photos, or those in `album`, ordered by id.
    fn list(&self, album: Option<&AlbumId>) -> RepositoryResult<Vec<Photo>>;

    /// Remove a photo and return it.
    fn delete(&self, id: &PhotoId) -> RepositoryResult<Photo>;

    /// Add per-type byte counts to an album's totals.
    fn increment_album_statistics(
        &self,
        album: &AlbumId,
        sizes: &[(SizeVariantType, u64)],
    ) -> RepositoryResult<()>;

    /// Subtract per-type byte counts from an album's totals, saturating at zero.
    fn decrement_album_statistics(
        &self,
        album: &AlbumId,
        sizes: &[(SizeVariantType, u64)],
    ) -> RepositoryResult<()>;

    fn album_statistics(&self, album: &AlbumId) -> RepositoryResult<AlbumSizeStatistics>;
}

/// Per-type byte counts of a photo, for statistics updates.
pub fn variant_sizes(photo: &Photo) -> Vec<(SizeVariantType, u64)> {
    photo
        .size_variants
        .iter()
        .map(|v| (v.variant_type, v.filesize))
        .collect()
}

/// The data behind both repository implementations.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Catalog {
    photos: BTreeMap<PhotoId, Photo>,
    albums: BTreeMap<AlbumId, AlbumSizeStatistics>,
}

impl Catalog {
    fn find_by_checksum(&self, checksum: &str) -> Option<Photo> {
        self.photos
            .values()
            .find(|p| p.checksum == checksum || p.original_checksum.as_deref() == Some(checksum))
            .cloned()
    }

    fn find_live_partner(&self, owner_id: u32, content_id: &str) -> Option<Photo> {
        self.photos
            .values()
            .find(|p| {
                p.owner_id == owner_id
                    && p.live_photo_content_id.as_deref() == Some(content_id)
                    && p.live_photo_partner.is_none()
            })
            .cloned()
    }

    fn insert(&mut self, photo: &Photo) -> RepositoryResult<()> {
        if self.photos.contains_key(&photo.id) {
            return Err(RepositoryError::DuplicateId(photo.id.clone()));
        }
        if self.find_by_checksum(&photo.checksum).is_some() {
            return Err(RepositoryError::DuplicateChecksum(photo.checksum.clone()));
        }
        self.photos.insert(photo.id.clone(), photo.clone());
        Ok(())
    }

    fn update(&mut self, photo: &Photo) -> RepositoryResult<()> {
        match self.photos.get_mut(&photo.id) {
            Some(existing) => {
                *existing = photo.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(photo.id.clone())),
        }
    }

    fn get(&self, id: &PhotoId) -> Option<Photo> {
        self.photos.get(id).cloned()
    }

    fn list(&self, album: Option<&AlbumId>) -> Vec<Photo> {
        self.photos
            .values()
            .filter(|p| album.map_or(true, |a| p.albums.contains(a)))
            .cloned()
            .collect()
    }

    fn delete(&mut self, id: &PhotoId) -> RepositoryResult<Photo> {
        self.photos
            .remove(id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))
    }

    fn adjust(&mut self, album: &AlbumId, sizes: &[(SizeVariantType, u64)], increment: bool) {
        let stats = self.albums.entry(album.clone()).or_default();
        for &(variant_type, bytes) in sizes {
            if increment {
                stats.increment(variant_type, bytes);
            } else {
                stats.decrement(variant_type, bytes);
            }
        }
    }

    fn album_statistics(&self, album: &AlbumId) -> AlbumSizeStatistics {
        self.albums.get(album).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::ImageDimension;

    pub(crate) fn photo(id: &str, checksum: &str) -> Photo {
        let mut photo = Photo::new(PhotoId::from(id), 1);
        photo.checksum = checksum.to_string();
        photo.size_variants.create(
            SizeVariantType::Original,
            format!("original/{id}.jpg"),
            ImageDimension::new(10, 10),
            100,
        );
        photo
    }

    /// Behaviour every implementation must share.
    pub(crate) fn exercise(repo: &dyn PhotoRepository) {
        let album = AlbumId::new("holidays");
        let mut a = photo("a", "sum-a");
        a.albums.push(album.clone());
        a.original_checksum = Some("sum-a-stored".to_string());
        repo.insert(&a).unwrap();

        assert!(matches!(
            repo.insert(&a),
            Err(RepositoryError::DuplicateId(_))
        ));
        assert!(matches!(
            repo.insert(&photo("b", "sum-a")),
            Err(RepositoryError::DuplicateChecksum(_))
        ));

        assert_eq!(repo.find_by_checksum("sum-a").unwrap().unwrap().id, a.id);
        assert_eq!(repo.find_by_checksum("sum-a-stored").unwrap().unwrap().id, a.id);
        assert!(repo.find_by_checksum("other").unwrap().is_none());

        let mut live = photo("c", "sum-c");
        live.live_photo_content_id = Some("live-1".to_string());
        repo.insert(&live).unwrap();
        assert_eq!(
            repo.find_live_partner(1, "live-1").unwrap().unwrap().id,
            live.id
        );
        assert!(repo.find_live_partner(2, "live-1").unwrap().is_none());

        assert_eq!(repo.list(None).unwrap().len(), 2);
        assert_eq!(repo.list(Some(&album)).unwrap().len(), 1);

        a.is_highlighted = true;
        repo.update(&a).unwrap();
        assert!(repo.get(&a.id).unwrap().unwrap().is_highlighted);

        repo.increment_album_statistics(
            &album,
            &[(SizeVariantType::Raw, 500), (SizeVariantType::Original, 100)],
        )
        .unwrap();
        let stats = repo.album_statistics(&album).unwrap();
        assert_eq!(stats.size_raw, 500);
        assert_eq!(stats.size_original, 100);

        repo.decrement_album_statistics(&album, &[(SizeVariantType::Raw, 800)])
            .unwrap();
        assert_eq!(repo.album_statistics(&album).unwrap().size_raw, 0);

        let removed = repo.delete(&live.id).unwrap();
        assert_eq!(removed.id, live.id);
        assert!(repo.get(&live.id).unwrap().is_none());
        assert!(matches!(
            repo.delete(&live.id),
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[test]
    fn test_variant_sizes() {
        let p = photo("a", "x");
        assert_eq!(variant_sizes(&p), vec![(SizeVariantType::Original, 100)]);
    }
}
