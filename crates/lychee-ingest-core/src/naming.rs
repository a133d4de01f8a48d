//! Deterministic storage paths for size variants.
//!
//! Paths are a pure function of (photo id, variant type, extension):
//!
//! ```text
//! {variant_dir}/{h[0..2]}/{h[2..4]}/{h[4..32]}{ext}
//! h = hex(blake3(photo_id ":" variant_dir [salt]))
//! ```
//!
//! Watermarked copies and backups add a salt so they never land on the path
//! of the clean variant.

use std::fmt;
use std::io::Read;

use crate::config::VariantFormat;
use crate::convert::normalize_extension;
use crate::error::StorageResult;
use crate::storage::{Storage, StreamStats};
use crate::types::{PhotoId, SizeVariantType};

const WATERMARKED_SALT: &str = ":watermarked";
const BACKUP_SALT: &str = ":backup";

/// Computes storage paths for one photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingStrategy {
    photo_id: PhotoId,
    source_extension: String,
    variant_extension: String,
}

impl NamingStrategy {
    /// Create the naming strategy for one photo.
    ///
    /// # Arguments
    ///
    /// * `photo_id` - Seed of every path hash
    /// * `source_extension` - Extension of the ORIGINAL (normalized to lowercase with a dot)
    /// * `variant_format` - Encoding of the derived variants
    pub fn new(photo_id: PhotoId, source_extension: &str, variant_format: VariantFormat) -> Self {
        Self {
            photo_id,
            source_extension: normalize_extension(source_extension),
            variant_extension: variant_format.extension().to_string(),
        }
    }

    pub fn photo_id(&self) -> &PhotoId {
        &self.photo_id
    }

    /// Extension a variant gets when the caller does not ask for another one.
    pub fn default_extension(&self, variant: SizeVariantType) -> &str {
        match variant {
            SizeVariantType::Raw | SizeVariantType::Original => &self.source_extension,
            _ => &self.variant_extension,
        }
    }

    /// Path of `variant` stored under `extension`.
    pub fn path_for(&self, variant: SizeVariantType, extension: &str) -> String {
        hashed_path(&self.photo_id, variant.name(), "", extension)
    }

    /// Path of `variant` under its default extension.
    pub fn default_path(&self, variant: SizeVariantType) -> String {
        self.path_for(variant, self.default_extension(variant))
    }

    /// Path of the watermarked copy of `variant`.
    pub fn watermarked_path(&self, variant: SizeVariantType, extension: &str) -> String {
        hashed_path(&self.photo_id, variant.name(), WATERMARKED_SALT, extension)
    }

    /// Path of the untouched upload kept when the ORIGINAL was re-encoded.
    pub fn backup_path(&self, extension: &str) -> String {
        hashed_path(
            &self.photo_id,
            SizeVariantType::Original.name(),
            BACKUP_SALT,
            extension,
        )
    }

    /// A writable target for `variant` under `extension`.
    pub fn create_file(&self, variant: SizeVariantType, extension: &str) -> TargetFile {
        TargetFile {
            variant,
            path: self.path_for(variant, extension),
        }
    }
}

fn hashed_path(photo_id: &PhotoId, dir: &str, salt: &str, extension: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(photo_id.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(dir.as_bytes());
    hasher.update(salt.as_bytes());
    let hash = hasher.finalize().to_hex();
    let h = hash.as_str();
    format!(
        "{dir}/{}/{}/{}{}",
        &h[0..2],
        &h[2..4],
        &h[4..32],
        normalize_extension(extension)
    )
}

/// A not-yet-written storage location for one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFile {
    variant: SizeVariantType,
    path: String,
}

impl TargetFile {
    pub fn variant(&self) -> SizeVariantType {
        self.variant
    }

    pub fn relative_path(&self) -> &str {
        &self.path
    }

    /// Copy `reader` into storage verbatim.
    pub fn write(&self, storage: &dyn Storage, reader: &mut dyn Read) -> StorageResult<StreamStats> {
        storage.write(&self.path, reader)
    }
}

impl fmt::Display for TargetFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}
