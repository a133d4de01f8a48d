//! Core data types: photos, size variants, import parameters.
//!
//! A [`Photo`] is the aggregate root; it owns its [`SizeVariants`] and is only
//! ever persisted as a whole. Size variants are never mutated after creation.

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::metadata::Metadata;

/// Length of generated photo ids.
pub const PHOTO_ID_LENGTH: usize = 24;

/// Unique photo identifier (24 alphanumeric characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(String);

impl PhotoId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(PHOTO_ID_LENGTH)
            .map(char::from)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PhotoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Album identifier. Albums themselves are managed elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlbumId(String);

impl AlbumId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlbumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of rendition. Declaration order is the storage order: RAW first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeVariantType {
    Raw,
    Original,
    Medium2x,
    Medium,
    Small2x,
    Small,
    Thumb2x,
    Thumb,
}

impl SizeVariantType {
    /// All types, in storage order.
    pub const ALL: [SizeVariantType; 8] = [
        Self::Raw,
        Self::Original,
        Self::Medium2x,
        Self::Medium,
        Self::Small2x,
        Self::Small,
        Self::Thumb2x,
        Self::Thumb,
    ];

    /// Types generated from the ORIGINAL by the variant generator.
    pub const DERIVED: [SizeVariantType; 6] = [
        Self::Medium2x,
        Self::Medium,
        Self::Small2x,
        Self::Small,
        Self::Thumb2x,
        Self::Thumb,
    ];

    /// Lowercase name, also used as the storage directory.
    pub fn name(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Original => "original",
            Self::Medium2x => "medium2x",
            Self::Medium => "medium",
            Self::Small2x => "small2x",
            Self::Small => "small",
            Self::Thumb2x => "thumb2x",
            Self::Thumb => "thumb",
        }
    }

    /// Numeric code as stored by the database.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Thumbnails are square crops; everything else keeps its aspect ratio.
    pub fn is_square(self) -> bool {
        matches!(self, Self::Thumb | Self::Thumb2x)
    }
}

impl fmt::Display for SizeVariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SizeVariantType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.name() == lower)
            .ok_or_else(|| format!("unknown size variant: {s}"))
    }
}

/// Pixel dimensions. Zero for renditions that are not decodable (RAW).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimension {
    pub width: u32,
    pub height: u32,
}

impl ImageDimension {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// One stored rendition of a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeVariant {
    #[serde(rename = "type")]
    pub variant_type: SizeVariantType,
    /// Path relative to the storage root
    pub short_path: String,
    pub width: u32,
    pub height: u32,
    /// Size of the stored file in bytes
    pub filesize: u64,
}

impl SizeVariant {
    pub fn dimensions(&self) -> ImageDimension {
        ImageDimension::new(self.width, self.height)
    }
}

/// The variants of one photo, at most one per type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeVariants(Vec<SizeVariant>);

impl SizeVariants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variant. Returns `false` (and leaves the set untouched) when a
    /// variant of the same type already exists.
    pub fn create(
        &mut self,
        variant_type: SizeVariantType,
        short_path: String,
        dimensions: ImageDimension,
        filesize: u64,
    ) -> bool {
        if self.get(variant_type).is_some() {
            return false;
        }
        self.0.push(SizeVariant {
            variant_type,
            short_path,
            width: dimensions.width,
            height: dimensions.height,
            filesize,
        });
        self.0.sort_by_key(|v| v.variant_type);
        true
    }

    pub fn get(&self, variant_type: SizeVariantType) -> Option<&SizeVariant> {
        self.0.iter().find(|v| v.variant_type == variant_type)
    }

    pub fn original(&self) -> Option<&SizeVariant> {
        self.get(SizeVariantType::Original)
    }

    pub fn raw(&self) -> Option<&SizeVariant> {
        self.get(SizeVariantType::Raw)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SizeVariant> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A watermarked copy of one size variant, stored beside the clean file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkedCopy {
    #[serde(rename = "type")]
    pub variant_type: SizeVariantType,
    pub short_path: String,
    pub filesize: u64,
}

/// EXIF metadata carried by a photo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExifData {
    /// When the photo was captured (camera local time)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<NaiveDateTime>,

    /// Camera manufacturer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,

    /// Camera model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Lens model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lens: Option<String>,

    /// ISO sensitivity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso: Option<u32>,

    /// Aperture (e.g., "f/1.8")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aperture: Option<String>,

    /// Shutter speed (e.g., "1/1000")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutter: Option<String>,

    /// Focal length in mm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal: Option<f32>,

    /// GPS latitude (decimal degrees)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    /// GPS longitude (decimal degrees)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    /// GPS altitude in meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,

    /// Direction the camera was facing, in degrees
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_direction: Option<f64>,

    /// EXIF orientation, 1-8
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u32>,
}

/// The aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    pub owner_id: u32,
    #[serde(default)]
    pub albums: Vec<AlbumId>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the ORIGINAL
    pub mime_type: String,
    /// BLAKE3 of the uploaded bytes
    pub checksum: String,
    /// BLAKE3 of the stored ORIGINAL, when it differs from the upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_checksum: Option<String>,
    #[serde(default)]
    pub exif: ExifData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_photo_content_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_photo_partner: Option<PhotoId>,
    #[serde(default)]
    pub is_highlighted: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub size_variants: SizeVariants,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watermarked: Vec<WatermarkedCopy>,
    /// Untouched upload, kept when the ORIGINAL was re-encoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Photo {
    /// A blank photo owned by `owner_id`, not yet backed by any file.
    pub fn new(id: PhotoId, owner_id: u32) -> Self {
        Self {
            id,
            owner_id,
            albums: Vec::new(),
            title: String::new(),
            description: None,
            mime_type: String::new(),
            checksum: String::new(),
            original_checksum: None,
            exif: ExifData::default(),
            file_last_modified: None,
            live_photo_content_id: None,
            live_photo_partner: None,
            is_highlighted: false,
            tags: Vec::new(),
            size_variants: SizeVariants::new(),
            watermarked: Vec::new(),
            backup_path: None,
            created_at: Utc::now(),
        }
    }

    /// Every storage path this photo owns.
    pub fn stored_paths(&self) -> Vec<&str> {
        self.size_variants
            .iter()
            .map(|v| v.short_path.as_str())
            .chain(self.watermarked.iter().map(|w| w.short_path.as_str()))
            .chain(self.backup_path.as_deref())
            .collect()
    }
}

/// Per-album byte totals, one bucket per variant type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumSizeStatistics {
    pub size_raw: u64,
    pub size_original: u64,
    pub size_medium2x: u64,
    pub size_medium: u64,
    pub size_small2x: u64,
    pub size_small: u64,
    pub size_thumb2x: u64,
    pub size_thumb: u64,
}

impl AlbumSizeStatistics {
    fn bucket(&mut self, variant_type: SizeVariantType) -> &mut u64 {
        match variant_type {
            SizeVariantType::Raw => &mut self.size_raw,
            SizeVariantType::Original => &mut self.size_original,
            SizeVariantType::Medium2x => &mut self.size_medium2x,
            SizeVariantType::Medium => &mut self.size_medium,
            SizeVariantType::Small2x => &mut self.size_small2x,
            SizeVariantType::Small => &mut self.size_small,
            SizeVariantType::Thumb2x => &mut self.size_thumb2x,
            SizeVariantType::Thumb => &mut self.size_thumb,
        }
    }

    pub fn increment(&mut self, variant_type: SizeVariantType, bytes: u64) {
        let bucket = self.bucket(variant_type);
        *bucket = bucket.saturating_add(bytes);
    }

    pub fn decrement(&mut self, variant_type: SizeVariantType, bytes: u64) {
        let bucket = self.bucket(variant_type);
        *bucket = bucket.saturating_sub(bytes);
    }

    pub fn total(&self) -> u64 {
        self.size_raw
            + self.size_original
            + self.size_medium2x
            + self.size_medium
            + self.size_small2x
            + self.size_small
            + self.size_thumb2x
            + self.size_thumb
    }
}

/// Per-upload watermark choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyWatermark {
    /// Follow the global `watermark.enabled` setting
    #[default]
    UseDefault,
    ForceOn,
    ForceOff,
}

impl From<Option<bool>> for ApplyWatermark {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Self::UseDefault,
            Some(true) => Self::ForceOn,
            Some(false) => Self::ForceOff,
        }
    }
}

/// How the upload is brought into storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportMode {
    /// Delete the uploaded file once it has been stored
    pub delete_imported: bool,
    /// Store the ORIGINAL as a symlink to the upload instead of a copy
    pub import_via_symlink: bool,
    /// Refuse uploads whose checksum matches an existing photo
    pub skip_duplicates: bool,
    /// Run the title through the renamer collaborator
    pub rename_photo_title: bool,
}

/// Everything the caller knows about an upload before processing starts.
#[derive(Debug, Clone, Default)]
pub struct ImportParam {
    pub import_mode: ImportMode,
    pub intended_owner_id: u32,
    pub album: Option<AlbumId>,
    pub is_highlighted: bool,
    /// Metadata supplied by the caller; extraction is skipped when present
    pub metadata: Option<Metadata>,
    pub apply_watermark: ApplyWatermark,
    pub tags: Vec<String>,
    pub file_last_modified_time: Option<DateTime<Utc>>,
}

impl ImportParam {
    pub fn new(import_mode: ImportMode, intended_owner_id: u32) -> Self {
        Self {
            import_mode,
            intended_owner_id,
            ..Default::default()
        }
    }
}
