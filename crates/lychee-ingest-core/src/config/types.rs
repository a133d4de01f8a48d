//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::ImportMode;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Root directory of the local storage backend
    pub storage_root: PathBuf,

    /// JSON catalog holding photo and album statistics records
    pub catalog_path: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("~/.lychee-ingest/uploads"),
            catalog_path: PathBuf::from("~/.lychee-ingest/catalog.json"),
        }
    }
}

/// Default import mode, overridable per upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Delete uploaded files after they have been stored
    pub delete_imported: bool,

    /// Symlink originals instead of copying (local storage only)
    pub import_via_symlink: bool,

    /// Refuse uploads that duplicate an existing photo
    pub skip_duplicates: bool,

    /// Apply the title renamer on import
    pub rename_photo_title: bool,
}

impl ImportConfig {
    /// The configured defaults as an [`ImportMode`].
    pub fn import_mode(&self) -> ImportMode {
        ImportMode {
            delete_imported: self.delete_imported,
            import_via_symlink: self.import_via_symlink,
            skip_duplicates: self.skip_duplicates,
            rename_photo_title: self.rename_photo_title,
        }
    }
}

/// File formats the pipeline accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatsConfig {
    /// Extensions stored as-is even though they cannot be displayed
    /// (dot-prefixed, case-insensitive)
    pub accepted_raw_formats: Vec<String>,
}

impl Default for FormatsConfig {
    fn default() -> Self {
        Self {
            accepted_raw_formats: vec![".tif".to_string(), ".tiff".to_string()],
        }
    }
}

/// RAW/HEIC/PSD to JPEG conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Master switch for automatic conversion
    pub enabled: bool,

    /// ImageMagick executable (`magick` for IM7, `convert` for IM6)
    pub magick_binary: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            magick_binary: "magick".to_string(),
        }
    }
}

/// Image backend used to render size variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageBackendKind {
    /// Pure Rust (`image` crate)
    #[default]
    Rust,
    /// External ImageMagick binary
    Magick,
}

/// Encoding of derived size variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantFormat {
    #[default]
    Jpg,
    Png,
    Webp,
}

impl VariantFormat {
    /// Dot-prefixed file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpg => ".jpg",
            Self::Png => ".png",
            Self::Webp => ".webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

/// Size variant generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Backend used for derived variants
    pub backend: ImageBackendKind,

    /// Output format of derived variants
    pub variant_format: VariantFormat,

    /// Encoder quality (1-100) for derived variants
    pub quality: u8,

    /// Bounding box of MEDIUM (0 = unbounded)
    pub medium_max_width: u32,
    pub medium_max_height: u32,

    /// Bounding box of SMALL (0 = unbounded)
    pub small_max_width: u32,
    pub small_max_height: u32,

    /// Edge length of the square THUMB
    pub thumb_size: u32,

    pub enable_medium2x: bool,
    pub enable_small2x: bool,
    pub enable_thumb2x: bool,

    /// Re-encode rotated JPEG originals upright, keeping the upload as backup
    pub auto_orient_original: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            backend: ImageBackendKind::Rust,
            variant_format: VariantFormat::Jpg,
            quality: 90,
            medium_max_width: 1920,
            medium_max_height: 1080,
            small_max_width: 0,
            small_max_height: 360,
            thumb_size: 200,
            enable_medium2x: true,
            enable_small2x: true,
            enable_thumb2x: true,
            auto_orient_original: false,
        }
    }
}

/// Where the watermark is anchored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

/// Watermarking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Global enable flag
    pub enabled: bool,

    /// Ignore per-upload opt-outs
    pub optout_disabled: bool,

    /// Watermark image (PNG with alpha recommended)
    pub image_path: Option<PathBuf>,

    /// Opacity in 0.0..=1.0
    pub opacity: f32,

    pub position: WatermarkPosition,

    /// Watermark width relative to the target width, in percent
    pub scale_percent: u32,

    /// Distance from the anchored edges in pixels
    pub margin: u32,

    /// Also produce a watermarked copy of the ORIGINAL
    pub include_original: bool,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            optout_disabled: false,
            image_path: None,
            opacity: 0.5,
            position: WatermarkPosition::BottomRight,
            scale_percent: 25,
            margin: 16,
            include_original: false,
        }
    }
}

/// Download settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Allow exporting the preserved RAW file
    pub raw_download_enabled: bool,
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum upload size in megabytes
    pub max_file_size_mb: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 200,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
