//! Configuration management.
//!
//! Configuration is loaded from the platform config directory
//! (`~/.config/lychee-ingest/config.toml` on Linux) with sensible defaults.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage and catalog locations
    pub general: GeneralConfig,

    /// Default import mode
    pub import: ImportConfig,

    /// Accepted file formats
    pub formats: FormatsConfig,

    /// RAW/HEIC/PSD conversion
    pub conversion: ConversionConfig,

    /// Size variant generation
    pub image: ImageConfig,

    /// Watermarking
    pub watermark: WatermarkConfig,

    /// Download permissions
    pub download: DownloadConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Falls back to ~/.lychee-ingest/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("org", "lychee", "lychee-ingest")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home)
                    .join(".lychee-ingest")
                    .join("config.toml")
            })
    }

    /// Resolved storage root (with ~ expansion).
    pub fn storage_root(&self) -> PathBuf {
        expand(&self.general.storage_root)
    }

    /// Resolved catalog path (with ~ expansion).
    pub fn catalog_path(&self) -> PathBuf {
        expand(&self.general.catalog_path)
    }

    /// Resolved watermark image path, if one is configured.
    pub fn watermark_image(&self) -> Option<PathBuf> {
        self.watermark.image_path.as_deref().map(expand)
    }

    /// Whether `extension` is listed in `formats.accepted_raw_formats`.
    pub fn is_accepted_raw(&self, extension: &str) -> bool {
        let ext = crate::convert::normalize_extension(extension);
        self.formats
            .accepted_raw_formats
            .iter()
            .any(|accepted| crate::convert::normalize_extension(accepted) == ext)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(&path_str);
    PathBuf::from(expanded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.conversion.enabled);
        assert!(!config.watermark.enabled);
        assert!(!config.download.raw_download_enabled);
        assert_eq!(config.image.thumb_size, 200);
        assert_eq!(config.limits.max_file_size_mb, 200);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[conversion]"));
        assert!(toml.contains("[watermark]"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [formats]
            accepted_raw_formats = [".TIF", "dng"]

            [image]
            backend = "magick"
            variant_format = "webp"

            [watermark]
            position = "top-left"
            "#,
        )
        .unwrap();
        assert_eq!(config.image.backend, ImageBackendKind::Magick);
        assert_eq!(config.image.variant_format, VariantFormat::Webp);
        assert_eq!(config.image.quality, 90);
        assert_eq!(config.watermark.position, WatermarkPosition::TopLeft);
        assert!(config.is_accepted_raw(".tif"));
        assert!(config.is_accepted_raw("DNG"));
        assert!(!config.is_accepted_raw(".jpg"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[download]\nraw_download_enabled = true\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert!(config.download.raw_download_enabled);
    }

    #[test]
    fn test_import_defaults() {
        let config: Config = toml::from_str("[import]\nskip_duplicates = true\n").unwrap();
        let mode = config.import.import_mode();
        assert!(mode.skip_duplicates);
        assert!(!mode.delete_imported);
    }

    #[test]
    fn test_tilde_expansion() {
        let config = Config::default();
        assert!(!config.storage_root().to_string_lossy().starts_with('~'));
        assert!(config.watermark_image().is_none());
    }
}
