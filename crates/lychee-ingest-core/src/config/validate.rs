//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.image.quality == 0 || self.image.quality > 100 {
            return Err(ConfigError::ValidationError(
                "image.quality must be between 1 and 100".into(),
            ));
        }
        if self.image.thumb_size == 0 {
            return Err(ConfigError::ValidationError(
                "image.thumb_size must be > 0".into(),
            ));
        }
        if self.image.medium_max_width == 0 && self.image.medium_max_height == 0 {
            return Err(ConfigError::ValidationError(
                "image.medium_max_width and image.medium_max_height cannot both be 0".into(),
            ));
        }
        if self.image.small_max_width == 0 && self.image.small_max_height == 0 {
            return Err(ConfigError::ValidationError(
                "image.small_max_width and image.small_max_height cannot both be 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.watermark.opacity) {
            return Err(ConfigError::ValidationError(
                "watermark.opacity must be between 0.0 and 1.0".into(),
            ));
        }
        if self.watermark.scale_percent == 0 || self.watermark.scale_percent > 100 {
            return Err(ConfigError::ValidationError(
                "watermark.scale_percent must be between 1 and 100".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.conversion.magick_binary.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "conversion.magick_binary must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_quality() {
        let mut config = Config::default();
        config.image.quality = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("image.quality"));
    }

    #[test]
    fn test_validate_rejects_unbounded_small() {
        let mut config = Config::default();
        config.image.small_max_width = 0;
        config.image.small_max_height = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("image.small_max_width"));
    }

    #[test]
    fn test_validate_rejects_invalid_opacity() {
        let mut config = Config::default();
        config.watermark.opacity = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("opacity"));

        config.watermark.opacity = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_file_limit() {
        let mut config = Config::default();
        config.limits.max_file_size_mb = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_file_size_mb"));
    }
}
