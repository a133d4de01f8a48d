//! Watermark overlay for stored size variants.
//!
//! The clean variant is never touched: the watermarked rendition is written
//! next to it under a salted path and recorded as a [`WatermarkedCopy`].

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::{Cursor, Read};

use crate::config::{Config, WatermarkConfig, WatermarkPosition};
use crate::error::{IngestError, ImagingError};
use crate::files::extension_of;
use crate::imaging::apply_orientation;
use crate::metadata::MetadataExtractor;
use crate::naming::NamingStrategy;
use crate::storage::Storage;
use crate::types::{SizeVariant, SizeVariantType, WatermarkedCopy};

pub struct Watermarker {
    config: WatermarkConfig,
    quality: u8,
    mark: Option<RgbaImage>,
}

impl Watermarker {
    /// Load the configured watermark image. A missing or unreadable image
    /// leaves the watermarker unable to watermark.
    pub fn from_config(config: &Config) -> Self {
        let mark = config.watermark_image().and_then(|path| match image::open(&path) {
            Ok(img) => Some(img.to_rgba8()),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot load watermark image");
                None
            }
        });
        Self {
            config: config.watermark.clone(),
            quality: config.image.quality,
            mark,
        }
    }

    pub fn with_image(config: WatermarkConfig, quality: u8, mark: DynamicImage) -> Self {
        Self {
            config,
            quality,
            mark: Some(mark.to_rgba8()),
        }
    }

    /// Whether a watermark image is loaded.
    pub fn can_watermark(&self) -> bool {
        self.mark.is_some()
    }

    /// Whether `variant` gets a watermarked copy at all.
    pub fn covers(&self, variant: SizeVariantType) -> bool {
        match variant {
            SizeVariantType::Raw => false,
            SizeVariantType::Original => self.config.include_original,
            _ => true,
        }
    }

    /// Write a watermarked copy of `variant`.
    pub fn apply(
        &self,
        storage: &dyn Storage,
        naming: &NamingStrategy,
        variant: &SizeVariant,
    ) -> Result<WatermarkedCopy, IngestError> {
        let mark = self.mark.as_ref().ok_or_else(|| ImagingError::Backend {
            backend: "watermark",
            message: "no watermark image loaded".to_string(),
        })?;

        let mut bytes = Vec::new();
        storage.read(&variant.short_path)?.read_to_end(&mut bytes)?;
        let base = image::load_from_memory(&bytes).map_err(|e| ImagingError::Decode {
            path: variant.short_path.clone().into(),
            message: e.to_string(),
        })?;
        // The copy is written without EXIF, so it has to be upright
        let base = apply_orientation(base, MetadataExtractor::orientation_of(&bytes));

        let marked = self.overlay(base, mark);
        let extension = extension_of(variant.short_path.as_ref());
        let encoded = encode(&marked, &extension, self.quality)?;

        let path = naming.watermarked_path(variant.variant_type, &extension);
        let stats = storage.write(&path, &mut encoded.as_slice())?;
        tracing::debug!(variant = %variant.variant_type, path = %path, "Watermarked size variant");

        Ok(WatermarkedCopy {
            variant_type: variant.variant_type,
            short_path: path,
            filesize: stats.bytes,
        })
    }

    fn overlay(&self, base: DynamicImage, mark: &RgbaImage) -> DynamicImage {
        let mut canvas = base.to_rgba8();
        let (width, height) = canvas.dimensions();

        let target_width = (width * self.config.scale_percent / 100).max(1);
        let target_height =
            ((u64::from(mark.height()) * u64::from(target_width)) / u64::from(mark.width().max(1)))
                .max(1) as u32;
        let mut scaled = imageops::resize(mark, target_width, target_height, FilterType::Triangle);

        let opacity = self.config.opacity.clamp(0.0, 1.0);
        for pixel in scaled.pixels_mut() {
            pixel.0[3] = (f32::from(pixel.0[3]) * opacity).round() as u8;
        }

        let (x, y) = anchor(
            self.config.position,
            (width, height),
            (target_width, target_height),
            self.config.margin,
        );
        imageops::overlay(&mut canvas, &scaled, x, y);
        DynamicImage::ImageRgba8(canvas)
    }
}

/// Top-left corner of the watermark inside the canvas.
fn anchor(
    position: WatermarkPosition,
    (width, height): (u32, u32),
    (mark_width, mark_height): (u32, u32),
    margin: u32,
) -> (i64, i64) {
    let (w, h) = (i64::from(width), i64::from(height));
    let (mw, mh) = (i64::from(mark_width), i64::from(mark_height));
    let m = i64::from(margin);
    match position {
        WatermarkPosition::TopLeft => (m, m),
        WatermarkPosition::TopRight => (w - mw - m, m),
        WatermarkPosition::BottomLeft => (m, h - mh - m),
        WatermarkPosition::BottomRight => (w - mw - m, h - mh - m),
        WatermarkPosition::Center => ((w - mw) / 2, (h - mh) / 2),
    }
}

fn encode(image: &DynamicImage, extension: &str, quality: u8) -> Result<Vec<u8>, ImagingError> {
    let format = ImageFormat::from_extension(extension.trim_start_matches('.'))
        .unwrap_or(ImageFormat::Jpeg);
    let mut out = Cursor::new(Vec::new());
    let result = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality)),
        other => image.write_to(&mut out, other),
    };
    result.map_err(|e| ImagingError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VariantFormat;
    use crate::storage::MemoryStorage;
    use crate::types::PhotoId;
    use image::{Rgba, RgbImage};

    fn marker() -> Watermarker {
        let config = WatermarkConfig {
            enabled: true,
            opacity: 1.0,
            ..Default::default()
        };
        let mark = DynamicImage::ImageRgba8(RgbaImage::from_pixel(50, 20, Rgba([255, 255, 255, 255])));
        Watermarker::with_image(config, 90, mark)
    }

    #[test]
    fn test_covers() {
        let w = marker();
        assert!(!w.covers(SizeVariantType::Raw));
        assert!(!w.covers(SizeVariantType::Original));
        assert!(w.covers(SizeVariantType::Thumb));
        assert!(w.covers(SizeVariantType::Medium2x));
    }

    #[test]
    fn test_from_config_without_image() {
        let w = Watermarker::from_config(&Config::default());
        assert!(!w.can_watermark());
    }

    #[test]
    fn test_anchor_positions() {
        assert_eq!(anchor(WatermarkPosition::TopLeft, (100, 80), (20, 10), 5), (5, 5));
        assert_eq!(anchor(WatermarkPosition::BottomRight, (100, 80), (20, 10), 5), (75, 65));
        assert_eq!(anchor(WatermarkPosition::Center, (100, 80), (20, 10), 5), (40, 35));
    }

    #[test]
    fn test_apply_writes_separate_copy() {
        let storage = MemoryStorage::new();
        let naming = NamingStrategy::new(PhotoId::from("p1"), ".png", VariantFormat::Png);
        let path = naming.default_path(SizeVariantType::Small);

        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(200, 100))
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();
        let clean = png.into_inner();
        storage.write(&path, &mut clean.as_slice()).unwrap();

        let variant = SizeVariant {
            variant_type: SizeVariantType::Small,
            short_path: path.clone(),
            width: 200,
            height: 100,
            filesize: clean.len() as u64,
        };
        let copy = marker().apply(&storage, &naming, &variant).unwrap();

        assert_ne!(copy.short_path, path);
        assert!(copy.short_path.ends_with(".png"));
        assert_eq!(storage.get(&path).unwrap(), clean);
        let marked = image::load_from_memory(&storage.get(&copy.short_path).unwrap())
            .unwrap()
            .to_rgba8();
        // Bottom-right corner area now carries the white mark
        assert_eq!(marked.get_pixel(200 - 16 - 5, 100 - 16 - 2).0[0], 255);
    }

    #[test]
    fn test_apply_uprights_rotated_original() {
        let storage = MemoryStorage::new();
        let naming = NamingStrategy::new(PhotoId::from("p2"), ".jpg", VariantFormat::Jpg);
        let path = naming.default_path(SizeVariantType::Original);
        let upload = crate::metadata::tests::jpeg_with_orientation(160, 80, 6);
        storage.write(&path, &mut upload.as_slice()).unwrap();

        let variant = SizeVariant {
            variant_type: SizeVariantType::Original,
            short_path: path,
            width: 80,
            height: 160,
            filesize: upload.len() as u64,
        };
        let copy = marker().apply(&storage, &naming, &variant).unwrap();

        let bytes = storage.get(&copy.short_path).unwrap();
        assert_eq!(MetadataExtractor::orientation_of(&bytes), None);
        let marked = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(marked.dimensions(), (80, 160));

        // Left half of the sensor image is red and ends up on top once upright
        let top = marked.get_pixel(40, 20).0;
        let bottom = marked.get_pixel(40, 120).0;
        assert!(top[0] > 200 && top[2] < 60, "{top:?}");
        assert!(bottom[2] > 200 && bottom[0] < 60, "{bottom:?}");
        // Mark sits in the bottom-right corner of the upright image
        let mark = marked.get_pixel(54, 140).0;
        assert!(mark.iter().map(|&c| u32::from(c)).sum::<u32>() > 600, "{mark:?}");
    }
}
