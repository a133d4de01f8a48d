//! Pure Rust backend built on the `image` crate.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use super::{ImageHandler, RenderRequest, SourceImage};
use crate::config::VariantFormat;
use crate::error::ImagingError;
use crate::metadata::MetadataExtractor;
use crate::types::ImageDimension;

/// Decodes with `image`, resizes with Lanczos3.
#[derive(Debug, Default, Clone)]
pub struct RustImageHandler;

impl RustImageHandler {
    pub fn new() -> Self {
        Self
    }
}

impl ImageHandler for RustImageHandler {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn load(&self, path: &Path) -> Result<Box<dyn SourceImage>, ImagingError> {
        let decode_error = |message: String| ImagingError::Decode {
            path: path.to_path_buf(),
            message,
        };
        let image = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| decode_error(e.to_string()))?;

        let image = apply_orientation(image, MetadataExtractor::orientation(path));
        tracing::trace!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "Decoded image"
        );
        Ok(Box::new(DecodedImage { image }))
    }
}

struct DecodedImage {
    image: DynamicImage,
}

impl SourceImage for DecodedImage {
    fn dimensions(&self) -> ImageDimension {
        ImageDimension::new(self.image.width(), self.image.height())
    }

    fn render(&self, request: &RenderRequest, target: &Path) -> Result<ImageDimension, ImagingError> {
        let wanted = request.output_dimensions(self.dimensions());
        let rendered = if request.square {
            self.image
                .resize_to_fill(wanted.width, wanted.height, FilterType::Lanczos3)
        } else if wanted == self.dimensions() {
            self.image.clone()
        } else {
            self.image
                .resize_exact(wanted.width, wanted.height, FilterType::Lanczos3)
        };

        encode(&rendered, request.format, request.quality, target)?;
        Ok(ImageDimension::new(rendered.width(), rendered.height()))
    }
}

fn encode(
    image: &DynamicImage,
    format: VariantFormat,
    quality: u8,
    target: &Path,
) -> Result<(), ImagingError> {
    let mut writer = BufWriter::new(File::create(target)?);
    let result = match format {
        VariantFormat::Jpg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
        }
        VariantFormat::Png => image.write_to(&mut writer, ImageFormat::Png),
        VariantFormat::Webp => {
            DynamicImage::ImageRgba8(image.to_rgba8()).write_to(&mut writer, ImageFormat::WebP)
        }
    };
    result.map_err(|e| ImagingError::Encode(e.to_string()))
}

/// Rotate or flip a decoded image upright for an EXIF orientation.
pub(crate) fn apply_orientation(image: DynamicImage, orientation: Option<u32>) -> DynamicImage {
    match orientation {
        Some(2) => image.fliph(),
        Some(3) => image.rotate180(),
        Some(4) => image.flipv(),
        Some(5) => image.rotate90().fliph(),
        Some(6) => image.rotate90(),
        Some(7) => image.rotate270().fliph(),
        Some(8) => image.rotate270(),
        _ => image,
    }
}
