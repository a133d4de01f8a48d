//! Interchangeable image backends.
//!
//! A backend decodes a file once into a [`SourceImage`], which then renders
//! any number of scaled or square-cropped copies. Renders come out upright:
//! EXIF orientation is applied on load.

mod rust_handler;

pub(crate) use rust_handler::apply_orientation;
pub use rust_handler::RustImageHandler;

use std::path::Path;
use std::sync::Arc;

use crate::config::{Config, ImageBackendKind, VariantFormat};
use crate::convert::MagickEngine;
use crate::error::ImagingError;
use crate::types::ImageDimension;

/// What to render from a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    /// Bounding box width, 0 = unbounded
    pub max_width: u32,
    /// Bounding box height, 0 = unbounded
    pub max_height: u32,
    /// Center-crop to a `max_width` square instead of fitting the box
    pub square: bool,
    pub format: VariantFormat,
    pub quality: u8,
}

impl RenderRequest {
    /// Re-encode at full size.
    pub fn full_size(format: VariantFormat, quality: u8) -> Self {
        Self {
            max_width: 0,
            max_height: 0,
            square: false,
            format,
            quality,
        }
    }

    /// Dimensions this request produces for a source of `source` size.
    pub fn output_dimensions(&self, source: ImageDimension) -> ImageDimension {
        if self.square {
            let side = self.max_width.min(source.width).min(source.height);
            ImageDimension::new(side, side)
        } else {
            fit_within(source, self.max_width, self.max_height)
        }
    }
}

/// Scale `source` down to fit the box, keeping the aspect ratio. Never upscales.
pub fn fit_within(source: ImageDimension, max_width: u32, max_height: u32) -> ImageDimension {
    if source.is_zero() {
        return source;
    }
    let width_ratio = if max_width == 0 {
        f64::INFINITY
    } else {
        f64::from(max_width) / f64::from(source.width)
    };
    let height_ratio = if max_height == 0 {
        f64::INFINITY
    } else {
        f64::from(max_height) / f64::from(source.height)
    };
    let ratio = width_ratio.min(height_ratio);
    if ratio >= 1.0 {
        return source;
    }
    ImageDimension::new(
        ((f64::from(source.width) * ratio).round() as u32).max(1),
        ((f64::from(source.height) * ratio).round() as u32).max(1),
    )
}

/// A decoded image ready for rendering.
pub trait SourceImage: Send {
    /// Upright dimensions.
    fn dimensions(&self) -> ImageDimension;

    /// Render into `target` and return the dimensions written.
    fn render(&self, request: &RenderRequest, target: &Path) -> Result<ImageDimension, ImagingError>;
}

/// An image backend.
pub trait ImageHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Decode the file at `path`.
    fn load(&self, path: &Path) -> Result<Box<dyn SourceImage>, ImagingError>;
}

/// Build the backend selected by `image.backend`.
pub fn handler_from_config(config: &Config) -> Arc<dyn ImageHandler> {
    match config.image.backend {
        ImageBackendKind::Rust => Arc::new(RustImageHandler::new()),
        ImageBackendKind::Magick => Arc::new(MagickEngine::new(&config.conversion.magick_binary)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_within_landscape() {
        let dim = fit_within(ImageDimension::new(4000, 3000), 1920, 1080);
        assert_eq!(dim, ImageDimension::new(1440, 1080));
    }

    #[test]
    fn test_fit_within_unbounded_width() {
        let dim = fit_within(ImageDimension::new(4000, 3000), 0, 360);
        assert_eq!(dim, ImageDimension::new(480, 360));
    }

    #[test]
    fn test_fit_within_never_upscales() {
        let dim = fit_within(ImageDimension::new(800, 600), 1920, 1080);
        assert_eq!(dim, ImageDimension::new(800, 600));
        let dim = fit_within(ImageDimension::new(800, 600), 0, 0);
        assert_eq!(dim, ImageDimension::new(800, 600));
    }

    #[test]
    fn test_square_output_dimensions() {
        let request = RenderRequest {
            max_width: 200,
            max_height: 200,
            square: true,
            format: VariantFormat::Jpg,
            quality: 90,
        };
        assert_eq!(
            request.output_dimensions(ImageDimension::new(1000, 500)),
            ImageDimension::new(200, 200)
        );
        assert_eq!(
            request.output_dimensions(ImageDimension::new(150, 120)),
            ImageDimension::new(120, 120)
        );
    }
}
