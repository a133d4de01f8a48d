//! Size variant rules and generation.
//!
//! | Type     | Box               | Created when                              |
//! |----------|-------------------|-------------------------------------------|
//! | MEDIUM2X | 2 × MEDIUM        | enabled and the original exceeds the box  |
//! | MEDIUM   | medium box        | the original exceeds the box              |
//! | SMALL2X  | 2 × SMALL         | enabled and the original exceeds the box  |
//! | SMALL    | small box         | the original exceeds the box              |
//! | THUMB2X  | 2 × thumb, square | enabled and both sides reach 2 × thumb    |
//! | THUMB    | thumb, square     | always                                    |
//!
//! A box side of 0 is unbounded.

use std::fs::File;
use std::io::BufReader;

use crate::config::ImageConfig;
use crate::error::{IngestError, ImagingError};
use crate::files::TemporaryFile;
use crate::imaging::{RenderRequest, SourceImage};
use crate::naming::NamingStrategy;
use crate::storage::Storage;
use crate::types::{ImageDimension, SizeVariantType};

/// One derived variant to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantPlan {
    pub variant_type: SizeVariantType,
    pub request: RenderRequest,
}

/// A derived variant that has been written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedVariant {
    pub variant_type: SizeVariantType,
    pub short_path: String,
    pub dimensions: ImageDimension,
    pub filesize: u64,
}

fn exceeds(original: ImageDimension, max_width: u32, max_height: u32) -> bool {
    (max_width > 0 && original.width > max_width) || (max_height > 0 && original.height > max_height)
}

/// Which derived variants an original of the given size gets, in storage order.
pub fn plan_variants(config: &ImageConfig, original: ImageDimension) -> Vec<VariantPlan> {
    if original.is_zero() {
        return Vec::new();
    }

    let request = |max_width: u32, max_height: u32, square: bool| RenderRequest {
        max_width,
        max_height,
        square,
        format: config.variant_format,
        quality: config.quality,
    };
    let (mw, mh) = (config.medium_max_width, config.medium_max_height);
    let (sw, sh) = (config.small_max_width, config.small_max_height);
    let thumb = config.thumb_size;
    let double = |v: u32| v.saturating_mul(2);

    let candidates = [
        (
            SizeVariantType::Medium2x,
            config.enable_medium2x && exceeds(original, double(mw), double(mh)),
            request(double(mw), double(mh), false),
        ),
        (
            SizeVariantType::Medium,
            exceeds(original, mw, mh),
            request(mw, mh, false),
        ),
        (
            SizeVariantType::Small2x,
            config.enable_small2x && exceeds(original, double(sw), double(sh)),
            request(double(sw), double(sh), false),
        ),
        (
            SizeVariantType::Small,
            exceeds(original, sw, sh),
            request(sw, sh, false),
        ),
        (
            SizeVariantType::Thumb2x,
            config.enable_thumb2x && original.width >= double(thumb) && original.height >= double(thumb),
            request(double(thumb), double(thumb), true),
        ),
        (SizeVariantType::Thumb, true, request(thumb, thumb, true)),
    ];

    candidates
        .into_iter()
        .filter(|(_, wanted, _)| *wanted)
        .map(|(variant_type, _, request)| VariantPlan {
            variant_type,
            request,
        })
        .collect()
}

/// Renders planned variants and stores them.
pub struct SizeVariantGenerator<'a> {
    config: &'a ImageConfig,
}

impl<'a> SizeVariantGenerator<'a> {
    pub fn new(config: &'a ImageConfig) -> Self {
        Self { config }
    }

    pub fn plan(&self, source: &dyn SourceImage) -> Vec<VariantPlan> {
        plan_variants(self.config, source.dimensions())
    }

    /// Render one planned variant and write it under its default path.
    pub fn generate(
        &self,
        source: &dyn SourceImage,
        plan: &VariantPlan,
        naming: &NamingStrategy,
        storage: &dyn Storage,
    ) -> Result<GeneratedVariant, IngestError> {
        let extension = plan.request.format.extension();
        let scratch = TemporaryFile::new(extension).map_err(ImagingError::Io)?;
        let dimensions = source.render(&plan.request, scratch.path())?;

        let target = naming.create_file(plan.variant_type, extension);
        let mut reader = BufReader::new(File::open(scratch.path())?);
        let stats = target.write(storage, &mut reader)?;

        tracing::debug!(
            variant = %plan.variant_type,
            path = %target,
            width = dimensions.width,
            height = dimensions.height,
            bytes = stats.bytes,
            "Created size variant"
        );
        Ok(GeneratedVariant {
            variant_type: plan.variant_type,
            short_path: target.relative_path().to_string(),
            dimensions,
            filesize: stats.bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VariantFormat;
    use crate::imaging::{ImageHandler, RustImageHandler};
    use crate::storage::MemoryStorage;
    use crate::types::PhotoId;

    fn types(plans: &[VariantPlan]) -> Vec<SizeVariantType> {
        plans.iter().map(|p| p.variant_type).collect()
    }

    #[test]
    fn test_large_original_gets_everything() {
        let config = ImageConfig::default();
        let plans = plan_variants(&config, ImageDimension::new(6000, 4000));
        assert_eq!(types(&plans), SizeVariantType::DERIVED.to_vec());
    }

    #[test]
    fn test_small_original_gets_only_thumbs() {
        let config = ImageConfig::default();
        let plans = plan_variants(&config, ImageDimension::new(300, 200));
        assert_eq!(types(&plans), vec![SizeVariantType::Thumb]);

        let plans = plan_variants(&config, ImageDimension::new(640, 480));
        assert_eq!(
            types(&plans),
            vec![SizeVariantType::Small, SizeVariantType::Thumb2x, SizeVariantType::Thumb]
        );
    }

    #[test]
    fn test_huge_bounds_saturate() {
        let config = ImageConfig {
            medium_max_width: u32::MAX,
            medium_max_height: u32::MAX,
            small_max_width: u32::MAX,
            small_max_height: u32::MAX,
            thumb_size: u32::MAX,
            ..Default::default()
        };
        let plans = plan_variants(&config, ImageDimension::new(6000, 4000));
        assert_eq!(types(&plans), vec![SizeVariantType::Thumb]);
        assert_eq!(plans[0].request.max_width, u32::MAX);
    }

    #[test]
    fn test_disabled_retina_variants() {
        let config = ImageConfig {
            enable_medium2x: false,
            enable_small2x: false,
            enable_thumb2x: false,
            ..Default::default()
        };
        let plans = plan_variants(&config, ImageDimension::new(6000, 4000));
        assert_eq!(
            types(&plans),
            vec![SizeVariantType::Medium, SizeVariantType::Small, SizeVariantType::Thumb]
        );
    }

    #[test]
    fn test_undecodable_original_gets_nothing() {
        let config = ImageConfig::default();
        assert!(plan_variants(&config, ImageDimension::zero()).is_empty());
    }

    #[test]
    fn test_generate_writes_to_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("src.png");
        image::RgbImage::from_pixel(900, 600, image::Rgb([10, 120, 200]))
            .save(&path)
            .unwrap();

        let config = ImageConfig {
            variant_format: VariantFormat::Jpg,
            ..Default::default()
        };
        let source = RustImageHandler::new().load(&path).unwrap();
        let generator = SizeVariantGenerator::new(&config);
        let plans = generator.plan(source.as_ref());
        let naming = NamingStrategy::new(PhotoId::from("p1"), ".png", config.variant_format);
        let storage = MemoryStorage::new();

        let small = plans
            .iter()
            .find(|p| p.variant_type == SizeVariantType::Small)
            .unwrap();
        let generated = generator
            .generate(source.as_ref(), small, &naming, &storage)
            .unwrap();

        assert_eq!(generated.dimensions, ImageDimension::new(540, 360));
        assert!(generated.short_path.starts_with("small/"));
        assert!(generated.short_path.ends_with(".jpg"));
        assert_eq!(storage.size(&generated.short_path).unwrap(), generated.filesize);
    }
}
