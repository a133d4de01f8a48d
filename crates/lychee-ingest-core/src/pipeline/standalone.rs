//! Standalone creation stages: store one upload as a new photo.

use std::io::BufReader;

use super::{Chain, ChainState, Flow, PhotoState, PipelineContext, StandaloneState, Stage};
use crate::config::VariantFormat;
use crate::convert::mime_type_for;
use crate::error::{ImagingError, PipelineError, Result, StorageError};
use crate::files::{LocalView, MediaFile, StoredFile, TemporaryFile};
use crate::imaging::RenderRequest;
use crate::metadata::MetadataExtractor;
use crate::naming::NamingStrategy;
use crate::repository::variant_sizes;
use crate::types::{ApplyWatermark as WatermarkChoice, ImageDimension, SizeVariantType};
use crate::variants::SizeVariantGenerator;

/// The standalone chain in its fixed order.
pub fn chain() -> Chain<StandaloneState> {
    Chain::new("standalone")
        .stage(InitPhoto)
        .stage(CreateOriginalSizeVariant)
        .stage(CreateRawSizeVariant)
        .stage(CreateSizeVariants)
        .stage(ApplyWatermark)
        .stage(SetTags)
        .stage(SetHighlighted)
        .stage(SavePhoto)
}

/// Fill the photo from metadata and resolve its naming strategy.
pub struct InitPhoto;

impl Stage<StandaloneState> for InitPhoto {
    fn name(&self) -> &'static str {
        "init_photo"
    }

    fn handle(&self, state: &mut StandaloneState, ctx: &PipelineContext) -> Result<Flow> {
        let metadata = &state.metadata;
        let title = match &ctx.renamer {
            Some(renamer) if state.import_mode.rename_photo_title => {
                renamer.rename(state.intended_owner_id, &metadata.title)
            }
            _ => metadata.title.clone(),
        };
        let extension = state.source_file.original_extension();

        let photo = &mut state.photo;
        photo.title = title;
        photo.description = metadata.description.clone();
        photo.mime_type = mime_type_for(&extension).to_string();
        photo.checksum = state.checksum.clone();
        photo.exif = metadata.exif.clone();
        photo.file_last_modified = metadata.file_last_modified;
        photo.live_photo_content_id = metadata.live_photo_content_id.clone();
        photo.live_photo_partner = state.live_partner.as_ref().map(|p| p.id.clone());
        photo.albums = state.album.iter().cloned().collect();

        state.naming = Some(NamingStrategy::new(
            photo.id.clone(),
            &extension,
            ctx.config.image.variant_format,
        ));
        tracing::debug!(photo = %photo.id, title = %photo.title, "Initialised photo");
        Ok(Flow::Continue)
    }
}

/// Record a stored variant on the photo. A second variant of one type is a bug.
fn add_variant(
    state: &mut StandaloneState,
    stage: &'static str,
    variant_type: SizeVariantType,
    short_path: String,
    dimensions: ImageDimension,
    filesize: u64,
) -> Result<()> {
    if state
        .photo
        .size_variants
        .create(variant_type, short_path, dimensions, filesize)
    {
        Ok(())
    } else {
        Err(PipelineError::VariantExists {
            stage,
            variant: variant_type,
        }
        .into())
    }
}

/// Store the working source as the ORIGINAL size variant.
pub struct CreateOriginalSizeVariant;

impl CreateOriginalSizeVariant {
    /// Upright dimensions of the working source.
    fn source_dimensions(state: &StandaloneState) -> Result<ImageDimension> {
        if state.raw_source_file.is_none() {
            // Metadata was read from this very file
            return Ok(state.metadata.dimensions());
        }
        let view = LocalView::acquire(state.source_file.as_ref())?;
        let path = view.path();
        Ok(MetadataExtractor::dimensions(
            path,
            MetadataExtractor::orientation(path),
        ))
    }

    /// Whether the ORIGINAL is a JPEG that should be re-encoded upright.
    ///
    /// A converted JPEG is already upright; its metadata describes the RAW.
    fn needs_orientation(state: &StandaloneState, ctx: &PipelineContext, extension: &str) -> bool {
        ctx.config.image.auto_orient_original
            && state.raw_source_file.is_none()
            && matches!(extension, ".jpg" | ".jpeg")
            && !matches!(state.metadata.exif.orientation, None | Some(1))
    }

    /// Re-encode the source upright into `target`, keeping the upload as a backup.
    fn store_oriented(
        state: &mut StandaloneState,
        ctx: &PipelineContext,
        extension: &str,
    ) -> Result<ImageDimension> {
        let naming = state.naming("create_original_size_variant")?.clone();
        let view = LocalView::acquire(state.source_file.as_ref())?;
        let image = ctx.image_handler.load(view.path())?;

        let scratch = TemporaryFile::new(extension).map_err(ImagingError::Io)?;
        let request = RenderRequest::full_size(VariantFormat::Jpg, ctx.config.image.quality);
        let dimensions = image.render(&request, scratch.path())?;
        drop(image);

        let backup = naming.backup_path(extension);
        let mut reader = state.source_file.open()?;
        ctx.storage.write(&backup, &mut reader)?;
        state.written_paths.push(backup.clone());
        state.photo.backup_path = Some(backup.clone());
        state.backup_file = Some(backup);

        let target = naming.create_file(SizeVariantType::Original, extension);
        let mut reader = BufReader::new(std::fs::File::open(scratch.path())?);
        let stats = target.write(ctx.storage.as_ref(), &mut reader)?;
        tracing::debug!(path = %target, "Stored upright ORIGINAL");
        state.record_write(target, stats);
        Ok(dimensions)
    }
}

impl Stage<StandaloneState> for CreateOriginalSizeVariant {
    fn name(&self) -> &'static str {
        "create_original_size_variant"
    }

    fn handle(&self, state: &mut StandaloneState, ctx: &PipelineContext) -> Result<Flow> {
        let naming = state.naming(self.name())?;
        let extension = naming.default_extension(SizeVariantType::Original).to_string();
        let target = naming.create_file(SizeVariantType::Original, &extension);

        let mut symlinked = false;
        let dimensions = if Self::needs_orientation(state, ctx, &extension) {
            Self::store_oriented(state, ctx, &extension)?
        } else {
            let dimensions = Self::source_dimensions(state)?;
            let symlink_source = state
                .source_file
                .local_path()
                .filter(|_| state.import_mode.import_via_symlink && state.source_file.is_native());

            let linked = match symlink_source {
                Some(source) => match ctx.storage.symlink(target.relative_path(), &source) {
                    Ok(stats) => Some(stats),
                    Err(StorageError::Unsupported { backend, .. }) => {
                        tracing::debug!(backend, "Symlinks unsupported, copying instead");
                        None
                    }
                    Err(e) => return Err(e.into()),
                },
                None => None,
            };

            let stats = match linked {
                Some(stats) => {
                    symlinked = true;
                    stats
                }
                None => {
                    let mut reader = state.source_file.open()?;
                    target.write(ctx.storage.as_ref(), &mut reader)?
                }
            };
            tracing::debug!(path = %target, bytes = stats.bytes, symlinked, "Stored ORIGINAL");
            state.record_write(target, stats);
            dimensions
        };

        let (path, stats) = match (&state.target_file, &state.stream_stats) {
            (Some(target), Some(stats)) => (target.relative_path().to_string(), stats.clone()),
            _ => {
                return Err(PipelineError::MissingState {
                    stage: self.name(),
                    missing: "ORIGINAL write",
                }
                .into())
            }
        };
        add_variant(
            state,
            self.name(),
            SizeVariantType::Original,
            path,
            dimensions,
            stats.bytes,
        )?;
        state.photo.original_checksum = Some(stats.checksum);

        // A converted upload is removed after its RAW copy instead
        if state.import_mode.delete_imported && state.raw_source_file.is_none() && !symlinked {
            if let Err(e) = state.source_file.delete() {
                ctx.reporter.report("delete_imported_file", &e);
            }
        }
        Ok(Flow::Continue)
    }
}

/// Keep the untouched upload of a converted file as the RAW size variant.
pub struct CreateRawSizeVariant;

impl Stage<StandaloneState> for CreateRawSizeVariant {
    fn name(&self) -> &'static str {
        "create_raw_size_variant"
    }

    fn handle(&self, state: &mut StandaloneState, ctx: &PipelineContext) -> Result<Flow> {
        let Some(raw) = state.raw_source_file.as_deref() else {
            return Ok(Flow::Continue);
        };

        let extension = raw.original_extension();
        let target = state
            .naming(self.name())?
            .create_file(SizeVariantType::Raw, &extension);
        let mut reader = raw.open()?;
        let stats = target.write(ctx.storage.as_ref(), &mut reader)?;
        drop(reader);

        let dimensions = state
            .photo
            .size_variants
            .original()
            .map(|v| v.dimensions())
            .unwrap_or_else(ImageDimension::zero);
        let delete_raw = state.import_mode.delete_imported;
        let path = target.relative_path().to_string();
        state.record_write(target, stats.clone());
        add_variant(
            state,
            self.name(),
            SizeVariantType::Raw,
            path.clone(),
            dimensions,
            stats.bytes,
        )?;
        tracing::debug!(path = %path, bytes = stats.bytes, "Stored RAW size variant");

        if delete_raw {
            if let Some(raw) = state.raw_source_file.as_deref() {
                if let Err(e) = raw.delete() {
                    ctx.reporter.report("delete_raw_source", &e);
                }
            }
        }
        Ok(Flow::Continue)
    }
}

/// Render the derived variants from the stored ORIGINAL.
pub struct CreateSizeVariants;

impl Stage<StandaloneState> for CreateSizeVariants {
    fn name(&self) -> &'static str {
        "create_size_variants"
    }

    fn handle(&self, state: &mut StandaloneState, ctx: &PipelineContext) -> Result<Flow> {
        let Some(original) = state.photo.size_variants.original() else {
            return Ok(Flow::Continue);
        };
        let stored = StoredFile::new(ctx.storage.clone(), original.short_path.clone());
        let view = LocalView::acquire(&stored)?;

        let source = match ctx.image_handler.load(view.path()) {
            Ok(source) => source,
            Err(e) => {
                tracing::debug!(
                    backend = ctx.image_handler.name(),
                    error = %e,
                    "ORIGINAL not decodable, no derived variants"
                );
                return Ok(Flow::Continue);
            }
        };

        let naming = state.naming(self.name())?.clone();
        let generator = SizeVariantGenerator::new(&ctx.config.image);
        for plan in generator.plan(source.as_ref()) {
            match generator.generate(source.as_ref(), &plan, &naming, ctx.storage.as_ref()) {
                Ok(variant) => {
                    state.written_paths.push(variant.short_path.clone());
                    add_variant(
                        state,
                        self.name(),
                        variant.variant_type,
                        variant.short_path,
                        variant.dimensions,
                        variant.filesize,
                    )?;
                }
                Err(e) => ctx.reporter.report("create_size_variant", &e),
            }
        }
        Ok(Flow::Continue)
    }
}

/// Write watermarked copies of the stored variants.
pub struct ApplyWatermark;

impl ApplyWatermark {
    fn wanted(state: &StandaloneState, ctx: &PipelineContext) -> bool {
        let config = &ctx.config.watermark;
        let opted_in = match state.apply_watermark {
            WatermarkChoice::ForceOff => config.optout_disabled,
            WatermarkChoice::UseDefault | WatermarkChoice::ForceOn => true,
        };
        opted_in && config.enabled && ctx.watermarker.can_watermark()
    }
}

impl Stage<StandaloneState> for ApplyWatermark {
    fn name(&self) -> &'static str {
        "apply_watermark"
    }

    fn handle(&self, state: &mut StandaloneState, ctx: &PipelineContext) -> Result<Flow> {
        if !Self::wanted(state, ctx) {
            return Ok(Flow::Continue);
        }

        let naming = state.naming(self.name())?.clone();
        let covered: Vec<_> = state
            .photo
            .size_variants
            .iter()
            .filter(|v| ctx.watermarker.covers(v.variant_type))
            .cloned()
            .collect();
        for variant in covered {
            match ctx.watermarker.apply(ctx.storage.as_ref(), &naming, &variant) {
                Ok(copy) => {
                    state.written_paths.push(copy.short_path.clone());
                    state.photo.watermarked.push(copy);
                }
                Err(e) => ctx.reporter.report("apply_watermark", &e),
            }
        }
        Ok(Flow::Continue)
    }
}

/// Merge caller tags with embedded keywords.
pub struct SetTags;

impl Stage<StandaloneState> for SetTags {
    fn name(&self) -> &'static str {
        "set_tags"
    }

    fn handle(&self, state: &mut StandaloneState, _ctx: &PipelineContext) -> Result<Flow> {
        let mut tags: Vec<String> = Vec::new();
        for tag in state.tags.iter().chain(&state.metadata.keywords) {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        state.photo.tags = tags;
        Ok(Flow::Continue)
    }
}

/// Copy the upload's highlight flag onto the photo. Shared with the duplicate chain.
pub struct SetHighlighted;

impl<S: PhotoState + ChainState> Stage<S> for SetHighlighted {
    fn name(&self) -> &'static str {
        "set_highlighted"
    }

    fn handle(&self, state: &mut S, _ctx: &PipelineContext) -> Result<Flow> {
        if state.is_highlighted() {
            state.photo_mut().is_highlighted = true;
        }
        Ok(Flow::Continue)
    }
}

/// Persist the photo with all its variants, then update album statistics.
pub struct SavePhoto;

impl Stage<StandaloneState> for SavePhoto {
    fn name(&self) -> &'static str {
        "save_photo"
    }

    fn handle(&self, state: &mut StandaloneState, ctx: &PipelineContext) -> Result<Flow> {
        ctx.repository.insert(&state.photo)?;
        // Committed files belong to the photo now
        state.written_paths.clear();

        let sizes = variant_sizes(&state.photo);
        for album in &state.photo.albums {
            ctx.repository.increment_album_statistics(album, &sizes)?;
        }

        tracing::info!(
            photo = %state.photo.id,
            title = %state.photo.title,
            variants = state.photo.size_variants.len(),
            raw = state.photo.size_variants.raw().is_some(),
            "Imported photo"
        );
        Ok(Flow::Continue)
    }
}
