//! Init stages: run once per upload, before anything is written to storage.

use std::io;

use super::{Chain, Flow, InitState, PipelineContext, Stage};
use crate::convert::{classify, is_convertible_raw, FormatClass, RawToJpeg};
use crate::error::{PipelineError, Result};
use crate::files::MediaFile;
use crate::metadata::{title_from_basename, MetadataExtractor};
use crate::storage::copy_with_stats;

/// The init chain in its fixed order.
pub fn chain() -> Chain<InitState> {
    Chain::new("init")
        .stage(DetectAndStoreRaw)
        .stage(AssertSupportedMedia)
        .stage(LoadFileMetadata)
        .stage(FindDuplicate)
        .stage(FindLivePartner)
}

/// Map a failed read of the upload to a pipeline error.
fn upload_error(file: &dyn MediaFile, err: io::Error) -> crate::error::IngestError {
    if err.kind() == io::ErrorKind::NotFound {
        PipelineError::FileNotFound(
            file.local_path()
                .unwrap_or_else(|| file.original_basename().into()),
        )
        .into()
    } else {
        err.into()
    }
}

/// Convert RAW/HEIC/PSD uploads to JPEG, stashing the untouched upload.
///
/// A failed conversion is reported and swallowed: the upload then continues
/// as an opaque file and gets no RAW variant.
pub struct DetectAndStoreRaw;

impl Stage<InitState> for DetectAndStoreRaw {
    fn name(&self) -> &'static str {
        "detect_and_store_raw"
    }

    fn handle(&self, state: &mut InitState, ctx: &PipelineContext) -> Result<Flow> {
        let extension = state.source_file.original_extension();
        if !is_convertible_raw(&extension) {
            return Ok(Flow::Continue);
        }

        match RawToJpeg::new(ctx.converter.as_ref()).handle(state.source_file.as_ref()) {
            Ok(jpeg) => {
                tracing::debug!(extension = %extension, "Converted upload to JPEG");
                let raw = std::mem::replace(&mut state.source_file, Box::new(jpeg));
                state.raw_source_file = Some(raw);
            }
            Err(e) => {
                tracing::debug!(extension = %extension, error = %e, "Keeping unconverted upload");
                ctx.reporter.report("convert_raw_to_jpeg", &e);
            }
        }
        Ok(Flow::Continue)
    }
}

/// Reject files that cannot be stored at all, and oversized uploads.
pub struct AssertSupportedMedia;

impl Stage<InitState> for AssertSupportedMedia {
    fn name(&self) -> &'static str {
        "assert_supported_media"
    }

    fn handle(&self, state: &mut InitState, ctx: &PipelineContext) -> Result<Flow> {
        let extension = state.source_file.original_extension();
        let class = classify(&extension, &ctx.config.formats.accepted_raw_formats);
        if class == FormatClass::Unsupported {
            return Err(PipelineError::UnsupportedFormat {
                path: state
                    .source_file
                    .local_path()
                    .unwrap_or_else(|| state.source_file.original_basename().into()),
                extension,
            }
            .into());
        }

        let upload = state.original_upload();
        let size = upload.filesize().map_err(|e| upload_error(upload, e))?;
        let max_bytes = ctx.config.limits.max_file_size_mb.saturating_mul(1024 * 1024);
        if size > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: upload
                    .local_path()
                    .unwrap_or_else(|| upload.original_basename().into()),
                size_mb: size / (1024 * 1024),
                max_mb: ctx.config.limits.max_file_size_mb,
            }
            .into());
        }

        tracing::trace!(extension = %extension, ?class, size, "Accepted upload");
        Ok(Flow::Continue)
    }
}

/// Extract metadata, preferring the untouched upload over a converted JPEG.
///
/// Does nothing when metadata is already present.
pub struct LoadFileMetadata;

impl Stage<InitState> for LoadFileMetadata {
    fn name(&self) -> &'static str {
        "load_file_metadata"
    }

    fn handle(&self, state: &mut InitState, _ctx: &PipelineContext) -> Result<Flow> {
        if state.metadata.is_some() {
            return Ok(Flow::Continue);
        }

        let upload = state.original_upload();
        let mut metadata = MetadataExtractor::extract(upload, state.file_last_modified_time)
            .map_err(|e| upload_error(upload, e))?;

        if metadata.title.trim().is_empty() {
            metadata.title = title_from_basename(&upload.original_basename());
        }
        state.metadata = Some(metadata);
        Ok(Flow::Continue)
    }
}

/// Halt when a photo with the same bytes already exists.
pub struct FindDuplicate;

impl Stage<InitState> for FindDuplicate {
    fn name(&self) -> &'static str {
        "find_duplicate"
    }

    fn handle(&self, state: &mut InitState, ctx: &PipelineContext) -> Result<Flow> {
        let upload = state.original_upload();
        let mut reader = upload.open().map_err(|e| upload_error(upload, e))?;
        let stats = copy_with_stats(&mut reader, &mut io::sink())?;
        drop(reader);

        let duplicate = ctx.repository.find_by_checksum(&stats.checksum)?;
        state.checksum = Some(stats.checksum);

        match duplicate {
            Some(existing) => {
                tracing::info!(photo = %existing.id, "Upload duplicates an existing photo");
                state.duplicate = Some(existing);
                Ok(Flow::Halt)
            }
            None => Ok(Flow::Continue),
        }
    }
}

/// Find the other half of a live photo pair.
pub struct FindLivePartner;

impl Stage<InitState> for FindLivePartner {
    fn name(&self) -> &'static str {
        "find_live_partner"
    }

    fn handle(&self, state: &mut InitState, ctx: &PipelineContext) -> Result<Flow> {
        let content_id = state
            .metadata
            .as_ref()
            .and_then(|m| m.live_photo_content_id.as_deref());
        if let Some(content_id) = content_id {
            state.live_partner = ctx
                .repository
                .find_live_partner(state.intended_owner_id, content_id)?;
            if let Some(partner) = &state.live_partner {
                tracing::debug!(partner = %partner.id, "Found live photo partner");
            }
        }
        Ok(Flow::Continue)
    }
}
