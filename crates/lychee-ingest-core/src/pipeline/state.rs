//! Per-upload processing state, one type per chain.
//!
//! File handles live in the state and are released when it is dropped, on
//! success and failure alike.

use chrono::{DateTime, Utc};

use super::ChainState;
use crate::error::PipelineError;
use crate::files::MediaFile;
use crate::metadata::Metadata;
use crate::naming::{NamingStrategy, TargetFile};
use crate::storage::StreamStats;
use crate::types::{AlbumId, ApplyWatermark, ImportMode, ImportParam, Photo, PhotoId};

/// State of the init chain.
#[derive(Debug)]
pub struct InitState {
    pub import_mode: ImportMode,
    pub intended_owner_id: u32,
    pub album: Option<AlbumId>,
    pub is_highlighted: bool,
    /// Populated by `LoadFileMetadata` unless supplied by the caller
    pub metadata: Option<Metadata>,
    pub apply_watermark: ApplyWatermark,
    /// The file downstream stages display and derive from
    pub source_file: Box<dyn MediaFile>,
    /// The untouched upload, set only after a successful RAW conversion
    pub raw_source_file: Option<Box<dyn MediaFile>>,
    pub duplicate: Option<Photo>,
    pub live_partner: Option<Photo>,
    pub file_last_modified_time: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    /// BLAKE3 of the uploaded bytes
    pub checksum: Option<String>,
}

impl InitState {
    pub fn new(source_file: Box<dyn MediaFile>, param: ImportParam) -> Self {
        Self {
            import_mode: param.import_mode,
            intended_owner_id: param.intended_owner_id,
            album: param.album,
            is_highlighted: param.is_highlighted,
            metadata: param.metadata,
            apply_watermark: param.apply_watermark,
            source_file,
            raw_source_file: None,
            duplicate: None,
            live_partner: None,
            file_last_modified_time: param.file_last_modified_time,
            tags: param.tags,
            checksum: None,
        }
    }

    /// The file exactly as uploaded: the stashed RAW if any, else the source.
    pub fn original_upload(&self) -> &dyn MediaFile {
        self.raw_source_file
            .as_deref()
            .unwrap_or(self.source_file.as_ref())
    }
}

impl ChainState for InitState {}

/// State of one standalone creation.
#[derive(Debug)]
pub struct StandaloneState {
    pub import_mode: ImportMode,
    pub intended_owner_id: u32,
    pub album: Option<AlbumId>,
    pub is_highlighted: bool,
    pub metadata: Metadata,
    pub apply_watermark: ApplyWatermark,
    pub source_file: Box<dyn MediaFile>,
    pub raw_source_file: Option<Box<dyn MediaFile>>,
    pub live_partner: Option<Photo>,
    pub checksum: String,
    pub tags: Vec<String>,

    /// The photo being built; its id is allocated here
    pub photo: Photo,
    /// Set by `InitPhoto`
    pub naming: Option<NamingStrategy>,
    /// Target of the most recent write
    pub target_file: Option<TargetFile>,
    /// Statistics of the most recent write
    pub stream_stats: Option<StreamStats>,
    /// Storage path of the untouched upload, when the ORIGINAL was re-encoded
    pub backup_file: Option<String>,
    /// Every storage path written so far
    pub written_paths: Vec<String>,
}

impl StandaloneState {
    /// Carry an init state into the creation phase.
    pub fn from_init(init: InitState) -> Result<Self, PipelineError> {
        let metadata = init.metadata.ok_or(PipelineError::MissingState {
            stage: "standalone",
            missing: "metadata",
        })?;
        let checksum = init.checksum.ok_or(PipelineError::MissingState {
            stage: "standalone",
            missing: "checksum",
        })?;
        Ok(Self {
            import_mode: init.import_mode,
            intended_owner_id: init.intended_owner_id,
            album: init.album,
            is_highlighted: init.is_highlighted,
            metadata,
            apply_watermark: init.apply_watermark,
            source_file: init.source_file,
            raw_source_file: init.raw_source_file,
            live_partner: init.live_partner,
            checksum,
            tags: init.tags,
            photo: Photo::new(PhotoId::generate(), init.intended_owner_id),
            naming: None,
            target_file: None,
            stream_stats: None,
            backup_file: None,
            written_paths: Vec::new(),
        })
    }

    pub fn naming(&self, stage: &'static str) -> Result<&NamingStrategy, PipelineError> {
        self.naming.as_ref().ok_or(PipelineError::MissingState {
            stage,
            missing: "naming strategy",
        })
    }

    /// Remember a completed write.
    pub fn record_write(&mut self, target: TargetFile, stats: StreamStats) {
        self.written_paths.push(target.relative_path().to_string());
        self.target_file = Some(target);
        self.stream_stats = Some(stats);
    }
}

impl ChainState for StandaloneState {
    fn written_paths(&self) -> &[String] {
        &self.written_paths
    }
}

/// State of the duplicate chain.
#[derive(Debug)]
pub struct DuplicateState {
    pub import_mode: ImportMode,
    pub album: Option<AlbumId>,
    pub is_highlighted: bool,
    /// The upload; deleted afterwards when the import mode asks for it
    pub original_upload: Box<dyn MediaFile>,
    /// The existing photo with the same bytes
    pub photo: Photo,
    /// Album newly linked by `LinkToAlbum`
    pub linked_album: Option<AlbumId>,
}

impl DuplicateState {
    pub fn from_init(init: InitState, photo: Photo) -> Self {
        let original_upload = match init.raw_source_file {
            Some(raw) => raw,
            None => init.source_file,
        };
        Self {
            import_mode: init.import_mode,
            album: init.album,
            is_highlighted: init.is_highlighted,
            original_upload,
            photo,
            linked_album: None,
        }
    }
}

impl ChainState for DuplicateState {}

/// State that carries a photo, for stages shared between chains.
pub trait PhotoState {
    fn photo_mut(&mut self) -> &mut Photo;

    fn is_highlighted(&self) -> bool;
}

impl PhotoState for StandaloneState {
    fn photo_mut(&mut self) -> &mut Photo {
        &mut self.photo
    }

    fn is_highlighted(&self) -> bool {
        self.is_highlighted
    }
}

impl PhotoState for DuplicateState {
    fn photo_mut(&mut self) -> &mut Photo {
        &mut self.photo
    }

    fn is_highlighted(&self) -> bool {
        self.is_highlighted
    }
}
