//! Entry points: importing uploads and managing stored photos.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::discovery::{DiscoveredFile, FileDiscovery};
use crate::error::{IngestError, RepositoryError, Result};
use crate::files::{MediaFile, NativeLocalFile};
use crate::pipeline::{
    duplicate, init, standalone, Chain, DuplicateState, InitState, IngestOutcome, PipelineContext,
    StandaloneState,
};
use crate::report::ErrorReporter;
use crate::repository::{variant_sizes, JsonCatalog, PhotoRepository};
use crate::storage::{copy_with_stats, LocalStorage, Storage, StreamStats};
use crate::types::{AlbumId, AlbumSizeStatistics, ImportParam, Photo, PhotoId, SizeVariantType};

/// Runs uploads through the pipeline.
///
/// An `Ingestor` is immutable once built and can be shared between worker
/// threads; each call to [`ingest`](Self::ingest) owns its own state.
pub struct Ingestor {
    ctx: PipelineContext,
    init: Chain<InitState>,
    standalone: Chain<StandaloneState>,
    duplicate: Chain<DuplicateState>,
    discovery: FileDiscovery,
}

impl Ingestor {
    pub fn new(ctx: PipelineContext) -> Self {
        Self {
            discovery: FileDiscovery::new(&ctx.config),
            init: init::chain(),
            standalone: standalone::chain(),
            duplicate: duplicate::chain(),
            ctx,
        }
    }

    /// An ingestor over the local storage root and JSON catalog named by `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let storage = LocalStorage::new(config.storage_root());
        let catalog = JsonCatalog::open(config.catalog_path())?;
        tracing::debug!(
            storage = %storage.root().display(),
            catalog = %catalog.path().display(),
            "Opened gallery"
        );
        Ok(Self::new(PipelineContext::new(
            config,
            Arc::new(storage),
            Arc::new(catalog),
        )))
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Photo management over the same storage and repository.
    pub fn gallery(&self) -> Gallery {
        Gallery::new(&self.ctx)
    }

    /// Discover importable files at a path.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        self.discovery.discover(path)
    }

    /// Import one upload.
    ///
    /// # Arguments
    ///
    /// * `file` - The upload; a converted RAW/HEIC/PSD keeps its bytes as the RAW variant
    /// * `param` - Owner, album, import mode and per-upload overrides
    ///
    /// # Notes
    ///
    /// - A known checksum yields `Duplicate`, or `Skipped` with `skip_duplicates`
    /// - On error, files already written stay in storage and are logged as orphans
    pub fn ingest(&self, file: Box<dyn MediaFile>, param: ImportParam) -> Result<IngestOutcome> {
        let start = std::time::Instant::now();
        tracing::debug!(file = ?file, "Ingesting");

        let mut init = InitState::new(file, param);
        self.init.run(&mut init, &self.ctx)?;

        if let Some(existing) = init.duplicate.take() {
            if init.import_mode.skip_duplicates {
                tracing::info!(photo = %existing.id, "Skipped duplicate upload");
                return Ok(IngestOutcome::Skipped {
                    existing: existing.id,
                });
            }
            let mut state = DuplicateState::from_init(init, existing);
            self.duplicate.run(&mut state, &self.ctx)?;
            return Ok(IngestOutcome::Duplicate {
                photo: Box::new(state.photo),
            });
        }

        let mut state = StandaloneState::from_init(init)?;
        self.standalone.run(&mut state, &self.ctx)?;
        tracing::debug!(photo = %state.photo.id, elapsed = ?start.elapsed(), "Ingested");
        Ok(IngestOutcome::Created {
            photo: Box::new(state.photo),
        })
    }

    /// Import a file on local disk.
    pub fn ingest_path(&self, path: &Path, param: ImportParam) -> Result<IngestOutcome> {
        self.ingest(Box::new(NativeLocalFile::new(path)), param)
    }
}

/// Operations on photos that are already stored.
#[derive(Clone)]
pub struct Gallery {
    config: Arc<Config>,
    storage: Arc<dyn Storage>,
    repository: Arc<dyn PhotoRepository>,
    reporter: Arc<dyn ErrorReporter>,
}

impl Gallery {
    pub fn new(ctx: &PipelineContext) -> Self {
        Self {
            config: ctx.config.clone(),
            storage: ctx.storage.clone(),
            repository: ctx.repository.clone(),
            reporter: ctx.reporter.clone(),
        }
    }

    pub fn get(&self, id: &PhotoId) -> Result<Photo> {
        self.repository
            .get(id)?
            .ok_or_else(|| IngestError::PhotoNotFound(id.clone()))
    }

    pub fn list(&self, album: Option<&AlbumId>) -> Result<Vec<Photo>> {
        Ok(self.repository.list(album)?)
    }

    pub fn album_statistics(&self, album: &AlbumId) -> Result<AlbumSizeStatistics> {
        Ok(self.repository.album_statistics(album)?)
    }

    /// Remove a photo, its files and its share of album statistics.
    ///
    /// Files that cannot be deleted are reported and left behind.
    pub fn delete_photo(&self, id: &PhotoId) -> Result<Photo> {
        let photo = match self.repository.delete(id) {
            Ok(photo) => photo,
            Err(RepositoryError::NotFound(id)) => return Err(IngestError::PhotoNotFound(id)),
            Err(e) => return Err(e.into()),
        };

        for path in photo.stored_paths() {
            if let Err(e) = self.storage.delete(path) {
                self.reporter.report("delete_stored_file", &e);
            }
        }

        let sizes = variant_sizes(&photo);
        for album in &photo.albums {
            self.repository.decrement_album_statistics(album, &sizes)?;
        }
        tracing::info!(photo = %photo.id, files = photo.stored_paths().len(), "Deleted photo");
        Ok(photo)
    }

    /// Copy one stored variant to `destination`.
    pub fn export_variant(
        &self,
        id: &PhotoId,
        variant_type: SizeVariantType,
        destination: &Path,
    ) -> Result<StreamStats> {
        if variant_type == SizeVariantType::Raw && !self.config.download.raw_download_enabled {
            return Err(IngestError::RawDownloadDisabled);
        }

        let photo = self.get(id)?;
        let variant =
            photo
                .size_variants
                .get(variant_type)
                .ok_or_else(|| IngestError::VariantNotFound {
                    photo: id.clone(),
                    variant: variant_type,
                })?;

        let mut reader = self.storage.read(&variant.short_path)?;
        let mut writer = BufWriter::new(File::create(destination)?);
        let stats = copy_with_stats(&mut reader, &mut writer)?;
        writer.flush()?;
        tracing::debug!(
            photo = %id,
            variant = %variant_type,
            destination = %destination.display(),
            bytes = stats.bytes,
            "Exported size variant"
        );
        Ok(stats)
    }
}
