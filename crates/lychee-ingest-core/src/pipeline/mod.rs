//! Photo ingestion pipeline.
//!
//! An upload runs through three ordered chains of stages:
//! - **init**: conversion, validation, metadata, duplicate and live-photo detection
//! - **standalone**: storage of the ORIGINAL, RAW and derived variants, watermarks, persistence
//! - **duplicate**: album linking for an upload whose bytes are already known
//!
//! Each [`Stage`] mutates the chain's state and either continues or halts.
//! Errors abort the chain; storage writes made before the error stay behind as
//! orphans and are logged, never rolled back.

pub mod duplicate;
pub mod init;
pub mod standalone;
pub mod state;


pub use state::{DuplicateState, InitState, PhotoState, StandaloneState};

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::convert::{ConversionEngine, DisabledEngine, MagickEngine};
use crate::error::Result;
use crate::imaging::{handler_from_config, ImageHandler};
use crate::report::{ErrorReporter, TracingReporter};
use crate::repository::PhotoRepository;
use crate::storage::Storage;
use crate::types::{Photo, PhotoId};
use crate::watermark::Watermarker;

/// What a stage wants the driver to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop the chain without error
    Halt,
}

/// One step of a chain.
pub trait Stage<S>: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle(&self, state: &mut S, ctx: &PipelineContext) -> Result<Flow>;
}

/// State that tracks the storage paths it caused to be written.
pub trait ChainState {
    fn written_paths(&self) -> &[String] {
        &[]
    }
}

/// A fixed, ordered list of stages.
pub struct Chain<S> {
    name: &'static str,
    stages: Vec<Box<dyn Stage<S>>>,
}

impl<S: ChainState> Chain<S> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            stages: Vec::new(),
        }
    }

    /// Append a stage.
    pub fn stage(mut self, stage: impl Stage<S> + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order until one halts or fails.
    pub fn run(&self, state: &mut S, ctx: &PipelineContext) -> Result<Flow> {
        let start = Instant::now();
        for stage in &self.stages {
            let stage_start = Instant::now();
            let flow = match stage.handle(state, ctx) {
                Ok(flow) => flow,
                Err(e) => {
                    tracing::debug!(chain = self.name, stage = stage.name(), error = %e, "Stage failed");
                    for path in state.written_paths() {
                        tracing::warn!(
                            chain = self.name,
                            stage = stage.name(),
                            path = %path,
                            "Orphaned file left in storage"
                        );
                    }
                    return Err(e);
                }
            };
            tracing::trace!(
                chain = self.name,
                stage = stage.name(),
                elapsed = ?stage_start.elapsed(),
                "Stage done"
            );
            if flow == Flow::Halt {
                tracing::debug!(chain = self.name, stage = stage.name(), "Chain halted");
                return Ok(Flow::Halt);
            }
        }
        tracing::trace!(chain = self.name, elapsed = ?start.elapsed(), "Chain done");
        Ok(Flow::Continue)
    }
}

/// Renames photo titles on import. Supplied by the host application.
pub trait TitleRenamer: Send + Sync {
    fn rename(&self, owner_id: u32, title: &str) -> String;
}

/// Collaborators shared by every stage.
#[derive(Clone)]
pub struct PipelineContext {
    pub config: Arc<Config>,
    pub storage: Arc<dyn Storage>,
    pub repository: Arc<dyn PhotoRepository>,
    pub converter: Arc<dyn ConversionEngine>,
    pub image_handler: Arc<dyn ImageHandler>,
    pub watermarker: Arc<Watermarker>,
    pub reporter: Arc<dyn ErrorReporter>,
    pub renamer: Option<Arc<dyn TitleRenamer>>,
}

impl PipelineContext {
    /// Wire the defaults implied by `config` around a storage and repository.
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        repository: Arc<dyn PhotoRepository>,
    ) -> Self {
        let converter: Arc<dyn ConversionEngine> = if config.conversion.enabled {
            Arc::new(MagickEngine::new(&config.conversion.magick_binary))
        } else {
            Arc::new(DisabledEngine)
        };
        Self {
            converter,
            image_handler: handler_from_config(&config),
            watermarker: Arc::new(Watermarker::from_config(&config)),
            reporter: Arc::new(TracingReporter),
            renamer: None,
            storage,
            repository,
            config: Arc::new(config),
        }
    }

    pub fn with_converter(mut self, converter: Arc<dyn ConversionEngine>) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_image_handler(mut self, handler: Arc<dyn ImageHandler>) -> Self {
        self.image_handler = handler;
        self
    }

    pub fn with_watermarker(mut self, watermarker: Watermarker) -> Self {
        self.watermarker = Arc::new(watermarker);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_renamer(mut self, renamer: Arc<dyn TitleRenamer>) -> Self {
        self.renamer = Some(renamer);
        self
    }
}

/// Result of ingesting one upload.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// A new photo with its variants was persisted
    Created { photo: Box<Photo> },
    /// The bytes were already known; the existing photo was linked instead
    Duplicate { photo: Box<Photo> },
    /// The bytes were already known and the import mode skips duplicates
    Skipped { existing: PhotoId },
}

impl IngestOutcome {
    pub fn photo_id(&self) -> &PhotoId {
        match self {
            Self::Created { photo } | Self::Duplicate { photo } => &photo.id,
            Self::Skipped { existing } => existing,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Duplicate { .. } => "duplicate",
            Self::Skipped { .. } => "skipped",
        }
    }
}
