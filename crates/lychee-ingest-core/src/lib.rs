//! Lychee Ingest Core - photo ingestion library.
//!
//! Takes uploaded image files, converts RAW/HEIC/PSD uploads to JPEG while
//! keeping the untouched upload as a RAW size variant, stores the ORIGINAL and
//! its derived variants, and persists the resulting photo records.
//!
//! # Architecture
//!
//! Every upload runs through chains of stages with no database dependencies
//! beyond the [`PhotoRepository`] seam:
//!
//! ```text
//! Upload → init (convert, validate, metadata, duplicates)
//!        → standalone (ORIGINAL, RAW, variants, watermark, save)
//!        | duplicate (link album, save)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use lychee_ingest_core::{Config, ImportParam, Ingestor};
//!
//! fn main() -> lychee_ingest_core::Result<()> {
//!     let config = Config::load()?;
//!     let ingestor = Ingestor::from_config(config)?;
//!
//!     let outcome = ingestor.ingest_path("./IMG_0042.heic".as_ref(), ImportParam::default())?;
//!     println!("{}: {}", outcome.status(), outcome.photo_id());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod convert;
pub mod discovery;
pub mod error;
pub mod files;
pub mod gallery;
pub mod imaging;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod repository;
pub mod storage;
pub mod types;
pub mod variants;
pub mod watermark;

// Re-exports for convenient access
pub use config::Config;
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use error::{
    ConfigError, ConversionError, ImagingError, IngestError, PipelineError, RepositoryError,
    Result, StorageError,
};
pub use gallery::{Gallery, Ingestor};
pub use output::{ImportRecord, OutputFormat, OutputWriter};
pub use pipeline::{IngestOutcome, PipelineContext};
pub use repository::PhotoRepository;
pub use types::{
    AlbumId, AlbumSizeStatistics, ImageDimension, ImportMode, ImportParam, Photo, PhotoId,
    SizeVariant, SizeVariantType,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
