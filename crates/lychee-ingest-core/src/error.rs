//! Error types for the ingestion pipeline.
//!
//! Errors are organized by concern so that each stage can raise a typed,
//! stage-specific failure. Recoverable failures (conversion, cleanup) are
//! reported through [`ErrorReporter`](crate::report::ErrorReporter) and never
//! reach the caller; everything else converges on [`IngestError`].

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{PhotoId, SizeVariantType};

/// Top-level error type for ingestion operations.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline stage failures
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Storage backend failures
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Persistence failures
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Image backend failures that were not recovered in place
    #[error("Imaging error: {0}")]
    Imaging(#[from] ImagingError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Photo does not exist
    #[error("Photo not found: {0}")]
    PhotoNotFound(PhotoId),

    /// Photo has no variant of the requested type
    #[error("Photo {photo} has no {variant} size variant")]
    VariantNotFound {
        photo: PhotoId,
        variant: SizeVariantType,
    },

    /// RAW downloads are switched off by configuration
    #[error("Downloading RAW files is disabled")]
    RawDownloadDisabled,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Stage failures that abort the chain.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The file cannot be processed at all
    #[error("Unsupported format for {path}: {extension}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Source file vanished between upload and processing
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A stage ran without the state its predecessors should have produced
    #[error("Stage {stage} ran before {missing} was available")]
    MissingState {
        stage: &'static str,
        missing: &'static str,
    },

    /// A stage produced a size variant the photo already has
    #[error("Stage {stage} produced a second {variant} size variant")]
    VariantExists {
        stage: &'static str,
        variant: SizeVariantType,
    },
}

/// Storage backend errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No such object: {0}")]
    NotFound(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("{backend} storage does not support {operation}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },
}

/// RAW/HEIC/PSD to JPEG conversion failures. Always recoverable.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Conversion engine is not available: {0}")]
    EngineUnavailable(String),

    #[error("Failed to convert {path} to JPEG: {message}")]
    Failed { path: PathBuf, message: String },

    #[error("IO error during conversion: {0}")]
    Io(#[from] std::io::Error),
}

/// Image backend errors (decode, resize, encode).
#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Backend {backend} failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence errors.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Unique constraint on checksum (concurrent upload of the same bytes)
    #[error("A photo with checksum {0} already exists")]
    DuplicateChecksum(String),

    #[error("A photo with id {0} already exists")]
    DuplicateId(PhotoId),

    #[error("Photo not found: {0}")]
    NotFound(PhotoId),

    #[error("Catalog IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Repository lock poisoned")]
    Poisoned,
}

/// Convenience type alias for ingestion results.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Convenience type alias for storage results.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
