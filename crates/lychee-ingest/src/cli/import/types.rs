//! CLI enum types for the import command: output format and watermark choice.

use clap::ValueEnum;
use lychee_ingest_core::output::OutputFormat as CoreOutputFormat;
use lychee_ingest_core::types::ApplyWatermark;

/// Supported output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Per-run watermark choice.
#[derive(Clone, Copy, Debug, ValueEnum, Default)]
pub enum WatermarkChoice {
    /// Follow `watermark.enabled`
    #[default]
    Default,
    /// Watermark even if the run would otherwise opt out
    On,
    /// Opt out (ignored when `watermark.optout_disabled` is set)
    Off,
}

impl From<WatermarkChoice> for ApplyWatermark {
    fn from(choice: WatermarkChoice) -> Self {
        match choice {
            WatermarkChoice::Default => ApplyWatermark::UseDefault,
            WatermarkChoice::On => ApplyWatermark::ForceOn,
            WatermarkChoice::Off => ApplyWatermark::ForceOff,
        }
    }
}
