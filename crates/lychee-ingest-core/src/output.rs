//! JSON and JSON Lines output of import results.

use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::error::IngestError;
use crate::pipeline::IngestOutcome;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON value or array
    Json,
    /// One JSON object per line
    JsonLines,
}

impl OutputFormat {
    /// Parse a format name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// One line of an import report.
#[derive(Debug, Serialize)]
pub struct ImportRecord {
    pub source: PathBuf,
    #[serde(flatten)]
    pub result: ImportResult,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ImportResult {
    Done(IngestOutcome),
    Failed { status: &'static str, error: String },
}

impl ImportRecord {
    pub fn new(source: impl Into<PathBuf>, result: Result<IngestOutcome, IngestError>) -> Self {
        let result = match result {
            Ok(outcome) => ImportResult::Done(outcome),
            Err(e) => ImportResult::Failed {
                status: "failed",
                error: e.to_string(),
            },
        };
        Self {
            source: source.into(),
            result,
        }
    }

    pub fn status(&self) -> &'static str {
        match &self.result {
            ImportResult::Done(outcome) => outcome.status(),
            ImportResult::Failed { status, .. } => status,
        }
    }
}

/// Serializes items as JSON or JSON Lines.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new output writer.
    ///
    /// # Arguments
    ///
    /// * `writer` - The underlying writer (report file, stdout, etc.)
    /// * `format` - Output format (JSON array or JSON Lines)
    /// * `pretty` - Whether to pretty-print JSON (only affects JSON format)
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write a single item.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)?;
        self.items_written += 1;
        Ok(())
    }

    /// Write a batch: one array for JSON, one line per item for JSON Lines.
    pub fn write_all<T: Serialize>(&mut self, items: &[T]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, items)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, items).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.items_written += items.len();
            }
            OutputFormat::JsonLines => {
                for item in items {
                    self.write(item)?;
                }
            }
        }
        Ok(())
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn items_written(&self) -> usize {
        self.items_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::types::PhotoId;

    fn records() -> Vec<ImportRecord> {
        vec![
            ImportRecord::new(
                "a.jpg",
                Ok(IngestOutcome::Skipped {
                    existing: PhotoId::from("p1"),
                }),
            ),
            ImportRecord::new(
                "b.txt",
                Err(PipelineError::UnsupportedFormat {
                    path: "b.txt".into(),
                    extension: ".txt".to_string(),
                }
                .into()),
            ),
        ]
    }

    #[test]
    fn test_jsonl_one_record_per_line() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::JsonLines, true);
        writer.write_all(&records()).unwrap();
        assert_eq!(writer.items_written(), 2);

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["status"], "skipped");
        assert_eq!(lines[0]["existing"], "p1");
        assert_eq!(lines[0]["source"], "a.jpg");
        assert_eq!(lines[1]["status"], "failed");
        assert!(lines[1]["error"].as_str().unwrap().contains(".txt"));
    }

    #[test]
    fn test_json_array() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, false);
        writer.write_all(&records()).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_record_status() {
        let statuses: Vec<_> = records().iter().map(|r| r.status()).collect();
        assert_eq!(statuses, vec!["skipped", "failed"]);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("NDJSON"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("xml"), None);
    }
}
