//! Batch import: a bounded pool of blocking workers with progress and streaming output.

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lychee_ingest_core::output::OutputFormat;
use lychee_ingest_core::{DiscoveredFile, ImportParam, ImportRecord, Ingestor, OutputWriter};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Counts for the summary table.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Summary {
    pub created: u64,
    pub duplicates: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Bytes of the uploads that became new photos
    pub total_bytes: u64,
    pub elapsed: Duration,
}

impl Summary {
    fn record(&mut self, status: &str, size: u64) {
        match status {
            "created" => {
                self.created += 1;
                self.total_bytes += size;
            }
            "duplicate" => self.duplicates += 1,
            "skipped" => self.skipped += 1,
            _ => self.failed += 1,
        }
    }

    fn processed(&self) -> u64 {
        self.created + self.duplicates + self.skipped + self.failed
    }
}

/// Import `files` with at most `parallel` uploads in flight.
///
/// JSON Lines records are written as uploads finish; JSON output is written as
/// one array once the batch is done.
pub async fn import_batch<W: Write>(
    ingestor: Arc<Ingestor>,
    files: Vec<DiscoveredFile>,
    param: ImportParam,
    parallel: usize,
    writer: &mut OutputWriter<W>,
) -> anyhow::Result<Summary> {
    let progress = create_progress_bar(files.len() as u64);
    let semaphore = Arc::new(Semaphore::new(parallel.max(1)));
    let start_time = Instant::now();

    let mut tasks = JoinSet::new();
    for file in files {
        let ingestor = Arc::clone(&ingestor);
        let semaphore = Arc::clone(&semaphore);
        let param = param.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let DiscoveredFile { path, size } = file;
            let source = path.clone();
            let result =
                tokio::task::spawn_blocking(move || ingestor.ingest_path(&source, param)).await?;
            Ok::<_, anyhow::Error>((path, size, result))
        });
    }

    let mut summary = Summary::default();
    let mut records = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (path, size, result) = joined??;
        if let Err(e) = &result {
            tracing::error!("Failed: {:?} - {}", path, e);
        }

        let record = ImportRecord::new(path, result);
        summary.record(record.status(), size);
        match writer.format() {
            OutputFormat::JsonLines => writer.write(&record)?,
            OutputFormat::Json => records.push(record),
        }

        progress.inc(1);
        let elapsed = start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            progress.set_message(format!("{:.1} img/sec", summary.processed() as f64 / elapsed));
        }
    }

    if !records.is_empty() {
        writer.write_all(&records)?;
    }

    progress.finish_and_clear();
    summary.elapsed = start_time.elapsed();
    Ok(summary)
}

/// Create a progress bar for batch imports.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after a batch import.
pub fn print_summary(summary: &Summary) {
    let elapsed = summary.elapsed.as_secs_f64();
    let (rate, throughput) = if elapsed > 0.0 {
        (
            summary.processed() as f64 / elapsed,
            summary.total_bytes as f64 / 1_000_000.0 / elapsed,
        )
    } else {
        (0.0, 0.0)
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Created:      {:>8}", summary.created);
    if summary.duplicates > 0 {
        eprintln!("    Duplicates:   {:>8}", summary.duplicates);
    }
    if summary.skipped > 0 {
        eprintln!("    Skipped:      {:>8}", summary.skipped);
    }
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", summary.processed());
    eprintln!("    Duration:     {:>7.1}s", elapsed);
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("    Throughput:   {:>7.1} MB/sec", throughput);
    eprintln!("  ====================================");
}
