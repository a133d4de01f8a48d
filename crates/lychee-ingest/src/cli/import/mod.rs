//! The `lychee-ingest import` command for importing photos.

mod batch;
pub mod types;

pub use types::{OutputFormat, WatermarkChoice};

use clap::Args;
use lychee_ingest_core::{AlbumId, Config, ImportParam, Ingestor, OutputWriter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use batch::{import_batch, print_summary};

/// Arguments for the `import` command.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Files or directories to import
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Album to add the imported photos to
    #[arg(long)]
    pub album: Option<String>,

    /// Owner of the imported photos
    #[arg(long, default_value = "0")]
    pub owner: u32,

    /// Mark the imported photos as highlighted
    #[arg(long)]
    pub highlight: bool,

    /// Watermark choice for this run
    #[arg(long, value_enum, default_value = "default")]
    pub watermark: WatermarkChoice,

    /// Tag to attach (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Delete uploaded files once they are stored
    #[arg(long)]
    pub delete_imported: bool,

    /// Symlink originals instead of copying them
    #[arg(long)]
    pub symlink: bool,

    /// Skip files whose content is already in the gallery
    #[arg(long)]
    pub skip_duplicates: bool,

    /// Number of parallel workers
    #[arg(short, long, default_value = "4")]
    pub parallel: usize,

    /// Report format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Report file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ImportArgs {
    /// The per-upload parameters for this run, on top of the `[import]` defaults.
    pub fn import_param(&self, config: &Config) -> ImportParam {
        let mut mode = config.import.import_mode();
        mode.delete_imported |= self.delete_imported;
        mode.import_via_symlink |= self.symlink;
        mode.skip_duplicates |= self.skip_duplicates;

        let mut param = ImportParam::new(mode, self.owner);
        param.album = self.album.as_deref().map(AlbumId::new);
        param.is_highlighted = self.highlight;
        param.apply_watermark = self.watermark.into();
        param.tags = self.tags.clone();
        param
    }
}

/// Execute the import command.
pub async fn execute(args: ImportArgs, config: Config) -> anyhow::Result<()> {
    for path in &args.paths {
        if !path.exists() {
            anyhow::bail!(
                "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
                path
            );
        }
    }

    let param = args.import_param(&config);
    let ingestor = Arc::new(Ingestor::from_config(config)?);

    let files: Vec<_> = args
        .paths
        .iter()
        .flat_map(|path| ingestor.discover(path))
        .collect();
    if files.is_empty() {
        tracing::warn!("No importable files found at {:?}", args.paths);
        return Ok(());
    }
    tracing::info!("Found {} file(s) to import", files.len());

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout()),
    };
    let mut writer = OutputWriter::new(sink, args.format.into(), args.output.is_none());

    let summary = import_batch(ingestor, files, param, args.parallel, &mut writer).await?;
    writer.flush()?;
    if let Some(path) = &args.output {
        tracing::info!("Report written to {:?}", path);
    }

    print_summary(&summary);
    if summary.failed > 0 {
        anyhow::bail!("{} file(s) failed to import", summary.failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use lychee_ingest_core::types::ApplyWatermark;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ImportArgs,
    }

    fn parse(argv: &[&str]) -> ImportArgs {
        TestCli::parse_from(std::iter::once("import").chain(argv.iter().copied())).args
    }

    #[test]
    fn import_args_defaults() {
        let args = parse(&["a.jpg"]);
        assert_eq!(args.paths, vec![PathBuf::from("a.jpg")]);
        assert_eq!(args.parallel, 4);
        assert_eq!(args.owner, 0);
        assert!(matches!(args.format, OutputFormat::Json));
        assert!(matches!(args.watermark, WatermarkChoice::Default));
        assert!(args.output.is_none());
    }

    #[test]
    fn import_param_from_flags() {
        let args = parse(&[
            "a.heic",
            "b.jpg",
            "--album",
            "trip",
            "--owner",
            "7",
            "--highlight",
            "--watermark",
            "off",
            "--tag",
            "sea",
            "--tag",
            "sun",
            "--symlink",
        ]);
        let param = args.import_param(&Config::default());

        assert_eq!(param.intended_owner_id, 7);
        assert_eq!(param.album, Some(AlbumId::new("trip")));
        assert!(param.is_highlighted);
        assert_eq!(param.apply_watermark, ApplyWatermark::ForceOff);
        assert_eq!(param.tags, vec!["sea", "sun"]);
        assert!(param.import_mode.import_via_symlink);
        assert!(!param.import_mode.delete_imported);
    }

    #[test]
    fn import_param_keeps_config_defaults() {
        let mut config = Config::default();
        config.import.skip_duplicates = true;
        config.import.rename_photo_title = true;

        let param = parse(&["a.jpg"]).import_param(&config);
        assert!(param.import_mode.skip_duplicates);
        assert!(param.import_mode.rename_photo_title);
    }
}
