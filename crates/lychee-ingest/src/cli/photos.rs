//! The `lychee-ingest photos` command for managing imported photos.

use clap::{Args, Subcommand};
use lychee_ingest_core::{AlbumId, Config, Gallery, Ingestor, PhotoId, SizeVariantType};
use std::io::Write;
use std::path::PathBuf;

/// Arguments for the `photos` command.
#[derive(Args, Debug)]
pub struct PhotosArgs {
    #[command(subcommand)]
    pub command: PhotosCommand,
}

/// Subcommands for photo management.
#[derive(Subcommand, Debug)]
pub enum PhotosCommand {
    /// List imported photos
    List {
        /// Only photos in this album
        #[arg(long)]
        album: Option<String>,
    },

    /// Print one photo record as JSON
    Show {
        /// Photo id
        id: String,
    },

    /// Delete a photo and all of its stored files
    Delete {
        /// Photo id
        id: String,
    },

    /// Copy one size variant out of storage
    Export {
        /// Photo id
        id: String,

        /// Size variant: raw, original, medium2x, medium, small2x, small, thumb2x, thumb
        #[arg(long)]
        variant: SizeVariantType,

        /// Destination file
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Execute the photos command.
pub async fn execute(args: PhotosArgs, config: Config) -> anyhow::Result<()> {
    let gallery = Ingestor::from_config(config)?.gallery();
    let stdout = std::io::stdout();
    run(args.command, &gallery, &mut stdout.lock())
}

fn run(command: PhotosCommand, gallery: &Gallery, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        PhotosCommand::List { album } => {
            let album = album.map(AlbumId::new);
            let photos = gallery.list(album.as_ref())?;
            for photo in &photos {
                let variants: Vec<_> = photo
                    .size_variants
                    .iter()
                    .map(|v| v.variant_type.name())
                    .collect();
                writeln!(out, "{}  {:<40}  {}", photo.id, photo.title, variants.join(","))?;
            }
            tracing::debug!("Listed {} photo(s)", photos.len());

            if let Some(album) = &album {
                let stats = gallery.album_statistics(album)?;
                writeln!(out, "album {album}: {} bytes stored", stats.total())?;
            }
        }

        PhotosCommand::Show { id } => {
            let photo = gallery.get(&PhotoId::from(id.as_str()))?;
            writeln!(out, "{}", serde_json::to_string_pretty(&photo)?)?;
        }

        PhotosCommand::Delete { id } => {
            let photo = gallery.delete_photo(&PhotoId::from(id.as_str()))?;
            writeln!(out, "Deleted photo {} ({})", photo.id, photo.title)?;
        }

        PhotosCommand::Export {
            id,
            variant,
            output,
        } => {
            let stats = gallery.export_variant(&PhotoId::from(id.as_str()), variant, &output)?;
            writeln!(
                out,
                "Exported {variant} of {id} to {} ({} bytes)",
                output.display(),
                stats.bytes
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lychee_ingest_core::{ImportParam, IngestOutcome};
    use std::path::Path;

    struct Fixture {
        dir: tempfile::TempDir,
        ingestor: Ingestor,
    }

    fn fixture(raw_download_enabled: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.general.storage_root = dir.path().join("storage");
        config.general.catalog_path = dir.path().join("catalog.json");
        config.conversion.enabled = false;
        config.download.raw_download_enabled = raw_download_enabled;
        let ingestor = Ingestor::from_config(config).unwrap();
        Fixture { dir, ingestor }
    }

    fn import(fixture: &Fixture, name: &str) -> PhotoId {
        let path = fixture.dir.path().join(name);
        image::RgbImage::from_pixel(400, 300, image::Rgb([1, 2, 3]))
            .save_with_format(&path, image::ImageFormat::Jpeg)
            .unwrap();
        let mut param = ImportParam::default();
        param.album = Some(AlbumId::new("trip"));
        match fixture.ingestor.ingest_path(&path, param).unwrap() {
            IngestOutcome::Created { photo } => photo.id,
            other => panic!("unexpected {}", other.status()),
        }
    }

    fn output(fixture: &Fixture, command: PhotosCommand) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        run(command, &fixture.ingestor.gallery(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap())
    }

    #[test]
    fn test_list_and_show() {
        let fixture = fixture(false);
        let id = import(&fixture, "beach.jpg");

        let listed = output(
            &fixture,
            PhotosCommand::List {
                album: Some("trip".to_string()),
            },
        )
        .unwrap();
        assert!(listed.contains(id.as_str()));
        assert!(listed.contains("original,"));
        assert!(listed.contains("album trip"));

        let shown = output(&fixture, PhotosCommand::Show { id: id.to_string() }).unwrap();
        let value: serde_json::Value = serde_json::from_str(&shown).unwrap();
        assert_eq!(value["title"], "beach");
    }

    #[test]
    fn test_export_original() {
        let fixture = fixture(false);
        let id = import(&fixture, "beach.jpg");
        let destination = fixture.dir.path().join("out.jpg");

        output(
            &fixture,
            PhotosCommand::Export {
                id: id.to_string(),
                variant: SizeVariantType::Original,
                output: destination.clone(),
            },
        )
        .unwrap();
        assert_eq!(
            std::fs::read(&destination).unwrap(),
            std::fs::read(fixture.dir.path().join("beach.jpg")).unwrap()
        );
    }

    #[test]
    fn test_raw_export_is_gated() {
        let fixture = fixture(false);
        let id = import(&fixture, "beach.jpg");

        let err = output(
            &fixture,
            PhotosCommand::Export {
                id: id.to_string(),
                variant: SizeVariantType::Raw,
                output: fixture.dir.path().join("raw.bin"),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("RAW"));
        assert!(!Path::new(&fixture.dir.path().join("raw.bin")).exists());
    }

    #[test]
    fn test_delete_removes_files() {
        let fixture = fixture(false);
        let id = import(&fixture, "beach.jpg");

        let deleted = output(&fixture, PhotosCommand::Delete { id: id.to_string() }).unwrap();
        assert!(deleted.contains("Deleted photo"));
        assert!(output(&fixture, PhotosCommand::Show { id: id.to_string() }).is_err());
    }
}
