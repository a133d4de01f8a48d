//! ImageMagick backend, driven through its command-line binary.
//!
//! Serves both as the RAW conversion engine and as an alternative image
//! backend for size variants. Availability is probed once with `-version`.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::OnceLock;

use super::ConversionEngine;
use crate::error::{ConversionError, ImagingError};
use crate::imaging::{ImageHandler, RenderRequest, SourceImage};
use crate::types::ImageDimension;

#[derive(Debug)]
pub struct MagickEngine {
    binary: String,
    available: OnceLock<bool>,
}

impl MagickEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            available: OnceLock::new(),
        }
    }

    fn run(&self, args: &[String]) -> std::io::Result<Output> {
        tracing::trace!(binary = %self.binary, ?args, "Running ImageMagick");
        Command::new(&self.binary).args(args).output()
    }

    fn probe(&self) -> bool {
        match Command::new(&self.binary).arg("-version").output() {
            Ok(output) if output.status.success() => {
                let banner = String::from_utf8_lossy(&output.stdout);
                tracing::debug!(
                    version = banner.lines().next().unwrap_or_default(),
                    "ImageMagick available"
                );
                true
            }
            Ok(output) => {
                tracing::debug!(status = %output.status, "ImageMagick probe failed");
                false
            }
            Err(e) => {
                tracing::debug!(binary = %self.binary, error = %e, "ImageMagick not found");
                false
            }
        }
    }
}

/// `path[0]`: first frame or page of multi-image containers.
fn first_frame(path: &Path) -> String {
    format!("{}[0]", path.display())
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// ImageMagick geometry for a bounding box. `None` when unbounded.
fn fit_geometry(max_width: u32, max_height: u32) -> Option<String> {
    match (max_width, max_height) {
        (0, 0) => None,
        (w, 0) => Some(format!("{w}>")),
        (0, h) => Some(format!("x{h}>")),
        (w, h) => Some(format!("{w}x{h}>")),
    }
}

impl ConversionEngine for MagickEngine {
    fn name(&self) -> &'static str {
        "imagemagick"
    }

    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| self.probe())
    }

    fn convert_to_jpeg(
        &self,
        source: &Path,
        target: &Path,
        quality: u8,
    ) -> Result<(), ConversionError> {
        let args = vec![
            first_frame(source),
            "-auto-orient".to_string(),
            "-quality".to_string(),
            quality.to_string(),
            format!("jpg:{}", target.display()),
        ];
        let output = self.run(&args)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ConversionError::Failed {
                path: source.to_path_buf(),
                message: stderr_of(&output),
            })
        }
    }
}

impl ImageHandler for MagickEngine {
    fn name(&self) -> &'static str {
        "magick"
    }

    fn load(&self, path: &Path) -> Result<Box<dyn SourceImage>, ImagingError> {
        if !self.is_available() {
            return Err(ImagingError::Backend {
                backend: "magick",
                message: format!("{} is not available", self.binary),
            });
        }
        let args = vec![
            first_frame(path),
            "-auto-orient".to_string(),
            "-format".to_string(),
            "%w %h".to_string(),
            "info:".to_string(),
        ];
        let output = self.run(&args)?;
        if !output.status.success() {
            return Err(ImagingError::Decode {
                path: path.to_path_buf(),
                message: stderr_of(&output),
            });
        }
        let dimensions = parse_dimensions(&String::from_utf8_lossy(&output.stdout)).ok_or_else(
            || ImagingError::Decode {
                path: path.to_path_buf(),
                message: "could not read image geometry".to_string(),
            },
        )?;

        Ok(Box::new(MagickImage {
            binary: self.binary.clone(),
            path: path.to_path_buf(),
            dimensions,
        }))
    }
}

fn parse_dimensions(text: &str) -> Option<ImageDimension> {
    let mut parts = text.split_whitespace();
    let width = parts.next()?.parse().ok()?;
    let height = parts.next()?.parse().ok()?;
    Some(ImageDimension::new(width, height))
}

struct MagickImage {
    binary: String,
    path: PathBuf,
    dimensions: ImageDimension,
}

impl SourceImage for MagickImage {
    fn dimensions(&self) -> ImageDimension {
        self.dimensions
    }

    fn render(&self, request: &RenderRequest, target: &Path) -> Result<ImageDimension, ImagingError> {
        let wanted = request.output_dimensions(self.dimensions);

        let mut args = vec![first_frame(&self.path), "-auto-orient".to_string()];
        if request.square {
            let side = format!("{}x{}", wanted.width, wanted.height);
            args.extend([
                "-thumbnail".to_string(),
                format!("{side}^"),
                "-gravity".to_string(),
                "center".to_string(),
                "-extent".to_string(),
                side,
            ]);
        } else if let Some(geometry) = fit_geometry(request.max_width, request.max_height) {
            args.extend(["-resize".to_string(), geometry]);
        }
        args.extend([
            "-quality".to_string(),
            request.quality.to_string(),
            format!(
                "{}:{}",
                request.format.extension().trim_start_matches('.'),
                target.display()
            ),
        ]);

        let output = Command::new(&self.binary).args(&args).output()?;
        if output.status.success() {
            Ok(wanted)
        } else {
            Err(ImagingError::Backend {
                backend: "magick",
                message: stderr_of(&output),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_unavailable() {
        let engine = MagickEngine::new("lychee-ingest-no-such-binary");
        assert!(!engine.is_available());
        // Cached
        assert!(!engine.is_available());
        assert!(ImageHandler::load(&engine, Path::new("/tmp/x.jpg")).is_err());
    }

    #[test]
    fn test_fit_geometry() {
        assert_eq!(fit_geometry(0, 0), None);
        assert_eq!(fit_geometry(1920, 1080).as_deref(), Some("1920x1080>"));
        assert_eq!(fit_geometry(0, 360).as_deref(), Some("x360>"));
        assert_eq!(fit_geometry(640, 0).as_deref(), Some("640>"));
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("6000 4000"), Some(ImageDimension::new(6000, 4000)));
        assert_eq!(parse_dimensions("garbage"), None);
    }

    #[test]
    fn test_first_frame() {
        assert_eq!(first_frame(Path::new("/a/b.psd")), "/a/b.psd[0]");
    }
}
