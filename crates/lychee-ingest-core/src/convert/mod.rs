//! Format classification and RAW/HEIC/PSD to JPEG conversion.
//!
//! A file is either directly displayable, a convertible RAW (camera RAW,
//! HEIC/HEIF, PSD), accepted as an opaque RAW by configuration, or
//! unsupported. Generic TIFF is never converted, even when configuration
//! lists it as an accepted RAW format.

mod magick;

pub use magick::MagickEngine;

use std::path::Path;

use crate::error::ConversionError;
use crate::files::{LocalView, MediaFile, TemporaryFile};

/// Extensions converted to JPEG on import. Fixed, dot-prefixed, lowercase.
pub const CONVERTIBLE_RAW_EXTENSIONS: [&str; 14] = [
    ".nef", ".cr2", ".cr3", ".arw", ".dng", ".orf", ".rw2", ".raf", ".pef", ".srw", ".nrw",
    ".psd", ".heic", ".heif",
];

/// Extensions the image backends can decode and browsers can show.
pub const DISPLAYABLE_EXTENSIONS: [&str; 8] = [
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp", ".tif", ".tiff",
];

/// JPEG quality for converted RAW files.
pub const CONVERSION_JPEG_QUALITY: u8 = 92;

/// Lowercase `ext` and make sure it starts with a dot. Empty stays empty.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

pub fn is_convertible_raw(ext: &str) -> bool {
    let ext = normalize_extension(ext);
    CONVERTIBLE_RAW_EXTENSIONS.contains(&ext.as_str())
}

pub fn is_displayable(ext: &str) -> bool {
    let ext = normalize_extension(ext);
    DISPLAYABLE_EXTENSIONS.contains(&ext.as_str())
}

/// What the pipeline may do with a file of a given extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatClass {
    /// Decodable and displayable as is
    Displayable,
    /// Converted to JPEG, with the untouched bytes kept as a RAW variant
    ConvertibleRaw,
    /// Stored verbatim as the ORIGINAL because configuration accepts it
    AcceptedRaw,
    Unsupported,
}

/// Classify an extension. Conversion takes precedence over everything else.
pub fn classify(ext: &str, accepted_raw: &[String]) -> FormatClass {
    let ext = normalize_extension(ext);
    if is_convertible_raw(&ext) {
        FormatClass::ConvertibleRaw
    } else if is_displayable(&ext) {
        FormatClass::Displayable
    } else if accepted_raw
        .iter()
        .any(|accepted| normalize_extension(accepted) == ext)
    {
        FormatClass::AcceptedRaw
    } else {
        FormatClass::Unsupported
    }
}

/// MIME type for a stored file extension.
pub fn mime_type_for(ext: &str) -> &'static str {
    match normalize_extension(ext).as_str() {
        ".jpg" | ".jpeg" => "image/jpeg",
        ".png" => "image/png",
        ".gif" => "image/gif",
        ".webp" => "image/webp",
        ".bmp" => "image/bmp",
        ".tif" | ".tiff" => "image/tiff",
        ".heic" => "image/heic",
        ".heif" => "image/heif",
        ".psd" => "image/vnd.adobe.photoshop",
        ".dng" => "image/x-adobe-dng",
        ".nef" => "image/x-nikon-nef",
        ".nrw" => "image/x-nikon-nrw",
        ".cr2" => "image/x-canon-cr2",
        ".cr3" => "image/x-canon-cr3",
        ".arw" => "image/x-sony-arw",
        ".orf" => "image/x-olympus-orf",
        ".rw2" => "image/x-panasonic-rw2",
        ".raf" => "image/x-fuji-raf",
        ".pef" => "image/x-pentax-pef",
        ".srw" => "image/x-samsung-srw",
        _ => "application/octet-stream",
    }
}

/// An installed capability that turns a RAW-like file into a JPEG.
pub trait ConversionEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the engine can run at all on this host.
    fn is_available(&self) -> bool;

    /// Convert the first frame of `source` to an upright JPEG at `target`.
    fn convert_to_jpeg(
        &self,
        source: &Path,
        target: &Path,
        quality: u8,
    ) -> Result<(), ConversionError>;
}

/// Engine used when conversion is switched off in configuration.
#[derive(Debug, Default)]
pub struct DisabledEngine;

impl ConversionEngine for DisabledEngine {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn convert_to_jpeg(&self, _: &Path, _: &Path, _: u8) -> Result<(), ConversionError> {
        Err(ConversionError::EngineUnavailable(
            "conversion is disabled".to_string(),
        ))
    }
}

/// Converts a RAW/HEIC/PSD upload to a temporary JPEG.
///
/// The source is never modified or deleted.
pub struct RawToJpeg<'a> {
    engine: &'a dyn ConversionEngine,
}

impl<'a> RawToJpeg<'a> {
    pub fn new(engine: &'a dyn ConversionEngine) -> Self {
        Self { engine }
    }

    pub fn handle(&self, source: &dyn MediaFile) -> Result<TemporaryFile, ConversionError> {
        if !self.engine.is_available() {
            return Err(ConversionError::EngineUnavailable(format!(
                "{} is not available",
                self.engine.name()
            )));
        }

        let input = LocalView::acquire(source)?;
        let output = TemporaryFile::new(".jpg")?.with_original_basename(source.original_basename());

        tracing::debug!(
            engine = self.engine.name(),
            source = %input.path().display(),
            "Converting to JPEG"
        );
        self.engine
            .convert_to_jpeg(input.path(), output.path(), CONVERSION_JPEG_QUALITY)?;

        if output.filesize()? == 0 {
            return Err(ConversionError::Failed {
                path: input.path().to_path_buf(),
                message: format!("{} produced an empty file", self.engine.name()),
            });
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::NativeLocalFile;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedEngine {
        available: bool,
        calls: AtomicUsize,
    }

    impl ConversionEngine for FixedEngine {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn convert_to_jpeg(&self, _: &Path, target: &Path, quality: u8) -> Result<(), ConversionError> {
            assert_eq!(quality, CONVERSION_JPEG_QUALITY);
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::fs::write(target, b"\xFF\xD8\xFF\xD9")?;
            Ok(())
        }
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("CR3"), ".cr3");
        assert_eq!(normalize_extension(".HEIC"), ".heic");
        assert_eq!(normalize_extension(""), "");
    }

    #[test]
    fn test_classify() {
        let accepted = vec![".tif".to_string(), "xcf".to_string()];
        assert_eq!(classify(".heic", &accepted), FormatClass::ConvertibleRaw);
        assert_eq!(classify("NEF", &accepted), FormatClass::ConvertibleRaw);
        assert_eq!(classify(".tif", &accepted), FormatClass::Displayable);
        assert_eq!(classify(".jpg", &[]), FormatClass::Displayable);
        assert_eq!(classify(".xcf", &accepted), FormatClass::AcceptedRaw);
        assert_eq!(classify(".txt", &accepted), FormatClass::Unsupported);
    }

    #[test]
    fn test_tiff_is_never_convertible() {
        assert!(!is_convertible_raw(".tif"));
        assert!(!is_convertible_raw(".TIFF"));
        assert!(is_convertible_raw(".DNG"));
    }

    #[test]
    fn test_raw_to_jpeg_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMG_1.cr3");
        std::fs::write(&path, b"raw sensor data").unwrap();
        let source = NativeLocalFile::new(&path);

        let engine = FixedEngine {
            available: true,
            calls: AtomicUsize::new(0),
        };
        let jpeg = RawToJpeg::new(&engine).handle(&source).unwrap();

        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
        assert_eq!(jpeg.original_extension(), ".jpg");
        assert_eq!(jpeg.original_basename(), "IMG_1");
        assert_eq!(std::fs::read(&path).unwrap(), b"raw sensor data");
    }

    #[test]
    fn test_raw_to_jpeg_fails_fast_without_engine() {
        let engine = FixedEngine {
            available: false,
            calls: AtomicUsize::new(0),
        };
        let source = NativeLocalFile::new("/nonexistent/IMG_1.cr3");
        let err = RawToJpeg::new(&engine).handle(&source).unwrap_err();
        assert!(matches!(err, ConversionError::EngineUnavailable(_)));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type_for(".JPG"), "image/jpeg");
        assert_eq!(mime_type_for("heic"), "image/heic");
        assert_eq!(mime_type_for(".xyz"), "application/octet-stream");
    }
}
