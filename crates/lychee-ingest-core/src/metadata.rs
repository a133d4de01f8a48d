//! Embedded metadata extraction.
//!
//! Reads EXIF from any container kamadak-exif understands (JPEG, TIFF-based
//! RAW, HEIF, PNG, WebP). Extraction is lenient: a file without EXIF, or with
//! a corrupt block, still yields a record with size, MIME type and dimensions.

use chrono::{DateTime, NaiveDateTime, Utc};
use exif::{Context, Exif, In, Reader, Tag, Value};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, Cursor};
use std::path::Path;

use crate::convert::mime_type_for;
use crate::files::{LocalView, MediaFile};
use crate::types::{ExifData, ImageDimension};

/// Maximum length of a title synthesized from a file name.
pub const MAX_TITLE_LENGTH: usize = 98;

const XP_TITLE: Tag = Tag(Context::Tiff, 0x9c9b);
const XP_KEYWORDS: Tag = Tag(Context::Tiff, 0x9c9e);

/// Everything known about a file before it becomes a photo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Embedded title; empty when the file carries none
    pub title: String,
    pub description: Option<String>,
    pub mime_type: String,
    pub filesize: u64,
    /// Upright width; 0 when the file could not be decoded
    pub width: u32,
    /// Upright height; 0 when the file could not be decoded
    pub height: u32,
    pub exif: ExifData,
    pub file_last_modified: Option<DateTime<Utc>>,
    pub live_photo_content_id: Option<String>,
    /// Embedded keywords
    pub keywords: Vec<String>,
}

impl Metadata {
    pub fn dimensions(&self) -> ImageDimension {
        ImageDimension::new(self.width, self.height)
    }
}

/// Truncate a file name to a usable title.
pub fn title_from_basename(basename: &str) -> String {
    basename.chars().take(MAX_TITLE_LENGTH).collect()
}

/// Extracts [`Metadata`] from files.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Extract metadata from `file`.
    ///
    /// `last_modified` wins over the file's own modification time.
    /// Only I/O failures on the file itself are errors.
    pub fn extract(
        file: &dyn MediaFile,
        last_modified: Option<DateTime<Utc>>,
    ) -> io::Result<Metadata> {
        let filesize = file.filesize()?;
        let view = LocalView::acquire(file)?;
        let path = view.path();

        let mut metadata = Metadata {
            mime_type: mime_type_for(&file.original_extension()).to_string(),
            filesize,
            file_last_modified: last_modified.or_else(|| file.last_modified()),
            ..Default::default()
        };

        if let Some(exif) = Self::read_exif(path) {
            metadata.exif = Self::exif_data(&exif);
            metadata.title = Self::get_utf16(&exif, XP_TITLE).unwrap_or_default();
            metadata.description = Self::get_string(&exif, Tag::ImageDescription)
                .filter(|d| !d.is_empty());
            metadata.keywords = Self::get_utf16(&exif, XP_KEYWORDS)
                .map(|k| {
                    k.split(';')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default();
        }

        let dimensions = Self::dimensions(path, metadata.exif.orientation);
        metadata.width = dimensions.width;
        metadata.height = dimensions.height;

        tracing::debug!(
            mime_type = %metadata.mime_type,
            width = metadata.width,
            height = metadata.height,
            has_title = !metadata.title.is_empty(),
            "Extracted metadata"
        );
        Ok(metadata)
    }

    /// Upright dimensions of an image file, or 0×0 if it cannot be decoded.
    pub fn dimensions(path: &Path, orientation: Option<u32>) -> ImageDimension {
        match image::image_dimensions(path) {
            Ok((w, h)) if matches!(orientation, Some(5..=8)) => ImageDimension::new(h, w),
            Ok((w, h)) => ImageDimension::new(w, h),
            Err(e) => {
                tracing::trace!(path = %path.display(), error = %e, "No decodable dimensions");
                ImageDimension::zero()
            }
        }
    }

    /// EXIF orientation (1-8) of the file at `path`, if present.
    pub fn orientation(path: &Path) -> Option<u32> {
        Self::read_exif(path).and_then(|exif| Self::get_u32(&exif, Tag::Orientation))
    }

    /// EXIF orientation of an in-memory image, if present.
    pub fn orientation_of(bytes: &[u8]) -> Option<u32> {
        let exif = Reader::new().read_from_container(&mut Cursor::new(bytes)).ok()?;
        Self::get_u32(&exif, Tag::Orientation)
    }

    fn read_exif(path: &Path) -> Option<Exif> {
        let file = File::open(path).ok()?;
        let mut reader = BufReader::new(file);
        Reader::new().read_from_container(&mut reader).ok()
    }

    fn exif_data(exif: &Exif) -> ExifData {
        let (altitude, img_direction) = Self::get_altitude_and_direction(exif);
        ExifData {
            taken_at: Self::get_datetime(exif),
            make: Self::get_string(exif, Tag::Make),
            model: Self::get_string(exif, Tag::Model),
            lens: Self::get_string(exif, Tag::LensModel),
            iso: Self::get_u32(exif, Tag::PhotographicSensitivity),
            aperture: Self::get_aperture(exif),
            shutter: Self::get_shutter_speed(exif),
            focal: Self::get_rational(exif, Tag::FocalLength).map(|f| f as f32),
            latitude: Self::get_gps_coord(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef),
            longitude: Self::get_gps_coord(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef),
            altitude,
            img_direction,
            orientation: Self::get_u32(exif, Tag::Orientation),
        }
    }

    /// Get a string field from EXIF data.
    fn get_string(exif: &Exif, tag: Tag) -> Option<String> {
        let field = exif.get_field(tag, In::PRIMARY)?;
        let s = match &field.value {
            Value::Ascii(parts) => parts
                .iter()
                .map(|p| String::from_utf8_lossy(p).into_owned())
                .collect::<Vec<_>>()
                .join(" "),
            _ => field.display_value().to_string(),
        };
        let s = s.trim_matches(|c: char| c == '"' || c == '\0' || c.is_whitespace());
        (!s.is_empty()).then(|| s.to_string())
    }

    /// Windows XP* tags store UTF-16LE in a BYTE array.
    fn get_utf16(exif: &Exif, tag: Tag) -> Option<String> {
        let field = exif.get_field(tag, In::PRIMARY)?;
        let Value::Byte(bytes) = &field.value else {
            return None;
        };
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|&u| u != 0)
            .collect();
        let s = String::from_utf16_lossy(&units).trim().to_string();
        (!s.is_empty()).then_some(s)
    }

    /// Get a u32 field from EXIF data.
    fn get_u32(exif: &Exif, tag: Tag) -> Option<u32> {
        exif.get_field(tag, In::PRIMARY)
            .and_then(|f| match &f.value {
                Value::Short(v) => v.first().map(|&x| x as u32),
                Value::Long(v) => v.first().copied(),
                _ => None,
            })
    }

    fn get_rational(exif: &Exif, tag: Tag) -> Option<f64> {
        exif.get_field(tag, In::PRIMARY)
            .and_then(|f| match &f.value {
                Value::Rational(v) => v.first().map(|r| r.to_f64()),
                _ => None,
            })
            .filter(|v| v.is_finite())
    }

    /// Get the capture datetime, preferring DateTimeOriginal over DateTime.
    fn get_datetime(exif: &Exif) -> Option<NaiveDateTime> {
        let raw = Self::get_string(exif, Tag::DateTimeOriginal)
            .or_else(|| Self::get_string(exif, Tag::DateTime))?;
        NaiveDateTime::parse_from_str(&raw, "%Y:%m:%d %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S"))
            .ok()
    }

    /// Get GPS coordinate, converting from degrees/minutes/seconds to decimal.
    fn get_gps_coord(exif: &Exif, coord_tag: Tag, ref_tag: Tag) -> Option<f64> {
        let coord = exif.get_field(coord_tag, In::PRIMARY)?;
        let reference = exif.get_field(ref_tag, In::PRIMARY)?;

        let degrees = Self::parse_gps_rationals(&coord.value)?;
        let ref_str = reference.display_value().to_string();

        // Apply sign based on reference (N/S for lat, E/W for lon)
        let sign = if ref_str.contains('S') || ref_str.contains('W') {
            -1.0
        } else {
            1.0
        };

        Some(sign * degrees)
    }

    /// Parse GPS rationals (degrees, minutes, seconds) to decimal degrees.
    fn parse_gps_rationals(value: &Value) -> Option<f64> {
        match value {
            Value::Rational(rationals) if rationals.len() >= 3 => {
                let degrees = rationals[0].to_f64();
                let minutes = rationals[1].to_f64();
                let seconds = rationals[2].to_f64();
                Some(degrees + minutes / 60.0 + seconds / 3600.0)
            }
            _ => None,
        }
    }

    fn get_altitude_and_direction(exif: &Exif) -> (Option<f64>, Option<f64>) {
        let below_sea_level = exif
            .get_field(Tag::GPSAltitudeRef, In::PRIMARY)
            .and_then(|f| match &f.value {
                Value::Byte(v) => v.first().copied(),
                _ => None,
            })
            == Some(1);
        let altitude = Self::get_rational(exif, Tag::GPSAltitude)
            .map(|a| if below_sea_level { -a } else { a });
        let direction = Self::get_rational(exif, Tag::GPSImgDirection);
        (altitude, direction)
    }

    /// Get aperture as a formatted string (e.g., "f/1.8").
    fn get_aperture(exif: &Exif) -> Option<String> {
        exif.get_field(Tag::FNumber, In::PRIMARY).map(|f| {
            let s = f.display_value().to_string();
            format!("f/{}", s)
        })
    }

    /// Get shutter speed as a string (e.g., "1/1000").
    fn get_shutter_speed(exif: &Exif) -> Option<String> {
        exif.get_field(Tag::ExposureTime, In::PRIMARY)
            .map(|f| f.display_value().to_string())
    }
}
