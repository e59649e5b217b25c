//! Per-photo metadata extraction.
//!
//! One pass over the file produces the dimensions, the dedicated camera and
//! exposure fields, GPS coordinates, and the three raw key/value maps (EXIF,
//! IPTC, XMP). Extraction never fails a photo: a file whose metadata cannot
//! be read yields empty maps and unset fields, and the caller decides what
//! to do with the rest of the pipeline.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use exif::{Exif, In, Tag, Value};
use tracing::debug;

use super::gps;
use super::iptc::{self, IptcData};
use super::xmp::{self, XmpData};

#[derive(Debug, Clone, Default)]
pub struct PhotoMetadata {
    // Image dimensions
    pub width: Option<u32>,
    pub height: Option<u32>,

    // Camera info
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub lens: Option<String>,

    // Exposure settings
    pub focal_length: Option<f64>,
    pub aperture: Option<f64>,
    pub shutter: Option<String>,
    pub iso: Option<i64>,

    // GPS
    pub gps_lat: Option<f64>,
    pub gps_lon: Option<f64>,
    pub gps_alt: Option<f64>,

    // Raw key/value maps, one per standard
    pub exif: BTreeMap<String, String>,
    pub iptc: IptcData,
    pub xmp: XmpData,
}

impl PhotoMetadata {
    /// Flat tag list: IPTC keywords followed by XMP dc:subject items.
    /// Not deduplicated; the tag write downstream is idempotent per value.
    pub fn tags(&self) -> Vec<String> {
        self.iptc
            .keywords
            .iter()
            .chain(self.xmp.subjects.iter())
            .cloned()
            .collect()
    }
}

/// Extract everything we know how to read from one image file.
pub fn extract(path: &Path) -> PhotoMetadata {
    let mut metadata = PhotoMetadata::default();

    match image::ImageReader::open(path).map(|r| r.into_dimensions()) {
        Ok(Ok((width, height))) => {
            metadata.width = Some(width);
            metadata.height = Some(height);
        }
        _ => debug!(path = %path.display(), "could not read image dimensions"),
    }

    if let Some(exif) = read_exif(path) {
        metadata.exif = exif_map(&exif);

        metadata.camera_make = string_field(&exif, Tag::Make);
        metadata.camera_model = string_field(&exif, Tag::Model);
        metadata.lens = string_field(&exif, Tag::LensModel);
        metadata.focal_length = rational_field(&exif, Tag::FocalLength);
        metadata.aperture = rational_field(&exif, Tag::FNumber);
        metadata.iso = short_field(&exif, Tag::PhotographicSensitivity);
        metadata.shutter = exif
            .get_field(Tag::ExposureTime, In::PRIMARY)
            .map(|f| f.display_value().to_string());

        metadata.gps_lat = gps::latitude(&exif);
        metadata.gps_lon = gps::longitude(&exif);
        metadata.gps_alt = gps::altitude(&exif);
    } else {
        debug!(path = %path.display(), "no EXIF data");
    }

    metadata.iptc = iptc::read_iptc(path);
    metadata.xmp = xmp::read_xmp(path);

    metadata
}

fn read_exif(path: &Path) -> Option<Exif> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    exif::Reader::new().read_from_container(&mut reader).ok()
}

/// Every primary-IFD field keyed by its tag name, values as display strings.
fn exif_map(exif: &Exif) -> BTreeMap<String, String> {
    exif.fields()
        .filter(|f| f.ifd_num == In::PRIMARY)
        .map(|f| {
            let key = format!("{}", f.tag);
            let value = f
                .display_value()
                .to_string()
                .trim_matches('"')
                .to_string();
            (key, value)
        })
        .collect()
}

fn string_field(exif: &Exif, tag: Tag) -> Option<String> {
    exif.get_field(tag, In::PRIMARY)
        .map(|f| f.display_value().to_string().trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
}

fn rational_field(exif: &Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let Value::Rational(ref vals) = field.value else {
        return None;
    };
    vals.first()
        .filter(|r| r.denom != 0)
        .map(|r| r.num as f64 / r.denom as f64)
}

fn short_field(exif: &Exif, tag: Tag) -> Option<i64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match field.value {
        Value::Short(ref v) => v.first().map(|&n| n as i64),
        Value::Long(ref v) => v.first().map(|&n| n as i64),
        _ => None,
    }
}
