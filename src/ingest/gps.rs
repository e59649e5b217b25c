//! EXIF GPS conversion: sexagesimal rationals to signed decimal degrees.

use exif::{Exif, In, Tag, Value};

/// Decimal latitude in degrees, negative for the southern hemisphere.
pub fn latitude(exif: &Exif) -> Option<f64> {
    coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef)
}

/// Decimal longitude in degrees, negative for the western hemisphere.
pub fn longitude(exif: &Exif) -> Option<f64> {
    coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef)
}

/// Altitude in meters, negative below sea level (GPSAltitudeRef == 1).
pub fn altitude(exif: &Exif) -> Option<f64> {
    let field = exif.get_field(Tag::GPSAltitude, In::PRIMARY)?;
    let Value::Rational(ref vals) = field.value else {
        return None;
    };
    let raw = vals.first().filter(|r| r.denom != 0)?;
    let mut meters = raw.num as f64 / raw.denom as f64;

    let below_sea_level = exif
        .get_field(Tag::GPSAltitudeRef, In::PRIMARY)
        .is_some_and(|field| match field.value {
            Value::Byte(ref v) => v.first() == Some(&1),
            _ => false,
        });
    if below_sea_level {
        meters = -meters;
    }
    Some(meters)
}

fn coordinate(exif: &Exif, value_tag: Tag, ref_tag: Tag) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let Value::Rational(ref vals) = field.value else {
        return None;
    };
    let parts: Vec<(u32, u32)> = vals.iter().map(|r| (r.num, r.denom)).collect();

    let reference = exif
        .get_field(ref_tag, In::PRIMARY)?
        .display_value()
        .to_string();
    let negate = reference.contains('S') || reference.contains('W');

    dms_to_decimal(&parts, negate)
}

/// `degrees + minutes/60 + seconds/3600`, negated for S/W references.
/// Fewer than three rationals or a zero denominator in any slot means
/// the coordinate is unusable.
pub fn dms_to_decimal(parts: &[(u32, u32)], negate: bool) -> Option<f64> {
    if parts.len() < 3 {
        return None;
    }

    let to_f64 = |(num, denom): (u32, u32)| -> Option<f64> {
        (denom != 0).then(|| num as f64 / denom as f64)
    };

    let degrees = to_f64(parts[0])?;
    let minutes = to_f64(parts[1])?;
    let seconds = to_f64(parts[2])?;

    let decimal = degrees + minutes / 60.0 + seconds / 3600.0;
    Some(if negate { -decimal } else { decimal })
}
