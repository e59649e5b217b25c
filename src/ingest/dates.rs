//! Capture-timestamp resolution through an ordered fallback chain.
//!
//! Order: EXIF `DateTimeOriginal`, EXIF `DateTime`, date patterns in the
//! filename, file mtime. Every step is tried for every photo; a malformed
//! value at one step falls through to the next. The mtime fallback always
//! succeeds, so the resolver is total.

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::SystemTime;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Resolve the best-guess capture timestamp for one photo.
pub fn resolve_taken_at(
    exif: &BTreeMap<String, String>,
    file_name: &str,
    mtime: SystemTime,
) -> NaiveDateTime {
    for key in ["DateTimeOriginal", "DateTime"] {
        if let Some(parsed) = exif.get(key).and_then(|raw| parse_exif_datetime(raw)) {
            return parsed;
        }
    }

    if let Some(parsed) = parse_filename_datetime(file_name) {
        return parsed;
    }

    DateTime::<Utc>::from(mtime).naive_utc()
}

/// Parse the EXIF `YYYY:MM:DD HH:MM:SS` format. Returns None on anything
/// malformed so the caller can fall through.
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim().trim_matches('"'), EXIF_DATE_FORMAT).ok()
}

fn filename_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // 20230615_143022
            Regex::new(r"(\d{4})(\d{2})(\d{2})_(\d{2})(\d{2})(\d{2})").expect("valid pattern"),
            // 2023-06-15 14.30.22 / 2023-06-15_14-30-22
            Regex::new(r"(\d{4})-(\d{2})-(\d{2})[ _](\d{2})[.-](\d{2})[.-](\d{2})")
                .expect("valid pattern"),
        ]
    })
}

/// Recognize timestamp patterns embedded in a filename; the first pattern
/// that matches anywhere wins. Impossible dates (month 13, hour 25) are
/// treated as non-matches.
pub fn parse_filename_datetime(file_name: &str) -> Option<NaiveDateTime> {
    for pattern in filename_patterns() {
        let Some(caps) = pattern.captures(file_name) else {
            continue;
        };

        let mut parts = [0u32; 6];
        for (slot, part) in parts.iter_mut().zip(1usize..=6) {
            *slot = caps.get(part)?.as_str().parse().ok()?;
        }

        let candidate = NaiveDate::from_ymd_opt(parts[0] as i32, parts[1], parts[2])
            .and_then(|date| date.and_hms_opt(parts[3], parts[4], parts[5]));
        if let Some(parsed) = candidate {
            return Some(parsed);
        }
    }
    None
}
