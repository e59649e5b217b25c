//! Geo-hierarchy extraction from directory structure.
//!
//! Photos live under `<root>/<continent>/<country>/<province>/<city>/[<date>/]file`.
//! Any suffix of the hierarchy may be omitted; a trailing directory that
//! looks like a date (`YYYY`, `YYYY-MM`, `YYYY-MM-DD`) is a date hint, not
//! a geography level. Segments are taken as-is: no gazetteer validation,
//! case-sensitive.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoInfo {
    pub continent: Option<String>,
    pub country: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub fallback_date: Option<String>,
}

fn date_segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}(-\d{2})?(-\d{2})?$").expect("valid date pattern"))
}

impl GeoInfo {
    /// Parse the file's parent directory, relative to the import root, into
    /// the geo hierarchy. A file directly under the root yields an all-unset
    /// GeoInfo.
    pub fn parse(root: &Path, file_path: &Path) -> Self {
        let relative = file_path
            .parent()
            .and_then(|parent| parent.strip_prefix(root).ok());

        let mut segments: Vec<String> = match relative {
            Some(rel) => rel
                .components()
                .filter_map(|c| match c {
                    std::path::Component::Normal(part) => {
                        Some(part.to_string_lossy().into_owned())
                    }
                    _ => None,
                })
                .collect(),
            None => Vec::new(),
        };

        let mut info = GeoInfo::default();
        if segments.is_empty() {
            return info;
        }

        if segments
            .last()
            .is_some_and(|last| date_segment_regex().is_match(last))
        {
            info.fallback_date = segments.pop();
        }

        // Positional assignment; extra segments beyond city are ignored.
        let mut levels = segments.into_iter();
        info.continent = levels.next();
        info.country = levels.next();
        info.province = levels.next();
        info.city = levels.next();

        info
    }
}
