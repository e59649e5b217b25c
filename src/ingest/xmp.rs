//! Lightweight XMP packet scanner.
//!
//! XMP is RDF/XML embedded verbatim in the image file (JPEG APP1 with the
//! adobe.com/xap namespace header, TIFF tag 700, or anywhere a writer put
//! it). Rather than a full XML parse, the packet between `<x:xmpmeta>` and
//! `</x:xmpmeta>` is located by string search and mined for three shapes:
//! attributes on `rdf:Description`, simple `<ns:Name>value</ns:Name>`
//! elements, and `rdf:Bag`/`rdf:Seq`/`rdf:Alt` item lists. That covers what
//! real-world camera and editor output looks like; anything fancier is
//! simply not extracted.

use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmpData {
    pub entries: BTreeMap<String, String>,
    /// Items of the `dc:subject` list, which is where keyword tags live.
    pub subjects: Vec<String>,
}

impl XmpData {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.subjects.is_empty()
    }
}

const PACKET_OPEN: &str = "<x:xmpmeta";
const PACKET_CLOSE: &str = "</x:xmpmeta>";

/// Read and parse the XMP packet of a file, if any. Any I/O or scan
/// failure yields empty data.
pub fn read_xmp(path: &Path) -> XmpData {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(_) => return XmpData::default(),
    };
    parse_xmp(&bytes)
}

pub(crate) fn parse_xmp(bytes: &[u8]) -> XmpData {
    let text = String::from_utf8_lossy(bytes);
    let Some(packet) = extract_packet(&text) else {
        return XmpData::default();
    };

    let mut data = XmpData::default();
    scan_description_attributes(packet, &mut data);
    scan_elements(packet, &mut data);
    data
}

fn extract_packet(text: &str) -> Option<&str> {
    let start = text.find(PACKET_OPEN)?;
    let end = text[start..].find(PACKET_CLOSE)? + start + PACKET_CLOSE.len();
    Some(&text[start..end])
}

/// Property-as-attribute form: `<rdf:Description ns:Name="value" ...>`.
fn scan_description_attributes(packet: &str, data: &mut XmpData) {
    let mut rest = packet;
    while let Some(start) = rest.find("<rdf:Description") {
        let tail = &rest[start + "<rdf:Description".len()..];
        let Some(end) = tail.find('>') else {
            return;
        };
        for (name, value) in attribute_pairs(&tail[..end]) {
            // rdf: and xmlns: attributes are structure, not properties.
            if name.starts_with("xmlns:") || name.starts_with("rdf:") || !name.contains(':') {
                continue;
            }
            record(data, name, value);
        }
        rest = &tail[end..];
    }
}

fn attribute_pairs(raw: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = raw;
    while let Some(eq) = rest.find("=\"") {
        let name = rest[..eq]
            .rsplit(|c: char| c.is_whitespace())
            .next()
            .unwrap_or("")
            .to_string();
        let after = &rest[eq + 2..];
        let Some(close) = after.find('"') else {
            break;
        };
        if !name.is_empty() {
            pairs.push((name, after[..close].to_string()));
        }
        rest = &after[close + 1..];
    }
    pairs
}

/// Property-as-element form, including rdf:Bag/Seq/Alt item lists.
fn scan_elements(packet: &str, data: &mut XmpData) {
    let mut rest = packet;
    while let Some(open) = rest.find('<') {
        let tail = &rest[open + 1..];
        let Some(name_end) = tail.find(|c: char| c.is_whitespace() || c == '>' || c == '/') else {
            return;
        };
        let name = &tail[..name_end];

        let skip = name.is_empty()
            || name.starts_with('/')
            || name.starts_with('?')
            || name.starts_with('!')
            || name.starts_with("rdf:")
            || name.starts_with("x:")
            || !name.contains(':');
        if skip {
            rest = &tail[name_end.max(1)..];
            continue;
        }

        let Some(content_start) = tail.find('>') else {
            return;
        };
        if tail[..content_start].ends_with('/') {
            // self-closing element, properties were attributes
            rest = &tail[content_start..];
            continue;
        }

        let body = &tail[content_start + 1..];
        let close_tag = format!("</{name}>");
        let Some(close) = body.find(&close_tag) else {
            rest = &tail[content_start..];
            continue;
        };
        let inner = &body[..close];

        if let Some(items) = list_items(inner) {
            if !items.is_empty() {
                record(data, name.to_string(), items.join(", "));
                if name == "dc:subject" {
                    data.subjects.extend(items);
                }
            }
        } else if !inner.contains('<') {
            let value = inner.trim();
            if !value.is_empty() {
                record(data, name.to_string(), value.to_string());
            }
        }

        rest = &body[close + close_tag.len()..];
    }
}

/// If the element body wraps an rdf container, return its `rdf:li` items.
fn list_items(inner: &str) -> Option<Vec<String>> {
    let trimmed = inner.trim();
    let is_container = ["<rdf:Bag", "<rdf:Seq", "<rdf:Alt"]
        .iter()
        .any(|open| trimmed.starts_with(open));
    if !is_container {
        return None;
    }

    let mut items = Vec::new();
    let mut rest = trimmed;
    while let Some(li_start) = rest.find("<rdf:li") {
        let tail = &rest[li_start..];
        let Some(open_end) = tail.find('>') else {
            break;
        };
        let body = &tail[open_end + 1..];
        let Some(close) = body.find("</rdf:li>") else {
            break;
        };
        let value = body[..close].trim();
        if !value.is_empty() && !value.contains('<') {
            items.push(value.to_string());
        }
        rest = &body[close..];
    }
    Some(items)
}

fn record(data: &mut XmpData, key: String, value: String) {
    data.entries.entry(key).or_insert(value);
}
