//! Minimal IPTC-IIM reader for JPEG and TIFF files.
//!
//! Every Record 2 (Application Record) dataset is collected into a raw
//! key/value table using Exiv2-style keys (`Iptc.Application2.Keywords`);
//! repeated datasets accumulate into a comma-joined value. Keywords are
//! additionally collected one-by-one for the tag list.
//!
//! JPEG carries IIM bytes in the APP13 marker (Photoshop 8BIM resource
//! 0x0404); TIFF in IFD tag 33723 (IPTC-NAA) or tag 34377 (Photoshop
//! resource block). Parse failures of any kind yield empty data.

use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IptcData {
    pub entries: BTreeMap<String, String>,
    pub keywords: Vec<String>,
}

impl IptcData {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.keywords.is_empty()
    }

    fn record(&mut self, dataset: u8, value: String) {
        if dataset == DATASET_KEYWORDS {
            self.keywords.push(value.clone());
        }
        self.entries
            .entry(dataset_key(dataset))
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
}

const DATASET_KEYWORDS: u8 = 25;

/// Exiv2-style key for an Application Record dataset number.
fn dataset_key(dataset: u8) -> String {
    let name = match dataset {
        0 => "RecordVersion",
        5 => "ObjectName",
        10 => "Urgency",
        15 => "Category",
        20 => "SuppCategory",
        25 => "Keywords",
        40 => "SpecialInstructions",
        55 => "DateCreated",
        60 => "TimeCreated",
        80 => "Byline",
        85 => "BylineTitle",
        90 => "City",
        92 => "SubLocation",
        95 => "ProvinceState",
        100 => "CountryCode",
        101 => "CountryName",
        103 => "TransmissionReference",
        105 => "Headline",
        110 => "Credit",
        115 => "Source",
        116 => "Copyright",
        120 => "Caption",
        122 => "Writer",
        other => return format!("Iptc.Application2.0x{other:02x}"),
    };
    format!("Iptc.Application2.{name}")
}

/// Read IPTC metadata from a file, dispatching by extension.
/// Returns empty data on any parse failure.
pub fn read_iptc(path: &Path) -> IptcData {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(_) => return IptcData::default(),
    };

    match ext.as_str() {
        "jpg" | "jpeg" => parse_iim(find_jpeg_app13_iptc(&bytes).unwrap_or(&[])),
        "tif" | "tiff" => read_iptc_from_tiff(&bytes),
        _ => IptcData::default(),
    }
}

/// Parse raw IPTC-IIM bytes.
///
/// Each dataset: 0x1C marker, record number, dataset number, big-endian
/// u16 length, then the data bytes.
pub(crate) fn parse_iim(data: &[u8]) -> IptcData {
    let mut result = IptcData::default();
    let mut pos = 0;

    while pos + 5 <= data.len() {
        if data[pos] != 0x1C {
            pos += 1;
            continue;
        }

        let record = data[pos + 1];
        let dataset = data[pos + 2];
        let length = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as usize;
        pos += 5;

        if pos + length > data.len() {
            break;
        }

        if record == 2 {
            let value = String::from_utf8_lossy(&data[pos..pos + length])
                .trim()
                .to_string();
            if !value.is_empty() {
                result.record(dataset, value);
            }
        }

        pos += length;
    }

    result
}

// ---------------------------------------------------------------------------
// JPEG: APP13 / Photoshop 8BIM
// ---------------------------------------------------------------------------

const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const BIM_MARKER: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;

fn find_jpeg_app13_iptc(data: &[u8]) -> Option<&[u8]> {
    let mut pos = 0;
    while pos + 4 < data.len() {
        if data[pos] == 0xFF && data[pos + 1] == 0xED {
            let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            let seg_start = pos + 4;
            let seg_end = (pos + 2 + seg_len).min(data.len());

            if let Some(iptc) = extract_iptc_from_8bim(&data[seg_start..seg_end]) {
                return Some(iptc);
            }
        }

        // Advance marker-by-marker until the image data starts.
        if data[pos] == 0xFF && pos + 3 < data.len() && data[pos + 1] != 0x00 {
            let marker = data[pos + 1];
            if marker == 0xDA {
                break;
            }
            if marker == 0xD8 || marker == 0xD9 || (0xD0..=0xD7).contains(&marker) {
                pos += 2;
            } else {
                let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
                pos += 2 + len;
            }
        } else {
            pos += 1;
        }
    }
    None
}

/// Walk Photoshop 8BIM resource blocks and return the IPTC-IIM payload.
fn extract_iptc_from_8bim(segment: &[u8]) -> Option<&[u8]> {
    let data = segment.strip_prefix(PHOTOSHOP_HEADER).unwrap_or(segment);

    let mut pos = 0;
    while pos + 12 <= data.len() {
        if &data[pos..pos + 4] != BIM_MARKER {
            pos += 1;
            continue;
        }
        pos += 4;

        if pos + 2 > data.len() {
            break;
        }
        let resource_id = u16::from_be_bytes([data[pos], data[pos + 1]]);
        pos += 2;

        // Pascal name string, padded to even total length
        if pos >= data.len() {
            break;
        }
        let pascal_len = data[pos] as usize;
        pos += 1 + pascal_len + ((1 + pascal_len) % 2);

        if pos + 4 > data.len() {
            break;
        }
        let res_len =
            u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        pos += 4;

        if pos + res_len > data.len() {
            break;
        }

        if resource_id == IPTC_RESOURCE_ID {
            return Some(&data[pos..pos + res_len]);
        }

        pos += res_len + (res_len % 2);
    }

    None
}

// ---------------------------------------------------------------------------
// TIFF: IFD tags 33723 / 34377
// ---------------------------------------------------------------------------

fn read_iptc_from_tiff(data: &[u8]) -> IptcData {
    if data.len() < 8 {
        return IptcData::default();
    }

    let big_endian = match &data[0..2] {
        b"MM" => true,
        b"II" => false,
        _ => return IptcData::default(),
    };

    let read_u16 = |offset: usize| -> u16 {
        let bytes = [data[offset], data[offset + 1]];
        if big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        }
    };

    let read_u32 = |offset: usize| -> u32 {
        let bytes = [
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ];
        if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        }
    };

    if read_u16(2) != 42 {
        return IptcData::default();
    }

    // count is number of values; byte size depends on the field type
    let type_size = |typ: u16| -> usize {
        match typ {
            1 | 2 | 6 | 7 => 1, // BYTE, ASCII, SBYTE, UNDEFINED
            3 | 8 => 2,         // SHORT, SSHORT
            4 | 9 | 11 => 4,    // LONG, SLONG, FLOAT
            5 | 10 | 12 => 8,   // RATIONAL, SRATIONAL, DOUBLE
            _ => 1,
        }
    };

    let mut ifd_offset = read_u32(4) as usize;

    while ifd_offset > 0 && ifd_offset + 2 < data.len() {
        let entry_count = read_u16(ifd_offset) as usize;
        let entries_start = ifd_offset + 2;

        for i in 0..entry_count {
            let entry_offset = entries_start + i * 12;
            if entry_offset + 12 > data.len() {
                return IptcData::default();
            }

            let tag = read_u16(entry_offset);
            let typ = read_u16(entry_offset + 2);
            let count = read_u32(entry_offset + 4) as usize;
            let byte_len = count * type_size(typ);
            let value_offset = read_u32(entry_offset + 8) as usize;

            if value_offset + byte_len > data.len() {
                continue;
            }
            let payload = &data[value_offset..value_offset + byte_len];

            // Tag 33723: raw IPTC-IIM bytes
            if tag == 33723 {
                let result = parse_iim(payload);
                if !result.is_empty() {
                    return result;
                }
            }

            // Tag 34377: Photoshop resource block wrapping the IIM bytes
            if tag == 34377 {
                if let Some(iptc_bytes) = extract_iptc_from_8bim(payload) {
                    let result = parse_iim(iptc_bytes);
                    if !result.is_empty() {
                        return result;
                    }
                }
            }
        }

        let next_offset_pos = entries_start + entry_count * 12;
        if next_offset_pos + 4 <= data.len() {
            ifd_offset = read_u32(next_offset_pos) as usize;
        } else {
            break;
        }
    }

    IptcData::default()
}
