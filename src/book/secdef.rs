// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Security-definition index.
//!
//! Loads a gzip-compressed, SOH-delimited FIX-style file and keeps a
//! `security_id -> (symbol, market depth)` table. Two layouts exist in
//! the wild: the current one carries tag 264 (MarketDepth) inline with
//! 48/55, the legacy one only states depth on `1022=GBX` rows; both are
//! accepted.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use regex::Regex;

use crate::core::{CodecError, Result};

/// Tags extracted per record.
const TAG_SECURITY_ID: &str = "48";
const TAG_SYMBOL: &str = "55";
const TAG_MARKET_DEPTH: &str = "264";

/// Lookup table from security id to `(symbol, depth)`.
#[derive(Debug, Clone, Default)]
pub struct SecDef {
    info: HashMap<i32, (String, u32)>,
}

impl SecDef {
    /// Load a gzip-compressed secdef file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            CodecError::io(format!("secdef file '{}'", path.display()), e.to_string())
        })?;
        Self::load_reader(file)
    }

    /// Load from any gzip-compressed byte stream.
    pub fn load_reader<R: Read>(reader: R) -> Result<Self> {
        let decoder = GzDecoder::new(reader);
        Self::parse_records(BufReader::new(decoder))
    }

    fn parse_records<R: BufRead>(reader: R) -> Result<Self> {
        let tag_re = Regex::new(r"(?:^|\x01)(48|55|264)=([^\x01]*)").expect("valid tag pattern");
        let legacy_depth_re = Regex::new(r"1022=GBX\x01264=(\d+)").expect("valid depth pattern");

        let mut info = HashMap::new();
        for (index, record) in reader.split(b'\n').enumerate() {
            let line_number = index + 1;
            let record = record.map_err(|e| {
                CodecError::io(format!("secdef line {line_number}"), e.to_string())
            })?;
            let line = String::from_utf8_lossy(&record);
            if line.trim().is_empty() {
                continue;
            }

            let mut tags: HashMap<&str, &str> = HashMap::new();
            for caps in tag_re.captures_iter(&line) {
                let tag = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let value = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                tags.insert(tag, value);
            }

            let security_id = tags.get(TAG_SECURITY_ID);
            let symbol = tags.get(TAG_SYMBOL);
            let (security_id, symbol) = match (security_id, symbol) {
                (Some(id), Some(symbol)) => (*id, *symbol),
                (None, None) => continue,
                _ => {
                    return Err(CodecError::secdef(
                        line_number,
                        "record has tag 48 or 55 but not both",
                    ))
                }
            };

            let security_id: i32 = security_id.parse().map_err(|_| {
                CodecError::secdef(
                    line_number,
                    format!("invalid SecurityID (48) value '{security_id}'"),
                )
            })?;

            // Legacy rows state depth per market segment; the GBX one is
            // authoritative there, so it wins over a bare 264 match.
            let depth_text = match legacy_depth_re.captures(&line) {
                Some(caps) => caps[1].to_string(),
                None => match tags.get(TAG_MARKET_DEPTH) {
                    Some(depth) => (*depth).to_string(),
                    None => {
                        return Err(CodecError::secdef(
                            line_number,
                            "record has no MarketDepth (264) tag",
                        ))
                    }
                },
            };
            let depth: u32 = depth_text.parse().map_err(|_| {
                CodecError::secdef(
                    line_number,
                    format!("invalid MarketDepth (264) value '{depth_text}'"),
                )
            })?;

            info.insert(security_id, (symbol.to_string(), depth));
        }

        Ok(SecDef { info })
    }

    /// Single hash probe for a security id.
    pub fn lookup_security_id(&self, security_id: i32) -> Option<(&str, u32)> {
        self.info
            .get(&security_id)
            .map(|(symbol, depth)| (symbol.as_str(), *depth))
    }

    /// Short-form alias for [`SecDef::lookup_security_id`].
    pub fn lookup(&self, security_id: i32) -> Option<(&str, u32)> {
        self.lookup_security_id(security_id)
    }

    /// Number of loaded definitions.
    pub fn len(&self) -> usize {
        self.info.len()
    }

    /// Whether no definitions were loaded.
    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }

    /// Iterate all `(security_id, (symbol, depth))` definitions.
    pub fn iter(&self) -> impl Iterator<Item = (&i32, &(String, u32))> {
        self.info.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(content: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_inline_depth_layout() {
        let content = "35=d\x0148=903188\x0155=ESH8\x01264=10\x01\n\
                       35=d\x0148=12345\x0155=GEZ9\x01264=5\x01\n";
        let secdef = SecDef::load_reader(gzip(content).as_slice()).unwrap();
        assert_eq!(secdef.len(), 2);
        assert_eq!(secdef.lookup_security_id(903188), Some(("ESH8", 10)));
        assert_eq!(secdef.lookup_security_id(12345), Some(("GEZ9", 5)));
    }

    #[test]
    fn test_legacy_gbx_layout() {
        let content = "35=d\x0148=800\x0155=6EU7\x011022=GBX\x01264=12\x01107=EUROFX\x01\n";
        let secdef = SecDef::load_reader(gzip(content).as_slice()).unwrap();
        assert_eq!(secdef.lookup_security_id(800), Some(("6EU7", 12)));
    }

    #[test]
    fn test_lookup_miss() {
        let content = "35=d\x0148=1\x0155=A\x01264=3\x01\n";
        let secdef = SecDef::load_reader(gzip(content).as_slice()).unwrap();
        assert_eq!(secdef.lookup_security_id(9999999), None);
    }

    #[test]
    fn test_rows_without_ids_are_skipped() {
        let content = "35=f\x0160=20170810\x01\n48=2\x0155=B\x01264=2\x01\n";
        let secdef = SecDef::load_reader(gzip(content).as_slice()).unwrap();
        assert_eq!(secdef.len(), 1);
        assert_eq!(secdef.lookup_security_id(2), Some(("B", 2)));
    }

    #[test]
    fn test_malformed_record_errors() {
        // tag 48 without 55
        let content = "48=3\x01264=2\x01\n";
        let err = SecDef::load_reader(gzip(content).as_slice()).unwrap_err();
        assert!(matches!(err, CodecError::SecDef { line: 1, .. }));

        // missing depth entirely
        let content = "48=3\x0155=C\x01\n";
        let err = SecDef::load_reader(gzip(content).as_slice()).unwrap_err();
        assert!(matches!(err, CodecError::SecDef { .. }));

        // unparsable id
        let content = "48=notanumber\x0155=C\x01264=1\x01\n";
        let err = SecDef::load_reader(gzip(content).as_slice()).unwrap_err();
        assert!(matches!(err, CodecError::SecDef { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secdef.dat.gz");
        std::fs::write(&path, gzip("48=7\x0155=NQZ7\x01264=10\x01\n")).unwrap();
        let secdef = SecDef::load(&path).unwrap();
        assert_eq!(secdef.lookup_security_id(7), Some(("NQZ7", 10)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SecDef::load("/nonexistent/secdef.dat.gz").unwrap_err();
        assert!(matches!(err, CodecError::Io { .. }));
    }
}
