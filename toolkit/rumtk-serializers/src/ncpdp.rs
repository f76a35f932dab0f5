/*
 * rumtk attempts to implement HL7 and medical protocols for interoperability in medicine.
 * This toolkit aims to be reliable, simple, performant, and standards compliant.
 * Copyright (C) 2025  Luis M. Santos, M.D.
 *
 * This library is free software; you can redistribute it and/or
 * modify it under the terms of the GNU Lesser General Public
 * License as published by the Free Software Foundation; either
 * version 2.1 of the License, or (at your option) any later version.
 *
 * This library is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
 * Lesser General Public License for more details.
 *
 * You should have received a copy of the GNU Lesser General Public
 * License along with this library; if not, write to the Free Software
 * Foundation, Inc., 51 Franklin Street, Fifth Floor, Boston, MA  02110-1301  USA
 */

use crate::metadata::{MetadataMap, KEY_TYPE, KEY_VERSION};
use crate::DataTypeSerializer;
use compact_str::format_compact;
use quick_xml::escape::escape;
use rumtk_core::core::RUMResult;
use rumtk_core::strings::RUMString;

/// Segment separator (RS), group separator (GS) and field separator (FS) control
/// characters used by NCPDP Telecommunication/D.0 batch transactions.
pub const SEGMENT_SEPARATOR: u8 = 0x1E;
pub const GROUP_SEPARATOR: u8 = 0x1D;
pub const FIELD_SEPARATOR: u8 = 0x1C;

pub struct NcpdpSerializer;

pub static NCPDP: NcpdpSerializer = NcpdpSerializer;

fn transaction_header(raw: &[u8]) -> RUMResult<(&str, &str)> {
    let text = std::str::from_utf8(raw).map_err(|e| format_compact!("NCPDP payload is not valid UTF-8: {}", e))?;
    if text.len() < 3 {
        return Err(format_compact!("NCPDP payload too short to contain a version/transaction header!"));
    }
    Ok((&text[0..2], &text[2..3]))
}

fn to_xml(raw: &[u8]) -> RUMResult<RUMString> {
    let text = std::str::from_utf8(raw).map_err(|e| format_compact!("NCPDP payload is not valid UTF-8: {}", e))?;
    let mut out = String::from("<NCPDPMessage>");
    for (gidx, group) in text.split(GROUP_SEPARATOR as char).enumerate() {
        out.push_str(&format!("<Group{}>", gidx));
        for (sidx, segment) in group.split(SEGMENT_SEPARATOR as char).enumerate() {
            if segment.is_empty() {
                continue;
            }
            out.push_str(&format!("<Segment{}>", sidx));
            for (fidx, field) in segment.split(FIELD_SEPARATOR as char).enumerate() {
                if field.is_empty() {
                    continue;
                }
                out.push_str(&format!("<Field{}>{}</Field{}>", fidx, escape(field), fidx));
            }
            out.push_str(&format!("</Segment{}>", sidx));
        }
        out.push_str(&format!("</Group{}>", gidx));
    }
    out.push_str("</NCPDPMessage>");
    Ok(RUMString::from(out))
}

impl DataTypeSerializer for NcpdpSerializer {
    fn to_canonical_xml(&self, raw: &[u8]) -> RUMResult<Option<RUMString>> {
        transaction_header(raw)?;
        Ok(Some(to_xml(raw)?))
    }

    fn from_canonical_xml(&self, _xml: &str) -> RUMResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn is_serialization_required(&self, _to_xml: bool) -> bool {
        true
    }

    fn transform_without_serializing(&self, _raw: &[u8]) -> RUMResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn populate_metadata(&self, raw: &[u8], map: &mut MetadataMap) -> RUMResult<()> {
        let (version, transaction_code) = transaction_header(raw)?;
        map.insert(RUMString::from(KEY_TYPE), RUMString::from("NCPDP"));
        map.insert(RUMString::from(KEY_VERSION), RUMString::from(version));
        map.insert(RUMString::from("mirth_ncpdp_transaction_code"), RUMString::from(transaction_code));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"D1B1");
        bytes.push(FIELD_SEPARATOR);
        bytes.extend_from_slice(b"01");
        bytes.push(SEGMENT_SEPARATOR);
        bytes.extend_from_slice(b"AM04");
        bytes.push(FIELD_SEPARATOR);
        bytes.extend_from_slice(b"123456789");
        bytes
    }

    #[test]
    fn extracts_version_and_transaction_code() {
        let mut map = MetadataMap::default();
        NCPDP.populate_metadata(&sample(), &mut map).unwrap();
        assert_eq!(map.get(KEY_VERSION).map(|s| s.as_str()), Some("D1"));
        assert_eq!(map.get("mirth_ncpdp_transaction_code").map(|s| s.as_str()), Some("B"));
    }

    #[test]
    fn converts_segments_to_fields() {
        let xml = NCPDP.to_canonical_xml(&sample()).unwrap().unwrap();
        assert!(xml.contains("<Group0>"));
        assert!(xml.contains("<Segment0>"));
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(NCPDP.to_canonical_xml(b"D").is_err());
    }
}
