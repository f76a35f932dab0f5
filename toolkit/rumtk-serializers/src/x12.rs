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

use crate::metadata::{MetadataMap, KEY_SOURCE, KEY_TYPE, KEY_VERSION};
use crate::DataTypeSerializer;
use compact_str::format_compact;
use quick_xml::escape::escape;
use rumtk_core::core::RUMResult;
use rumtk_core::strings::RUMString;

/// Minimum length of a well-formed ISA segment: 16 elements of 1-15 characters each,
/// fixed-width per the X12 envelope standard, terminated by the segment separator.
const ISA_MIN_LEN: usize = 105;

///
/// X12/EDI delimiters aren't declared anywhere explicit; every interchange infers them
/// from fixed byte offsets of its own ISA segment: byte 3 is the element separator,
/// byte 104 the sub-element (component) separator, and the byte right after ISA16 is
/// the segment terminator. See X12.5/X12.6; this mirrors how every production X12
/// parser bootstraps itself before it can read anything else.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct X12Delimiters {
    pub element_separator: u8,
    pub sub_element_separator: u8,
    pub segment_terminator: u8,
}

impl X12Delimiters {
    pub fn from_isa(raw: &[u8]) -> RUMResult<X12Delimiters> {
        if raw.len() < ISA_MIN_LEN + 1 {
            return Err(format_compact!(
                "X12 payload too short to contain a complete ISA segment ({} bytes)",
                raw.len()
            ));
        }
        if &raw[0..3] != b"ISA" {
            return Err(format_compact!("X12 payload does not start with an ISA segment!"));
        }
        Ok(X12Delimiters {
            element_separator: raw[3],
            sub_element_separator: raw[104],
            segment_terminator: raw[105],
        })
    }
}

pub struct X12Serializer;

pub static X12: X12Serializer = X12Serializer;

/// Returns the 1-indexed element at `index` of the first segment matching `seg_id`
/// (e.g. `find_element(text, delims, "GS", 8)` is GS.08), or `None` if the segment or
/// the element isn't present.
fn find_element<'a>(text: &'a str, delims: X12Delimiters, seg_id: &str, index: usize) -> Option<&'a str> {
    for segment in text.split(delims.segment_terminator as char) {
        let segment = segment.trim_matches(|c| c == '\r' || c == '\n');
        if segment.is_empty() {
            continue;
        }
        let mut elements = segment.split(delims.element_separator as char);
        let id = elements.next().unwrap_or("").trim();
        if id == seg_id {
            return elements.nth(index - 1).map(|s| s.trim());
        }
    }
    None
}

fn segments_to_xml(raw: &[u8], delims: X12Delimiters) -> RUMResult<RUMString> {
    let text = std::str::from_utf8(raw).map_err(|e| format_compact!("X12 payload is not valid UTF-8: {}", e))?;
    let mut out = String::from("<X12Interchange>");
    for segment in text.split(delims.segment_terminator as char) {
        let segment = segment.trim_matches(|c| c == '\r' || c == '\n');
        if segment.is_empty() {
            continue;
        }
        let mut elements = segment.split(delims.element_separator as char);
        let id = elements.next().unwrap_or("").trim();
        if id.is_empty() {
            continue;
        }
        out.push_str(&format!("<{}>", id));
        for (idx, element) in elements.enumerate() {
            out.push_str(&format!("<E{}>{}</E{}>", idx + 1, escape(element), idx + 1));
        }
        out.push_str(&format!("</{}>", id));
    }
    out.push_str("</X12Interchange>");
    Ok(RUMString::from(out))
}

impl DataTypeSerializer for X12Serializer {
    fn to_canonical_xml(&self, raw: &[u8]) -> RUMResult<Option<RUMString>> {
        let delims = X12Delimiters::from_isa(raw)?;
        Ok(Some(segments_to_xml(raw, delims)?))
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
        let delims = X12Delimiters::from_isa(raw)?;
        let text = std::str::from_utf8(raw).map_err(|e| format_compact!("X12 payload is not valid UTF-8: {}", e))?;
        if let Some(st01) = find_element(text, delims, "ST", 1) {
            map.insert(RUMString::from(KEY_TYPE), RUMString::from(st01));
        }
        let source = find_element(text, delims, "ISA", 6)
            .filter(|s| !s.is_empty())
            .or_else(|| find_element(text, delims, "GS", 2));
        if let Some(source) = source {
            map.insert(RUMString::from(KEY_SOURCE), RUMString::from(source));
        }
        if let Some(version) = find_element(text, delims, "GS", 8) {
            map.insert(RUMString::from(KEY_VERSION), RUMString::from(version));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_isa() -> String {
        let mut isa = String::from("ISA*00*          *00*          *ZZ*SENDER         *ZZ*RECEIVER       *230101*1253*U*00401*000000001*0*T*:~");
        isa.push_str("GS*HC*SENDER*RECEIVER*20230101*1253*1*X*004010~");
        isa
    }

    #[test]
    fn infers_delimiters_from_isa_offsets() {
        let isa = sample_isa();
        let delims = X12Delimiters::from_isa(isa.as_bytes()).unwrap();
        assert_eq!(delims.element_separator, b'*');
        assert_eq!(delims.segment_terminator, b'~');
    }

    #[test]
    fn converts_segments_to_elements() {
        let isa = sample_isa();
        let xml = X12.to_canonical_xml(isa.as_bytes()).unwrap().unwrap();
        assert!(xml.contains("<ISA>"));
        assert!(xml.contains("<GS>"));
    }

    #[test]
    fn rejects_payload_without_isa() {
        assert!(X12.to_canonical_xml(b"GS*HC*SENDER~").is_err());
    }

    #[test]
    fn populates_metadata_from_isa_gs_and_st() {
        let mut isa = sample_isa();
        isa.push_str("ST*837*0001~");
        let mut map = MetadataMap::default();
        X12.populate_metadata(isa.as_bytes(), &mut map).unwrap();
        assert_eq!(map.get(KEY_TYPE).map(|s| s.as_str()), Some("837"));
        assert_eq!(map.get(KEY_SOURCE).map(|s| s.as_str()), Some("SENDER"));
        assert_eq!(map.get(KEY_VERSION).map(|s| s.as_str()), Some("004010"));
    }

    #[test]
    fn falls_back_to_gs02_when_isa06_is_blank() {
        let mut isa = String::from("ISA*00*          *00*          *ZZ*               *ZZ*RECEIVER       *230101*1253*U*00401*000000001*0*T*:~");
        isa.push_str("GS*HC*SENDER*RECEIVER*20230101*1253*1*X*004010~");
        let mut map = MetadataMap::default();
        X12.populate_metadata(isa.as_bytes(), &mut map).unwrap();
        assert_eq!(map.get(KEY_SOURCE).map(|s| s.as_str()), Some("SENDER"));
    }
}
