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

use crate::metadata::{MetadataMap, KEY_TYPE};
use crate::DataTypeSerializer;
use compact_str::format_compact;
use quick_xml::events::Event;
use quick_xml::Reader;
use rumtk_core::core::RUMResult;
use rumtk_core::strings::RUMString;

///
/// XML is already its own canonical form, so this serializer is close to identity; the
/// only real transformation is the optional namespace-stripping pass (`xmlns`/`xmlns:*`
/// attributes removed) so destinations that don't care about namespaces can match on
/// unqualified element names.
///
pub struct XmlSerializer;

pub static XML: XmlSerializer = XmlSerializer;

///
/// Removes `xmlns` and `xmlns:prefix` attributes from every start tag. This is a
/// best-effort textual pass rather than a full namespace-aware rewrite; it is
/// sufficient for stripping the declarations without altering element structure.
///
pub fn strip_namespaces(xml: &str) -> RUMString {
    let mut out = String::with_capacity(xml.len());
    let mut chars = xml.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c != '<' {
            out.push(c);
            continue;
        }
        // Copy the tag verbatim up to its closing '>', dropping xmlns attributes as we go.
        out.push('<');
        let mut tag = String::new();
        for (_, tc) in chars.by_ref() {
            if tc == '>' {
                break;
            }
            tag.push(tc);
        }
        let filtered: Vec<&str> = tag
            .split_whitespace()
            .filter(|tok| !tok.starts_with("xmlns"))
            .collect();
        out.push_str(&filtered.join(" "));
        out.push('>');
    }
    RUMString::from(out)
}

fn validate_well_formed(xml: &str) -> RUMResult<()> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => return Ok(()),
            Err(e) => return Err(format_compact!("Malformed XML at offset {}: {}", reader.buffer_position(), e)),
            _ => {}
        }
        buf.clear();
    }
}

impl DataTypeSerializer for XmlSerializer {
    fn to_canonical_xml(&self, raw: &[u8]) -> RUMResult<Option<RUMString>> {
        let text = std::str::from_utf8(raw).map_err(|e| format_compact!("XML payload is not valid UTF-8: {}", e))?;
        validate_well_formed(text)?;
        Ok(Some(strip_namespaces(text)))
    }

    fn from_canonical_xml(&self, xml: &str) -> RUMResult<Option<Vec<u8>>> {
        validate_well_formed(xml)?;
        Ok(Some(xml.as_bytes().to_vec()))
    }

    fn is_serialization_required(&self, _to_xml: bool) -> bool {
        true
    }

    fn transform_without_serializing(&self, _raw: &[u8]) -> RUMResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn populate_metadata(&self, _raw: &[u8], map: &mut MetadataMap) -> RUMResult<()> {
        map.insert(RUMString::from(KEY_TYPE), RUMString::from("XML"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_default_and_prefixed_namespaces() {
        let xml = r#"<root xmlns="urn:hl7-org:v3" xmlns:voc="urn:hl7-org:v3/voc"><id voc:code="1"/></root>"#;
        let stripped = strip_namespaces(xml);
        assert!(!stripped.contains("xmlns"));
        assert!(stripped.contains("<root>"));
    }

    #[test]
    fn rejects_malformed_xml() {
        assert!(XML.to_canonical_xml(b"<root><unterminated>").is_err());
    }

    #[test]
    fn round_trips_well_formed_xml() {
        let xml = b"<root><child>value</child></root>";
        let canonical = XML.to_canonical_xml(xml).unwrap().unwrap();
        let back = XML.from_canonical_xml(&canonical).unwrap().unwrap();
        assert_eq!(back, xml);
    }
}
