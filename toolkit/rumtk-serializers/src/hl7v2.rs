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
use rumtk_hl7_v2::hl7_v2_parser::v2_parser::V2Message;

///
/// ER7-encoded HL7 v2 messages get a straightforward XML tree: one element per segment
/// named after the segment id, one `FieldN` child per field, one `RepN` grandchild per
/// repetition holding the raw (still component/subcomponent delimited) field text. This
/// mirrors the segment/field/repetition structure [V2Message] already parses into,
/// rather than inventing a separate schema.
///
pub struct Hl7V2Serializer;

pub static HL7V2: Hl7V2Serializer = Hl7V2Serializer;

fn message_to_xml(message: &V2Message) -> RUMString {
    let mut out = String::from("<HL7Message>");
    for name in message.segment_order() {
        let count = message.segment_count(name);
        for occurrence in 1..=count {
            let segment = match message.get(name, occurrence) {
                Ok(s) => s,
                Err(_) => continue,
            };
            out.push_str(&format!("<{}>", segment.name));
            for (idx, field) in segment.fields().iter().enumerate() {
                out.push_str(&format!("<Field{}>", idx + 1));
                for repetition in field.repetitions().iter() {
                    let raw = repetition
                        .iter()
                        .map(RUMString::as_str)
                        .collect::<Vec<_>>()
                        .join("^");
                    out.push_str(&format!("<Rep>{}</Rep>", escape(&raw)));
                }
                out.push_str(&format!("</Field{}>", idx + 1));
            }
            out.push_str(&format!("</{}>", segment.name));
        }
    }
    out.push_str("</HL7Message>");
    RUMString::from(out)
}

impl DataTypeSerializer for Hl7V2Serializer {
    fn to_canonical_xml(&self, raw: &[u8]) -> RUMResult<Option<RUMString>> {
        let text = std::str::from_utf8(raw).map_err(|e| format_compact!("HL7 v2 payload is not valid UTF-8: {}", e))?;
        let message = V2Message::from_str(text)?;
        Ok(Some(message_to_xml(&message)))
    }

    fn from_canonical_xml(&self, _xml: &str) -> RUMResult<Option<Vec<u8>>> {
        // Reconstructing ER7 from the generic XML tree requires re-deriving the
        // original encoding characters, which the message model already owns; callers
        // that need the original bytes back hold onto the source [V2Message] instead of
        // round-tripping through this XML form.
        Ok(None)
    }

    fn is_serialization_required(&self, _to_xml: bool) -> bool {
        true
    }

    fn transform_without_serializing(&self, _raw: &[u8]) -> RUMResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn populate_metadata(&self, raw: &[u8], map: &mut MetadataMap) -> RUMResult<()> {
        let text = std::str::from_utf8(raw).map_err(|e| format_compact!("HL7 v2 payload is not valid UTF-8: {}", e))?;
        let message = V2Message::from_str(text)?;
        let msh = message.get("MSH", 1)?;
        if let Ok(message_type) = msh.field(9).and_then(|f| f.get(1)) {
            map.insert(RUMString::from(KEY_TYPE), message_type.clone());
        }
        if let Ok(sending_app) = msh.field(3) {
            map.insert(RUMString::from(KEY_SOURCE), RUMString::from(sending_app.as_str()));
        }
        if let Ok(version) = message.version_id() {
            map.insert(RUMString::from(KEY_VERSION), version);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VXU: &str = "MSH|^~\\&|EHR|GOOD HEALTH HOSPITAL|IMM|GOOD HEALTH HOSPITAL|20070818112555||VXU^V04|MSG00001|P|2.5\rPID|1||PATID1234^5^M11||EVERYMAN^ADAM^A||19610615|M\r";

    #[test]
    fn converts_segments_to_xml_elements() {
        let xml = HL7V2.to_canonical_xml(VXU.as_bytes()).unwrap().unwrap();
        assert!(xml.contains("<MSH>"));
        assert!(xml.contains("<PID>"));
    }

    #[test]
    fn extracts_version_metadata() {
        let mut map = MetadataMap::default();
        HL7V2.populate_metadata(VXU.as_bytes(), &mut map).unwrap();
        assert_eq!(map.get(KEY_VERSION).map(|s| s.as_str()), Some("2.5"));
    }

    #[test]
    fn extracts_type_and_source_metadata() {
        let mut map = MetadataMap::default();
        HL7V2.populate_metadata(VXU.as_bytes(), &mut map).unwrap();
        assert_eq!(map.get(KEY_TYPE).map(|s| s.as_str()), Some("VXU"));
        assert_eq!(map.get(KEY_SOURCE).map(|s| s.as_str()), Some("EHR"));
    }

    #[test]
    fn rejects_message_without_msh() {
        assert!(HL7V2.to_canonical_xml(b"PID|1||PATID1234\r").is_err());
    }
}
