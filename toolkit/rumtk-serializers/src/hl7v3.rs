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
use crate::xml_serializer::{strip_namespaces, XML};
use crate::DataTypeSerializer;
use compact_str::format_compact;
use quick_xml::events::Event;
use quick_xml::Reader;
use rumtk_core::core::RUMResult;
use rumtk_core::strings::RUMString;

///
/// HL7 v3 messages are already XML, so this is a thin wrapper over [crate::xml_serializer::XML]
/// that additionally pulls the interaction id (`<PRPA_IN201301UV02>`-style root element
/// name, or an explicit `interactionId` attribute/element) and `versionCode` out for
/// metadata, since those live in the v3 envelope rather than in MSH-9/MSH-12 the way
/// HL7 v2 carries them.
///
pub struct Hl7V3Serializer;

pub static HL7V3: Hl7V3Serializer = Hl7V3Serializer;

fn extract_root_and_version(xml: &str) -> (Option<RUMString>, Option<RUMString>) {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut root: Option<RUMString> = None;
    let mut version: Option<RUMString> = None;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = RUMString::from(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                if root.is_none() {
                    root = Some(name.clone());
                }
                if name.as_str().ends_with("versionCode") || name.as_str().ends_with("interactionId") {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"code" || attr.key.as_ref() == b"extension" {
                            if let Ok(v) = attr.unescape_value() {
                                version = Some(RUMString::from(v.into_owned()));
                            }
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    (root, version)
}

impl DataTypeSerializer for Hl7V3Serializer {
    fn to_canonical_xml(&self, raw: &[u8]) -> RUMResult<Option<RUMString>> {
        XML.to_canonical_xml(raw)
    }

    fn from_canonical_xml(&self, xml: &str) -> RUMResult<Option<Vec<u8>>> {
        XML.from_canonical_xml(xml)
    }

    fn is_serialization_required(&self, _to_xml: bool) -> bool {
        true
    }

    fn transform_without_serializing(&self, _raw: &[u8]) -> RUMResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn populate_metadata(&self, raw: &[u8], map: &mut MetadataMap) -> RUMResult<()> {
        let text = std::str::from_utf8(raw).map_err(|e| format_compact!("HL7 v3 payload is not valid UTF-8: {}", e))?;
        let stripped = strip_namespaces(text);
        let (root, version) = extract_root_and_version(stripped.as_str());
        map.insert(RUMString::from(KEY_TYPE), RUMString::from("HL7V3"));
        if let Some(root) = root {
            map.insert(RUMString::from("mirth_interaction"), root);
        }
        if let Some(version) = version {
            map.insert(RUMString::from(KEY_VERSION), version);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<PRPA_IN201301UV02 xmlns="urn:hl7-org:v3"><id root="1.2.3"/><versionCode code="V3PR1"/></PRPA_IN201301UV02>"#;

    #[test]
    fn extracts_interaction_and_version() {
        let mut map = MetadataMap::default();
        HL7V3.populate_metadata(SAMPLE.as_bytes(), &mut map).unwrap();
        assert_eq!(map.get("mirth_interaction").map(|s| s.as_str()), Some("PRPA_IN201301UV02"));
        assert_eq!(map.get(KEY_VERSION).map(|s| s.as_str()), Some("V3PR1"));
    }

    #[test]
    fn delegates_xml_validation() {
        assert!(HL7V3.to_canonical_xml(b"<unterminated>").is_err());
    }
}
