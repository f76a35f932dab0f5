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
use rumtk_core::core::RUMResult;
use rumtk_core::strings::RUMString;

///
/// JSON has no native XML form, so the canonical representation wraps the validated
/// JSON text verbatim in a `<json>` root as CDATA (the same strategy Mirth-style
/// engines use for opaque data types that must still flow through an XML-shaped
/// pipeline). Round-tripping recovers the original text exactly.
///
pub struct JsonSerializer;

pub static JSON: JsonSerializer = JsonSerializer;

const WRAPPER_OPEN: &str = "<json><![CDATA[";
const WRAPPER_CLOSE: &str = "]]></json>";

impl DataTypeSerializer for JsonSerializer {
    fn to_canonical_xml(&self, raw: &[u8]) -> RUMResult<Option<RUMString>> {
        let text = std::str::from_utf8(raw).map_err(|e| format_compact!("JSON payload is not valid UTF-8: {}", e))?;
        serde_json::from_str::<serde_json::Value>(text)
            .map_err(|e| format_compact!("Malformed JSON at line {} column {}: {}", e.line(), e.column(), e))?;
        Ok(Some(RUMString::from(format!("{}{}{}", WRAPPER_OPEN, text, WRAPPER_CLOSE))))
    }

    fn from_canonical_xml(&self, xml: &str) -> RUMResult<Option<Vec<u8>>> {
        let trimmed = xml.trim();
        if !trimmed.starts_with(WRAPPER_OPEN) || !trimmed.ends_with(WRAPPER_CLOSE) {
            return Err(format_compact!("Expected a <json><![CDATA[...]]></json> wrapper, got: {}", xml));
        }
        let inner = &trimmed[WRAPPER_OPEN.len()..trimmed.len() - WRAPPER_CLOSE.len()];
        Ok(Some(inner.as_bytes().to_vec()))
    }

    fn is_serialization_required(&self, _to_xml: bool) -> bool {
        true
    }

    fn transform_without_serializing(&self, _raw: &[u8]) -> RUMResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn populate_metadata(&self, _raw: &[u8], map: &mut MetadataMap) -> RUMResult<()> {
        map.insert(RUMString::from(KEY_TYPE), RUMString::from("JSON"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_json_through_wrapper() {
        let payload = br#"{"patientId":"1234","name":"Adam"}"#;
        let canonical = JSON.to_canonical_xml(payload).unwrap().unwrap();
        assert!(canonical.starts_with(WRAPPER_OPEN));
        let back = JSON.from_canonical_xml(&canonical).unwrap().unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(JSON.to_canonical_xml(b"{not json}").is_err());
    }
}
