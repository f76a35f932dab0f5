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
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use compact_str::format_compact;
use rumtk_core::core::RUMResult;
use rumtk_core::strings::RUMString;

const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8] = b"DICM";

///
/// Full DICOM data-dictionary decoding (tag-by-tag VR parsing) is out of scope; this
/// serializer's job is only to let a DICOM payload flow through the same canonical-XML
/// pipeline as every other data type. It detects the optional 128-byte preamble plus
/// `DICM` magic and carries the entire binary object, base64-encoded, as CDATA.
///
pub struct DicomSerializer;

pub static DICOM: DicomSerializer = DicomSerializer;

fn has_preamble(raw: &[u8]) -> bool {
    raw.len() >= PREAMBLE_LEN + MAGIC.len() && &raw[PREAMBLE_LEN..PREAMBLE_LEN + MAGIC.len()] == MAGIC
}

impl DataTypeSerializer for DicomSerializer {
    fn to_canonical_xml(&self, raw: &[u8]) -> RUMResult<Option<RUMString>> {
        let preamble = has_preamble(raw);
        let encoded = STANDARD.encode(raw);
        Ok(Some(RUMString::from(format!(
            "<DICOM preamble=\"{}\"><![CDATA[{}]]></DICOM>",
            preamble, encoded
        ))))
    }

    fn from_canonical_xml(&self, xml: &str) -> RUMResult<Option<Vec<u8>>> {
        let open = xml
            .find("<![CDATA[")
            .ok_or_else(|| format_compact!("Expected a <DICOM><![CDATA[...]]></DICOM> wrapper"))?;
        let close = xml
            .rfind("]]>")
            .ok_or_else(|| format_compact!("Unterminated CDATA section in DICOM wrapper"))?;
        let start = open + "<![CDATA[".len();
        if start > close {
            return Err(format_compact!("Malformed DICOM wrapper: CDATA bounds overlap"));
        }
        let encoded = &xml[start..close];
        let decoded = STANDARD
            .decode(encoded)
            .map_err(|e| format_compact!("DICOM payload is not valid base64: {}", e))?;
        Ok(Some(decoded))
    }

    fn is_serialization_required(&self, _to_xml: bool) -> bool {
        true
    }

    fn transform_without_serializing(&self, _raw: &[u8]) -> RUMResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn populate_metadata(&self, raw: &[u8], map: &mut MetadataMap) -> RUMResult<()> {
        map.insert(RUMString::from(KEY_TYPE), RUMString::from("DICOM"));
        map.insert(
            RUMString::from("mirth_dicom_preamble"),
            RUMString::from(if has_preamble(raw) { "true" } else { "false" }),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_with_preamble() -> Vec<u8> {
        let mut bytes = vec![0u8; PREAMBLE_LEN];
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[0x08, 0x00, 0x00, 0x00]);
        bytes
    }

    #[test]
    fn detects_preamble_and_magic() {
        let bytes = sample_with_preamble();
        assert!(has_preamble(&bytes));
        assert!(!has_preamble(b"not dicom"));
    }

    #[test]
    fn round_trips_through_base64_cdata() {
        let bytes = sample_with_preamble();
        let canonical = DICOM.to_canonical_xml(&bytes).unwrap().unwrap();
        assert!(canonical.contains("preamble=\"true\""));
        let back = DICOM.from_canonical_xml(&canonical).unwrap().unwrap();
        assert_eq!(back, bytes);
    }

    #[test]
    fn rejects_wrapper_without_cdata() {
        assert!(DICOM.from_canonical_xml("<DICOM></DICOM>").is_err());
    }
}
