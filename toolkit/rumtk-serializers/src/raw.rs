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
use rumtk_core::core::RUMResult;
use rumtk_core::strings::RUMString;

/// Identity data type. Never serializes to XML; every pipeline stage that would
/// otherwise round-trip through XML uses [RawSerializer::transform_without_serializing]
/// instead, which is just a copy of the bytes.
pub struct RawSerializer;

pub static RAW: RawSerializer = RawSerializer;

impl DataTypeSerializer for RawSerializer {
    fn to_canonical_xml(&self, _raw: &[u8]) -> RUMResult<Option<RUMString>> {
        Ok(None)
    }

    fn from_canonical_xml(&self, _xml: &str) -> RUMResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn is_serialization_required(&self, _to_xml: bool) -> bool {
        false
    }

    fn transform_without_serializing(&self, raw: &[u8]) -> RUMResult<Option<Vec<u8>>> {
        Ok(Some(raw.to_vec()))
    }

    fn populate_metadata(&self, _raw: &[u8], map: &mut MetadataMap) -> RUMResult<()> {
        map.insert(RUMString::from(KEY_TYPE), RUMString::from("RAW"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_never_serializes() {
        assert!(RAW.to_canonical_xml(b"anything").unwrap().is_none());
        assert!(!RAW.is_serialization_required(true));
    }

    #[test]
    fn raw_passes_bytes_through() {
        let payload = b"some bytes\x00\x01";
        let result = RAW.transform_without_serializing(payload).unwrap().unwrap();
        assert_eq!(result, payload);
    }
}
