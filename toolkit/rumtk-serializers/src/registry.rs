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

use crate::dicom::DICOM;
use crate::hl7v2::HL7V2;
use crate::hl7v3::HL7V3;
use crate::json::JSON;
use crate::ncpdp::NCPDP;
use crate::raw::RAW;
use crate::x12::X12;
use crate::xml_serializer::XML;
use crate::{DataType, DataTypeSerializer};
use ::phf::phf_map;

///
/// Resolves a [DataType] to its serializer without an allocation or a trait-object
/// lookup table built at runtime, the same static-dispatch pattern the field-descriptor
/// registry in `rumtk-hl7-v2` uses for component lookups. `DELIMITED` is intentionally
/// absent: its serializer is parameterized by [crate::delimited::DelimitedConfig] and so
/// cannot be a single `'static` instance; callers construct one directly with
/// [crate::delimited::DelimitedSerializer::new].
///
pub static SERIALIZER_REGISTRY: ::phf::Map<&'static str, &'static dyn DataTypeSerializer> = phf_map! {
    "HL7V2" => &HL7V2,
    "HL7V3" => &HL7V3,
    "XML" => &XML,
    "JSON" => &JSON,
    "RAW" => &RAW,
    "X12" => &X12,
    "NCPDP" => &NCPDP,
    "DICOM" => &DICOM,
};

pub fn lookup(data_type: DataType) -> Option<&'static dyn DataTypeSerializer> {
    SERIALIZER_REGISTRY.get(data_type.as_str()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_registered_data_type() {
        assert!(lookup(DataType::HL7V2).is_some());
        assert!(lookup(DataType::HL7V3).is_some());
        assert!(lookup(DataType::Xml).is_some());
        assert!(lookup(DataType::Json).is_some());
        assert!(lookup(DataType::Raw).is_some());
        assert!(lookup(DataType::X12).is_some());
        assert!(lookup(DataType::Ncpdp).is_some());
        assert!(lookup(DataType::Dicom).is_some());
    }

    #[test]
    fn delimited_is_intentionally_absent() {
        assert!(lookup(DataType::Delimited).is_none());
    }
}
