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

//! Data type serializer framework. Every supported wire format gets a
//! [DataTypeSerializer] implementation that knows how to convert a raw payload to and
//! from a canonical XML representation, matching every other connector in the engine
//! regardless of the data type flowing through it.

pub mod delimited;
pub mod dicom;
pub mod hl7v2;
pub mod hl7v3;
pub mod json;
pub mod metadata;
pub mod ncpdp;
pub mod raw;
pub mod registry;
pub mod x12;
pub mod xml_serializer;

use rumtk_core::core::RUMResult;
use rumtk_core::strings::RUMString;
use serde::{Deserialize, Serialize};

pub use metadata::MetadataMap;

///
/// Every data type this engine understands implements this trait. `RAW` is the only
/// type for which XML conversion is meaningless; its implementation returns `Ok(None)`
/// for both directions, per spec.
///
pub trait DataTypeSerializer: Sync {
    /// Converts a raw wire payload into its canonical XML representation.
    fn to_canonical_xml(&self, raw: &[u8]) -> RUMResult<Option<RUMString>>;
    /// Reverses [Self::to_canonical_xml].
    fn from_canonical_xml(&self, xml: &str) -> RUMResult<Option<Vec<u8>>>;
    /// Whether the transformation stage needs to serialize to/from XML at all for
    /// this direction, or whether [Self::transform_without_serializing] suffices.
    fn is_serialization_required(&self, to_xml: bool) -> bool;
    /// Optional shortcut that skips the XML round-trip entirely (e.g. RAW, or a
    /// same-type passthrough). Returns `Ok(None)` when no shortcut applies.
    fn transform_without_serializing(&self, raw: &[u8]) -> RUMResult<Option<Vec<u8>>>;
    /// Extracts domain metadata (`mirth_source`, `mirth_type`, `mirth_version`) from
    /// the raw payload into `map`.
    fn populate_metadata(&self, raw: &[u8], map: &mut MetadataMap) -> RUMResult<()>;
}

///
/// The closed set of data types this engine's connectors can be bound to.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    HL7V2,
    HL7V3,
    Xml,
    Json,
    Raw,
    Delimited,
    X12,
    Ncpdp,
    Dicom,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::HL7V2 => "HL7V2",
            DataType::HL7V3 => "HL7V3",
            DataType::Xml => "XML",
            DataType::Json => "JSON",
            DataType::Raw => "RAW",
            DataType::Delimited => "DELIMITED",
            DataType::X12 => "X12",
            DataType::Ncpdp => "NCPDP",
            DataType::Dicom => "DICOM",
        }
    }
}
