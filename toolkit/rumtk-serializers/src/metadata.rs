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

use ahash::AHashMap;
use rumtk_core::strings::RUMString;

/// Domain metadata a serializer extracts out of a raw payload: `mirth_source`,
/// `mirth_type`, `mirth_version`, plus whatever else a given data type contributes.
pub type MetadataMap = AHashMap<RUMString, RUMString>;

pub const KEY_SOURCE: &str = "mirth_source";
pub const KEY_TYPE: &str = "mirth_type";
pub const KEY_VERSION: &str = "mirth_version";
