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
use phf::phf_map;

/// Number of digits carried in the fractional-second part of a DTM value before padding/scaling.
pub const V2_DATETIME_MIRCRO_LENGTH: u8 = 5;
/// Divisor used to turn a [chrono] nanosecond count into the HL7 fractional-second tick.
pub const V2_DATETIME_THOUSAND_TICK: u32 = 1000;

/// Segment codes this toolkit recognizes by name, mapped to a stable numeric ID used internally
/// for fast lookups. Unknown segment codes are still accepted by the parser; this table only
/// backs friendlier diagnostics and ordering, not a whitelist.
pub static V2_SEGMENT_IDS: phf::Map<&'static str, u16> = phf_map! {
    "MSH" => 1,
    "MSA" => 2,
    "ERR" => 3,
    "EVN" => 4,
    "PID" => 5,
    "PD1" => 6,
    "NK1" => 7,
    "PV1" => 8,
    "PV2" => 9,
    "ORC" => 10,
    "OBR" => 11,
    "OBX" => 12,
    "NTE" => 13,
    "DG1" => 14,
    "SPM" => 15,
    "FHS" => 16,
    "BHS" => 17,
    "FTS" => 18,
    "BTS" => 19,
};

pub static V2_SEGMENT_NAMES: phf::Map<u16, &'static str> = phf_map! {
    1u16 => "MSH",
    2u16 => "MSA",
    3u16 => "ERR",
    4u16 => "EVN",
    5u16 => "PID",
    6u16 => "PD1",
    7u16 => "NK1",
    8u16 => "PV1",
    9u16 => "PV2",
    10u16 => "ORC",
    11u16 => "OBR",
    12u16 => "OBX",
    13u16 => "NTE",
    14u16 => "DG1",
    15u16 => "SPM",
    16u16 => "FHS",
    17u16 => "BHS",
    18u16 => "FTS",
    19u16 => "BTS",
};
