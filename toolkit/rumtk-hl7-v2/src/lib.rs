/*
 * rumtk attempts to implement HL7 and medical protocols for interoperability in medicine.
 * This toolkit aims to be reliable, simple, performant, and standards compliant.
 * Copyright (C) 2024  Luis M. Santos, M.D.
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
#![feature(inherent_associated_types)]
#![feature(rustc_private)]

extern crate rumtk_core;
pub mod hl7_v2_base_types;
pub mod hl7_v2_complex_types;
pub mod hl7_v2_constants;
pub mod hl7_v2_field_descriptors;
pub mod hl7_v2_interpreter;
mod hl7_v2_optionality_rules;
pub mod hl7_v2_parser;
pub mod hl7_v2_search;
/*****************************************Tests****************************************/
#[cfg(test)]
mod tests {
    use crate::hl7_v2_base_types::v2_base_types::V2DateTime;
    use crate::hl7_v2_interpreter::v2_interpreter::interpret_field;
    use crate::hl7_v2_parser::v2_parser::{V2Field, V2Message, V2ParseCharacters};

    const VXU_HL7_V2_MESSAGE: &str = "MSH|^~\\&|EHR|GOOD HEALTH HOSPITAL|IMM|GOOD HEALTH HOSPITAL|20070818112555||VXU^V04|MSG00001|P|2.5\r\
        PID|1||PATID1234^5^M11||EVERYMAN^ADAM^A||19610615|M\r\
        ORC|RE||197023^IMM\r\
        RXA|0|1|20070818112555|20070818112555|48^HIB PRP-T^CVX|0.5|ML";

    #[test]
    fn parses_vxu_message_segments() {
        let message = V2Message::from_str(VXU_HL7_V2_MESSAGE).unwrap();
        assert!(message.segment_exists("PID"));
        assert!(message.segment_exists("ORC"));
        assert!(message.segment_exists("RXA"));
        assert_eq!(message.message_type().unwrap().as_str(), "VXU^V04");
    }

    #[test]
    fn parses_datetime_with_fractional_seconds() {
        let dt = V2DateTime::from_v2_string(&"20070818112355.55".into());
        assert_eq!(dt.as_v2_date(), "20070818");
    }

    #[test]
    fn interprets_address_field_components() {
        let chars = V2ParseCharacters::new();
        let field = V2Field::from_str("123 Main St^^Springfield^IL^62704^USA", &chars);
        let components = interpret_field("AD", &field).unwrap();
        assert_eq!(components[2].as_str(), "Springfield");
    }

    #[test]
    fn rejects_message_missing_msh() {
        let garbage = "PID|1||PATID1234\r";
        assert!(V2Message::from_str(garbage).is_err());
    }
}
