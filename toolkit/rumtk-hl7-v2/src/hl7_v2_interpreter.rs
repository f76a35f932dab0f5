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

///
/// Schema-driven interpreter. Where [crate::hl7_v2_parser] only knows about delimiters and
/// segment/field/component structure, this module looks a raw component up against the
/// [crate::hl7_v2_field_descriptors] registry and validates/casts it per its declared data
/// type, the way a v2 data-type dictionary would.
///
pub mod v2_interpreter {
    use crate::hl7_v2_complex_types::hl7_v2_complex_types::validate_and_cast_component;
    use crate::hl7_v2_field_descriptors::v2_field_descriptor::V2_FIELD_DESCRIPTORS;
    use crate::hl7_v2_parser::v2_parser::V2Field;
    use rumtk_core::core::RUMResult;
    use rumtk_core::strings::RUMString;

    ///
    /// Interprets every component of `field` against the named composite data type's
    /// descriptor table (e.g. `"AD"` for an address field). Components beyond the descriptor's
    /// length, or when `data_type` has no registered descriptor, are passed through unvalidated
    /// since the registry only grows as more composite types are added.
    ///
    pub fn interpret_field(data_type: &str, field: &V2Field) -> RUMResult<Vec<RUMString>> {
        let descriptor = match V2_FIELD_DESCRIPTORS.get(data_type) {
            Some(descriptor) => descriptor,
            None => {
                let mut passthrough = Vec::with_capacity(field.len());
                for i in 1..=field.len() {
                    passthrough.push(field.get(i as isize)?.clone());
                }
                return Ok(passthrough);
            }
        };
        let mut components = Vec::with_capacity(descriptor.len());
        for (i, component_type) in descriptor.iter().enumerate() {
            let raw = match field.get((i + 1) as isize) {
                Ok(value) => value.as_str(),
                Err(_) => "",
            };
            components.push(validate_and_cast_component(raw, component_type)?);
        }
        Ok(components)
    }
}

#[cfg(test)]
mod tests {
    use super::v2_interpreter::interpret_field;
    use crate::hl7_v2_parser::v2_parser::{V2Field, V2ParseCharacters};

    #[test]
    fn interprets_known_composite_type() {
        let chars = V2ParseCharacters::new();
        let field = V2Field::from_str("123 Main St^^Springfield^IL^62704^USA", &chars);
        let components = interpret_field("AD", &field).unwrap();
        assert_eq!(components[0].as_str(), "123 Main St");
        assert_eq!(components[2].as_str(), "Springfield");
    }

    #[test]
    fn passes_through_unknown_composite_type() {
        let chars = V2ParseCharacters::new();
        let field = V2Field::from_str("a^b^c", &chars);
        let components = interpret_field("ZZZ", &field).unwrap();
        assert_eq!(components.len(), 3);
    }
}
