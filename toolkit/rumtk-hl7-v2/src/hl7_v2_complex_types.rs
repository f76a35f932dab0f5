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

pub mod hl7_v2_complex_types {
    use crate::hl7_v2_base_types::v2_base_types::{V2PrimitiveType, V2String};
    use crate::hl7_v2_field_descriptors::v2_field_descriptor::V2ComponentTypeDescriptor;
    use rumtk_core::core::RUMResult;
    use compact_str::format_compact;

    /// Interface for ensuring we get a vector of strings instead of components.
    /// This ensures we keep this module independent of the parser module.
    pub trait V2FieldToString {
        fn to_component_list(&self) -> Vec<V2String>;
    }

    ///
    /// Validates a raw component string against its descriptor's required/optional flag and
    /// casts it into the requested primitive, which only the `V2STRING` data type currently
    /// supports (the richer primitive casts live alongside the serializer framework, which
    /// consumes this same descriptor table).
    ///
    pub fn validate_and_cast_component(
        component: &str,
        component_type: &V2ComponentTypeDescriptor,
    ) -> RUMResult<V2String> {
        if component_type.required && component.is_empty() {
            return Err(format_compact!(
                "Component \"{}\" is required but was empty!",
                component_type.name
            ));
        }
        match component_type.data_type {
            V2PrimitiveType::V2STRING => Ok(V2String::from(component)),
            _ => Ok(V2String::from(component)),
        }
    }
}
