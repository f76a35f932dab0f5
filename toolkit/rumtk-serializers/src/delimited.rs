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
use quick_xml::escape::escape;
use rumtk_core::core::RUMResult;
use rumtk_core::strings::RUMString;

///
/// Generic delimited text (CSV/TSV/pipe-separated, with an optional quote character
/// that escapes embedded delimiters and newlines). Unlike [crate::x12::X12Serializer]
/// or [crate::ncpdp::NcpdpSerializer], the delimiters here are configuration rather than
/// something inferred from the payload, so the serializer is parameterized by a
/// [DelimitedConfig] instead of exposing a single `static`.
///
#[derive(Debug, Clone, Copy)]
pub struct DelimitedConfig {
    pub column_delimiter: char,
    pub record_delimiter: char,
    pub quote_char: Option<char>,
}

impl Default for DelimitedConfig {
    fn default() -> Self {
        DelimitedConfig {
            column_delimiter: ',',
            record_delimiter: '\n',
            quote_char: Some('"'),
        }
    }
}

pub struct DelimitedSerializer {
    pub config: DelimitedConfig,
}

impl DelimitedSerializer {
    pub fn new(config: DelimitedConfig) -> DelimitedSerializer {
        DelimitedSerializer { config }
    }

    fn split_record(&self, record: &str) -> Vec<RUMString> {
        match self.config.quote_char {
            None => record
                .split(self.config.column_delimiter)
                .map(RUMString::from)
                .collect(),
            Some(quote) => {
                let mut fields = Vec::new();
                let mut current = String::new();
                let mut in_quotes = false;
                let mut chars = record.chars().peekable();
                while let Some(c) = chars.next() {
                    if c == quote {
                        if in_quotes && chars.peek() == Some(&quote) {
                            current.push(quote);
                            chars.next();
                        } else {
                            in_quotes = !in_quotes;
                        }
                    } else if c == self.config.column_delimiter && !in_quotes {
                        fields.push(RUMString::from(current.clone()));
                        current.clear();
                    } else {
                        current.push(c);
                    }
                }
                fields.push(RUMString::from(current));
                fields
            }
        }
    }
}

impl DataTypeSerializer for DelimitedSerializer {
    fn to_canonical_xml(&self, raw: &[u8]) -> RUMResult<Option<RUMString>> {
        let text = std::str::from_utf8(raw).map_err(|e| format_compact!("Delimited payload is not valid UTF-8: {}", e))?;
        let mut out = String::from("<DelimitedMessage>");
        for record in text.split(self.config.record_delimiter) {
            if record.is_empty() {
                continue;
            }
            out.push_str("<Row>");
            for (idx, field) in self.split_record(record).iter().enumerate() {
                out.push_str(&format!("<Col{}>{}</Col{}>", idx, escape(field.as_str()), idx));
            }
            out.push_str("</Row>");
        }
        out.push_str("</DelimitedMessage>");
        Ok(Some(RUMString::from(out)))
    }

    fn from_canonical_xml(&self, _xml: &str) -> RUMResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn is_serialization_required(&self, _to_xml: bool) -> bool {
        true
    }

    fn transform_without_serializing(&self, _raw: &[u8]) -> RUMResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn populate_metadata(&self, _raw: &[u8], map: &mut MetadataMap) -> RUMResult<()> {
        map.insert(RUMString::from(KEY_TYPE), RUMString::from("DELIMITED"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_quoted_csv_fields() {
        let serializer = DelimitedSerializer::new(DelimitedConfig::default());
        let fields = serializer.split_record(r#"a,"b,c",d"#);
        assert_eq!(fields, vec![RUMString::from("a"), RUMString::from("b,c"), RUMString::from("d")]);
    }

    #[test]
    fn converts_rows_to_xml() {
        let serializer = DelimitedSerializer::new(DelimitedConfig::default());
        let xml = serializer.to_canonical_xml(b"a,b,c\n1,2,3\n").unwrap().unwrap();
        assert!(xml.contains("<Row>"));
        assert!(xml.contains("<Col0>a</Col0>"));
    }

    #[test]
    fn honors_custom_delimiters_without_quoting() {
        let serializer = DelimitedSerializer::new(DelimitedConfig {
            column_delimiter: '|',
            record_delimiter: ';',
            quote_char: None,
        });
        let fields = serializer.split_record("a|b|c");
        assert_eq!(fields.len(), 3);
    }
}
