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
/// ER7 (pipe-delimited) HL7 v2 parser. A message is a sequence of segments, each a sequence of
/// fields, each field a sequence of repetitions, each repetition a sequence of components. We
/// only split down to the component level here; sub-components are left as raw text for the
/// caller to split further with the same separators if needed.
///
pub mod v2_parser {
    use ahash::AHashMap;
    use compact_str::format_compact;
    use rumtk_core::core::{clamp_index, RUMResult};
    use rumtk_core::strings::RUMString;
    use serde::{Deserialize, Serialize};

    /// Parse characters carried by a message's own MSH segment (MSH-1/MSH-2).
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct V2ParseCharacters {
        pub field_separator: char,
        pub component_separator: char,
        pub repetition_separator: char,
        pub escape_character: char,
        pub subcomponent_separator: char,
        pub segment_terminator: char,
    }

    impl Default for V2ParseCharacters {
        fn default() -> V2ParseCharacters {
            V2ParseCharacters {
                field_separator: '|',
                component_separator: '^',
                repetition_separator: '~',
                escape_character: '\\',
                subcomponent_separator: '&',
                segment_terminator: '\r',
            }
        }
    }

    impl V2ParseCharacters {
        pub fn new() -> V2ParseCharacters {
            V2ParseCharacters::default()
        }

        ///
        /// Reads MSH-1 (the field separator, the character right after "MSH") and MSH-2 (the
        /// encoding characters, e.g. `^~\&`) off the raw MSH segment text.
        ///
        pub fn from_msh(msh_segment: &str) -> RUMResult<V2ParseCharacters> {
            let trimmed = msh_segment.trim_start();
            if trimmed.len() < 8 || !trimmed.starts_with("MSH") {
                return Err(format_compact!(
                    "Expected segment to begin with MSH but got {}!",
                    msh_segment
                ));
            }
            let chars: Vec<char> = trimmed.chars().collect();
            let field_separator = chars[3];
            let encoding_chars: Vec<char> = chars[4..]
                .iter()
                .take_while(|&&c| c != field_separator)
                .copied()
                .collect();
            if encoding_chars.len() < 4 {
                return Err(format_compact!(
                    "MSH-2 must define at least 4 encoding characters, found {} in {}!",
                    encoding_chars.len(),
                    msh_segment
                ));
            }
            Ok(V2ParseCharacters {
                field_separator,
                component_separator: encoding_chars[0],
                repetition_separator: encoding_chars[1],
                escape_character: encoding_chars[2],
                subcomponent_separator: encoding_chars[3],
                segment_terminator: '\r',
            })
        }
    }

    /// One field's worth of repetitions, each being an ordered list of components.
    #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct V2Field {
        repetitions: Vec<Vec<RUMString>>,
    }

    impl V2Field {
        pub fn from_str(raw: &str, chars: &V2ParseCharacters) -> V2Field {
            let repetitions = raw
                .split(chars.repetition_separator)
                .map(|rep| {
                    rep.split(chars.component_separator)
                        .map(RUMString::from)
                        .collect::<Vec<_>>()
                })
                .collect();
            V2Field { repetitions }
        }

        /// Number of components in the first repetition.
        pub fn len(&self) -> usize {
            self.repetitions.first().map(Vec::len).unwrap_or(0)
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Number of repetitions this field carries.
        pub fn repetition_count(&self) -> usize {
            self.repetitions.len()
        }

        /// Fetch a 1-indexed component out of the first repetition. Negative indices count
        /// from the end, matching the rest of this toolkit's indexing convention.
        pub fn get(&self, index: isize) -> RUMResult<&RUMString> {
            let rep = self
                .repetitions
                .first()
                .ok_or_else(|| format_compact!("Field has no repetitions!"))?;
            let i = clamp_index(&index, &(rep.len() as isize))?;
            rep.get(i - 1)
                .ok_or_else(|| format_compact!("Component index {} out of range!", index))
        }

        /// Fetch a 1-indexed component out of a specific (0-indexed) repetition.
        pub fn get_repetition(&self, repetition: usize, index: isize) -> RUMResult<&RUMString> {
            let rep = self
                .repetitions
                .get(repetition)
                .ok_or_else(|| format_compact!("No repetition #{} in field!", repetition))?;
            let i = clamp_index(&index, &(rep.len() as isize))?;
            rep.get(i - 1)
                .ok_or_else(|| format_compact!("Component index {} out of range!", index))
        }

        pub fn as_str(&self) -> &str {
            self.repetitions
                .first()
                .and_then(|rep| rep.first())
                .map(RUMString::as_str)
                .unwrap_or("")
        }

        /// Every repetition, each an ordered list of raw (still subcomponent-delimited)
        /// component strings.
        pub fn repetitions(&self) -> &[Vec<RUMString>] {
            &self.repetitions
        }

        pub fn to_raw(&self, chars: &V2ParseCharacters) -> RUMString {
            let reps: Vec<String> = self
                .repetitions
                .iter()
                .map(|rep| {
                    rep.iter()
                        .map(RUMString::as_str)
                        .collect::<Vec<_>>()
                        .join(&chars.component_separator.to_string())
                })
                .collect();
            RUMString::from(reps.join(&chars.repetition_separator.to_string()))
        }
    }

    /// A single segment occurrence: its 3-letter code plus its 1-indexed fields.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct V2Segment {
        pub name: RUMString,
        fields: Vec<V2Field>,
    }

    impl V2Segment {
        pub fn from_str(raw: &str, chars: &V2ParseCharacters) -> RUMResult<V2Segment> {
            let raw = raw.trim_end_matches(chars.segment_terminator);
            let mut tokens = raw.splitn(2, chars.field_separator);
            let name = RUMString::from(tokens.next().unwrap_or("").trim());
            if name.is_empty() {
                return Err(format_compact!("Segment has no name: {}", raw));
            }
            let rest = tokens.next().unwrap_or("");
            // MSH is special: the field separator itself is MSH-1, so the first field we split
            // out of `rest` is already MSH-2, not MSH-1.
            let mut fields: Vec<V2Field> = if name.as_str() == "MSH" {
                let mut fields = vec![V2Field::from_str(&chars.field_separator.to_string(), chars)];
                fields.extend(rest.split(chars.field_separator).map(|f| V2Field::from_str(f, chars)));
                fields
            } else {
                rest.split(chars.field_separator)
                    .map(|f| V2Field::from_str(f, chars))
                    .collect()
            };
            if fields.is_empty() {
                fields.push(V2Field::default());
            }
            Ok(V2Segment { name, fields })
        }

        /// Fetch a 1-indexed field.
        pub fn field(&self, index: isize) -> RUMResult<&V2Field> {
            let i = clamp_index(&index, &(self.fields.len() as isize))?;
            self.fields
                .get(i - 1)
                .ok_or_else(|| format_compact!("Field index {} out of range in {}!", index, self.name))
        }

        pub fn field_count(&self) -> usize {
            self.fields.len()
        }

        /// Every field in this segment, 1-indexed position implied by the slice order.
        pub fn fields(&self) -> &[V2Field] {
            &self.fields
        }

        pub fn to_raw(&self, chars: &V2ParseCharacters) -> RUMString {
            let skip = if self.name.as_str() == "MSH" { 1 } else { 0 };
            let rendered: Vec<String> = self.fields[skip..]
                .iter()
                .map(|f| f.to_raw(chars).to_string())
                .collect();
            RUMString::from(format!(
                "{}{}{}",
                self.name,
                chars.field_separator,
                rendered.join(&chars.field_separator.to_string())
            ))
        }
    }

    /// A fully parsed HL7 v2 message: parse characters plus every segment occurrence, grouped
    /// by segment code in the order they appeared on the wire.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct V2Message {
        chars: V2ParseCharacters,
        order: Vec<RUMString>,
        segments: AHashMap<RUMString, Vec<V2Segment>>,
    }

    impl V2Message {
        ///
        /// Normalizes line endings so every segment is terminated by exactly one `\r`,
        /// regardless of whether the wire used `\r`, `\n`, or `\r\n`.
        ///
        pub fn sanitize(raw: &str) -> RUMString {
            let mut out = String::with_capacity(raw.len());
            let mut chars = raw.chars().peekable();
            while let Some(c) = chars.next() {
                match c {
                    '\r' => {
                        if chars.peek() == Some(&'\n') {
                            chars.next();
                        }
                        if !out.ends_with('\r') {
                            out.push('\r');
                        }
                    }
                    '\n' => {
                        if !out.ends_with('\r') {
                            out.push('\r');
                        }
                    }
                    _ => out.push(c),
                }
            }
            RUMString::from(out)
        }

        pub fn tokenize_segments(sanitized: &str) -> Vec<&str> {
            sanitized
                .split('\r')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect()
        }

        pub fn find_msh<'a>(tokens: &[&'a str]) -> RUMResult<&'a str> {
            tokens
                .iter()
                .find(|t| t.trim_start().starts_with("MSH"))
                .copied()
                .ok_or_else(|| format_compact!("No MSH segment found in message!"))
        }

        pub fn extract_segments(
            tokens: &[&str],
            chars: &V2ParseCharacters,
        ) -> RUMResult<(Vec<RUMString>, AHashMap<RUMString, Vec<V2Segment>>)> {
            let mut order = Vec::with_capacity(tokens.len());
            let mut segments: AHashMap<RUMString, Vec<V2Segment>> = AHashMap::with_capacity(tokens.len());
            for token in tokens {
                let segment = V2Segment::from_str(token, chars)?;
                if !order.contains(&segment.name) {
                    order.push(segment.name.clone());
                }
                segments.entry(segment.name.clone()).or_default().push(segment);
            }
            Ok((order, segments))
        }

        pub fn from_str(raw: &str) -> RUMResult<V2Message> {
            let sanitized = V2Message::sanitize(raw);
            let tokens = V2Message::tokenize_segments(sanitized.as_str());
            if tokens.is_empty() {
                return Err(format_compact!("Message has no segments!"));
            }
            let msh = V2Message::find_msh(&tokens)?;
            let chars = V2ParseCharacters::from_msh(msh)?;
            let (order, segments) = V2Message::extract_segments(&tokens, &chars)?;
            Ok(V2Message { chars, order, segments })
        }

        pub fn parse_characters(&self) -> &V2ParseCharacters {
            &self.chars
        }

        pub fn segment_exists(&self, name: &str) -> bool {
            self.segments.contains_key(name)
        }

        /// Fetch the `occurrence`-th (1-indexed) occurrence of segment `name`.
        pub fn get(&self, name: &str, occurrence: usize) -> RUMResult<&V2Segment> {
            let group = self
                .segments
                .get(name)
                .ok_or_else(|| format_compact!("No {} segment in message!", name))?;
            if occurrence == 0 || occurrence > group.len() {
                return Err(format_compact!(
                    "No occurrence #{} of segment {} (found {})!",
                    occurrence,
                    name,
                    group.len()
                ));
            }
            Ok(&group[occurrence - 1])
        }

        pub fn segment_count(&self, name: &str) -> usize {
            self.segments.get(name).map(Vec::len).unwrap_or(0)
        }

        /// Segment codes in the order they first appeared on the wire.
        pub fn segment_order(&self) -> &[RUMString] {
            &self.order
        }

        /// Re-encode the message back into ER7 wire format, segments in original order.
        pub fn to_raw(&self) -> RUMString {
            let mut out = String::new();
            for name in &self.order {
                if let Some(group) = self.segments.get(name) {
                    for segment in group {
                        out.push_str(segment.to_raw(&self.chars).as_str());
                        out.push(self.chars.segment_terminator);
                    }
                }
            }
            RUMString::from(out)
        }

        /// MSH-10, the message control ID used to correlate an ACK with its source message.
        pub fn control_id(&self) -> RUMResult<RUMString> {
            Ok(self.get("MSH", 1)?.field(10)?.as_str().into())
        }

        /// MSH-12, the version ID.
        pub fn version_id(&self) -> RUMResult<RUMString> {
            Ok(self.get("MSH", 1)?.field(12)?.as_str().into())
        }

        /// MSH-9, the message type (e.g. `ADT^A01`).
        pub fn message_type(&self) -> RUMResult<RUMString> {
            Ok(self.get("MSH", 1)?.field(9)?.as_str().into())
        }

        ///
        /// Builds the application-level ACK/NAK for this message: an `MSH`/`MSA` pair
        /// with the sending/receiving application and facility swapped and this
        /// message's control ID echoed back in MSA-2, e.g.
        /// `MSH|^~\&|...||ACK|<controlId>|P|2.3\rMSA|AA|<controlId>\r`. `ack_code` is
        /// the MSA-1 value (`AA`/`AE`/`AR`, or the `CA`/`CE`/`CR` commit-accept
        /// synonyms) and is written verbatim.
        ///
        pub fn generate_ack(&self, ack_code: &str) -> RUMResult<RUMString> {
            let msh = self.get("MSH", 1)?;
            let sending_app = msh.field(3)?.as_str().to_string();
            let sending_facility = msh.field(4)?.as_str().to_string();
            let receiving_app = msh.field(5)?.as_str().to_string();
            let receiving_facility = msh.field(6)?.as_str().to_string();
            let version = self.version_id().unwrap_or_else(|_| RUMString::from("2.3"));
            let control_id = self.control_id()?;
            let c = &self.chars;
            let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S").to_string();
            let ack_control_id = format_compact!("ACK{}", control_id);
            let sep = c.field_separator;
            let msh_line = format!(
                "MSH{sep}{c2}{r}{e}{s}{sep}{ra}{sep}{rf}{sep}{sa}{sep}{sf}{sep}{ts}{sep}{sep}ACK{sep}{cid}{sep}P{sep}{ver}",
                sep = sep,
                c2 = c.component_separator,
                r = c.repetition_separator,
                e = c.escape_character,
                s = c.subcomponent_separator,
                ra = receiving_app,
                rf = receiving_facility,
                sa = sending_app,
                sf = sending_facility,
                ts = timestamp,
                cid = ack_control_id,
                ver = version,
            );
            let msa_line = format!("MSA{sep}{code}{sep}{cid}", sep = sep, code = ack_code, cid = control_id);
            Ok(RUMString::from(format!(
                "{msh}{term}{msa}{term}",
                msh = msh_line,
                msa = msa_line,
                term = c.segment_terminator
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::v2_parser::{V2Field, V2Message, V2ParseCharacters};

    const SAMPLE: &str = "MSH|^~\\&|ADT1|GOOD HEALTH HOSPITAL|GHH LAB|GOOD HEALTH HOSPITAL|198808181126||ADT^A01|MSG00001|P|2.8\r\
        EVN|A01|200708181123\r\
        PID|1||PATID1234^5^M11||EVERYMAN^ADAM^A||19610615|M\r\
        PV1|1|I|2000^2012^01";

    #[test]
    fn parses_encoding_characters_from_msh() {
        let chars = V2ParseCharacters::from_msh("MSH|^~\\&|A|B").unwrap();
        assert_eq!(chars.field_separator, '|');
        assert_eq!(chars.component_separator, '^');
        assert_eq!(chars.repetition_separator, '~');
        assert_eq!(chars.escape_character, '\\');
        assert_eq!(chars.subcomponent_separator, '&');
    }

    #[test]
    fn parses_field_components() {
        let chars = V2ParseCharacters::new();
        let field = V2Field::from_str("2000^2012^01", &chars);
        assert_eq!(field.len(), 3);
        assert_eq!(field.get(1).unwrap().as_str(), "2000");
        assert_eq!(field.get(3).unwrap().as_str(), "01");
        assert_eq!(field.get(-1).unwrap().as_str(), "01");
    }

    #[test]
    fn sanitizes_mixed_line_endings() {
        let raw = "MSH|a\r\nPID|b\rPV1|c\n";
        let sanitized = V2Message::sanitize(raw);
        assert!(!sanitized.contains('\n'));
        assert_eq!(sanitized.matches('\r').count(), 3);
    }

    #[test]
    fn parses_message_and_finds_segments() {
        let message = V2Message::from_str(SAMPLE).unwrap();
        assert!(message.segment_exists("MSH"));
        assert!(message.segment_exists("PID"));
        assert!(message.segment_exists("PV1"));
        assert_eq!(message.message_type().unwrap().as_str(), "ADT^A01");
        assert_eq!(message.control_id().unwrap().as_str(), "MSG00001");
    }

    #[test]
    fn round_trips_to_raw() {
        let message = V2Message::from_str(SAMPLE).unwrap();
        let raw = message.to_raw();
        let reparsed = V2Message::from_str(raw.as_str()).unwrap();
        assert_eq!(
            message.control_id().unwrap(),
            reparsed.control_id().unwrap()
        );
        assert_eq!(
            message.message_type().unwrap(),
            reparsed.message_type().unwrap()
        );
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(V2Message::from_str("not an hl7 message").is_err());
    }

    #[test]
    fn rejects_missing_msh() {
        assert!(V2Message::from_str("PID|1||PATID1234\r").is_err());
    }

    #[test]
    fn generates_ack_with_swapped_endpoints_and_echoed_control_id() {
        let message = V2Message::from_str(SAMPLE).unwrap();
        let ack = V2Message::from_str(message.generate_ack("AA").unwrap().as_str()).unwrap();
        assert_eq!(ack.message_type().unwrap().as_str(), "ACK");
        assert_eq!(ack.get("MSA", 1).unwrap().field(1).unwrap().as_str(), "AA");
        assert_eq!(ack.get("MSA", 1).unwrap().field(2).unwrap().as_str(), "MSG00001");
        let ack_msh = ack.get("MSH", 1).unwrap();
        assert_eq!(ack_msh.field(3).unwrap().as_str(), "GHH LAB");
        assert_eq!(ack_msh.field(5).unwrap().as_str(), "ADT1");
    }

    #[test]
    fn generates_nak_with_requested_ack_code() {
        let message = V2Message::from_str(SAMPLE).unwrap();
        let ack = V2Message::from_str(message.generate_ack("AE").unwrap().as_str()).unwrap();
        assert_eq!(ack.get("MSA", 1).unwrap().field(1).unwrap().as_str(), "AE");
    }
}
