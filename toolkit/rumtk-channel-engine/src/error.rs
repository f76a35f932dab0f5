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

use rumtk_core::strings::RUMString;
use std::fmt;

/// Every error kind the engine's error handling design names, kept as a closed enum so
/// call sites that need to dispatch on retryability (§7) can match directly, while call
/// sites that just need to bail with `?` get a `RUMString` conversion below.
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Malformed payload; carries the offset where parsing failed when known.
    Serialization(RUMString),
    Filter(RUMString),
    Transformer(RUMString),
    /// Transport failure that may succeed on retry.
    TransportSendTransient(RUMString),
    /// Transport failure that will not succeed on retry (e.g. destination refused
    /// the connection outright, or rejected the payload as invalid).
    TransportSendPermanent(RUMString),
    Datastore(RUMString),
    /// Detected at deploy time; the channel never reaches `STARTED`.
    Configuration(RUMString),
    /// Captured as content on the message; never changes connector status.
    Postprocessor(RUMString),
}

impl EngineError {
    pub fn message(&self) -> &RUMString {
        match self {
            EngineError::Serialization(m)
            | EngineError::Filter(m)
            | EngineError::Transformer(m)
            | EngineError::TransportSendTransient(m)
            | EngineError::TransportSendPermanent(m)
            | EngineError::Datastore(m)
            | EngineError::Configuration(m)
            | EngineError::Postprocessor(m) => m,
        }
    }

    /// Whether this error, if surfaced from a destination send, should be retried via
    /// the queue rather than taken straight to `ERROR`.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::TransportSendTransient(_))
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            EngineError::Serialization(_) => "SerializationError",
            EngineError::Filter(_) => "FilterError",
            EngineError::Transformer(_) => "TransformerError",
            EngineError::TransportSendTransient(_) => "TransportSendError(transient)",
            EngineError::TransportSendPermanent(_) => "TransportSendError(permanent)",
            EngineError::Datastore(_) => "DatastoreError",
            EngineError::Configuration(_) => "ConfigurationError",
            EngineError::Postprocessor(_) => "PostprocessorError",
        };
        write!(f, "{}: {}", kind, self.message())
    }
}

impl std::error::Error for EngineError {}

impl From<EngineError> for RUMString {
    fn from(err: EngineError) -> RUMString {
        RUMString::from(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_transport_errors_are_retryable() {
        let err = EngineError::TransportSendTransient(RUMString::from("connection reset"));
        assert!(err.is_retryable());
    }

    #[test]
    fn permanent_transport_errors_are_not_retryable() {
        let err = EngineError::TransportSendPermanent(RUMString::from("malformed payload rejected"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn converts_to_rumstring_for_question_mark_call_sites() {
        let err = EngineError::Configuration(RUMString::from("missing listener port"));
        let msg: RUMString = err.into();
        assert!(msg.contains("ConfigurationError"));
    }
}
