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

use crate::status::Status;
use ahash::AHashMap;
use compact_str::format_compact;
use rumtk_core::core::RUMResult;
use rumtk_core::strings::RUMString;
use rumtk_serializers::DataType;
use serde::{Deserialize, Serialize};

/// The `metaDataId` reserved for the source connector; every destination gets a
/// nonzero id unique within its Channel.
pub const SOURCE_METADATA_ID: u32 = 0;

/// Closed set of content an engine may attach to a `ConnectorMessage` (spec §3). Each
/// variant is written at most once per `ConnectorMessage` — see
/// [ConnectorMessage::put_content]'s append-only enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Raw,
    ProcessedRaw,
    Transformed,
    Encoded,
    Sent,
    Response,
    ProcessedResponse,
    ResponseTransformed,
    SourceMap,
    ChannelMap,
    ConnectorMap,
    ResponseMap,
    ProcessingError,
    ResponseError,
    PostprocessorError,
}

/// `(contentType, content, dataType, encrypted)` from spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContent {
    pub content_type: ContentType,
    pub content: RUMString,
    pub data_type: DataType,
    pub encrypted: bool,
}

impl MessageContent {
    pub fn new(content_type: ContentType, content: RUMString, data_type: DataType) -> MessageContent {
        MessageContent {
            content_type,
            content,
            data_type,
            encrypted: false,
        }
    }
}

/// Ephemeral key/value context carried alongside a `ConnectorMessage`: `sourceMap` is
/// set by the source and read-only afterward, `channelMap` is shared by every connector
/// of one `Message`, `connectorMap` is private to one `ConnectorMessage`.
pub type VariableMap = AHashMap<RUMString, RUMString>;

/// One `Message` as it passes through one connector (spec §3). `metaDataId = 0` is
/// always the source; every destination's connector message carries a distinct nonzero
/// id assigned by the owning Channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorMessage {
    pub meta_data_id: u32,
    pub message_id: u64,
    pub channel_id: RUMString,
    pub connector_name: RUMString,
    pub server_id: RUMString,
    pub status: Status,
    pub send_attempts: u32,
    pub send_date: Option<i64>,
    pub response_date: Option<i64>,
    pub error_code: i32,
    pub processing_error: Option<RUMString>,
    pub response_error: Option<RUMString>,
    content: AHashMap<ContentType, MessageContent>,
    pub source_map: VariableMap,
    pub channel_map: VariableMap,
    pub connector_map: VariableMap,
}

impl ConnectorMessage {
    pub fn new(
        meta_data_id: u32,
        message_id: u64,
        channel_id: RUMString,
        connector_name: RUMString,
        server_id: RUMString,
    ) -> ConnectorMessage {
        ConnectorMessage {
            meta_data_id,
            message_id,
            channel_id,
            connector_name,
            server_id,
            status: Status::Received,
            send_attempts: 0,
            send_date: None,
            response_date: None,
            error_code: 0,
            processing_error: None,
            response_error: None,
            content: AHashMap::default(),
            source_map: VariableMap::default(),
            channel_map: VariableMap::default(),
            connector_map: VariableMap::default(),
        }
    }

    ///
    /// Content entries are append-only per connector message (spec §3 invariant): once a
    /// given `contentType` is written, a second write for the same type is rejected
    /// rather than silently overwriting history a downstream filter/transformer may
    /// have already observed.
    ///
    pub fn put_content(&mut self, content: MessageContent) -> RUMResult<()> {
        if self.content.contains_key(&content.content_type) {
            return Err(format_compact!(
                "Content type {:?} already set on connector message {} of message {}!",
                content.content_type,
                self.meta_data_id,
                self.message_id
            ));
        }
        self.content.insert(content.content_type, content);
        Ok(())
    }

    pub fn get_content(&self, content_type: ContentType) -> Option<&MessageContent> {
        self.content.get(&content_type)
    }

    pub fn has_content(&self, content_type: ContentType) -> bool {
        self.content.contains_key(&content_type)
    }

    ///
    /// Moves `self.status` through [Status::validate_transition], recording the new
    /// state only if the transition is legal.
    ///
    pub fn transition(&mut self, to: Status) -> RUMResult<()> {
        self.status = self.status.validate_transition(to)?;
        Ok(())
    }
}

/// One end-to-end unit (spec §3): one entry with `metaDataId = 0` (the source) plus one
/// per active destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: u64,
    pub channel_id: RUMString,
    pub server_id: RUMString,
    pub received_date: i64,
    pub processed: bool,
    pub attributes: VariableMap,
    connectors: AHashMap<u32, ConnectorMessage>,
}

impl Message {
    pub fn new(message_id: u64, channel_id: RUMString, server_id: RUMString, received_date: i64) -> Message {
        Message {
            message_id,
            channel_id,
            server_id,
            received_date,
            processed: false,
            attributes: VariableMap::default(),
            connectors: AHashMap::default(),
        }
    }

    pub fn put_connector_message(&mut self, cm: ConnectorMessage) {
        self.connectors.insert(cm.meta_data_id, cm);
    }

    pub fn connector_message(&self, meta_data_id: u32) -> Option<&ConnectorMessage> {
        self.connectors.get(&meta_data_id)
    }

    pub fn connector_message_mut(&mut self, meta_data_id: u32) -> Option<&mut ConnectorMessage> {
        self.connectors.get_mut(&meta_data_id)
    }

    pub fn source_message(&self) -> Option<&ConnectorMessage> {
        self.connectors.get(&SOURCE_METADATA_ID)
    }

    pub fn destination_ids(&self) -> Vec<u32> {
        self.connectors
            .keys()
            .copied()
            .filter(|id| *id != SOURCE_METADATA_ID)
            .collect()
    }

    /// A Message is done once every connector it owns has reached a terminal status
    /// (spec §3: "closed when postprocessor completes", which in practice means every
    /// connector has nothing left to do).
    pub fn all_terminal(&self) -> bool {
        self.connectors.values().all(|cm| cm.status.is_terminal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_connector_message() -> ConnectorMessage {
        ConnectorMessage::new(0, 1, RUMString::from("chan"), RUMString::from("Source"), RUMString::from("srv-1"))
    }

    #[test]
    fn rejects_rewriting_an_existing_content_type() {
        let mut cm = sample_connector_message();
        cm.put_content(MessageContent::new(ContentType::Raw, RUMString::from("MSH|..."), DataType::HL7V2))
            .unwrap();
        let result = cm.put_content(MessageContent::new(ContentType::Raw, RUMString::from("other"), DataType::HL7V2));
        assert!(result.is_err());
    }

    #[test]
    fn message_requires_source_and_destination_entries() {
        let mut message = Message::new(1, RUMString::from("chan"), RUMString::from("srv-1"), 0);
        message.put_connector_message(sample_connector_message());
        message.put_connector_message(ConnectorMessage::new(1, 1, RUMString::from("chan"), RUMString::from("Dest1"), RUMString::from("srv-1")));
        assert!(message.source_message().is_some());
        assert_eq!(message.destination_ids(), vec![1]);
    }

    #[test]
    fn all_terminal_is_false_until_every_connector_reaches_a_terminal_status() {
        let mut message = Message::new(1, RUMString::from("chan"), RUMString::from("srv-1"), 0);
        let mut source = sample_connector_message();
        source.transition(Status::Filtered).unwrap();
        message.put_connector_message(source);
        let mut dest = ConnectorMessage::new(1, 1, RUMString::from("chan"), RUMString::from("Dest1"), RUMString::from("srv-1"));
        message.put_connector_message(dest.clone());
        assert!(!message.all_terminal());
        dest.transition(Status::Transformed).unwrap();
        dest.transition(Status::Pending).unwrap();
        dest.transition(Status::Sent).unwrap();
        message.put_connector_message(dest);
        assert!(message.all_terminal());
    }
}
