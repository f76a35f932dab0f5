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

use crate::error::EngineError;
use crate::message::{ConnectorMessage, Message};
use rumtk_core::cache::RUMCache;
use rumtk_core::strings::RUMString;
use std::sync::Mutex;

///
/// C9 Datastore Interface (spec §6): the persistence port every state transition
/// writes through. Every operation is synchronous and expected to be fast — callers on
/// the hot path (chain dispatch, queue workers) are not expected to tolerate a slow
/// datastore any more gracefully than spec §7's `DatastoreError` handling allows
/// ("fatal to current op; worker logs, does not change state, backs off before
/// retry").
///
pub trait Datastore: Send + Sync {
    fn save_message(&self, message: &Message) -> Result<(), EngineError>;
    fn load_message(&self, channel_id: &str, message_id: u64) -> Result<Option<Message>, EngineError>;
    fn save_connector_message(&self, cm: &ConnectorMessage) -> Result<(), EngineError>;
    fn load_connector_messages(&self, channel_id: &str, meta_data_id: u32, limit: usize) -> Result<Vec<ConnectorMessage>, EngineError>;
    fn delete_message(&self, channel_id: &str, message_id: u64) -> Result<(), EngineError>;
}

#[derive(Hash, PartialEq, Eq, Clone)]
struct MessageKey {
    channel_id: RUMString,
    message_id: u64,
}

#[derive(Hash, PartialEq, Eq, Clone)]
struct ConnectorKey {
    channel_id: RUMString,
    meta_data_id: u32,
    message_id: u64,
}

///
/// Reference `Datastore` implementation grounded on `rumtk_core::cache::RUMCache`
/// (an `ahash`-backed map), guarded by a plain `std::sync::Mutex` consistent with the
/// teacher's preference for `Arc<Mutex<_>>`-guarded shared state over actor channels.
/// Suitable for tests and single-process deployments; a durable backend is a drop-in
/// replacement for this trait.
///
pub struct InMemoryDatastore {
    messages: Mutex<RUMCache<MessageKey, Message>>,
    connector_messages: Mutex<RUMCache<ConnectorKey, ConnectorMessage>>,
}

impl InMemoryDatastore {
    pub fn new() -> InMemoryDatastore {
        InMemoryDatastore {
            messages: Mutex::new(RUMCache::default()),
            connector_messages: Mutex::new(RUMCache::default()),
        }
    }
}

impl Default for InMemoryDatastore {
    fn default() -> InMemoryDatastore {
        InMemoryDatastore::new()
    }
}

impl Datastore for InMemoryDatastore {
    fn save_message(&self, message: &Message) -> Result<(), EngineError> {
        let key = MessageKey { channel_id: message.channel_id.clone(), message_id: message.message_id };
        self.messages
            .lock()
            .map_err(|_| EngineError::Datastore(RUMString::from("message store lock poisoned")))?
            .insert(key, message.clone());
        Ok(())
    }

    fn load_message(&self, channel_id: &str, message_id: u64) -> Result<Option<Message>, EngineError> {
        let key = MessageKey { channel_id: RUMString::from(channel_id), message_id };
        let guard = self
            .messages
            .lock()
            .map_err(|_| EngineError::Datastore(RUMString::from("message store lock poisoned")))?;
        Ok(guard.get(&key).cloned())
    }

    fn save_connector_message(&self, cm: &ConnectorMessage) -> Result<(), EngineError> {
        let key = ConnectorKey {
            channel_id: cm.channel_id.clone(),
            meta_data_id: cm.meta_data_id,
            message_id: cm.message_id,
        };
        self.connector_messages
            .lock()
            .map_err(|_| EngineError::Datastore(RUMString::from("connector store lock poisoned")))?
            .insert(key, cm.clone());
        Ok(())
    }

    fn load_connector_messages(&self, channel_id: &str, meta_data_id: u32, limit: usize) -> Result<Vec<ConnectorMessage>, EngineError> {
        let guard = self
            .connector_messages
            .lock()
            .map_err(|_| EngineError::Datastore(RUMString::from("connector store lock poisoned")))?;
        Ok(guard
            .iter()
            .filter(|(k, _)| k.channel_id.as_str() == channel_id && k.meta_data_id == meta_data_id)
            .take(limit)
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn delete_message(&self, channel_id: &str, message_id: u64) -> Result<(), EngineError> {
        let key = MessageKey { channel_id: RUMString::from(channel_id), message_id };
        self.messages
            .lock()
            .map_err(|_| EngineError::Datastore(RUMString::from("message store lock poisoned")))?
            .remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> Message {
        Message::new(1, RUMString::from("chan"), RUMString::from("srv-1"), 0)
    }

    #[test]
    fn save_then_load_round_trips_a_message() {
        let store = InMemoryDatastore::new();
        store.save_message(&sample_message()).unwrap();
        let loaded = store.load_message("chan", 1).unwrap();
        assert!(loaded.is_some());
    }

    #[test]
    fn load_missing_message_returns_none_not_an_error() {
        let store = InMemoryDatastore::new();
        assert!(store.load_message("chan", 999).unwrap().is_none());
    }

    #[test]
    fn delete_removes_a_saved_message() {
        let store = InMemoryDatastore::new();
        store.save_message(&sample_message()).unwrap();
        store.delete_message("chan", 1).unwrap();
        assert!(store.load_message("chan", 1).unwrap().is_none());
    }

    #[test]
    fn connector_messages_filter_by_channel_and_meta_data_id() {
        let store = InMemoryDatastore::new();
        let cm1 = ConnectorMessage::new(1, 1, RUMString::from("chan"), RUMString::from("Dest1"), RUMString::from("srv-1"));
        let cm2 = ConnectorMessage::new(2, 1, RUMString::from("chan"), RUMString::from("Dest2"), RUMString::from("srv-1"));
        store.save_connector_message(&cm1).unwrap();
        store.save_connector_message(&cm2).unwrap();
        let loaded = store.load_connector_messages("chan", 1, 10).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].meta_data_id, 1);
    }
}
