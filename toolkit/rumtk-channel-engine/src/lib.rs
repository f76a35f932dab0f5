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

//! The Donkey-style channel engine: a message arrives at a source connector, runs
//! through a preprocessor and source filter/transformer, fans out across one or more
//! destination chains, and comes back through a response aggregator and postprocessor.
//! Every state transition is append-only and persisted through the [datastore]
//! interface; every observable occurrence goes through [events].

pub mod aggregator;
pub mod chain;
pub mod channel;
pub mod datastore;
pub mod error;
pub mod events;
pub mod message;
pub mod queue;
pub mod source;
pub mod status;

pub use error::EngineError;
pub use message::{ConnectorMessage, ContentType, Message, MessageContent};
pub use status::Status;

use datastore::Datastore;
use events::{ChannelCounters, EventDispatcher};
use std::sync::Arc;

///
/// Cross-cutting handles threaded into every source connector and destination: event
/// dispatch and counters (C8 Statistics & Events) and the datastore persistence port
/// (C9). Bundled together because every call site that needs one needs all three, and
/// every instance of one channel shares the same bundle.
///
#[derive(Clone)]
pub struct EngineServices {
    pub events: Arc<dyn EventDispatcher>,
    pub counters: Arc<ChannelCounters>,
    pub datastore: Arc<dyn Datastore>,
}

impl EngineServices {
    pub fn new(events: Arc<dyn EventDispatcher>, datastore: Arc<dyn Datastore>) -> EngineServices {
        EngineServices { events, counters: Arc::new(ChannelCounters::new()), datastore }
    }
}
