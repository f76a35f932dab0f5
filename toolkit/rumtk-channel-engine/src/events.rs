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
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info, warn};

/// One observable occurrence in a channel's lifetime (spec §6: `MESSAGE_RECEIVED`,
/// `QUEUED`, `SENT`, `ERROR`, connector lifecycle).
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    MessageReceived { channel_id: RUMString, message_id: u64 },
    Queued { channel_id: RUMString, message_id: u64, destination: RUMString },
    Sent { channel_id: RUMString, message_id: u64, destination: RUMString },
    Error { channel_id: RUMString, message_id: u64, destination: Option<RUMString>, detail: RUMString },
    ChannelStarted { channel_id: RUMString },
    ChannelStopped { channel_id: RUMString },
}

/// Cumulative per-channel counters (spec §6:
/// `received/filtered/transformed/pending/sent/error`, `queueDepth`).
#[derive(Debug, Default)]
pub struct ChannelCounters {
    pub received: AtomicU64,
    pub filtered: AtomicU64,
    pub transformed: AtomicU64,
    pub pending: AtomicU64,
    pub sent: AtomicU64,
    pub error: AtomicU64,
    pub queue_depth: AtomicU64,
}

impl ChannelCounters {
    pub fn new() -> ChannelCounters {
        ChannelCounters::default()
    }

    pub fn snapshot(&self) -> ChannelCounterSnapshot {
        ChannelCounterSnapshot {
            received: self.received.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            transformed: self.transformed.load(Ordering::Relaxed),
            pending: self.pending.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            error: self.error.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
        }
    }

    /// Applies a signed delta to one named counter, the shape spec §6 describes
    /// ("counter deltas"). Unknown names are ignored rather than panicking, since a
    /// dispatcher outlives whatever set of counters a particular build knows about.
    pub fn apply_delta(&self, name: &str, delta: i64) {
        let counter = match name {
            "received" => &self.received,
            "filtered" => &self.filtered,
            "transformed" => &self.transformed,
            "pending" => &self.pending,
            "sent" => &self.sent,
            "error" => &self.error,
            "queueDepth" => &self.queue_depth,
            _ => return,
        };
        if delta >= 0 {
            counter.fetch_add(delta as u64, Ordering::Relaxed);
        } else {
            counter.fetch_sub((-delta) as u64, Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCounterSnapshot {
    pub received: u64,
    pub filtered: u64,
    pub transformed: u64,
    pub pending: u64,
    pub sent: u64,
    pub error: u64,
    pub queue_depth: u64,
}

/// C8 Statistics & Events (spec §6): the observability seam every other component
/// reports through. Implementations must not block the caller for long — dispatch is
/// called from hot paths (filter/transform/send).
pub trait EventDispatcher: Send + Sync {
    fn dispatch(&self, event: ChannelEvent);
}

/// Default dispatcher: forwards every event to `tracing`, grounded on the
/// per-message `tracing::info!` calls other Mirth-style engines in the pack use.
/// Embedders that need counters/metrics wire their own `EventDispatcher` instead.
pub struct TracingEventDispatcher;

impl EventDispatcher for TracingEventDispatcher {
    fn dispatch(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::MessageReceived { channel_id, message_id } => {
                info!(channel = %channel_id, message_id, "message received");
            }
            ChannelEvent::Queued { channel_id, message_id, destination } => {
                info!(channel = %channel_id, message_id, destination = %destination, "message queued");
            }
            ChannelEvent::Sent { channel_id, message_id, destination } => {
                info!(channel = %channel_id, message_id, destination = %destination, "message sent");
            }
            ChannelEvent::Error { channel_id, message_id, destination, detail } => {
                warn!(channel = %channel_id, message_id, destination = ?destination, detail = %detail, "connector error");
            }
            ChannelEvent::ChannelStarted { channel_id } => {
                info!(channel = %channel_id, "channel started");
            }
            ChannelEvent::ChannelStopped { channel_id } => {
                error!(channel = %channel_id, "channel stopped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_apply_positive_and_negative_deltas() {
        let counters = ChannelCounters::new();
        counters.apply_delta("received", 3);
        counters.apply_delta("queueDepth", 5);
        counters.apply_delta("queueDepth", -2);
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.received, 3);
        assert_eq!(snapshot.queue_depth, 3);
    }

    #[test]
    fn unknown_counter_name_is_ignored_not_panicking() {
        let counters = ChannelCounters::new();
        counters.apply_delta("not_a_real_counter", 10);
        assert_eq!(counters.snapshot().received, 0);
    }

    #[test]
    fn tracing_dispatcher_accepts_every_event_variant_without_panicking() {
        let dispatcher = TracingEventDispatcher;
        dispatcher.dispatch(ChannelEvent::MessageReceived { channel_id: RUMString::from("chan"), message_id: 1 });
        dispatcher.dispatch(ChannelEvent::Error {
            channel_id: RUMString::from("chan"),
            message_id: 1,
            destination: None,
            detail: RUMString::from("boom"),
        });
    }
}
