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
use crate::events::ChannelEvent;
use crate::message::{ConnectorMessage, ContentType, MessageContent};
use crate::queue::{ConnectorMessageQueue, QueuePolicy};
use crate::status::Status;
use crate::EngineServices;
use async_trait::async_trait;
use rumtk_core::strings::RUMString;
use rumtk_serializers::DataType;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// A filter inspects (but does not mutate) a `ConnectorMessage`'s content and decides
/// whether it continues down the chain.
pub trait Filter: Send + Sync {
    fn evaluate(&self, cm: &ConnectorMessage) -> Result<bool, EngineError>;
}

/// A transformer may rewrite a `ConnectorMessage`'s content, producing the `ENCODED`
/// entry the dispatch stage sends.
pub trait Transformer: Send + Sync {
    fn transform(&self, cm: &mut ConnectorMessage) -> Result<(), EngineError>;
}

/// One destination's transport binding. `send` is the only operation the chain needs;
/// everything else (listener setup, credentials, retries below the transport layer)
/// is the implementor's concern.
#[async_trait]
pub trait DestinationSender: Send + Sync {
    async fn send(&self, payload: &[u8]) -> Result<Vec<u8>, EngineError>;
}

/// One destination within a [DestinationChain] (spec §4.4).
pub struct Destination {
    pub meta_data_id: u32,
    pub name: RUMString,
    pub data_type: DataType,
    pub queue_enabled: bool,
    pub queue_send_first: bool,
    pub filter: Option<Box<dyn Filter>>,
    pub transformer: Option<Box<dyn Transformer>>,
    pub sender: Arc<dyn DestinationSender>,
    pub queue: ConnectorMessageQueue,
    /// Cap on queue-worker retries of a transient send failure (spec §4.4
    /// `retryCount`). `None` retries indefinitely, matching the queue's own
    /// `release(finished=false)` contract.
    pub retry_count: Option<u32>,
    /// Delay between a retryable failure and the next `drain_once` attempt for the
    /// same `ConnectorMessage` (spec §4.4 `retryIntervalMillis`).
    pub retry_interval: Duration,
    pub services: EngineServices,
}

impl Destination {
    pub fn new(
        meta_data_id: u32,
        name: RUMString,
        data_type: DataType,
        queue_enabled: bool,
        queue_send_first: bool,
        sender: Arc<dyn DestinationSender>,
        queue_policy: QueuePolicy,
        services: EngineServices,
    ) -> Destination {
        Destination {
            meta_data_id,
            name,
            data_type,
            queue_enabled,
            queue_send_first,
            filter: None,
            transformer: None,
            sender,
            queue: ConnectorMessageQueue::new(queue_policy),
            retry_count: None,
            retry_interval: Duration::from_millis(10_000),
            services,
        }
    }

    /// Sets `retryCount`/`retryIntervalMillis` (spec §4.4). Builder-style since most
    /// destinations are happy with the unlimited-retry default.
    pub fn with_retry_policy(mut self, retry_count: Option<u32>, retry_interval: Duration) -> Destination {
        self.retry_count = retry_count;
        self.retry_interval = retry_interval;
        self
    }

    async fn attempt_send(&self, cm: &mut ConnectorMessage) -> Result<(), EngineError> {
        let encoded = cm
            .get_content(ContentType::Encoded)
            .map(|c| c.content.clone())
            .unwrap_or_default();
        cm.transition(Status::Pending).map_err(EngineError::Serialization)?;
        cm.send_attempts += 1;
        self.services.datastore.save_connector_message(cm).ok();
        match self.sender.send(encoded.as_bytes()).await {
            Ok(response) => {
                let response_text = RUMString::from(String::from_utf8_lossy(&response).into_owned());
                cm.put_content(MessageContent::new(ContentType::Response, response_text, self.data_type))
                    .ok();
                cm.transition(Status::Sent).map_err(EngineError::Serialization)?;
                self.services.counters.apply_delta("sent", 1);
                self.services.events.dispatch(ChannelEvent::Sent {
                    channel_id: cm.channel_id.clone(),
                    message_id: cm.message_id,
                    destination: self.name.clone(),
                });
                self.services.datastore.save_connector_message(cm).ok();
                info!(destination = %self.name, message_id = cm.message_id, "destination send succeeded");
                Ok(())
            }
            Err(err) => {
                cm.response_error = Some(err.message().clone());
                Err(err)
            }
        }
    }

    /// Transitions `cm` to `ERROR`, recording the counter/event/persistence side
    /// effects every such transition owes (spec §6/§2). Centralized here since a send
    /// can land in `ERROR` from three different call sites (direct send, queue
    /// fallback exhausted, filter/transformer exception).
    fn mark_error(&self, cm: &mut ConnectorMessage, detail: RUMString) {
        cm.transition(Status::Error).ok();
        self.services.counters.apply_delta("error", 1);
        self.services.events.dispatch(ChannelEvent::Error {
            channel_id: cm.channel_id.clone(),
            message_id: cm.message_id,
            destination: Some(self.name.clone()),
            detail,
        });
        self.services.datastore.save_connector_message(cm).ok();
    }

    ///
    /// Runs this destination's filter -> transformer -> dispatch contract against one
    /// `ConnectorMessage` (spec §4.4). A filter/transformer failure stops the chain
    /// (the caller is expected to not invoke subsequent destinations); a dispatch
    /// failure only stops the chain if the destination has no queue to fall back to.
    ///
    pub async fn run(&self, cm: &mut ConnectorMessage) -> Result<bool, EngineError> {
        if let Some(filter) = &self.filter {
            match filter.evaluate(cm) {
                Ok(true) => {}
                Ok(false) => {
                    cm.transition(Status::Filtered).map_err(EngineError::Filter)?;
                    self.services.counters.apply_delta("filtered", 1);
                    self.services.datastore.save_connector_message(cm).ok();
                    return Ok(false);
                }
                Err(err) => {
                    cm.processing_error = Some(err.message().clone());
                    self.mark_error(cm, err.message().clone());
                    return Err(err);
                }
            }
        }

        cm.transition(Status::Transformed).map_err(EngineError::Transformer)?;
        self.services.counters.apply_delta("transformed", 1);

        if let Some(transformer) = &self.transformer {
            if let Err(err) = transformer.transform(cm) {
                cm.processing_error = Some(err.message().clone());
                self.mark_error(cm, err.message().clone());
                return Err(err);
            }
        }
        if !cm.has_content(ContentType::Encoded) {
            if let Some(raw) = cm.get_content(ContentType::Raw).cloned() {
                cm.put_content(MessageContent::new(ContentType::Encoded, raw.content, raw.data_type)).ok();
            }
        }

        if !self.queue_enabled {
            if let Err(err) = self.attempt_send(cm).await {
                let detail = err.message().clone();
                self.mark_error(cm, detail);
                return Err(err);
            }
            return Ok(true);
        }

        if self.queue_send_first {
            if self.attempt_send(cm).await.is_ok() {
                return Ok(true);
            }
            warn!(destination = %self.name, message_id = cm.message_id, "queueSendFirst send failed, falling back to queue");
        }
        cm.transition(Status::Queued).map_err(EngineError::Serialization)?;
        self.services.counters.apply_delta("pending", 1);
        self.services.counters.apply_delta("queueDepth", 1);
        self.services.events.dispatch(ChannelEvent::Queued {
            channel_id: cm.channel_id.clone(),
            message_id: cm.message_id,
            destination: self.name.clone(),
        });
        self.services.datastore.save_connector_message(cm).ok();
        self.queue.add(cm.clone());
        Ok(true)
    }

    ///
    /// Drains one acquired item from this destination's own queue, retrying its send.
    /// Intended to be driven by a dedicated worker loop per spec §5 ("one worker per
    /// destination-queue bucket"). A retryable failure is requeued up to `retry_count`
    /// times, waiting `retry_interval` between attempts (spec §4.4); once exhausted (or
    /// on a non-retryable failure) the message is dropped from the queue at `ERROR`.
    ///
    pub async fn drain_once(&self, bucket_idx: usize) -> bool {
        let Some(mut cm) = self.queue.acquire(bucket_idx) else {
            return false;
        };
        match self.attempt_send(&mut cm).await {
            Ok(()) => {
                self.services.counters.apply_delta("queueDepth", -1);
                self.queue.release(cm, true);
            }
            Err(err) => {
                let exhausted = self.retry_count.is_some_and(|max| cm.send_attempts > max);
                if err.is_retryable() && !exhausted {
                    cm.transition(Status::Queued).ok();
                    self.services.datastore.save_connector_message(&cm).ok();
                    self.queue.release(cm, false);
                    tokio::time::sleep(self.retry_interval).await;
                } else {
                    self.services.counters.apply_delta("queueDepth", -1);
                    self.mark_error(&mut cm, err.message().clone());
                    error!(destination = %self.name, message_id = cm.message_id, attempts = cm.send_attempts, "retries exhausted or permanent send failure, dropping from queue");
                    self.queue.release(cm, true);
                }
            }
        }
        true
    }
}

/// An ordered list of destinations sharing a stop-on-error contract (spec §4.4):
/// destinations within a chain run sequentially, and a filter/transformer exception
/// stops the rest of the chain.
pub struct DestinationChain {
    pub name: RUMString,
    pub destinations: Vec<Destination>,
}

impl DestinationChain {
    pub fn new(name: RUMString, destinations: Vec<Destination>) -> DestinationChain {
        DestinationChain { name, destinations }
    }

    ///
    /// Runs every destination in order against its own clone of `source_cm`'s encoded
    /// content, stopping early if a destination's filter/transformer throws. Returns
    /// one result per destination attempted.
    ///
    pub async fn dispatch(&self, source_cm: &ConnectorMessage) -> Vec<(RUMString, Result<ConnectorMessage, EngineError>)> {
        let mut results = Vec::with_capacity(self.destinations.len());
        for destination in &self.destinations {
            let mut cm = ConnectorMessage::new(
                destination.meta_data_id,
                source_cm.message_id,
                source_cm.channel_id.clone(),
                destination.name.clone(),
                source_cm.server_id.clone(),
            );
            cm.channel_map = source_cm.channel_map.clone();
            cm.source_map = source_cm.source_map.clone();
            if let Some(raw) = source_cm.get_content(ContentType::Raw).cloned() {
                cm.put_content(raw).ok();
            }
            let outcome = destination.run(&mut cm).await;
            let stop = outcome.is_err();
            results.push((destination.name.clone(), outcome.map(|_| cm)));
            if stop {
                break;
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::InMemoryDatastore;
    use crate::events::TracingEventDispatcher;
    use crate::message::SOURCE_METADATA_ID;

    fn test_services() -> EngineServices {
        EngineServices::new(Arc::new(TracingEventDispatcher), Arc::new(InMemoryDatastore::new()))
    }

    struct EchoSender;

    #[async_trait]
    impl DestinationSender for EchoSender {
        async fn send(&self, payload: &[u8]) -> Result<Vec<u8>, EngineError> {
            Ok(payload.to_vec())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl DestinationSender for AlwaysFails {
        async fn send(&self, _payload: &[u8]) -> Result<Vec<u8>, EngineError> {
            Err(EngineError::TransportSendTransient(RUMString::from("connection refused")))
        }
    }

    fn source_cm() -> ConnectorMessage {
        let mut cm = ConnectorMessage::new(SOURCE_METADATA_ID, 1, RUMString::from("chan"), RUMString::from("Source"), RUMString::from("srv-1"));
        cm.put_content(MessageContent::new(ContentType::Raw, RUMString::from("payload"), DataType::Raw)).unwrap();
        cm
    }

    #[tokio::test]
    async fn direct_send_destination_reaches_sent() {
        let destination = Destination::new(1, RUMString::from("Dest1"), DataType::Raw, false, false, Arc::new(EchoSender), QueuePolicy::default(), test_services());
        let chain = DestinationChain::new(RUMString::from("chain1"), vec![destination]);
        let results = chain.dispatch(&source_cm()).await;
        assert_eq!(results.len(), 1);
        let (_, outcome) = &results[0];
        let cm = outcome.as_ref().unwrap();
        assert_eq!(cm.status, Status::Sent);
    }

    #[tokio::test]
    async fn queue_enabled_without_send_first_queues_directly() {
        let destination = Destination::new(1, RUMString::from("Dest1"), DataType::Raw, true, false, Arc::new(AlwaysFails), QueuePolicy::default(), test_services());
        let chain = DestinationChain::new(RUMString::from("chain1"), vec![destination]);
        let results = chain.dispatch(&source_cm()).await;
        let (_, outcome) = &results[0];
        let cm = outcome.as_ref().unwrap();
        assert_eq!(cm.status, Status::Queued);
        assert_eq!(cm.send_attempts, 0);
    }

    #[tokio::test]
    async fn queue_send_first_falls_back_to_queue_on_failure() {
        let destination = Destination::new(1, RUMString::from("Dest1"), DataType::Raw, true, true, Arc::new(AlwaysFails), QueuePolicy::default(), test_services());
        let chain = DestinationChain::new(RUMString::from("chain1"), vec![destination]);
        let results = chain.dispatch(&source_cm()).await;
        let (_, outcome) = &results[0];
        let cm = outcome.as_ref().unwrap();
        assert_eq!(cm.status, Status::Queued);
        assert_eq!(cm.send_attempts, 1);
    }

    struct RejectAllFilter;
    impl Filter for RejectAllFilter {
        fn evaluate(&self, _cm: &ConnectorMessage) -> Result<bool, EngineError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn filtered_destination_reaches_filtered_terminal_state() {
        let mut destination = Destination::new(1, RUMString::from("Dest1"), DataType::Raw, false, false, Arc::new(EchoSender), QueuePolicy::default(), test_services());
        destination.filter = Some(Box::new(RejectAllFilter));
        let chain = DestinationChain::new(RUMString::from("chain1"), vec![destination]);
        let results = chain.dispatch(&source_cm()).await;
        let (_, outcome) = &results[0];
        let cm = outcome.as_ref().unwrap();
        assert_eq!(cm.status, Status::Filtered);
    }

    #[tokio::test]
    async fn drain_once_requeues_a_retryable_failure_until_retry_count_is_exhausted() {
        let destination = Destination::new(1, RUMString::from("Dest1"), DataType::Raw, true, false, Arc::new(AlwaysFails), QueuePolicy::default(), test_services())
            .with_retry_policy(Some(1), Duration::from_millis(0));
        let chain = DestinationChain::new(RUMString::from("chain1"), vec![destination]);
        let results = chain.dispatch(&source_cm()).await;
        let (_, outcome) = &results[0];
        assert_eq!(outcome.as_ref().unwrap().status, Status::Queued);
        let destination = &chain.destinations[0];

        // First retry: attempts so far is 1 (<= retry_count of 1), requeues.
        assert!(destination.drain_once(0).await);
        let requeued = destination.queue.acquire(0).unwrap();
        assert_eq!(requeued.status, Status::Queued);
        assert_eq!(requeued.send_attempts, 1);
        destination.queue.release(requeued, false);

        // Second retry exhausts retry_count (attempts becomes 2 > 1) and lands in ERROR.
        assert!(destination.drain_once(0).await);
        assert!(destination.queue.acquire(0).is_none());
    }
}
