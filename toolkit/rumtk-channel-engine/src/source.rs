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

use crate::aggregator::{run_postprocessor, AggregatedResponse, Postprocessor, ResponseAggregator};
use crate::chain::{DestinationChain, Filter, Transformer};
use crate::error::EngineError;
use crate::events::ChannelEvent;
use crate::message::{ConnectorMessage, ContentType, Message, MessageContent, SOURCE_METADATA_ID};
use crate::status::Status;
use crate::EngineServices;
use async_trait::async_trait;
use rumtk_core::strings::RUMString;
use rumtk_hl7_v2::hl7_v2_parser::v2_parser::V2Message;
use rumtk_mllp::mllp::MLLPTransport;
use rumtk_serializers::DataType;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

///
/// Splits one raw transport payload into the individual messages it may carry (spec
/// §4.5: "Source Connector ... `BatchAdaptor` for HL7v2/delimited/EDI/NCPDP/raw").
/// Implementors see the whole payload and decide where message boundaries fall; types
/// with no natural batching concept (most transports deliver one message per frame
/// already) use [SingleMessageBatchAdaptor].
///
pub trait BatchAdaptor: Send + Sync {
    fn split(&self, raw: &[u8]) -> Vec<RUMString>;
}

/// No splitting: the whole payload is one message. Correct for MLLP/TCP framed HL7v2,
/// DICOM, and HL7v3/JSON/XML sources, which deliver one message per connection frame.
pub struct SingleMessageBatchAdaptor;

impl BatchAdaptor for SingleMessageBatchAdaptor {
    fn split(&self, raw: &[u8]) -> Vec<RUMString> {
        vec![RUMString::from(String::from_utf8_lossy(raw).into_owned())]
    }
}

/// Splits a batch of ER7 messages at each subsequent `MSH` segment boundary, for
/// sources (e.g. file/HTTP polling) that deliver several HL7v2 messages concatenated
/// in one payload.
pub struct Hl7V2BatchAdaptor {
    pub segment_terminator: char,
}

impl Default for Hl7V2BatchAdaptor {
    fn default() -> Hl7V2BatchAdaptor {
        Hl7V2BatchAdaptor { segment_terminator: '\r' }
    }
}

impl BatchAdaptor for Hl7V2BatchAdaptor {
    fn split(&self, raw: &[u8]) -> Vec<RUMString> {
        let text = String::from_utf8_lossy(raw);
        let mut messages = Vec::new();
        let mut current = String::new();
        for segment in text.split(self.segment_terminator) {
            if segment.is_empty() {
                continue;
            }
            if segment.starts_with("MSH") && !current.is_empty() {
                messages.push(RUMString::from(current.clone()));
                current.clear();
            }
            current.push_str(segment);
            current.push(self.segment_terminator);
        }
        if !current.is_empty() {
            messages.push(RUMString::from(current));
        }
        messages
    }
}

/// Splits on a record delimiter, for delimited/X12/NCPDP sources where one payload may
/// carry several whole records back to back.
pub struct DelimitedBatchAdaptor {
    pub record_delimiter: char,
}

impl BatchAdaptor for DelimitedBatchAdaptor {
    fn split(&self, raw: &[u8]) -> Vec<RUMString> {
        String::from_utf8_lossy(raw)
            .split(self.record_delimiter)
            .filter(|r| !r.trim().is_empty())
            .map(|r| RUMString::from(format!("{}{}", r, self.record_delimiter)))
            .collect()
    }
}

/// Monotonic per-channel message id generator. The spec leaves id assignment to the
/// implementation; a simple atomic counter is sufficient since ids only need to be
/// unique within one channel/server pair (spec §3).
pub struct MessageIdGenerator {
    next: AtomicU64,
}

impl MessageIdGenerator {
    pub fn new() -> MessageIdGenerator {
        MessageIdGenerator { next: AtomicU64::new(1) }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for MessageIdGenerator {
    fn default() -> MessageIdGenerator {
        MessageIdGenerator::new()
    }
}

///
/// C4 Source Connector (spec §4.5): accepts a raw payload, creates a `Message`, seeds
/// its `metaDataId = 0` `ConnectorMessage` with `RAW` content, runs the
/// preprocessor/source filter/transformer, then hands the result to every destination
/// chain. Transport binding is a separate concern, driven by [SourceTransport].
///
pub struct SourceConnector {
    pub channel_id: RUMString,
    pub server_id: RUMString,
    pub data_type: DataType,
    pub batch_adaptor: Box<dyn BatchAdaptor>,
    pub filter: Option<Box<dyn Filter>>,
    pub transformer: Option<Box<dyn Transformer>>,
    pub chains: Vec<DestinationChain>,
    /// Selects what gets attributed to the source as a response (spec §4.6). `None`
    /// skips response attribution entirely, preserving fire-and-forget sources.
    pub response_aggregator: Option<ResponseAggregator>,
    pub postprocessor: Option<Box<dyn Postprocessor>>,
    pub services: EngineServices,
    ids: MessageIdGenerator,
}

impl SourceConnector {
    pub fn new(
        channel_id: RUMString,
        server_id: RUMString,
        data_type: DataType,
        batch_adaptor: Box<dyn BatchAdaptor>,
        chains: Vec<DestinationChain>,
        services: EngineServices,
    ) -> SourceConnector {
        SourceConnector {
            channel_id,
            server_id,
            data_type,
            batch_adaptor,
            filter: None,
            transformer: None,
            chains,
            response_aggregator: None,
            postprocessor: None,
            services,
            ids: MessageIdGenerator::new(),
        }
    }

    ///
    /// Runs one already-split raw message through the source stage and every
    /// destination chain, returning the assembled `Message` with every connector's
    /// outcome attached.
    ///
    async fn process_one(&self, raw: RUMString, received_date: i64) -> Message {
        let message_id = self.ids.next_id();
        let mut message = Message::new(message_id, self.channel_id.clone(), self.server_id.clone(), received_date);

        let mut source_cm = ConnectorMessage::new(
            SOURCE_METADATA_ID,
            message_id,
            self.channel_id.clone(),
            RUMString::from("Source"),
            self.server_id.clone(),
        );
        source_cm
            .put_content(MessageContent::new(ContentType::Raw, raw, self.data_type))
            .ok();

        self.services.counters.apply_delta("received", 1);
        self.services
            .events
            .dispatch(ChannelEvent::MessageReceived { channel_id: self.channel_id.clone(), message_id });
        self.services.datastore.save_connector_message(&source_cm).ok();

        if let Some(filter) = &self.filter {
            match filter.evaluate(&source_cm) {
                Ok(true) => {}
                Ok(false) => {
                    source_cm.transition(Status::Filtered).ok();
                    self.services.counters.apply_delta("filtered", 1);
                    self.services.datastore.save_connector_message(&source_cm).ok();
                    message.put_connector_message(source_cm);
                    self.services.datastore.save_message(&message).ok();
                    return message;
                }
                Err(err) => {
                    self.fail_source(&mut source_cm, &mut message, err);
                    return message;
                }
            }
        }

        source_cm.transition(Status::Transformed).ok();
        self.services.counters.apply_delta("transformed", 1);
        if let Some(transformer) = &self.transformer {
            if let Err(err) = transformer.transform(&mut source_cm) {
                self.fail_source(&mut source_cm, &mut message, err);
                return message;
            }
        }

        for chain in &self.chains {
            for (_, outcome) in chain.dispatch(&source_cm).await {
                if let Ok(cm) = outcome {
                    message.put_connector_message(cm);
                }
            }
        }
        self.services.datastore.save_connector_message(&source_cm).ok();
        message.put_connector_message(source_cm);
        message.processed = true;

        self.attribute_response(&mut message);
        if let Some(postprocessor) = &self.postprocessor {
            run_postprocessor(postprocessor.as_ref(), &mut message);
        }
        self.services.datastore.save_message(&message).ok();
        message
    }

    fn fail_source(&self, source_cm: &mut ConnectorMessage, message: &mut Message, err: EngineError) {
        source_cm.processing_error = Some(err.message().clone());
        source_cm.transition(Status::Error).ok();
        self.services.counters.apply_delta("error", 1);
        self.services.events.dispatch(ChannelEvent::Error {
            channel_id: self.channel_id.clone(),
            message_id: source_cm.message_id,
            destination: None,
            detail: err.message().clone(),
        });
        self.services.datastore.save_connector_message(source_cm).ok();
        message.put_connector_message(source_cm.clone());
        self.services.datastore.save_message(message).ok();
    }

    ///
    /// Selects a response via [ResponseAggregator::select_response] and stashes it on
    /// `message.attributes` as `response_kind` (`AA`/`CA`/`AE`, the MSA-1 value an HL7v2
    /// ack echoes) and `response_body` (spec §4.5/§4.6). A transport binding that knows
    /// how to frame a response (e.g. [MllpSourceTransport]) reads these back out.
    ///
    fn attribute_response(&self, message: &mut Message) {
        let Some(aggregator) = &self.response_aggregator else {
            return;
        };
        let Some(response) = aggregator.select_response(message) else {
            return;
        };
        let (kind, body) = match response {
            AggregatedResponse::Ok(body) => ("AA", body),
            AggregatedResponse::AcceptedForLater(body) => ("CA", body),
            AggregatedResponse::Nak(body) => ("AE", body),
        };
        message.attributes.insert(RUMString::from("response_kind"), RUMString::from(kind));
        message.attributes.insert(RUMString::from("response_body"), body);
    }

    /// Splits `raw` via this source's [BatchAdaptor] and processes every resulting
    /// message independently. `received_date` is a caller-supplied epoch timestamp
    /// (this module never reads the clock itself, keeping it deterministic to test).
    pub async fn handle_payload(&self, raw: &[u8], received_date: i64) -> Vec<Message> {
        let mut messages = Vec::new();
        for piece in self.batch_adaptor.split(raw) {
            messages.push(self.process_one(piece, received_date).await);
        }
        messages
    }
}

///
/// A transport binding drives [SourceConnector::handle_payload] from whatever wire
/// protocol it listens on (spec §4.5/§6). Implementations own their own accept loop and
/// stop cleanly when `cancel` fires.
///
#[async_trait]
pub trait SourceTransport: Send + Sync {
    async fn run(&self, connector: Arc<SourceConnector>, cancel: CancellationToken) -> Result<(), EngineError>;
}

/// MLLP/TCP source binding (spec §6: "MLLP ... fully implemented"), built directly on
/// `rumtk-mllp`'s client-polling API.
pub struct MllpSourceTransport {
    pub transport: Arc<MLLPTransport>,
    pub poll_interval: Duration,
}

impl MllpSourceTransport {
    pub fn new(transport: Arc<MLLPTransport>) -> MllpSourceTransport {
        MllpSourceTransport { transport, poll_interval: Duration::from_millis(25) }
    }
}

#[async_trait]
impl SourceTransport for MllpSourceTransport {
    async fn run(&self, connector: Arc<SourceConnector>, cancel: CancellationToken) -> Result<(), EngineError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            for client_id in self.transport.get_client_ids() {
                if let Ok(payload) = self.transport.receive_message(&client_id) {
                    let messages = connector.handle_payload(&payload, epoch_seconds_hint()).await;
                    let ack = build_ack(&payload, messages.last());
                    if let Err(err) = self.transport.send_message(&ack, &client_id) {
                        warn!(client = %client_id, error = %err, "failed to send MLLP ack");
                    }
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Builds the framed ACK to send back over MLLP (spec §4.5/§6/S1): echoes the inbound
/// control id via `V2Message::generate_ack`, using the `response_kind` the source
/// connector's response aggregator attributed to `message` (`AA`/`CA`/`AE`), defaulting
/// to `AA` when no aggregator is configured. Falls back to a generic unparsed-message
/// NAK if `raw` is not itself a parseable HL7v2 message (e.g. a non-HL7 data type was
/// configured for this MLLP channel).
fn build_ack(raw: &[u8], message: Option<&Message>) -> Vec<u8> {
    let ack_code = message
        .and_then(|m| m.attributes.get("response_kind"))
        .map(RUMString::as_str)
        .unwrap_or("AA");
    let ack = std::str::from_utf8(raw)
        .ok()
        .and_then(|text| V2Message::from_str(text).ok())
        .and_then(|parsed| parsed.generate_ack(ack_code).ok());
    match ack {
        Some(ack) => ack.as_bytes().to_vec(),
        None => b"MSH|^~\\&|||||||ACK||P|2.3\rMSA|AE|\r".to_vec(),
    }
}

/// Placeholder until an injected clock lands; transports that need a real timestamp
/// should overwrite `received_date` on the returned `Message`s themselves.
fn epoch_seconds_hint() -> i64 {
    0
}

///
/// Concrete MLLP destination sender (spec §6: destinations share the same MLLP binding
/// as sources). Connects once to `ip:port` at construction and reuses that connection
/// for every send; the response frame received back is returned as-is to become the
/// destination's `RESPONSE` content.
///
pub struct MllpDestinationSender {
    transport: Arc<MLLPTransport>,
    peer: RUMString,
}

impl MllpDestinationSender {
    pub fn connect(
        ip: &str,
        port: u16,
        filter_policy: rumtk_mllp::mllp::FilterPolicy,
    ) -> Result<MllpDestinationSender, EngineError> {
        let transport = MLLPTransport::connect(ip, port, filter_policy).map_err(EngineError::Configuration)?;
        Ok(MllpDestinationSender {
            transport: Arc::new(transport),
            peer: RUMString::from(format!("{}:{}", ip, port)),
        })
    }
}

#[async_trait]
impl crate::chain::DestinationSender for MllpDestinationSender {
    async fn send(&self, payload: &[u8]) -> Result<Vec<u8>, EngineError> {
        self.transport
            .send_message(payload, &self.peer)
            .map_err(EngineError::TransportSendTransient)?;
        self.transport
            .receive_message(&self.peer)
            .map_err(EngineError::TransportSendTransient)
    }
}

/// HTTP source binding (spec §6), grounded on an axum `Router` exposing one POST route
/// that hands its body straight to the source connector.
pub struct HttpSourceTransport {
    pub bind_addr: std::net::SocketAddr,
}

#[async_trait]
impl SourceTransport for HttpSourceTransport {
    async fn run(&self, connector: Arc<SourceConnector>, cancel: CancellationToken) -> Result<(), EngineError> {
        use axum::{body::Bytes, extract::State, routing::post, Router};

        async fn accept(State(connector): State<Arc<SourceConnector>>, body: Bytes) -> &'static str {
            connector.handle_payload(&body, epoch_seconds_hint()).await;
            "ACCEPTED"
        }

        let app = Router::new().route("/", post(accept)).with_state(connector);
        let listener = tokio::net::TcpListener::bind(self.bind_addr)
            .await
            .map_err(|err| EngineError::Configuration(RUMString::from(err.to_string())))?;
        info!(addr = %self.bind_addr, "HTTP source connector listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await
            .map_err(|err| EngineError::TransportSendTransient(RUMString::from(err.to_string())))
    }
}

/// JMS source binding: spec §1/§6 names JMS among supported transports but the wire
/// protocol is out of this crate's dependency stack. Deploying a channel with this
/// transport fails at configuration time rather than silently accepting traffic it
/// cannot actually bind.
pub struct JmsSourceTransport;

#[async_trait]
impl SourceTransport for JmsSourceTransport {
    async fn run(&self, _connector: Arc<SourceConnector>, _cancel: CancellationToken) -> Result<(), EngineError> {
        Err(EngineError::Configuration(RUMString::from(
            "JMS source transport is not implemented in this build",
        )))
    }
}

/// Web Services (SOAP) source binding: same status as [JmsSourceTransport].
pub struct WebServicesSourceTransport;

#[async_trait]
impl SourceTransport for WebServicesSourceTransport {
    async fn run(&self, _connector: Arc<SourceConnector>, _cancel: CancellationToken) -> Result<(), EngineError> {
        Err(EngineError::Configuration(RUMString::from(
            "Web Services source transport is not implemented in this build",
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{ResponsePolicy, ResponseUpdatePolicy};
    use crate::chain::{Destination, DestinationSender};
    use crate::datastore::InMemoryDatastore;
    use crate::events::TracingEventDispatcher;
    use crate::queue::QueuePolicy;

    struct EchoSender;

    #[async_trait]
    impl DestinationSender for EchoSender {
        async fn send(&self, payload: &[u8]) -> Result<Vec<u8>, EngineError> {
            Ok(payload.to_vec())
        }
    }

    fn test_services() -> EngineServices {
        EngineServices::new(Arc::new(TracingEventDispatcher), Arc::new(InMemoryDatastore::new()))
    }

    fn connector_with_one_destination() -> SourceConnector {
        let destination = Destination::new(
            1,
            RUMString::from("Dest1"),
            DataType::Raw,
            false,
            false,
            Arc::new(EchoSender),
            QueuePolicy::default(),
            test_services(),
        );
        let chain = DestinationChain::new(RUMString::from("chain1"), vec![destination]);
        let mut connector = SourceConnector::new(
            RUMString::from("chan"),
            RUMString::from("srv-1"),
            DataType::Raw,
            Box::new(SingleMessageBatchAdaptor),
            vec![chain],
            test_services(),
        );
        connector.response_aggregator = Some(ResponseAggregator::new(ResponsePolicy::Aggregate, ResponseUpdatePolicy::Never));
        connector
    }

    #[tokio::test]
    async fn single_payload_produces_one_message_with_sent_destination() {
        let connector = connector_with_one_destination();
        let messages = connector.handle_payload(b"hello world", 1000).await;
        assert_eq!(messages.len(), 1);
        let message = &messages[0];
        assert!(message.source_message().is_some());
        let dest = message.connector_message(1).unwrap();
        assert_eq!(dest.status, Status::Sent);
    }

    #[test]
    fn hl7v2_batch_adaptor_splits_on_msh_boundaries() {
        let adaptor = Hl7V2BatchAdaptor::default();
        let raw = b"MSH|^~\\&|A\rPID|1\rMSH|^~\\&|B\rPID|2\r";
        let messages = adaptor.split(raw);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("MSH"));
        assert!(messages[1].starts_with("MSH"));
    }

    #[test]
    fn delimited_batch_adaptor_splits_on_record_delimiter() {
        let adaptor = DelimitedBatchAdaptor { record_delimiter: '\n' };
        let raw = b"a,b,c\nd,e,f\n";
        let messages = adaptor.split(raw);
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn jms_transport_fails_configuration_instead_of_silently_accepting() {
        let connector = Arc::new(connector_with_one_destination());
        let result = JmsSourceTransport.run(connector, CancellationToken::new()).await;
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[tokio::test]
    async fn configured_aggregator_attributes_an_ack_response_on_success() {
        let connector = connector_with_one_destination();
        let messages = connector.handle_payload(b"hello world", 1000).await;
        let message = &messages[0];
        assert_eq!(message.attributes.get("response_kind").map(RUMString::as_str), Some("AA"));
        assert!(message.attributes.contains_key("response_body"));
    }

    struct RecordingPostprocessor {
        ran: Arc<std::sync::Mutex<bool>>,
    }

    impl Postprocessor for RecordingPostprocessor {
        fn run(&self, _message: &Message) -> Result<(), EngineError> {
            *self.ran.lock().unwrap() = true;
            Ok(())
        }
    }

    #[tokio::test]
    async fn configured_postprocessor_runs_once_the_message_is_settled() {
        let ran = Arc::new(std::sync::Mutex::new(false));
        let mut connector = connector_with_one_destination();
        connector.postprocessor = Some(Box::new(RecordingPostprocessor { ran: ran.clone() }));
        let messages = connector.handle_payload(b"hello world", 1000).await;
        assert_eq!(messages.len(), 1);
        assert!(*ran.lock().unwrap());
    }

    const ADT_SAMPLE: &str = "MSH|^~\\&|ADT1|GOOD HEALTH HOSPITAL|GHH LAB|GOOD HEALTH HOSPITAL|198808181126||ADT^A01|MSG00001|P|2.8\rPID|1||PATID1234^5^M11\r";

    #[test]
    fn build_ack_echoes_control_id_for_a_parseable_message() {
        let ack = build_ack(ADT_SAMPLE.as_bytes(), None);
        let ack = V2Message::from_str(std::str::from_utf8(&ack).unwrap()).unwrap();
        assert_eq!(ack.message_type().unwrap().as_str(), "ACK");
        assert_eq!(ack.get("MSA", 1).unwrap().field(1).unwrap().as_str(), "AA");
        assert_eq!(ack.get("MSA", 1).unwrap().field(2).unwrap().as_str(), "MSG00001");
    }

    #[test]
    fn build_ack_uses_the_attributed_response_kind() {
        let mut message = Message::new(1, RUMString::from("chan"), RUMString::from("srv-1"), 0);
        message.attributes.insert(RUMString::from("response_kind"), RUMString::from("AE"));
        let ack = build_ack(ADT_SAMPLE.as_bytes(), Some(&message));
        let ack = V2Message::from_str(std::str::from_utf8(&ack).unwrap()).unwrap();
        assert_eq!(ack.get("MSA", 1).unwrap().field(1).unwrap().as_str(), "AE");
    }

    #[test]
    fn build_ack_falls_back_to_a_generic_nak_for_unparseable_payloads() {
        let ack = build_ack(b"not an hl7 message", None);
        assert!(std::str::from_utf8(&ack).unwrap().contains("MSA|AE"));
    }
}
