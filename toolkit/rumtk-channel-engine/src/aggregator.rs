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
use crate::message::{ContentType, Message};
use crate::status::Status;
use rumtk_core::strings::RUMString;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Resolves the open question at spec §9: whether a response already attributed from a
/// `QUEUED` destination should be replaced once that destination eventually reaches
/// `SENT`. `Never` (the default) matches legacy behavior; `Aggregate` re-runs selection
/// on every terminal-state transition of the named destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseUpdatePolicy {
    Never,
    Aggregate,
}

impl Default for ResponseUpdatePolicy {
    fn default() -> ResponseUpdatePolicy {
        ResponseUpdatePolicy::Never
    }
}

/// Which destination's (or synthesized) response the channel returns to its source
/// (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponsePolicy {
    /// Use the named destination's `RESPONSE` content, synthesizing from status if the
    /// destination produced none.
    Destination { meta_data_id: u32 },
    /// Aggregate across every destination: all `SENT` -> ok ack, any `ERROR` -> nak,
    /// otherwise (some still `QUEUED`) -> accepted-for-later.
    Aggregate,
}

/// The response an aggregator hands back to the source connector (spec §4.6: "the
/// channel-response policy decides what the upstream caller sees").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregatedResponse {
    Ok(RUMString),
    AcceptedForLater(RUMString),
    Nak(RUMString),
}

///
/// C6 Response Aggregator (spec §4.6): collects destination responses and selects the
/// one the channel reports upstream, then runs the postprocessor once every connector
/// has reached a terminal state (`QUEUED` counts as terminal here; the aggregator does
/// not wait for eventual redelivery).
///
pub struct ResponseAggregator {
    pub policy: ResponsePolicy,
    pub update_policy: ResponseUpdatePolicy,
}

impl ResponseAggregator {
    pub fn new(policy: ResponsePolicy, update_policy: ResponseUpdatePolicy) -> ResponseAggregator {
        ResponseAggregator { policy, update_policy }
    }

    /// Whether a connector has reached a state the aggregator can report on. `QUEUED`
    /// counts as settled here (it becomes an `AcceptedForLater` response) even though
    /// [Status::is_terminal] does not consider it terminal for postprocessor purposes.
    fn is_settled(status: Status) -> bool {
        status.is_terminal() || status == Status::Queued
    }

    fn synthesize(status: Status, response_content: Option<&RUMString>) -> AggregatedResponse {
        if let Some(content) = response_content {
            return match status {
                Status::Sent => AggregatedResponse::Ok(content.clone()),
                Status::Queued => AggregatedResponse::AcceptedForLater(content.clone()),
                _ => AggregatedResponse::Nak(content.clone()),
            };
        }
        match status {
            Status::Sent => AggregatedResponse::Ok(RUMString::from("ok")),
            Status::Queued | Status::Pending => AggregatedResponse::AcceptedForLater(RUMString::from("accepted")),
            _ => AggregatedResponse::Nak(RUMString::from("error")),
        }
    }

    ///
    /// Selects the response to attribute to `message` per this aggregator's policy.
    /// Returns `None` if the named destination (or, for `Aggregate`, any destination at
    /// all) has no terminal state to report yet — the caller should not treat this as a
    /// failure, only as "not ready."
    ///
    pub fn select_response(&self, message: &Message) -> Option<AggregatedResponse> {
        match &self.policy {
            ResponsePolicy::Destination { meta_data_id } => {
                let cm = message.connector_message(*meta_data_id)?;
                if !Self::is_settled(cm.status) {
                    return None;
                }
                let response = cm.get_content(ContentType::Response).map(|c| &c.content);
                Some(Self::synthesize(cm.status, response))
            }
            ResponsePolicy::Aggregate => {
                let ids = message.destination_ids();
                if ids.is_empty() {
                    return None;
                }
                let mut any_error = false;
                let mut any_pending = false;
                for id in &ids {
                    let Some(cm) = message.connector_message(*id) else {
                        return None;
                    };
                    if !Self::is_settled(cm.status) {
                        return None;
                    }
                    match cm.status {
                        Status::Error => any_error = true,
                        Status::Queued => any_pending = true,
                        _ => {}
                    }
                }
                if any_error {
                    Some(AggregatedResponse::Nak(RUMString::from("one or more destinations failed")))
                } else if any_pending {
                    Some(AggregatedResponse::AcceptedForLater(RUMString::from("accepted")))
                } else {
                    Some(AggregatedResponse::Ok(RUMString::from("ok")))
                }
            }
        }
    }

    /// Whether a response already returned for `message` should be recomputed now that
    /// more destinations have reached a terminal state, per [ResponseUpdatePolicy].
    pub fn should_update(&self) -> bool {
        self.update_policy == ResponseUpdatePolicy::Aggregate
    }
}

/// Runs once per `Message` after every connector (source + destinations) has reached a
/// terminal state (spec §4.6). A postprocessor failure is captured as
/// `POSTPROCESSOR_ERROR` content and never changes connector status.
pub trait Postprocessor: Send + Sync {
    fn run(&self, message: &Message) -> Result<(), EngineError>;
}

/// Drives a [Postprocessor] against a finished `Message`, recording any failure as
/// content rather than propagating it (spec §4.6/§7: "non-fatal; captured as content").
pub fn run_postprocessor(postprocessor: &dyn Postprocessor, message: &mut Message) {
    if !message.all_terminal() {
        return;
    }
    if let Err(err) = postprocessor.run(message) {
        warn!(message_id = message.message_id, error = %err, "postprocessor failed");
        if let Some(source) = message.connector_message_mut(crate::message::SOURCE_METADATA_ID) {
            source
                .put_content(crate::message::MessageContent::new(
                    ContentType::PostprocessorError,
                    err.message().clone(),
                    rumtk_serializers::DataType::Raw,
                ))
                .ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ConnectorMessage, MessageContent};
    use rumtk_serializers::DataType;

    fn message_with_destination(status: Status, response: Option<&str>) -> Message {
        let mut message = Message::new(1, RUMString::from("chan"), RUMString::from("srv-1"), 0);
        let mut dest = ConnectorMessage::new(1, 1, RUMString::from("chan"), RUMString::from("Dest1"), RUMString::from("srv-1"));
        if status == Status::Transformed {
            dest.transition(Status::Transformed).unwrap();
        } else {
            dest.transition(Status::Transformed).unwrap();
            dest.transition(Status::Pending).unwrap();
            if status == Status::Sent {
                dest.transition(Status::Sent).unwrap();
            } else if status == Status::Error {
                dest.transition(Status::Error).unwrap();
            } else if status == Status::Queued {
                dest.transition(Status::Queued).unwrap();
            }
        }
        if let Some(text) = response {
            dest.put_content(MessageContent::new(ContentType::Response, RUMString::from(text), DataType::Raw)).unwrap();
        }
        message.put_connector_message(dest);
        message
    }

    #[test]
    fn destination_policy_returns_ok_once_sent() {
        let message = message_with_destination(Status::Sent, Some("ack body"));
        let aggregator = ResponseAggregator::new(ResponsePolicy::Destination { meta_data_id: 1 }, ResponseUpdatePolicy::Never);
        assert_eq!(aggregator.select_response(&message), Some(AggregatedResponse::Ok(RUMString::from("ack body"))));
    }

    #[test]
    fn destination_policy_returns_none_while_not_terminal() {
        let mut message = Message::new(1, RUMString::from("chan"), RUMString::from("srv-1"), 0);
        let dest = ConnectorMessage::new(1, 1, RUMString::from("chan"), RUMString::from("Dest1"), RUMString::from("srv-1"));
        message.put_connector_message(dest);
        let aggregator = ResponseAggregator::new(ResponsePolicy::Destination { meta_data_id: 1 }, ResponseUpdatePolicy::Never);
        assert_eq!(aggregator.select_response(&message), None);
    }

    #[test]
    fn aggregate_policy_naks_if_any_destination_errors() {
        let message = message_with_destination(Status::Error, None);
        let aggregator = ResponseAggregator::new(ResponsePolicy::Aggregate, ResponseUpdatePolicy::Never);
        assert!(matches!(aggregator.select_response(&message), Some(AggregatedResponse::Nak(_))));
    }

    #[test]
    fn aggregate_policy_accepts_for_later_when_queued() {
        let message = message_with_destination(Status::Queued, None);
        let aggregator = ResponseAggregator::new(ResponsePolicy::Aggregate, ResponseUpdatePolicy::Never);
        assert!(matches!(aggregator.select_response(&message), Some(AggregatedResponse::AcceptedForLater(_))));
    }

    struct FailingPostprocessor;
    impl Postprocessor for FailingPostprocessor {
        fn run(&self, _message: &Message) -> Result<(), EngineError> {
            Err(EngineError::Postprocessor(RUMString::from("downstream webhook unreachable")))
        }
    }

    #[test]
    fn postprocessor_failure_is_captured_without_touching_status() {
        let mut message = message_with_destination(Status::Sent, Some("ack"));
        let mut source = ConnectorMessage::new(crate::message::SOURCE_METADATA_ID, 1, RUMString::from("chan"), RUMString::from("Source"), RUMString::from("srv-1"));
        source.transition(Status::Filtered).unwrap();
        message.put_connector_message(source);
        run_postprocessor(&FailingPostprocessor, &mut message);
        let source = message.connector_message(crate::message::SOURCE_METADATA_ID).unwrap();
        assert!(source.has_content(ContentType::PostprocessorError));
        assert_eq!(source.status, Status::Filtered);
    }
}
