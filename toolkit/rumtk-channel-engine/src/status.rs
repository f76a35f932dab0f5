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

use compact_str::format_compact;
use rumtk_core::core::RUMResult;
use serde::{Deserialize, Serialize};

/// A `ConnectorMessage`'s position in the state machine (spec §4.2). `RECEIVED` is the
/// entry state every connector starts in; every other state is reached only through
/// [Status::validate_transition].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Received,
    Filtered,
    Transformed,
    Queued,
    Pending,
    Sent,
    Error,
}

impl Status {
    /// `SENT`, `ERROR`, `FILTERED`: once reached, nothing moves a `ConnectorMessage` out
    /// of these.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Sent | Status::Error | Status::Filtered)
    }

    /// `QUEUED`, `PENDING`: the two states a queue worker may legally `acquire()`.
    pub fn is_acquirable(&self) -> bool {
        matches!(self, Status::Queued | Status::Pending)
    }

    ///
    /// Enforces the transition diagram in spec §4.2 in one place, rather than scattering
    /// ad-hoc status writes across the chain/queue/source connectors. Returns the
    /// destination status on success.
    ///
    pub fn validate_transition(self, to: Status) -> RUMResult<Status> {
        let allowed = match (self, to) {
            (Status::Received, Status::Filtered) => true,
            (Status::Received, Status::Transformed) => true,
            (Status::Transformed, Status::Queued) => true,
            (Status::Transformed, Status::Pending) => true,
            (Status::Pending, Status::Sent) => true,
            (Status::Pending, Status::Queued) => true,
            (Status::Queued, Status::Pending) => true,
            // Any non-terminal state can fall to ERROR on an unhandled exception.
            (from, Status::Error) if !from.is_terminal() => true,
            _ => false,
        };
        if !allowed {
            return Err(format_compact!(
                "Illegal status transition {:?} -> {:?}",
                self,
                to
            ));
        }
        Ok(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn received_can_filter_or_transform() {
        assert!(Status::Received.validate_transition(Status::Filtered).is_ok());
        assert!(Status::Received.validate_transition(Status::Transformed).is_ok());
    }

    #[test]
    fn terminal_states_reject_any_further_transition() {
        assert!(Status::Sent.validate_transition(Status::Queued).is_err());
        assert!(Status::Error.validate_transition(Status::Pending).is_err());
        assert!(Status::Filtered.validate_transition(Status::Transformed).is_err());
    }

    #[test]
    fn queue_cycle_allows_pending_back_to_queued() {
        assert!(Status::Pending.validate_transition(Status::Queued).is_ok());
        assert!(Status::Queued.validate_transition(Status::Pending).is_ok());
    }

    #[test]
    fn any_non_terminal_can_fall_to_error() {
        assert!(Status::Transformed.validate_transition(Status::Error).is_ok());
        assert!(Status::Queued.validate_transition(Status::Error).is_ok());
        assert!(Status::Pending.validate_transition(Status::Error).is_ok());
    }

    #[test]
    fn skipping_straight_from_received_to_sent_is_rejected() {
        assert!(Status::Received.validate_transition(Status::Sent).is_err());
    }
}
