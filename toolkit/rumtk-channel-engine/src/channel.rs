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
use crate::events::{ChannelEvent, EventDispatcher};
use crate::source::SourceConnector;
use rumtk_core::rumtk_init_threads;
use rumtk_core::strings::RUMString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A Channel's position in its deploy/run lifecycle (spec §4.7). Transitions are
/// invoked by the deployer, never inferred implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Undeployed,
    Deployed,
    Starting,
    Started,
    Pausing,
    Paused,
    Stopping,
    Stopped,
}

impl ChannelState {
    fn validate_transition(self, to: ChannelState) -> Result<ChannelState, EngineError> {
        use ChannelState::*;
        let allowed = matches!(
            (self, to),
            (Undeployed, Deployed)
                | (Deployed, Starting)
                | (Starting, Started)
                | (Started, Pausing)
                | (Pausing, Paused)
                | (Paused, Starting)
                | (Started, Stopping)
                | (Paused, Stopping)
                | (Stopping, Stopped)
                | (Stopped, Undeployed)
                | (Stopped, Deployed)
        );
        if !allowed {
            return Err(EngineError::Configuration(RUMString::from(format!(
                "illegal channel lifecycle transition {:?} -> {:?}",
                self, to
            ))));
        }
        Ok(to)
    }
}

///
/// C7 Channel (spec §4.7): owns one source-accept loop and drives its destination
/// chains' queue workers, all scheduled on the process-wide cached tokio runtime (spec
/// §5). `deploy`/`start`/`pause`/`stop` mirror the deployer-invoked lifecycle exactly;
/// nothing here transitions itself.
///
pub struct Channel {
    pub channel_id: RUMString,
    pub connector: Arc<SourceConnector>,
    pub events: Arc<dyn EventDispatcher>,
    /// Stamped fresh on every `deploy()`; lets a cluster directory (spec §4.7:
    /// "registers the channel in the cluster directory") distinguish one revision's
    /// running workers from a prior revision's that are still draining.
    pub deployment_revision: Option<RUMString>,
    state: ChannelState,
    cancel: CancellationToken,
    source_handle: Option<JoinHandle<()>>,
    drain_stop: Arc<AtomicBool>,
    drain_handles: Vec<JoinHandle<()>>,
}

impl Channel {
    pub fn new(channel_id: RUMString, connector: Arc<SourceConnector>, events: Arc<dyn EventDispatcher>) -> Channel {
        Channel {
            channel_id,
            connector,
            events,
            deployment_revision: None,
            state: ChannelState::Undeployed,
            cancel: CancellationToken::new(),
            source_handle: None,
            drain_stop: Arc::new(AtomicBool::new(false)),
            drain_handles: Vec::new(),
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Allocates nothing beyond validating the transition itself; datastore
    /// table/file allocation and cluster-directory registration are the owning
    /// deployer's responsibility (spec §4.7), not this struct's.
    pub fn deploy(&mut self) -> Result<(), EngineError> {
        self.state = self.state.validate_transition(ChannelState::Deployed)?;
        self.deployment_revision = Some(RUMString::from(uuid::Uuid::new_v4().to_string()));
        info!(channel = %self.channel_id, revision = ?self.deployment_revision, "channel deployed");
        Ok(())
    }

    ///
    /// Binds the source transport and launches one worker per destination-queue
    /// bucket, per spec §5's scheduling model. Transport binding itself (accepting
    /// connections, running the MLLP/HTTP loop) is driven by whatever
    /// `SourceTransport` the caller passes in; this only owns the task handles.
    ///
    pub async fn start<T>(&mut self, transport: Arc<T>) -> Result<(), EngineError>
    where
        T: crate::source::SourceTransport + 'static,
    {
        self.state = self.state.validate_transition(ChannelState::Starting)?;
        let rt = rumtk_init_threads!();
        self.cancel = CancellationToken::new();
        self.drain_stop.store(false, Ordering::SeqCst);

        let connector = self.connector.clone();
        let cancel = self.cancel.clone();
        self.source_handle = Some(rt.spawn(async move {
            if let Err(err) = transport.run(connector, cancel).await {
                tracing::error!(error = %err, "source transport exited with an error");
            }
        }));

        for chain in &self.connector.chains {
            for destination in &chain.destinations {
                let bucket_count = destination.queue.thread_count();
                for bucket_idx in 0..bucket_count {
                    let stop = self.drain_stop.clone();
                    let connector = self.connector.clone();
                    let chain_name = chain.name.clone();
                    let dest_name = destination.name.clone();
                    self.drain_handles.push(rt.spawn(async move {
                        loop {
                            if stop.load(Ordering::SeqCst) {
                                return;
                            }
                            let Some(chain) = connector.chains.iter().find(|c| c.name == chain_name) else {
                                return;
                            };
                            let Some(destination) = chain.destinations.iter().find(|d| d.name == dest_name) else {
                                return;
                            };
                            let worked = destination.drain_once(bucket_idx).await;
                            if !worked {
                                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                            }
                        }
                    }));
                }
            }
        }

        self.state = self.state.validate_transition(ChannelState::Started)?;
        self.events.dispatch(ChannelEvent::ChannelStarted { channel_id: self.channel_id.clone() });
        info!(channel = %self.channel_id, "channel started");
        Ok(())
    }

    /// Closes the source (stops accepting new messages) while destination workers keep
    /// draining their queues (spec §4.7).
    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.state = self.state.validate_transition(ChannelState::Pausing)?;
        self.cancel.cancel();
        if let Some(handle) = self.source_handle.take() {
            handle.abort();
        }
        self.state = self.state.validate_transition(ChannelState::Paused)?;
        info!(channel = %self.channel_id, "channel paused");
        Ok(())
    }

    pub fn resume_from_pause(&mut self) -> Result<(), EngineError> {
        self.state = self.state.validate_transition(ChannelState::Starting)?;
        Ok(())
    }

    /// Drains destination workers for up to `drain_timeout` before aborting them.
    /// Anything left `PENDING` at abort is the responsibility of the queue's own
    /// `release(finished=false)` contract to put back to `QUEUED` on next `start`
    /// (spec §4.7: "messages in PENDING at abort are reset to QUEUED on next start").
    pub async fn stop(&mut self, drain_timeout: std::time::Duration) -> Result<(), EngineError> {
        self.state = self.state.validate_transition(ChannelState::Stopping)?;
        self.cancel.cancel();
        if let Some(handle) = self.source_handle.take() {
            handle.abort();
        }
        self.drain_stop.store(true, Ordering::SeqCst);
        let deadline = tokio::time::Instant::now() + drain_timeout;
        for handle in self.drain_handles.drain(..) {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if tokio::time::timeout(remaining, handle).await.is_err() {
                // Handle dropped on timeout; its queue bucket's in-flight item stays
                // `PENDING` and is reconciled by the queue on next acquire.
            }
        }
        self.state = self.state.validate_transition(ChannelState::Stopped)?;
        info!(channel = %self.channel_id, "channel stopped");
        Ok(())
    }

    pub fn undeploy(&mut self) -> Result<(), EngineError> {
        self.state = self.state.validate_transition(ChannelState::Undeployed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_then_start_is_a_legal_sequence() {
        let mut state = ChannelState::Undeployed;
        state = state.validate_transition(ChannelState::Deployed).unwrap();
        state = state.validate_transition(ChannelState::Starting).unwrap();
        state = state.validate_transition(ChannelState::Started).unwrap();
        assert_eq!(state, ChannelState::Started);
    }

    #[test]
    fn cannot_start_without_deploying_first() {
        assert!(ChannelState::Undeployed.validate_transition(ChannelState::Starting).is_err());
    }

    #[test]
    fn pause_then_resume_round_trips_through_starting() {
        let started = ChannelState::Started;
        let pausing = started.validate_transition(ChannelState::Pausing).unwrap();
        let paused = pausing.validate_transition(ChannelState::Paused).unwrap();
        let resumed = paused.validate_transition(ChannelState::Starting).unwrap();
        assert_eq!(resumed, ChannelState::Starting);
    }

    #[test]
    fn stopped_channel_can_redeploy_or_fully_undeploy() {
        assert!(ChannelState::Stopped.validate_transition(ChannelState::Deployed).is_ok());
        assert!(ChannelState::Stopped.validate_transition(ChannelState::Undeployed).is_ok());
    }
}
