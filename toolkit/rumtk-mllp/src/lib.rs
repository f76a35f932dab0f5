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

///
/// Generic Minimal Lower Layer Protocol (MLLP) framing over TCP.
///
/// This is the same block framing used by HL7's MLLP Release 2:
///
/// `HL7-Content-Block = SB, dddd, EB, CR`
///
/// but this crate carries no HL7-specific knowledge. The payload (`dddd`) is
/// an opaque byte slice, so this transport is shared by every wire protocol
/// the engine speaks over MLLP/TCP (HL7 v2 ER7, HL7 v3 XML, or anything
/// else framed the same way).
///
pub mod mllp {
    use compact_str::format_compact;
    use rumtk_core::core::RUMResult;
    use rumtk_core::net::tcp::{
        ClientIDList, ClientList, RUMClientHandle, RUMNetMessage, RUMServerHandle, ANYHOST,
        LOCALHOST,
    };
    use rumtk_core::strings::RUMString;
    use rumtk_core::{rumtk_connect, rumtk_create_server, rumtk_start_server};
    use std::sync::{Arc, Mutex};

    /// Start Block control byte.
    pub const SB: u8 = 0x0b;
    /// Acknowledgement control byte. Not part of the framing itself; some
    /// peers send a bare ACK/NACK byte as the entire content of a block.
    pub const ACK: u8 = 0x06;
    /// Negative acknowledgement control byte.
    pub const NACK: u8 = 0x15;
    /// End Block control byte.
    pub const EB: u8 = 0x1c;
    /// Carriage return that terminates every block.
    pub const CR: u8 = 0x0d;

    ///
    /// Wraps `payload` in the `SB, payload, EB, CR` envelope.
    ///
    /// # Examples
    /// ```
    /// use rumtk_mllp::mllp::{frame, SB, EB, CR};
    /// let framed = frame(b"hello");
    /// assert_eq!(framed[0], SB);
    /// assert_eq!(framed[framed.len() - 2], EB);
    /// assert_eq!(framed[framed.len() - 1], CR);
    /// ```
    ///
    pub fn frame(payload: &[u8]) -> RUMNetMessage {
        let mut msg = RUMNetMessage::with_capacity(payload.len() + 3);
        msg.push(SB);
        msg.extend_from_slice(payload);
        msg.push(EB);
        msg.push(CR);
        msg
    }

    ///
    /// Strips the `SB, payload, EB, CR` envelope off a received message,
    /// returning the raw payload. Errors if the framing bytes are missing or
    /// malformed.
    ///
    /// # Examples
    /// ```
    /// use rumtk_mllp::mllp::{frame, unframe};
    /// let framed = frame(b"hello");
    /// assert_eq!(unframe(&framed).unwrap(), b"hello".to_vec());
    /// ```
    ///
    pub fn unframe(framed: &[u8]) -> RUMResult<Vec<u8>> {
        if framed.len() < 3 {
            return Err(format_compact!(
                "Message too short ({} bytes) to contain MLLP framing!",
                framed.len()
            ));
        }
        if framed[0] != SB {
            return Err(format_compact!(
                "Expected Start Block byte 0x{:02x} at position 0 but found 0x{:02x}!",
                SB,
                framed[0]
            ));
        }
        let last = framed.len() - 1;
        if framed[last] != CR {
            return Err(format_compact!(
                "Expected trailing CR byte 0x{:02x} but found 0x{:02x}!",
                CR,
                framed[last]
            ));
        }
        if framed[last - 1] != EB {
            return Err(format_compact!(
                "Expected End Block byte 0x{:02x} before CR but found 0x{:02x}!",
                EB,
                framed[last - 1]
            ));
        }
        Ok(framed[1..last - 1].to_vec())
    }

    ///
    /// Controls how inbound payload bytes are treated with respect to stray
    /// MLLP control characters that show up inside what should be the
    /// message body.
    ///
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FilterPolicy {
        /// Pass the payload through untouched.
        None,
        /// Escape stray SB/EB control bytes found inside the payload.
        EscapeInput,
        /// Drop stray SB/EB control bytes found inside the payload.
        FilterInput,
    }

    impl FilterPolicy {
        pub fn apply(&self, payload: &[u8]) -> Vec<u8> {
            match self {
                FilterPolicy::None => payload.to_vec(),
                FilterPolicy::EscapeInput => {
                    let mut out = Vec::with_capacity(payload.len());
                    for &b in payload {
                        if b == SB || b == EB {
                            out.push(b'\\');
                        }
                        out.push(b);
                    }
                    out
                }
                FilterPolicy::FilterInput => payload
                    .iter()
                    .copied()
                    .filter(|&b| b != SB && b != EB)
                    .collect(),
            }
        }
    }

    ///
    /// Either side of a TCP connection, wrapped in the sync-friendly handle
    /// types from [rumtk_core::net::tcp].
    ///
    pub enum LowerLayer {
        Server(RUMServerHandle),
        Client(RUMClientHandle),
    }

    impl LowerLayer {
        pub fn init(ip: &str, port: u16, as_server: bool) -> RUMResult<LowerLayer> {
            match as_server {
                true => Ok(LowerLayer::Server(rumtk_create_server!(ip, port)?)),
                false => Ok(LowerLayer::Client(rumtk_connect!(ip, port)?)),
            }
        }

        pub fn start(&mut self) -> RUMResult<()> {
            match self {
                LowerLayer::Server(handle) => rumtk_start_server!(handle),
                LowerLayer::Client(_) => Ok(()),
            }
        }

        pub fn send_message(
            &mut self,
            message: &RUMNetMessage,
            client_id: &RUMString,
        ) -> RUMResult<()> {
            match self {
                LowerLayer::Server(handle) => handle.send(client_id, message),
                LowerLayer::Client(handle) => handle.send(message),
            }
        }

        pub fn receive_message(&mut self, client_id: &RUMString) -> RUMResult<RUMNetMessage> {
            match self {
                LowerLayer::Server(handle) => handle.receive(client_id),
                LowerLayer::Client(handle) => handle.receive(),
            }
        }

        pub fn get_clients(&self) -> ClientList {
            match self {
                LowerLayer::Server(handle) => handle.get_clients(),
                LowerLayer::Client(_) => ClientList::new(),
            }
        }

        pub fn get_client_ids(&self) -> ClientIDList {
            match self {
                LowerLayer::Server(handle) => handle.get_client_ids(),
                LowerLayer::Client(_) => ClientIDList::new(),
            }
        }
    }

    pub type SafeLowerLayer = Arc<Mutex<LowerLayer>>;

    ///
    /// Top level MLLP transport. Owns a [LowerLayer] (server or client side)
    /// plus the [FilterPolicy] applied to outbound/inbound payload bytes.
    ///
    pub struct MLLPTransport {
        transport_layer: SafeLowerLayer,
        filter_policy: FilterPolicy,
    }

    impl MLLPTransport {
        ///
        /// Bind a server on all interfaces (`0.0.0.0`).
        ///
        pub fn listen(port: u16, filter_policy: FilterPolicy) -> RUMResult<MLLPTransport> {
            MLLPTransport::new(ANYHOST, port, filter_policy, true)
        }

        ///
        /// Bind a server on `127.0.0.1` only.
        ///
        pub fn listen_local(port: u16, filter_policy: FilterPolicy) -> RUMResult<MLLPTransport> {
            MLLPTransport::new(LOCALHOST, port, filter_policy, true)
        }

        ///
        /// Connect out to a remote MLLP listener.
        ///
        pub fn connect(
            ip: &str,
            port: u16,
            filter_policy: FilterPolicy,
        ) -> RUMResult<MLLPTransport> {
            MLLPTransport::new(ip, port, filter_policy, false)
        }

        pub fn new(
            ip: &str,
            port: u16,
            filter_policy: FilterPolicy,
            as_server: bool,
        ) -> RUMResult<MLLPTransport> {
            let mut transport_layer = LowerLayer::init(ip, port, as_server)?;
            transport_layer.start()?;
            Ok(MLLPTransport {
                transport_layer: SafeLowerLayer::new(Mutex::new(transport_layer)),
                filter_policy,
            })
        }

        pub fn next_layer(&self) -> SafeLowerLayer {
            Arc::clone(&self.transport_layer)
        }

        pub fn filter_policy(&self) -> FilterPolicy {
            self.filter_policy
        }

        pub fn send_message(&self, payload: &[u8], client_id: &RUMString) -> RUMResult<()> {
            let framed = frame(&self.filter_policy.apply(payload));
            self.transport_layer
                .lock()
                .unwrap()
                .send_message(&framed, client_id)
        }

        pub fn receive_message(&self, client_id: &RUMString) -> RUMResult<Vec<u8>> {
            let framed = self
                .transport_layer
                .lock()
                .unwrap()
                .receive_message(client_id)?;
            unframe(&framed)
        }

        pub fn get_clients(&self) -> ClientList {
            self.transport_layer.lock().unwrap().get_clients()
        }

        pub fn get_client_ids(&self) -> ClientIDList {
            self.transport_layer.lock().unwrap().get_client_ids()
        }
    }

    pub type SafeMLLPTransport = Arc<MLLPTransport>;

    ///
    /// A single logical peer conversation over an [MLLPTransport]. On the
    /// server side one [MLLPChannel] exists per connected client; on the
    /// client side there is exactly one, addressing the remote server.
    ///
    pub struct MLLPChannel {
        transport: SafeMLLPTransport,
        peer: RUMString,
    }

    impl MLLPChannel {
        ///
        /// Enumerate one channel per client currently connected to a server
        /// transport.
        ///
        pub fn from_server(transport: &SafeMLLPTransport) -> Vec<MLLPChannel> {
            transport
                .get_client_ids()
                .into_iter()
                .map(|peer| MLLPChannel {
                    transport: Arc::clone(transport),
                    peer,
                })
                .collect::<Vec<_>>()
        }

        ///
        /// Build the single channel addressing a client transport's peer.
        ///
        pub fn from_client(transport: &SafeMLLPTransport, peer: RUMString) -> MLLPChannel {
            MLLPChannel {
                transport: Arc::clone(transport),
                peer,
            }
        }

        pub fn open(transport: SafeMLLPTransport, peer: RUMString) -> MLLPChannel {
            MLLPChannel { transport, peer }
        }

        pub fn peer(&self) -> &RUMString {
            &self.peer
        }

        pub fn send_message(&self, payload: &[u8]) -> RUMResult<()> {
            self.transport.send_message(payload, &self.peer)
        }

        pub fn receive_message(&self) -> RUMResult<Vec<u8>> {
            self.transport.receive_message(&self.peer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mllp::{frame, unframe, FilterPolicy, MLLPTransport, EB, SB};

    #[test]
    fn frames_round_trip() {
        let payload = b"MSH|^~\\&|A|B|C|D|20240101||ADT^A01|1|P|2.3\r";
        let framed = frame(payload);
        assert_eq!(unframe(&framed).unwrap(), payload.to_vec());
    }

    #[test]
    fn unframe_rejects_missing_start_block() {
        let mut framed = frame(b"payload");
        framed[0] = b'X';
        assert!(unframe(&framed).is_err());
    }

    #[test]
    fn unframe_rejects_too_short_message() {
        assert!(unframe(&[SB]).is_err());
    }

    #[test]
    fn escape_policy_escapes_control_bytes() {
        let payload = vec![SB, b'a', EB];
        let escaped = FilterPolicy::EscapeInput.apply(&payload);
        assert_eq!(escaped, vec![b'\\', SB, b'a', b'\\', EB]);
    }

    #[test]
    fn filter_policy_drops_control_bytes() {
        let payload = vec![SB, b'a', EB];
        let filtered = FilterPolicy::FilterInput.apply(&payload);
        assert_eq!(filtered, vec![b'a']);
    }

    #[test]
    fn connect_fails_cleanly_without_a_listener() {
        // Port 1 is a privileged port nothing is listening on in a test sandbox; the
        // connect should fail cleanly rather than hang.
        let result = MLLPTransport::connect("127.0.0.1", 1, FilterPolicy::None);
        assert!(result.is_err());
    }
}
