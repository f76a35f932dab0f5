/*
 *     rumtk attempts to implement HL7 and medical protocols for interoperability in medicine.
 *     This toolkit aims to be reliable, simple, performant, and standards compliant.
 *     Copyright (C) 2025  Luis M. Santos, M.D.
 *
 *     This program is free software: you can redistribute it and/or modify
 *     it under the terms of the GNU General Public License as published by
 *     the Free Software Foundation, either version 3 of the License, or
 *     (at your option) any later version.
 *
 *     This program is distributed in the hope that it will be useful,
 *     but WITHOUT ANY WARRANTY; without even the implied warranty of
 *     MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *     GNU General Public License for more details.
 *
 *     You should have received a copy of the GNU General Public License
 *     along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Narrow HL7 v2 <-> MLLP passthrough tool: reads ER7 text from stdin and ships it over
//! MLLP when outbound, or listens for MLLP traffic and writes the parsed message back out
//! to stdout as JSON when inbound, ACKing every inbound message it can parse.

use clap::Parser;
use rumtk_core::core::RUMResult;
use rumtk_core::net::tcp::LOCALHOST;
use rumtk_core::strings::RUMString;
use rumtk_core::{rumtk_read_stdin, rumtk_serialize, rumtk_write_stdout};
use rumtk_hl7_v2::hl7_v2_parser::v2_parser::V2Message;
use rumtk_mllp::mllp::{FilterPolicy, MLLPChannel, MLLPTransport, SafeMLLPTransport};
use std::sync::Arc;
use std::time::Duration;

/// HL7 V2 Interface CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct RUMTKInterfaceArgs {
    /// For interface crate only. Specifies the ip address to connect to.
    ///
    /// In outbound mode, `--ip` and `--port` are required parameters.
    ///
    /// In inbound mode, you can omit either or both parameters.
    #[arg(short, long)]
    ip: Option<RUMString>,
    /// For interface crate only. Specifies the port to connect to.
    ///
    /// In outbound mode, `--ip` and `--port` are required parameters.
    ///
    /// In inbound mode, you can omit either or both parameters.
    #[arg(short, long)]
    port: Option<u16>,
    /// Filter mode under which the interface will operate. Meaning, if an input has unescaped
    /// characters that should have been escaped per the standard, what should the interface do
    /// to handle them.
    ///
    /// Options should be `escape`, `filter`, `none`.
    #[arg(short, long, default_value_t = RUMString::from("none"))]
    filter_policy: RUMString,
    /// For interface crate only. Specifies if the interface is in outbound mode.
    ///
    /// In outbound mode, `--ip` and `--port` are required parameters.
    ///
    /// In inbound mode, you can omit either or both parameters.
    #[arg(short, long)]
    outbound: bool,
    /// Is the interface meant to be bound to the loopback address and remain hidden from the
    /// outside world.
    ///
    /// If a NIC IP is defined via `--ip`, that value will override this flag.
    #[arg(short, long)]
    local: bool,
    /// Only used if in client/outbound mode. Places the interface into a loop constantly looking
    /// for messages in stdin to ship to the connected listening interface.
    #[arg(short, long)]
    daemon: bool,
}

fn parse_filter_policy(raw: &str) -> FilterPolicy {
    match raw {
        "escape" => FilterPolicy::EscapeInput,
        "filter" => FilterPolicy::FilterInput,
        _ => FilterPolicy::None,
    }
}

fn outbound_send(channel: &MLLPChannel) -> RUMResult<()> {
    let stdin_msg = rumtk_read_stdin!()?;
    if stdin_msg.is_empty() {
        return Ok(());
    }
    let msg = V2Message::from_str(&stdin_msg)?;
    channel.send_message(msg.to_raw().as_bytes())
}

fn outbound_loop(channel: &MLLPChannel) {
    loop {
        if let Err(e) = outbound_send(channel) {
            tracing::warn!(error = %e, "outbound send failed");
        }
    }
}

fn inbound_loop(transport: &SafeMLLPTransport) {
    loop {
        let channels = MLLPChannel::from_server(transport);
        if channels.is_empty() {
            std::thread::sleep(Duration::from_millis(50));
            continue;
        }
        for channel in &channels {
            let raw_msg = match channel.receive_message() {
                Ok(msg) => msg,
                Err(_) => continue,
            };
            let text = String::from_utf8_lossy(&raw_msg).into_owned();
            let msg = match V2Message::from_str(&text) {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(peer = %channel.peer(), error = %e, "failed to parse inbound message");
                    continue;
                }
            };
            if let Ok(ack) = msg.generate_ack("AA") {
                if let Err(e) = channel.send_message(ack.as_bytes()) {
                    tracing::warn!(peer = %channel.peer(), error = %e, "failed to ack inbound message");
                }
            }
            match rumtk_serialize!(&msg) {
                Ok(serialized) => rumtk_write_stdout!(&serialized),
                Err(e) => tracing::warn!(error = %e, "failed to serialize inbound message"),
            }
        }
    }
}

fn main() {
    rumtk_core::log::logging::init_logging("info");
    let args = RUMTKInterfaceArgs::parse();
    let filter_policy = parse_filter_policy(args.filter_policy.as_str());

    if args.outbound {
        let ip = match args.local {
            true => args.ip.unwrap_or_else(|| LOCALHOST.parse().unwrap()),
            false => args.ip.expect("Must provide an IP address"),
        };
        let port = args.port.expect("Must provide a port number");
        let transport = Arc::new(
            MLLPTransport::connect(ip.as_str(), port, filter_policy).expect("MLLP connection failed"),
        );
        let channel = MLLPChannel::from_client(&transport, RUMString::from(format!("{}:{}", ip, port)));

        if args.daemon {
            outbound_loop(&channel);
        } else if let Err(e) = outbound_send(&channel) {
            tracing::warn!(error = %e, "outbound send failed");
        }
    } else {
        let port = args.port.unwrap_or(2575);
        let transport = Arc::new(
            match (args.ip.as_ref(), args.local) {
                (Some(ip), _) => MLLPTransport::new(ip.as_str(), port, filter_policy, true),
                (None, true) => MLLPTransport::listen_local(port, filter_policy),
                (None, false) => MLLPTransport::listen(port, filter_policy),
            }
            .expect("MLLP listening connection failed to bind a network interface!"),
        );
        inbound_loop(&transport);
    }
}
