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

//! Channel engine CLI: reads a JSON channel configuration, deploys and starts a
//! `Channel`, then blocks until interrupted. Configuration is read once at startup;
//! changing it requires restarting the process (spec: "changes require redeploy").

use clap::Parser;
use rumtk_channel_engine::aggregator::{ResponseAggregator, ResponsePolicy, ResponseUpdatePolicy};
use rumtk_channel_engine::chain::{Destination, DestinationChain};
use rumtk_channel_engine::channel::Channel;
use rumtk_channel_engine::datastore::InMemoryDatastore;
use rumtk_channel_engine::events::TracingEventDispatcher;
use rumtk_channel_engine::queue::QueuePolicy;
use rumtk_channel_engine::source::{
    DelimitedBatchAdaptor, Hl7V2BatchAdaptor, HttpSourceTransport, JmsSourceTransport,
    MllpDestinationSender, MllpSourceTransport, SingleMessageBatchAdaptor, SourceConnector,
    WebServicesSourceTransport,
};
use rumtk_channel_engine::EngineServices;
use rumtk_core::core::RUMResult;
use rumtk_core::json::serialization::from_str;
use rumtk_core::strings::{format_compact, RUMString};
use rumtk_mllp::mllp::{FilterPolicy, MLLPTransport};
use rumtk_serializers::DataType;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Channel engine CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct RUMTKInterfaceArgs {
    /// Path to the channel's JSON configuration file.
    #[arg(short, long)]
    config: RUMString,
    /// Seconds to drain destination queues for on shutdown before aborting workers.
    #[arg(short, long, default_value_t = 30)]
    drain_timeout: u64,
}

#[derive(Debug, Deserialize)]
struct EngineConfig {
    channel_id: RUMString,
    server_id: RUMString,
    data_type: RUMString,
    #[serde(default = "default_batch_adaptor")]
    batch_adaptor: RUMString,
    source: TransportConfig,
    chains: Vec<ChainConfig>,
}

fn default_batch_adaptor() -> RUMString {
    RUMString::from("single")
}

#[derive(Debug, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
enum TransportConfig {
    Mllp {
        bind_ip: Option<RUMString>,
        port: u16,
        #[serde(default)]
        local: bool,
        #[serde(default = "default_filter_policy")]
        filter_policy: RUMString,
    },
    Http {
        bind_ip: RUMString,
        port: u16,
    },
    Jms,
    WebServices,
}

fn default_filter_policy() -> RUMString {
    RUMString::from("none")
}

#[derive(Debug, Deserialize)]
struct ChainConfig {
    name: RUMString,
    destinations: Vec<DestinationConfig>,
}

#[derive(Debug, Deserialize)]
struct DestinationConfig {
    meta_data_id: u32,
    name: RUMString,
    data_type: RUMString,
    #[serde(default)]
    queue_enabled: bool,
    #[serde(default)]
    queue_send_first: bool,
    #[serde(default = "default_queue_threads")]
    queue_threads: usize,
    #[serde(default = "default_queue_capacity")]
    queue_buffer_capacity: usize,
    sender: SenderConfig,
}

fn default_queue_threads() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    1000
}

#[derive(Debug, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
enum SenderConfig {
    Mllp {
        ip: RUMString,
        port: u16,
        #[serde(default = "default_filter_policy")]
        filter_policy: RUMString,
    },
}

fn parse_data_type(raw: &str) -> RUMResult<DataType> {
    match raw {
        "HL7V2" => Ok(DataType::HL7V2),
        "HL7V3" => Ok(DataType::HL7V3),
        "XML" => Ok(DataType::Xml),
        "JSON" => Ok(DataType::Json),
        "RAW" => Ok(DataType::Raw),
        "DELIMITED" => Ok(DataType::Delimited),
        "X12" => Ok(DataType::X12),
        "NCPDP" => Ok(DataType::Ncpdp),
        "DICOM" => Ok(DataType::Dicom),
        other => Err(format_compact!("Unknown data type '{}'", other)),
    }
}

fn parse_filter_policy(raw: &str) -> FilterPolicy {
    match raw {
        "escape" => FilterPolicy::EscapeInput,
        "filter" => FilterPolicy::FilterInput,
        _ => FilterPolicy::None,
    }
}

fn build_batch_adaptor(name: &str) -> Box<dyn rumtk_channel_engine::source::BatchAdaptor> {
    match name {
        "hl7v2" => Box::new(Hl7V2BatchAdaptor::default()),
        "delimited" => Box::new(DelimitedBatchAdaptor { record_delimiter: '\n' }),
        _ => Box::new(SingleMessageBatchAdaptor),
    }
}

fn build_destination(cfg: DestinationConfig, services: EngineServices) -> RUMResult<Destination> {
    let data_type = parse_data_type(cfg.data_type.as_str())?;
    let sender: Arc<dyn rumtk_channel_engine::chain::DestinationSender> = match cfg.sender {
        SenderConfig::Mllp { ip, port, filter_policy } => Arc::new(
            MllpDestinationSender::connect(ip.as_str(), port, parse_filter_policy(filter_policy.as_str()))
                .map_err(RUMString::from)?,
        ),
    };
    let queue_policy = QueuePolicy {
        thread_count: cfg.queue_threads.max(1),
        group_by: None,
        buffer_capacity: cfg.queue_buffer_capacity,
    };
    Ok(Destination::new(
        cfg.meta_data_id,
        cfg.name,
        data_type,
        cfg.queue_enabled,
        cfg.queue_send_first,
        sender,
        queue_policy,
        services,
    ))
}

fn build_chains(configs: Vec<ChainConfig>, services: EngineServices) -> RUMResult<Vec<DestinationChain>> {
    let mut chains = Vec::with_capacity(configs.len());
    for chain_cfg in configs {
        let mut destinations = Vec::with_capacity(chain_cfg.destinations.len());
        for destination_cfg in chain_cfg.destinations {
            destinations.push(build_destination(destination_cfg, services.clone())?);
        }
        chains.push(DestinationChain::new(chain_cfg.name, destinations));
    }
    Ok(chains)
}

async fn run(config: EngineConfig, drain_timeout: Duration) -> RUMResult<()> {
    let data_type = parse_data_type(config.data_type.as_str())?;
    let events = Arc::new(TracingEventDispatcher);
    let services = EngineServices::new(events.clone(), Arc::new(InMemoryDatastore::new()));
    let chains = build_chains(config.chains, services.clone())?;
    let mut connector = SourceConnector::new(
        config.channel_id.clone(),
        config.server_id,
        data_type,
        build_batch_adaptor(config.batch_adaptor.as_str()),
        chains,
        services,
    );
    connector.response_aggregator = Some(ResponseAggregator::new(ResponsePolicy::Aggregate, ResponseUpdatePolicy::Never));
    let connector = Arc::new(connector);
    let mut channel = Channel::new(config.channel_id, connector, events);
    channel.deploy().map_err(RUMString::from)?;

    match config.source {
        TransportConfig::Mllp { bind_ip, port, local, filter_policy } => {
            let policy = parse_filter_policy(filter_policy.as_str());
            let transport = match (bind_ip, local) {
                (Some(ip), _) => MLLPTransport::new(ip.as_str(), port, policy, true),
                (None, true) => MLLPTransport::listen_local(port, policy),
                (None, false) => MLLPTransport::listen(port, policy),
            }
            .map_err(RUMString::from)?;
            channel
                .start(Arc::new(MllpSourceTransport::new(Arc::new(transport))))
                .await
                .map_err(RUMString::from)?;
        }
        TransportConfig::Http { bind_ip, port } => {
            let bind_addr: SocketAddr = format!("{}:{}", bind_ip, port)
                .parse()
                .map_err(|e: std::net::AddrParseError| format_compact!("{}", e))?;
            channel
                .start(Arc::new(HttpSourceTransport { bind_addr }))
                .await
                .map_err(RUMString::from)?;
        }
        TransportConfig::Jms => {
            channel.start(Arc::new(JmsSourceTransport)).await.map_err(RUMString::from)?;
        }
        TransportConfig::WebServices => {
            channel
                .start(Arc::new(WebServicesSourceTransport))
                .await
                .map_err(RUMString::from)?;
        }
    }

    tracing::info!(channel = %channel.channel_id, "channel running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await.ok();
    channel.pause().map_err(RUMString::from)?;
    channel.stop(drain_timeout).await.map_err(RUMString::from)?;
    Ok(())
}

fn main() {
    rumtk_core::log::logging::init_logging("info");
    let args = RUMTKInterfaceArgs::parse();
    let raw_config = std::fs::read_to_string(args.config.as_str()).expect("Failed to read configuration file");
    let config: EngineConfig = from_str(&raw_config).expect("Failed to parse configuration file");

    let rt = tokio::runtime::Runtime::new().expect("Failed to start async runtime");
    if let Err(e) = rt.block_on(run(config, Duration::from_secs(args.drain_timeout))) {
        tracing::error!(error = %e, "channel exited with an error");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_data_type_accepts_every_spec_data_type() {
        assert!(matches!(parse_data_type("HL7V2"), Ok(DataType::HL7V2)));
        assert!(matches!(parse_data_type("HL7V3"), Ok(DataType::HL7V3)));
        assert!(matches!(parse_data_type("XML"), Ok(DataType::Xml)));
        assert!(matches!(parse_data_type("JSON"), Ok(DataType::Json)));
        assert!(matches!(parse_data_type("RAW"), Ok(DataType::Raw)));
        assert!(matches!(parse_data_type("DELIMITED"), Ok(DataType::Delimited)));
        assert!(matches!(parse_data_type("X12"), Ok(DataType::X12)));
        assert!(matches!(parse_data_type("NCPDP"), Ok(DataType::Ncpdp)));
        assert!(matches!(parse_data_type("DICOM"), Ok(DataType::Dicom)));
    }

    #[test]
    fn parse_data_type_rejects_unknown_type() {
        assert!(parse_data_type("COBOL-COPYBOOK").is_err());
    }

    #[test]
    fn parse_filter_policy_defaults_to_none_for_unknown_values() {
        assert!(matches!(parse_filter_policy("escape"), FilterPolicy::EscapeInput));
        assert!(matches!(parse_filter_policy("filter"), FilterPolicy::FilterInput));
        assert!(matches!(parse_filter_policy("bogus"), FilterPolicy::None));
    }

    #[test]
    fn mllp_source_config_deserializes_with_defaults() {
        let raw = r#"{"transport": "mllp", "port": 2575}"#;
        let config: TransportConfig = from_str(raw).unwrap();
        match config {
            TransportConfig::Mllp { bind_ip, port, local, filter_policy } => {
                assert_eq!(bind_ip, None);
                assert_eq!(port, 2575);
                assert!(!local);
                assert_eq!(filter_policy.as_str(), "none");
            }
            _ => panic!("expected Mllp variant"),
        }
    }

    #[test]
    fn engine_config_round_trips_from_json() {
        let raw = r#"{
            "channel_id": "chan-1",
            "server_id": "srv-1",
            "data_type": "HL7V2",
            "source": {"transport": "mllp", "port": 2575},
            "chains": [
                {
                    "name": "chain-1",
                    "destinations": [
                        {
                            "meta_data_id": 1,
                            "name": "dest-1",
                            "data_type": "HL7V2",
                            "sender": {"transport": "mllp", "ip": "127.0.0.1", "port": 6000}
                        }
                    ]
                }
            ]
        }"#;
        let config: EngineConfig = from_str(raw).unwrap();
        assert_eq!(config.channel_id.as_str(), "chan-1");
        assert_eq!(config.batch_adaptor.as_str(), "single");
        assert_eq!(config.chains.len(), 1);
        assert_eq!(config.chains[0].destinations.len(), 1);
        assert_eq!(config.chains[0].destinations[0].queue_threads, 1);
        assert_eq!(config.chains[0].destinations[0].queue_buffer_capacity, 1000);
    }
}
