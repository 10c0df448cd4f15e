//! Command line and environment configuration for the relay binary.

use std::time::Duration;

use clap::Parser;

use crate::address::AddressPrefix;
use crate::forwarder::ForwarderConfig;
use crate::handlers::HandlerContext;

/// CLI arguments parser using `clap` derive syntax.
///
/// Every flag can also be supplied through the environment variable named after it.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "Stratos Event Relay",
    version,
    about = "Relays Stratos chain events to the SDS node's HTTP API"
)]
pub struct RelayConfig {
    /// Websocket endpoint of the Tendermint node.
    #[arg(
        long,
        env = "TENDERMINT_URL",
        default_value = "ws://127.0.0.1:26657/websocket"
    )]
    pub tendermint_url: String,

    /// Host of the SDS node.
    #[arg(long, env = "SDS_NETWORK_ADDRESS", default_value = "127.0.0.1")]
    pub sds_network_address: String,

    /// Port of the SDS node's HTTP API.
    #[arg(long, env = "SDS_API_PORT", default_value_t = 9608)]
    pub sds_api_port: u16,

    /// Bech32 prefix node addresses are re-encoded under.
    #[arg(long, env = "P2P_ADDRESS_PREFIX", default_value = "stsds")]
    pub p2p_address_prefix: AddressPrefix,

    /// Timeout for each POST to the SDS node, in seconds.
    ///
    /// When absent the HTTP client's default applies.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// How long a subscription waits for the node to accept it, in seconds.
    #[arg(long, env = "ACK_TIMEOUT_SECS", default_value_t = 10)]
    pub ack_timeout_secs: u64,
}

impl RelayConfig {
    /// Where the forwarder posts commands.
    pub fn forwarder_config(&self) -> ForwarderConfig {
        ForwarderConfig {
            network_address: self.sds_network_address.clone(),
            api_port: self.sds_api_port,
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }

    /// The settings shared by all handlers.
    pub fn handler_context(&self) -> HandlerContext {
        HandlerContext {
            p2p_address_prefix: self.p2p_address_prefix,
        }
    }

    /// How long a subscription waits for its acknowledgement.
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_secs)
    }
}
