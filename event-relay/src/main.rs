//! This binary relays Stratos chain events to an SDS node.
//!
//! It subscribes to every relayed `message.action` on a Tendermint node, turns each event into a
//! command, and posts the command to the SDS node's HTTP API.
//!
//! ## Usage
//! ```sh
//! cargo run -- --tendermint-url ws://127.0.0.1:26657/websocket --sds-network-address 127.0.0.1 --sds-api-port 9608
//! ```
//!
//! The process exits with an error if any subscription fails or the websocket connection ends.
use std::sync::Arc;

use clap::Parser;
use event_relay::config::RelayConfig;
use event_relay::error::{
    ForwarderSnafu,
    RegistrationSnafu,
    Result,
    TransportSnafu,
    WorkerJoinSnafu,
};
use event_relay::forwarder::HttpForwarder;
use event_relay::registrar::Registrar;
use event_relay::relay::Relay;
use event_relay::tendermint::TendermintClient;
use log::info;
use snafu::ResultExt;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = RelayConfig::parse();

    // The blocking client owns a runtime of its own, so it is built off the async threads.
    let forwarder_config = config.forwarder_config();
    let forwarder = tokio::task::spawn_blocking(move || HttpForwarder::new(&forwarder_config))
        .await
        .context(WorkerJoinSnafu)?
        .context(ForwarderSnafu)?;
    info!("Forwarding commands to {}", forwarder.base_url());

    let relay = Arc::new(Relay::new(config.handler_context(), forwarder));

    let mut client = TendermintClient::connect(&config.tendermint_url, config.ack_timeout())
        .await
        .context(TransportSnafu)?;

    let registered = Registrar::new(relay)
        .register_all(&mut client)
        .await
        .context(RegistrationSnafu)?;
    info!("Registered {registered} subscriptions");

    client.run().await.context(TransportSnafu)
}
