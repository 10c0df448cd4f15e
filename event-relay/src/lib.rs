//! # Event Relay Library
//!
//! This library provides the components for listening to Stratos chain events over Tendermint's
//! websocket interface and relaying them as JSON commands to an SDS node's HTTP API.
//!
//! ## Flow
//! 1. The [`registrar`] subscribes one filter per [`handlers::EventKind`] through a
//!    [`registrar::Subscribe`] transport such as [`tendermint::TendermintClient`].
//! 2. Each matching event reaches the [`relay`], which runs the category's handler.
//! 3. A handler reads the event's attributes ([`event`]), re-encodes addresses and keys
//!    ([`address`]), and yields a [`command::Command`].
//! 4. The [`forwarder`] posts the command to the SDS node.

/// Bech32 address and Ed25519 public key conversion.
pub mod address;

/// Commands accepted by the SDS node and the endpoints they are posted to.
pub mod command;

/// Command line and environment configuration.
pub mod config;

/// Process level errors.
pub mod error;

/// Chain event records and attribute lookup.
pub mod event;

/// Delivery of commands to the SDS node.
pub mod forwarder;

/// The event categories and the handler for each of them.
///
/// Handlers are pure: they turn an event into a command, a skip, or an error, and never perform
/// I/O themselves.
pub mod handlers;

/// Subscription of every event category with a transport.
pub mod registrar;

/// Runs handlers and forwards their commands, logging every per-event failure.
pub mod relay;

/// Tendermint websocket subscription client.
pub mod tendermint;
