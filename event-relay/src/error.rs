//! Errors that stop the relay process.

use snafu::Snafu;

use crate::forwarder::ForwardError;
use crate::registrar::RegistrationError;
use crate::tendermint::TransportError;

/// Startup and shutdown failures of the relay.
///
/// Per-event failures never reach this type; they are logged by the relay and the event dropped.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The forwarder could not be built from the configuration.
    #[snafu(display("Failed to set up the SDS forwarder: {source}"))]
    Forwarder {
        /// The underlying forwarder error.
        source: ForwardError,
    },

    /// The Tendermint connection failed or ended.
    #[snafu(display("Tendermint transport error: {source}"))]
    Transport {
        /// The underlying transport error.
        source: TransportError,
    },

    /// Not every category could be subscribed.
    #[snafu(display("{source}"))]
    Registration {
        /// The underlying registration error.
        source: RegistrationError,
    },

    /// A blocking setup task did not complete.
    #[snafu(display("Setup task failed: {source}"))]
    WorkerJoin {
        /// The underlying join error.
        source: tokio::task::JoinError,
    },
}

/// Type alias for returning results with the relay [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
