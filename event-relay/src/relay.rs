//! # Relay
//!
//! The [`Relay`] joins the handlers to a [`Forward`] implementation. [`Relay::dispatch`] reports
//! every result to its caller, while [`Relay::on_event`] is the adapter handed to the subscription
//! transport: it dispatches and turns every failure into a log line, so that a bad event never
//! affects the process or any other category.

use log::{debug, error, info};
use snafu::{ResultExt, Snafu};

use crate::event::ResultEvent;
use crate::forwarder::{Forward, ForwardError, ForwardResponse};
use crate::handlers::{EventKind, Handler, HandlerContext, HandlerError, Outcome};

/// Errors raised while relaying a single event.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RelayError {
    /// The event could not be turned into a command.
    #[snafu(display("{source}"))]
    Handle {
        /// The underlying handler error.
        source: HandlerError,
    },

    /// The command could not be forwarded.
    #[snafu(display("{source}"))]
    Deliver {
        /// The underlying forwarding error.
        source: ForwardError,
    },
}

/// What happened to a relayed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// A command was posted downstream.
    Forwarded {
        /// The endpoint path the command was posted to.
        path: &'static str,
        /// The SDS node's reply.
        response: ForwardResponse,
    },
    /// The handler decided not to forward anything.
    Skipped {
        /// Why nothing was forwarded.
        reason: &'static str,
    },
    /// The category has no handler; the event was only observed.
    Unimplemented,
}

/// Runs handlers and forwards their commands.
#[derive(Debug)]
pub struct Relay<F> {
    context: HandlerContext,
    forwarder: F,
}

impl<F: Forward> Relay<F> {
    /// Creates a relay that handles events with `context` and delivers through `forwarder`.
    pub fn new(context: HandlerContext, forwarder: F) -> Self {
        Self { context, forwarder }
    }

    /// The forwarder commands are delivered through.
    pub fn forwarder(&self) -> &F {
        &self.forwarder
    }

    /// Handles `event` as a `kind` event and forwards the resulting command, if any.
    ///
    /// The forwarder is only called once the handler has built a complete command.
    pub fn dispatch(&self, kind: EventKind, event: &ResultEvent) -> Result<Dispatched, RelayError> {
        let handler = match kind.handler() {
            Handler::Forward(handler) => handler,
            Handler::Unimplemented => return Ok(Dispatched::Unimplemented),
        };

        match handler(event, &self.context).context(HandleSnafu)? {
            Outcome::Forward(command) => {
                let response = self.forwarder.forward(&command).context(DeliverSnafu)?;
                Ok(Dispatched::Forwarded {
                    path: command.path(),
                    response,
                })
            }
            Outcome::Skip { reason } => Ok(Dispatched::Skipped { reason }),
        }
    }

    /// Relays `event` and logs the result instead of returning it.
    pub fn on_event(&self, kind: EventKind, event: ResultEvent) {
        if kind == EventKind::Prepay {
            info!("{event:?}");
        }

        match self.dispatch(kind, &event) {
            Ok(Dispatched::Forwarded { .. }) => {}
            Ok(Dispatched::Skipped { reason }) => {
                debug!("{} handler: {reason}", kind.action());
            }
            Ok(Dispatched::Unimplemented) => {
                info!("{} event observed, nothing forwarded: {event:?}", kind.action());
            }
            Err(e) => error!("{e}"),
        }
    }
}
