//! # Subscription Registrar
//!
//! Binds the filter of every [`EventKind`] to its handler with a [`Subscribe`] transport.
//!
//! Registration runs in [`EventKind::ALL`] order and stops at the first failure. Bindings made
//! before the failure stay in place, but the failure is always returned: a category that is not
//! subscribed would lose all of its events silently, so a partial registration is treated as fatal
//! by the caller.

use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use snafu::Snafu;

use crate::event::ResultEvent;
use crate::forwarder::Forward;
use crate::handlers::EventKind;
use crate::relay::Relay;

/// Callback invoked by the transport for every event matching a subscription.
pub type EventCallback = Arc<dyn Fn(ResultEvent) + Send + Sync>;

/// A transport that can deliver chain events matching a filter expression.
#[async_trait]
pub trait Subscribe {
    /// The error returned when a subscription cannot be made.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Subscribes to events matching `filter`, delivering each one to `callback`.
    async fn subscribe(&mut self, filter: &str, callback: EventCallback) -> Result<(), Self::Error>;
}

/// Error returned when a filter could not be subscribed.
#[derive(Debug, Snafu)]
#[snafu(display(
    "Failed to subscribe to {filter} after {registered} successful subscriptions: {source}"
))]
pub struct RegistrationError {
    /// The filter that failed.
    pub filter: String,
    /// How many filters were subscribed before the failure. They are not rolled back.
    pub registered: usize,
    /// The transport error.
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

/// Registers every event category with a subscription transport.
pub struct Registrar<F> {
    relay: Arc<Relay<F>>,
}

impl<F> Registrar<F>
where
    F: Forward + 'static,
{
    /// Creates a registrar whose callbacks feed `relay`.
    pub fn new(relay: Arc<Relay<F>>) -> Self {
        Self { relay }
    }

    /// Subscribes every category in order, returning how many were subscribed.
    ///
    /// # Errors
    /// Returns a [`RegistrationError`] for the first filter the transport rejects. No further
    /// filters are attempted.
    pub async fn register_all<S>(&self, subscriber: &mut S) -> Result<usize, RegistrationError>
    where
        S: Subscribe + Send,
    {
        for (registered, kind) in EventKind::ALL.into_iter().enumerate() {
            let filter = kind.filter();
            let relay = Arc::clone(&self.relay);
            let callback: EventCallback = Arc::new(move |event| relay.on_event(kind, event));

            subscriber
                .subscribe(&filter, callback)
                .await
                .map_err(|e| RegistrationError {
                    filter: filter.clone(),
                    registered,
                    source: Box::new(e),
                })?;

            info!("Subscribed to {filter}");
        }

        Ok(EventKind::ALL.len())
    }
}
