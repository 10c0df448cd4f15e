//! # Tendermint Subscription Transport
//!
//! A [`Subscribe`] implementation speaking Tendermint's JSON-RPC websocket protocol.
//!
//! ## Protocol
//! - A subscription is a `subscribe` request carrying the filter as `params.query`. The node
//!   acknowledges it with an empty `result` under the request id, or refuses it with an `error`.
//! - Every matching event then arrives as a `result` holding the `query` it matched together with
//!   the `events` attribute table. Events are routed to their subscription by that `query`.
//!
//! ## Workers
//! Each subscription owns a dedicated worker thread fed by an unbounded channel. Callbacks may block
//! (the HTTP forwarder does), and a slow callback only delays later events of its own category.

use std::collections::HashMap;
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use snafu::{ResultExt, Snafu};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::event::ResultEvent;
use crate::registrar::{EventCallback, Subscribe};

/// Websocket connection to a Tendermint node.
type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors raised by the Tendermint transport.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransportError {
    /// The websocket connection could not be opened.
    #[snafu(display("Failed to connect to {url}: {source}"))]
    Connect {
        /// The url that was dialed.
        url: String,
        /// The underlying websocket error.
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// A message could not be sent.
    #[snafu(display("Failed to send to the node: {source}"))]
    Send {
        /// The underlying websocket error.
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// A message could not be received.
    #[snafu(display("Failed to receive from the node: {source}"))]
    Receive {
        /// The underlying websocket error.
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// The node closed the connection.
    #[snafu(display("The node closed the websocket connection"))]
    ConnectionClosed,

    /// The node refused a subscription.
    #[snafu(display("The node refused subscription {filter}: {message}"))]
    Rejected {
        /// The refused filter.
        filter: String,
        /// The JSON-RPC error message.
        message: String,
    },

    /// The node did not acknowledge a subscription in time.
    #[snafu(display("No acknowledgement for subscription {filter} within {timeout:?}"))]
    AckTimeout {
        /// The unacknowledged filter.
        filter: String,
        /// How long the transport waited.
        timeout: Duration,
    },

    /// The worker thread for a subscription could not be started.
    #[snafu(display("Failed to start the worker for {filter}: {source}"))]
    SpawnWorker {
        /// The filter the worker was for.
        filter: String,
        /// The underlying io error.
        source: std::io::Error,
    },
}

/// A JSON-RPC message received from the node.
#[derive(Debug, Deserialize)]
struct RpcMessage {
    /// Id of the request this answers. Notifications reuse the subscription's id.
    #[serde(default)]
    id: Value,
    /// Acknowledgement or event payload.
    result: Option<Value>,
    /// Present when the request was refused.
    error: Option<RpcError>,
}

/// The `error` member of a JSON-RPC message.
#[derive(Debug, Deserialize)]
struct RpcError {
    /// Short description.
    message: String,
    /// Details, usually the node's reason for refusing.
    #[serde(default)]
    data: Option<Value>,
}

/// A received message, classified.
#[derive(Debug, PartialEq)]
enum Incoming {
    /// A request was accepted.
    Ack {
        /// Id of the accepted request.
        id: Value,
    },
    /// A request was refused.
    Rejected {
        /// Id of the refused request.
        id: Value,
        /// The node's reason.
        message: String,
    },
    /// An event for one of the subscriptions.
    Event(ResultEvent),
    /// Anything else.
    Ignored,
}

/// Classifies one text frame from the node.
fn parse_incoming(text: &str) -> serde_json::Result<Incoming> {
    let message: RpcMessage = serde_json::from_str(text)?;

    if let Some(error) = message.error {
        let reason = match error.data {
            Some(Value::String(data)) if !data.is_empty() => format!("{}: {data}", error.message),
            _ => error.message,
        };
        return Ok(Incoming::Rejected {
            id: message.id,
            message: reason,
        });
    }

    Ok(match message.result {
        Some(result) if has_query(&result) => Incoming::Event(serde_json::from_value(result)?),
        Some(_) => Incoming::Ack { id: message.id },
        None => Incoming::Ignored,
    })
}

/// Event notifications carry the query they matched; acknowledgements carry an empty result.
fn has_query(result: &Value) -> bool {
    result
        .get("query")
        .and_then(Value::as_str)
        .is_some_and(|query| !query.is_empty())
}

/// Whether a response id refers to the request sent with `expected`.
///
/// Nodes echo the id either as a number or as its decimal string.
fn id_matches(id: &Value, expected: u64) -> bool {
    match id {
        Value::Number(number) => number.as_u64() == Some(expected),
        Value::String(text) => text.parse::<u64>().ok() == Some(expected),
        _ => false,
    }
}

/// Tendermint websocket client delivering events to per-subscription workers.
pub struct TendermintClient {
    /// Outgoing half of the socket.
    write: SplitSink<Socket, Message>,
    /// Incoming half of the socket.
    read: SplitStream<Socket>,
    /// Id of the next subscribe request.
    next_id: u64,
    /// How long a subscribe request waits for its acknowledgement.
    ack_timeout: Duration,
    /// Worker channel for each subscribed filter.
    routes: HashMap<String, UnboundedSender<ResultEvent>>,
    /// One thread per subscription.
    workers: Vec<JoinHandle<()>>,
}

impl TendermintClient {
    /// Connects to the node's websocket endpoint, e.g. `ws://127.0.0.1:26657/websocket`.
    ///
    /// `ack_timeout` bounds how long each subscription waits for the node to accept it.
    pub async fn connect(url: &str, ack_timeout: Duration) -> Result<Self, TransportError> {
        let (socket, _) = connect_async(url).await.context(ConnectSnafu { url })?;
        info!("Connected to {url}");

        let (write, read) = socket.split();
        Ok(Self {
            write,
            read,
            next_id: 0,
            ack_timeout,
            routes: HashMap::new(),
            workers: Vec::new(),
        })
    }

    /// Number of active subscriptions.
    pub fn subscriptions(&self) -> usize {
        self.routes.len()
    }

    /// Delivers events to their workers until the connection ends.
    ///
    /// Always returns an error, since the connection is never expected to end. Events already
    /// handed to the workers are relayed before it returns.
    pub async fn run(mut self) -> Result<(), TransportError> {
        info!("Listening for events on {} subscriptions", self.routes.len());

        let error = loop {
            match self.next_incoming().await {
                Ok(Incoming::Event(event)) => self.route(event),
                Ok(_) => {}
                Err(e) => break e,
            }
        };

        self.routes.clear();
        let workers = std::mem::take(&mut self.workers);
        let drained = tokio::task::spawn_blocking(move || {
            workers
                .into_iter()
                .map(JoinHandle::join)
                .filter(Result::is_err)
                .count()
        })
        .await;
        match drained {
            Ok(0) => {}
            Ok(panicked) => error!("{panicked} subscription workers panicked"),
            Err(e) => error!("Failed to wait for the subscription workers: {e}"),
        }

        Err(error)
    }

    /// Waits for the response to request `id`, routing any events that arrive first.
    async fn await_ack(&mut self, id: u64, filter: &str) -> Result<(), TransportError> {
        loop {
            match self.next_incoming().await? {
                Incoming::Ack { id: got } if id_matches(&got, id) => return Ok(()),
                Incoming::Rejected { id: got, message } if id_matches(&got, id) => {
                    return RejectedSnafu { filter, message }.fail();
                }
                Incoming::Event(event) => self.route(event),
                other => debug!("Ignoring {other:?} while waiting for subscription {id}"),
            }
        }
    }

    /// Reads the next text message, answering pings along the way.
    async fn next_incoming(&mut self) -> Result<Incoming, TransportError> {
        loop {
            let message = match self.read.next().await {
                Some(message) => message.context(ReceiveSnafu)?,
                None => return ConnectionClosedSnafu.fail(),
            };

            match message {
                Message::Text(text) => match parse_incoming(&text) {
                    Ok(incoming) => return Ok(incoming),
                    Err(e) => warn!("Ignoring unreadable message from the node: {e}"),
                },
                Message::Ping(payload) => {
                    self.write
                        .send(Message::Pong(payload))
                        .await
                        .context(SendSnafu)?;
                }
                Message::Close(_) => return ConnectionClosedSnafu.fail(),
                _ => {}
            }
        }
    }

    /// Hands `event` to the worker of the subscription it matched.
    fn route(&self, event: ResultEvent) {
        match self.routes.get(&event.query) {
            Some(worker) => {
                if worker.send(event).is_err() {
                    error!("Worker for a subscription has stopped; event dropped");
                }
            }
            None => warn!("Received an event for unknown subscription {}", event.query),
        }
    }
}

#[async_trait]
impl Subscribe for TendermintClient {
    type Error = TransportError;

    async fn subscribe(&mut self, filter: &str, callback: EventCallback) -> Result<(), Self::Error> {
        let id = self.next_id;
        self.next_id += 1;

        let request = json!({
            "jsonrpc": "2.0",
            "method": "subscribe",
            "id": id,
            "params": { "query": filter },
        });
        self.write
            .send(Message::Text(request.to_string().into()))
            .await
            .context(SendSnafu)?;

        let timeout = self.ack_timeout;
        tokio::time::timeout(timeout, self.await_ack(id, filter))
            .await
            .map_err(|_| TransportError::AckTimeout {
                filter: filter.to_string(),
                timeout,
            })??;

        let (sender, mut receiver) = mpsc::unbounded_channel::<ResultEvent>();
        let worker = std::thread::Builder::new()
            .name(format!("relay-{id}"))
            .spawn(move || {
                while let Some(event) = receiver.blocking_recv() {
                    callback(event);
                }
            })
            .context(SpawnWorkerSnafu { filter })?;

        self.routes.insert(filter.to_string(), sender);
        self.workers.push(worker);
        Ok(())
    }
}
