//! # Forwarder
//!
//! Delivers commands to the SDS node with a single blocking HTTP POST per command.
//!
//! Delivery is best effort. The POST is never retried, and a non-2xx status from the SDS node is
//! logged rather than returned as an error. Only a command that cannot be serialized, or a request
//! that cannot be sent at all, produces a [`ForwardError`].

use std::time::Duration;

use log::{info, warn};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;
use snafu::{ResultExt, Snafu};
use url::Url;

use crate::command::Command;

/// Name of the diagnostic field in SDS node responses.
pub const RESPONSE_MESSAGE_FIELD: &str = "Msg";

/// Errors raised while forwarding a command.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ForwardError {
    /// The command could not be serialized to JSON.
    #[snafu(display("Error when trying to marshal data for {path} to json: {source}"))]
    Serialization {
        /// The endpoint the command was meant for.
        path: String,
        /// The underlying serde error.
        source: serde_json::Error,
    },

    /// The POST could not be sent.
    #[snafu(display("Error when calling {path} endpoint in SP node: {source}"))]
    Transport {
        /// The endpoint that was called.
        path: String,
        /// The underlying reqwest error.
        source: reqwest::Error,
    },

    /// The configured host, port, or path do not form a valid url.
    #[snafu(display("invalid SDS endpoint {endpoint:?}: {source}"))]
    InvalidEndpoint {
        /// The text that failed to parse.
        endpoint: String,
        /// The underlying url error.
        source: url::ParseError,
    },

    /// The HTTP client could not be built.
    #[snafu(display("failed to build the HTTP client: {source}"))]
    ClientBuild {
        /// The underlying reqwest error.
        source: reqwest::Error,
    },
}

/// What the SDS node replied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardResponse {
    /// HTTP status code.
    pub status: u16,
    /// The `Msg` field of the response body, if the body was JSON and had one.
    pub message: Option<String>,
}

/// Delivers commands downstream.
///
/// Implementations are called from the subscription workers and may block.
pub trait Forward: Send + Sync {
    /// Delivers `command` to the endpoint it belongs to.
    fn forward(&self, command: &Command) -> Result<ForwardResponse, ForwardError>;
}

/// Where and how to reach the SDS node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderConfig {
    /// Host of the SDS node.
    pub network_address: String,
    /// Port of the SDS node's HTTP API.
    pub api_port: u16,
    /// Request timeout. When `None` the HTTP client's default applies.
    pub request_timeout: Option<Duration>,
}

/// [`Forward`] implementation posting JSON to the SDS node's HTTP API.
///
/// The client is blocking, so it must be built and used outside of an async context.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: Client,
    base_url: Url,
}

impl HttpForwarder {
    /// Builds a forwarder for `http://<network_address>:<api_port>`.
    pub fn new(config: &ForwarderConfig) -> Result<Self, ForwardError> {
        let endpoint = format!("http://{}:{}", config.network_address, config.api_port);
        let base_url = Url::parse(&endpoint).context(InvalidEndpointSnafu { endpoint })?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context(ClientBuildSnafu)?;

        Ok(Self { client, base_url })
    }

    /// The url commands are posted under.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Posts `body` as JSON to `path` and logs the reply.
    ///
    /// A reply body that is not JSON, or has no `Msg` field, is tolerated.
    pub fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<ForwardResponse, ForwardError> {
        let payload = serde_json::to_vec(body).context(SerializationSnafu { path })?;
        let url = self.base_url.join(path).context(InvalidEndpointSnafu {
            endpoint: format!("{}{}", self.base_url, path),
        })?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .context(TransportSnafu { path })?;

        let status = response.status();
        let message = response
            .json::<Value>()
            .ok()
            .and_then(|body| body.get(RESPONSE_MESSAGE_FIELD).map(message_text));

        if status.is_success() {
            info!(
                "{path} endpoint response from SP node: {} {}",
                status.as_u16(),
                message.as_deref().unwrap_or_default()
            );
        } else {
            warn!(
                "{path} endpoint response from SP node: {} {}",
                status.as_u16(),
                message.as_deref().unwrap_or_default()
            );
        }

        Ok(ForwardResponse {
            status: status.as_u16(),
            message,
        })
    }
}

impl Forward for HttpForwarder {
    fn forward(&self, command: &Command) -> Result<ForwardResponse, ForwardError> {
        self.post(command.path(), command)
    }
}

fn message_text(message: &Value) -> String {
    match message {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
