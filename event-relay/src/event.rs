//! # Chain Events
//!
//! A [`ResultEvent`] is what the subscription transport delivers for every transaction that
//! matches a filter. Its attributes are keyed by `"<category>.<attribute>"` and each key maps to
//! every value recorded for it within the delivered batch.
//!
//! Only the value at [`ATTRIBUTE_VALUE_INDEX`] is ever consulted. Later occurrences of the same key
//! are ignored.

use std::collections::HashMap;

use serde::Deserialize;
use snafu::Snafu;

/// Position of the attribute value that handlers read when a key was recorded more than once.
pub const ATTRIBUTE_VALUE_INDEX: usize = 0;

/// Attribute category that carries the transaction hash on every event.
pub const TX_CATEGORY: &str = "tx";

/// Attribute name of the transaction hash within [`TX_CATEGORY`].
pub const TX_HASH_KEY: &str = "hash";

/// Errors raised while reading attributes out of an event.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub))]
pub enum AttributeError {
    /// The key is absent, or present with no values.
    #[snafu(display("no {key} was specified in the event"))]
    MissingAttribute {
        /// The full `"<category>.<attribute>"` key.
        key: String,
    },
}

/// An event delivered by the chain for one subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResultEvent {
    /// The filter expression this event matched.
    #[serde(default)]
    pub query: String,
    /// Attribute values keyed by `"<category>.<attribute>"`.
    #[serde(default)]
    pub events: HashMap<String, Vec<String>>,
}

impl ResultEvent {
    /// Creates an event for `query` from `(key, values)` pairs.
    pub fn new<K, V, I>(query: impl Into<String>, attributes: I) -> Self
    where
        K: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            query: query.into(),
            events: attributes
                .into_iter()
                .map(|(key, values)| (key.into(), values.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    /// Returns the first value recorded for `"<category>.<key>"`.
    ///
    /// # Errors
    /// - [`AttributeError::MissingAttribute`] if the key is absent or its value list is empty.
    pub fn attribute(&self, category: &str, key: &str) -> Result<&str, AttributeError> {
        let full_key = attribute_key(category, key);
        self.events
            .get(&full_key)
            .and_then(|values| values.get(ATTRIBUTE_VALUE_INDEX))
            .map(String::as_str)
            .ok_or(AttributeError::MissingAttribute { key: full_key })
    }

    /// Returns the hash of the transaction that emitted this event.
    pub fn tx_hash(&self) -> Result<&str, AttributeError> {
        self.attribute(TX_CATEGORY, TX_HASH_KEY)
    }
}

/// Joins a category and attribute name into the key used by [`ResultEvent::events`].
pub fn attribute_key(category: &str, key: &str) -> String {
    format!("{category}.{key}")
}
