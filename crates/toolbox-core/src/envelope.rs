//! The JSON response envelope.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON object mapping top-level names to arbitrary values.
///
/// Every response body written by the toolbox is an envelope. Keys keep
/// their insertion order when serialized.
///
/// # Example
///
/// ```
/// use toolbox_core::Envelope;
///
/// let envelope = Envelope::new().with("user", serde_json::json!({"id": 1}));
/// assert_eq!(
///     serde_json::to_string(&envelope).unwrap(),
///     r#"{"user":{"id":1}}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(IndexMap<String, Value>);

impl Envelope {
    /// Creates an empty envelope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an envelope of the form `{"error": value}`.
    #[must_use]
    pub fn error(value: impl Into<Value>) -> Self {
        Self::new().with("error", value)
    }

    /// Adds a top-level entry and returns the envelope.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds or replaces a top-level entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the envelope has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<IndexMap<String, Value>> for Envelope {
    fn from(map: IndexMap<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Envelope {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
