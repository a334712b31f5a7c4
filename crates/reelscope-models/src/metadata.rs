//! Caller-supplied asset metadata.
//!
//! Metadata is an ordered list of metric name/value pairs carried alongside
//! a handle. The lifecycle never interprets it; it is rendered into the
//! inference prompt and echoed back in batch outcomes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single metric name/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MetricValue {
    pub name: String,
    pub value: String,
}

/// Ordered metric name → value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AssetMetadata(Vec<MetricValue>);

impl AssetMetadata {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Set `name` to `value`, replacing an existing entry in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|m| m.name == name) {
            Some(existing) => existing.value = value,
            None => self.0.push(MetricValue { name, value }),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|m| (m.name.as_str(), m.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for AssetMetadata
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = AssetMetadata::new();
        for (k, v) in iter {
            metadata.insert(k, v);
        }
        metadata
    }
}
