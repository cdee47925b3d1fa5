//! Keys, values, and the warm-tier query filter.

use serde::{Deserialize, Serialize};

/// Opaque string identifying a logical item.
///
/// Keys are caller-defined and must be stable across tiers: the same key is
/// written to hot, warm, and cold stores so promotion can round-trip.
/// Connectors conventionally namespace keys as `"<kind>:<id>"`
/// (e.g. `"profile:42"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Create a key from any string-like input.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key falls under the given prefix (cold-tier listing).
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A caller-defined payload stored in a tier.
///
/// The gateway treats values as opaque blobs; only connectors impose schema.
/// The `Document` variant carries the structured representation the warm
/// tier can query by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// UTF-8 text payload.
    Text(String),
    /// Raw byte payload (cold-tier blobs).
    Bytes(Vec<u8>),
    /// Structured document, queryable by field in the warm tier.
    Document(serde_json::Value),
}

impl Value {
    /// Construct a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Construct a byte value.
    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(b.into())
    }

    /// Construct a structured document value.
    pub fn document(doc: serde_json::Value) -> Self {
        Self::Document(doc)
    }

    /// The text payload, if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The byte payload, if this is a `Bytes` value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The structured document, if this is a `Document` value.
    pub fn as_document(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Look up a top-level field of a `Document` value.
    ///
    /// Returns `None` for non-document values and for absent fields; this is
    /// the primitive the warm tier's query-by-field support is built on.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.as_document().and_then(|doc| doc.get(name))
    }

    /// Approximate payload size in bytes, for stats and log fields.
    pub fn approximate_size(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Bytes(b) => b.len(),
            Self::Document(doc) => doc.to_string().len(),
        }
    }
}

/// Field-equality filter for warm-tier queries.
///
/// Matches `Document` values whose top-level `field` equals `equals`.
/// Non-document values never match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Top-level document field to compare.
    pub field: String,
    /// Value the field must equal.
    pub equals: serde_json::Value,
}

impl QueryFilter {
    /// Build a filter matching `field == equals`.
    pub fn field_equals(field: impl Into<String>, equals: serde_json::Value) -> Self {
        Self {
            field: field.into(),
            equals,
        }
    }

    /// Whether the given value satisfies this filter.
    pub fn matches(&self, value: &Value) -> bool {
        value.field(&self.field) == Some(&self.equals)
    }
}
