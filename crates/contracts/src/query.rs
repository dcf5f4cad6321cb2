//! Query - opaque filter predicate handed to the directory backend
//!
//! The sync core never interprets queries; they travel unchanged from the
//! caller to [`DirectoryBackend::list_users`](crate::DirectoryBackend::list_users).

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// Backend query descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    /// Wrap a pre-built query string as-is
    pub fn raw(query: impl Into<String>) -> Self {
        Self(query.into())
    }

    /// `attribute == value`
    pub fn equal(attribute: &str, value: impl Into<serde_json::Value>) -> Self {
        Self::method("equal", attribute, vec![value.into()])
    }

    /// Full-text search on an indexed attribute
    pub fn search(attribute: &str, term: &str) -> Self {
        Self::method("search", attribute, vec![term.into()])
    }

    /// Cap the number of returned documents
    pub fn limit(limit: u32) -> Self {
        Self(json!({ "method": "limit", "values": [limit] }).to_string())
    }

    fn method(method: &str, attribute: &str, values: Vec<serde_json::Value>) -> Self {
        Self(
            json!({
                "method": method,
                "attribute": attribute,
                "values": values,
            })
            .to_string(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
