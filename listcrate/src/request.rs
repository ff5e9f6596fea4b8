//! Abstract key-value view over the incoming request's query parameters.
//!
//! Query-string parsing belongs to the hosting framework. By the time a list
//! source sees the request, nested parameters such as
//! `filters[0][field]=title` have already been decoded into JSON-like values:
//!
//! ```json
//! {
//!   "page": "2",
//!   "page_limit": "20",
//!   "order_by": {"field": "title", "direction": "DESC"},
//!   "filters": {
//!     "0": {"field": "status", "operator": "eq", "value": {"from": "published"}},
//!     "search": "rust__AND__async"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Read-only access to request parameters.
pub trait RequestParameters: Send + Sync {
    /// Single parameter value, `None` when absent.
    fn get(&self, key: &str) -> Option<&Value>;

    /// Nested mapping parameter, `None` when absent or not a mapping.
    fn get_map(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }
}

/// Owned request parameters backed by a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListRequest {
    params: Map<String, Value>,
}

impl ListRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a decoded parameter tree. Anything that is not a JSON
    /// object yields an empty request.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(params) => Self { params },
            _ => Self::default(),
        }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }
}

impl From<Map<String, Value>> for ListRequest {
    fn from(params: Map<String, Value>) -> Self {
        Self { params }
    }
}

impl RequestParameters for ListRequest {
    fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

impl RequestParameters for Map<String, Value> {
    fn get(&self, key: &str) -> Option<&Value> {
        Map::get(self, key)
    }
}

impl RequestParameters for HashMap<String, Value> {
    fn get(&self, key: &str) -> Option<&Value> {
        HashMap::get(self, key)
    }
}
