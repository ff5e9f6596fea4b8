use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::errors::ListError;

/// Narrow handle on a search index: run a search body, count a query.
///
/// Implementations map transport failures to [`ListError::SearchIndex`].
#[async_trait]
pub trait SearchIndexClient: Send + Sync {
    /// Hits of a full request body (`query`, `sort`, `from`, `size`).
    async fn search(&self, body: Value) -> Result<Vec<Value>, ListError>;

    /// Number of documents matching `{"query": ...}`.
    async fn count(&self, query: Value) -> Result<u64, ListError>;
}

#[async_trait]
impl<T: SearchIndexClient + ?Sized> SearchIndexClient for Arc<T> {
    async fn search(&self, body: Value) -> Result<Vec<Value>, ListError> {
        (**self).search(body).await
    }

    async fn count(&self, query: Value) -> Result<u64, ListError> {
        (**self).count(query).await
    }
}
