//! Search index backend.
//!
//! Filters and search compile into an Elasticsearch boolean query. Exact,
//! inequality and range filters run in filter context, `like`/`nlike` and the
//! global search score as must/must-not clauses. Relation fields are indexed
//! as nested documents whose path is the first segment of the field name.

mod client;
mod query;

pub use client::SearchIndexClient;
pub use query::{FilterClause, SearchIndexQueryBuilder};

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use super::ListSource;
use crate::config::ListHandlerConfig;
use crate::errors::ListError;
use crate::mapping::ListMetadata;
use crate::models::FilterableField;
use crate::request::RequestParameters;

/// List source over a search index reached through `C`.
pub struct SearchIndexListSource<C> {
    builder: SearchIndexQueryBuilder,
    client: C,
    query: Option<(Value, Value)>,
}

impl<C: SearchIndexClient> SearchIndexListSource<C> {
    #[must_use]
    pub fn new(metadata: Arc<ListMetadata>, config: ListHandlerConfig, client: C) -> Self {
        Self {
            builder: SearchIndexQueryBuilder::new(metadata, config),
            client,
            query: None,
        }
    }

    #[must_use]
    pub fn builder(&self) -> &SearchIndexQueryBuilder {
        &self.builder
    }

    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Boolean query for `request`, built once per distinct filters value.
    fn search_query(&mut self, request: &dyn RequestParameters) -> Result<Value, ListError> {
        let key = self
            .builder
            .extractor()
            .filters_data(request)
            .cloned()
            .unwrap_or(Value::Null);

        if let Some((cached_key, query)) = &self.query
            && *cached_key == key
        {
            return Ok(query.clone());
        }

        let query = self.builder.query(request)?;
        tracing::debug!(query = %query, "Search index query assembled");
        self.query = Some((key, query.clone()));
        Ok(query)
    }
}

#[async_trait]
impl<C: SearchIndexClient> ListSource for SearchIndexListSource<C> {
    type Item = Value;

    async fn process_source(&mut self, request: &dyn RequestParameters) -> Result<Vec<Value>, ListError> {
        let query = self.search_query(request)?;
        let page = self.builder.extractor().extract_pagination(request)?;
        let sort = self.builder.sort(request)?;

        let size = match page.limit() {
            Some(limit) => limit,
            None => self.items_count(request).await?,
        };

        let body = self.builder.search_body(query, sort, page, size);
        let hits = self.client.search(body).await?;
        tracing::debug!(hits = hits.len(), page = page.page_nr, "Search index page fetched");
        Ok(hits)
    }

    async fn items_count(&mut self, request: &dyn RequestParameters) -> Result<u64, ListError> {
        let query = self.search_query(request)?;
        self.client.count(json!({ "query": query })).await
    }

    fn sortable_fields(&self) -> Vec<String> {
        self.builder.extractor().sortable_fields()
    }

    fn filterable_fields(&self) -> Vec<FilterableField> {
        self.builder.extractor().filterable_fields()
    }
}
