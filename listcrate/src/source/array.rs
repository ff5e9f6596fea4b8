use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;

use super::ListSource;
use crate::config::ListHandlerConfig;
use crate::errors::ListError;
use crate::filtering::normalize::{loose_eq, value_text};
use crate::filtering::search::{contains_ignore_case, search_terms, split_path};
use crate::filtering::sort::{directed, natural_cmp};
use crate::filtering::{ListQueryExtractor, OperatorDialect};
use crate::mapping::ListMetadata;
use crate::models::{Filter, FilterOperator, FilterableField, OrderBy};
use crate::request::RequestParameters;

/// One in-memory record. Relation data lives one level down:
/// `{"title": "..", "category": {"title": ".."}}`.
pub type Row = Map<String, Value>;

/// List source over rows already held in memory.
///
/// Only equality filters are implemented; any other operator is reported
/// as not implemented instead of being ignored.
#[derive(Debug, Clone)]
pub struct ArrayListSource {
    extractor: ListQueryExtractor,
    rows: Vec<Row>,
}

impl ArrayListSource {
    #[must_use]
    pub fn new(metadata: Arc<ListMetadata>, config: ListHandlerConfig, rows: Vec<Row>) -> Self {
        Self {
            extractor: ListQueryExtractor::new(metadata, config, OperatorDialect::Relational),
            rows,
        }
    }

    /// Rows whose values are JSON objects; anything else is skipped.
    #[must_use]
    pub fn from_values(
        metadata: Arc<ListMetadata>,
        config: ListHandlerConfig,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        let rows = values
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect();
        Self::new(metadata, config, rows)
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Rows matching filters and search, in source order.
    ///
    /// # Errors
    ///
    /// Returns filter, search and validation errors.
    pub fn matching_rows(&self, request: &dyn RequestParameters) -> Result<Vec<&Row>, ListError> {
        let filters = self.checked_filters(request)?;
        let terms = self
            .extractor
            .search_value(request)?
            .map(|search| search_terms(&search))
            .unwrap_or_default();

        Ok(self
            .rows
            .iter()
            .filter(|row| filters.iter().all(|filter| matches_filter(row, filter)))
            .filter(|row| self.matches_search(row, &terms))
            .collect())
    }

    fn checked_filters(&self, request: &dyn RequestParameters) -> Result<Vec<Filter>, ListError> {
        let filters = self.extractor.extract_filters(request)?;
        if filters.is_empty() {
            return Ok(filters);
        }
        if self.extractor.metadata().filter_fields().is_empty() {
            return Err(ListError::FilteringNotSupported);
        }

        for filter in &filters {
            self.extractor.validate_filter(filter)?;
            if FilterOperator::from_symbol(filter.operator()) != Some(FilterOperator::Eq) {
                return Err(ListError::OperatorNotImplemented {
                    operator: filter.operator().to_string(),
                });
            }
        }
        Ok(filters)
    }

    fn matches_search(&self, row: &Row, terms: &[Vec<String>]) -> bool {
        let fields = self.extractor.metadata().search_fields();
        terms.iter().all(|words| {
            fields.keys().any(|field| {
                let text = field_value(row, field).map(value_text);
                text.is_some_and(|text| words.iter().all(|word| contains_ignore_case(&text, word)))
            })
        })
    }

    fn sort_rows(rows: &mut [&Row], order_by: &[OrderBy]) {
        rows.sort_by(|left, right| {
            order_by.iter().fold(Ordering::Equal, |ordering, order| {
                ordering.then_with(|| {
                    let left = field_value(left, &order.field).unwrap_or(&Value::Null);
                    let right = field_value(right, &order.field).unwrap_or(&Value::Null);
                    directed(natural_cmp(left, right), order.direction)
                })
            })
        });
    }
}

#[async_trait]
impl ListSource for ArrayListSource {
    type Item = Row;

    async fn process_source(&mut self, request: &dyn RequestParameters) -> Result<Vec<Row>, ListError> {
        let mut rows = self.matching_rows(request)?;

        let order_by = self
            .extractor
            .validate_order_by(&self.extractor.extract_order_by(request))?;
        if !order_by.is_empty() {
            Self::sort_rows(&mut rows, &order_by);
        }

        let page = self.extractor.extract_pagination(request)?;
        let rows = rows.into_iter().cloned();
        if !page.is_paginated() {
            return Ok(rows.collect());
        }

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = page
            .limit()
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows.skip(offset).take(limit).collect())
    }

    async fn items_count(&mut self, request: &dyn RequestParameters) -> Result<u64, ListError> {
        let count = self.matching_rows(request)?.len();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    fn sortable_fields(&self) -> Vec<String> {
        self.extractor.sortable_fields()
    }

    fn filterable_fields(&self) -> Vec<FilterableField> {
        self.extractor.filterable_fields()
    }
}

fn matches_filter(row: &Row, filter: &Filter) -> bool {
    let value = row.get(filter.field()).unwrap_or(&Value::Null);
    loose_eq(value, &filter.value().from)
}

/// Value at `field`, or at `row[assoc][field]` for dotted names.
fn field_value<'r>(row: &'r Row, field: &str) -> Option<&'r Value> {
    match split_path(field) {
        Some((association, nested)) => row.get(association)?.get(nested),
        None => row.get(field),
    }
}
