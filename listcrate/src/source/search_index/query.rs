use indexmap::IndexMap;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::config::ListHandlerConfig;
use crate::errors::ListError;
use crate::filtering::normalize::{is_blank, is_truthy};
use crate::filtering::{ListQueryExtractor, OperatorDialect, PageRequest};
use crate::mapping::{FieldMapping, FieldType, ListMetadata};
use crate::models::{Filter, FilterOperator, SortDirection};
use crate::request::RequestParameters;

const SEARCH_ANALYZER: &str = "whitespace_lowercase";

/// Where a single filter lands in the boolean query.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    /// Exact, inequality and range clauses, applied in filter context.
    Field(Value),
    /// Contains clause, scored with the global search.
    Contains(Value),
    /// Not-contains clause.
    NotContains(Value),
    /// Blank value or an operator this backend ignores.
    Skip,
}

/// Renders list requests as Elasticsearch query DSL.
#[derive(Debug, Clone)]
pub struct SearchIndexQueryBuilder {
    extractor: ListQueryExtractor,
}

impl SearchIndexQueryBuilder {
    #[must_use]
    pub fn new(metadata: Arc<ListMetadata>, config: ListHandlerConfig) -> Self {
        Self {
            extractor: ListQueryExtractor::new(metadata, config, OperatorDialect::SearchIndex),
        }
    }

    #[must_use]
    pub fn extractor(&self) -> &ListQueryExtractor {
        &self.extractor
    }

    /// Boolean query for the request's filters and search.
    ///
    /// # Errors
    ///
    /// Returns extraction and validation errors.
    pub fn query(&self, request: &dyn RequestParameters) -> Result<Value, ListError> {
        let mut contains = Vec::new();
        let mut not_contains = Vec::new();
        let mut fields = Vec::new();

        if let Some(search) = self.global_search(request)? {
            contains.push(search);
        }

        for filter in self.extractor.extract_filters(request)? {
            match self.field_filter(&filter)? {
                FilterClause::Field(clause) => fields.push(clause),
                FilterClause::Contains(clause) => contains.push(clause),
                FilterClause::NotContains(clause) => not_contains.push(clause),
                FilterClause::Skip => {}
            }
        }

        let full = if contains.is_empty() && not_contains.is_empty() {
            None
        } else {
            let mut clauses = serde_json::Map::new();
            if !contains.is_empty() {
                clauses.insert("must".to_string(), Value::Array(contains));
            }
            if !not_contains.is_empty() {
                clauses.insert("must_not".to_string(), Value::Array(not_contains));
            }
            Some(json!({ "bool": clauses }))
        };

        Ok(match (full, fields.is_empty()) {
            (full, false) => json!({
                "bool": {
                    "must": [full.unwrap_or_else(match_all)],
                    "filter": [{ "bool": { "must": fields } }],
                }
            }),
            (Some(full), true) => full,
            (None, true) => match_all(),
        })
    }

    /// OR of one multi-match over direct search fields and one nested
    /// multi-match per relation path. `None` without a search string.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::SearchNotSupported`] when the entity has no search
    /// fields.
    pub fn global_search(&self, request: &dyn RequestParameters) -> Result<Option<Value>, ListError> {
        let Some(search) = self.extractor.search_value(request)? else {
            return Ok(None);
        };
        if search.is_empty() {
            return Ok(None);
        }

        let mut direct = Vec::new();
        let mut nested: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for mapping in self.extractor.metadata().search_fields().values() {
            if mapping.is_relation() {
                nested.entry(nested_path(mapping)).or_default().push(&mapping.name);
            } else {
                direct.push(mapping.name.as_str());
            }
        }

        let mut should = Vec::with_capacity(nested.len() + 1);
        if !direct.is_empty() {
            should.push(multi_match(&direct, &Value::String(search.clone())));
        }
        for (path, fields) in nested {
            should.push(json!({
                "nested": {
                    "path": path,
                    "query": multi_match(&fields, &Value::String(search.clone())),
                }
            }));
        }

        Ok(Some(json!({
            "bool": {
                "should": should,
                "minimum_should_match": 1,
            }
        })))
    }

    /// Clause for one validated filter.
    ///
    /// # Errors
    ///
    /// Returns validation and normalization errors.
    pub fn field_filter(&self, filter: &Filter) -> Result<FilterClause, ListError> {
        let resolved = self.extractor.validate_filter(filter)?;
        let mapping = resolved.mapping;
        let value = self.extractor.normalize_value(
            filter.field(),
            resolved.operator,
            &filter.value().from,
            Some(mapping),
        )?;
        if is_blank(&value) {
            return Ok(FilterClause::Skip);
        }

        let raw = format!("{}.raw", mapping.name);
        let contains = || nested_if_relation(mapping, multi_match(&[mapping.name.as_str()], &value));
        Ok(match resolved.operator {
            FilterOperator::Eq => {
                FilterClause::Field(nested_if_relation(mapping, equal_clause(mapping, &raw, value.clone())))
            }
            FilterOperator::Neq => FilterClause::Field(not_equal_clause(mapping, &raw, value.clone())),
            FilterOperator::Lt | FilterOperator::Lte | FilterOperator::Gt | FilterOperator::Gte => {
                let range = json!({ "range": { raw: { resolved.operator.symbol(): value } } });
                FilterClause::Field(nested_if_relation(mapping, range))
            }
            FilterOperator::Like => FilterClause::Contains(contains()),
            FilterOperator::NLike => FilterClause::NotContains(contains()),
            _ => FilterClause::Skip,
        })
    }

    /// Sort clauses on the mapped field names, lower-cased directions.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NotSortable`] or [`ListError::InvalidDirection`].
    pub fn sort(&self, request: &dyn RequestParameters) -> Result<Value, ListError> {
        let order_by = self
            .extractor
            .validate_order_by(&self.extractor.extract_order_by(request))?;

        let mut sort = Vec::with_capacity(order_by.len());
        for order in order_by {
            let mapping = self
                .extractor
                .sort_mapping(&order.field)
                .ok_or_else(|| ListError::NotSortable {
                    field: order.field.clone(),
                })?;
            let direction = match order.direction {
                SortDirection::Asc => "asc",
                SortDirection::Desc => "desc",
            };
            sort.push(json!({ mapping.name.clone(): { "order": direction } }));
        }
        Ok(Value::Array(sort))
    }

    /// Full search request body for one page of `size` hits.
    #[must_use]
    pub fn search_body(&self, query: Value, sort: Value, page: PageRequest, size: u64) -> Value {
        let from = page.page_nr.saturating_sub(1).saturating_mul(size);
        json!({
            "query": query,
            "sort": sort,
            "from": from,
            "size": size,
        })
    }
}

fn match_all() -> Value {
    json!({ "match_all": {} })
}

fn missing(field: &str) -> Value {
    json!({ "bool": { "must_not": [{ "exists": { "field": field } }] } })
}

fn term(field: &str, value: Value) -> Value {
    json!({ "term": { field: value } })
}

fn multi_match(fields: &[&str], value: &Value) -> Value {
    json!({
        "multi_match": {
            "query": value,
            "fields": fields,
            "operator": "and",
            "analyzer": SEARCH_ANALYZER,
        }
    })
}

/// Nested path of a relation mapping: the first segment of its name.
fn nested_path(mapping: &FieldMapping) -> &str {
    mapping.name.split('.').next().unwrap_or(&mapping.name)
}

fn nested(path: &str, query: Value) -> Value {
    json!({ "nested": { "path": path, "query": query } })
}

fn nested_if_relation(mapping: &FieldMapping, query: Value) -> Value {
    if mapping.is_relation() {
        nested(nested_path(mapping), query)
    } else {
        query
    }
}

/// Unindexed booleans read as false, so a falsy value also matches absence.
fn equal_clause(mapping: &FieldMapping, raw: &str, value: Value) -> Value {
    if mapping.field_type == FieldType::Boolean && !is_truthy(&value) {
        return json!({ "bool": { "should": [missing(raw), term(raw, value)] } });
    }
    term(raw, value)
}

fn not_equal_clause(mapping: &FieldMapping, raw: &str, value: Value) -> Value {
    let missing_or_not_equal = json!({
        "bool": {
            "should": [
                missing(raw),
                { "bool": { "must_not": [term(raw, value)] } },
            ]
        }
    });
    if !mapping.is_relation() {
        return missing_or_not_equal;
    }

    let path = nested_path(mapping);
    json!({
        "bool": {
            "should": [
                { "bool": { "must_not": [nested(path, match_all())] } },
                nested(path, missing_or_not_equal),
            ]
        }
    })
}
