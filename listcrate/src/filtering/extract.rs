use serde_json::Value;
use std::sync::Arc;

use super::normalize::{is_blank, value_text};
use super::pagination::{PageRequest, is_limit_given, parse_numeric};
use super::OperatorDialect;
use crate::config::ListHandlerConfig;
use crate::errors::ListError;
use crate::mapping::{FieldMapping, ListMetadata};
use crate::models::{
    Filter, FilterOperator, FilterValue, FilterableField, OrderBy, OrderByRequest, SortDirection,
};
use crate::request::RequestParameters;

/// A filter whose field and operator were looked up.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedFilter<'a> {
    pub filter: &'a Filter,
    pub mapping: &'a FieldMapping,
    /// Operator as the client sent it; decides wildcard placement and negation.
    pub requested: FilterOperator,
    /// Operator after dialect normalization; decides the predicate kind.
    pub operator: FilterOperator,
}

/// Reads list intent out of request parameters and checks it against the
/// entity's metadata. One instance is shared by every step of a source.
#[derive(Debug, Clone)]
pub struct ListQueryExtractor {
    metadata: Arc<ListMetadata>,
    config: ListHandlerConfig,
    dialect: OperatorDialect,
}

impl ListQueryExtractor {
    #[must_use]
    pub fn new(
        metadata: Arc<ListMetadata>,
        config: ListHandlerConfig,
        dialect: OperatorDialect,
    ) -> Self {
        Self {
            metadata,
            config,
            dialect,
        }
    }

    #[must_use]
    pub fn metadata(&self) -> &ListMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn config(&self) -> &ListHandlerConfig {
        &self.config
    }

    #[must_use]
    pub const fn dialect(&self) -> OperatorDialect {
        self.dialect
    }

    /// Raw filters container, `None` when the request has none.
    #[must_use]
    pub fn filters_data<'r>(&self, request: &'r dyn RequestParameters) -> Option<&'r Value> {
        request
            .get(&self.config.filters_param_name)
            .filter(|data| !data.is_null())
    }

    /// Filters in request order. The search entry of the container is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::MalformedFilter`] when an entry lacks `field`,
    /// `operator` or `value.from`.
    pub fn extract_filters(&self, request: &dyn RequestParameters) -> Result<Vec<Filter>, ListError> {
        let entries: Vec<&Value> = match self.filters_data(request) {
            Some(Value::Object(map)) => map
                .iter()
                .filter(|(key, _)| **key != self.config.search_param_name)
                .map(|(_, entry)| entry)
                .collect(),
            Some(Value::Array(items)) => items.iter().collect(),
            _ => Vec::new(),
        };

        entries.into_iter().map(parse_filter).collect()
    }

    /// Free-text search string, `None` when not requested.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::SearchNotSupported`] when a search is requested but
    /// the entity declares no search fields.
    pub fn search_value(&self, request: &dyn RequestParameters) -> Result<Option<String>, ListError> {
        let search = self
            .filters_data(request)
            .and_then(Value::as_object)
            .and_then(|filters| filters.get(&self.config.search_param_name))
            .filter(|value| !value.is_null());

        let Some(search) = search else {
            return Ok(None);
        };
        if self.metadata.search_fields().is_empty() {
            return Err(ListError::SearchNotSupported);
        }
        Ok(Some(value_text(search)))
    }

    /// Look up the filter's field and normalize its operator, without the
    /// per-field acceptance and range checks of [`Self::validate_filter`].
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NotFilterable`] or [`ListError::UnknownOperator`].
    pub fn resolve_filter<'a>(&'a self, filter: &'a Filter) -> Result<ResolvedFilter<'a>, ListError> {
        let mapping = self.metadata.filter_fields().get(filter.field()).ok_or_else(|| {
            ListError::NotFilterable {
                field: filter.field().to_string(),
            }
        })?;
        let operator = self.normalize_operator(filter.operator())?;
        let requested = FilterOperator::from_symbol(filter.operator()).unwrap_or(operator);

        Ok(ResolvedFilter {
            filter,
            mapping,
            requested,
            operator,
        })
    }

    /// Check a filter against the field's declaration.
    ///
    /// Rules apply in order: the field must be filterable, the normalized
    /// operator must be declared for it, and `btw` needs both bounds.
    ///
    /// # Errors
    ///
    /// Returns the [`ListError`] of the first rule that fails.
    pub fn validate_filter<'a>(&'a self, filter: &'a Filter) -> Result<ResolvedFilter<'a>, ListError> {
        let resolved = self.resolve_filter(filter)?;

        if !resolved.mapping.accepts(resolved.operator) {
            return Err(ListError::OperatorNotAcceptable {
                operator: resolved.operator.symbol().to_string(),
                field: filter.field().to_string(),
            });
        }

        let value = filter.value();
        let has_to = value.to.as_ref().is_some_and(|to| !to.is_null());
        if resolved.operator == FilterOperator::Btw && (value.from.is_null() || !has_to) {
            return Err(ListError::BetweenBoundsRequired {
                field: filter.field().to_string(),
            });
        }

        Ok(resolved)
    }

    /// # Errors
    ///
    /// Returns [`ListError::UnknownOperator`] when the dialect does not know
    /// the symbol.
    pub fn normalize_operator(&self, symbol: &str) -> Result<FilterOperator, ListError> {
        self.dialect.normalize_operator(symbol)
    }

    /// # Errors
    ///
    /// See [`OperatorDialect::normalize_value`].
    pub fn normalize_value(
        &self,
        field: &str,
        operator: FilterOperator,
        value: &Value,
        mapping: Option<&FieldMapping>,
    ) -> Result<Value, ListError> {
        self.dialect.normalize_value(field, operator, value, mapping)
    }

    /// Page number and limit.
    ///
    /// The page defaults to 1. A page beyond the first without a limit gets
    /// the configured default limit.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NonNumericPageNumber`] or
    /// [`ListError::NonNumericPageLimit`].
    pub fn extract_pagination(&self, request: &dyn RequestParameters) -> Result<PageRequest, ListError> {
        let page_nr = match request
            .get(&self.config.page_nr_param_name)
            .filter(|value| !value.is_null())
        {
            Some(raw) => parse_numeric(raw).ok_or_else(|| ListError::NonNumericPageNumber {
                value: value_text(raw),
            })?,
            None => 1,
        };

        let raw_limit = request.get(&self.config.page_limit_param_name);
        let mut page_limit = match raw_limit {
            Some(raw) if is_limit_given(Some(raw)) => {
                let limit = parse_numeric(raw).ok_or_else(|| ListError::NonNumericPageLimit {
                    value: value_text(raw),
                })?;
                Some(limit).filter(|limit| *limit > 0)
            }
            _ => None,
        };

        if page_nr > 1 && page_limit.is_none() {
            page_limit = Some(self.config.default_page_limit);
        }

        Ok(PageRequest::new(page_nr.max(1), page_limit))
    }

    /// Explicit `{field, direction}` from the request, otherwise the declared
    /// default order.
    #[must_use]
    pub fn extract_order_by(&self, request: &dyn RequestParameters) -> Vec<OrderByRequest> {
        let explicit = request
            .get_map(&self.config.sort_param_name)
            .and_then(|sort| {
                let field = sort.get("field").filter(|field| !is_blank(field))?;
                let direction = sort
                    .get("direction")
                    .filter(|direction| !direction.is_null())
                    .map(value_text);
                Some(OrderByRequest {
                    field: value_text(field),
                    direction,
                })
            });

        match explicit {
            Some(order) => vec![order],
            None => self.default_order_by(),
        }
    }

    /// Declared default order in declaration order.
    #[must_use]
    pub fn default_order_by(&self) -> Vec<OrderByRequest> {
        self.metadata
            .default_order_fields()
            .iter()
            .map(|(field, mapping)| OrderByRequest::new(field.clone(), Some(mapping.direction.as_str())))
            .collect()
    }

    /// Check that every field is sortable and every direction is `ASC` or
    /// `DESC`; a missing direction means `ASC`.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NotSortable`] or [`ListError::InvalidDirection`].
    pub fn validate_order_by(&self, order_by: &[OrderByRequest]) -> Result<Vec<OrderBy>, ListError> {
        let sortable = self.sortable_fields();
        order_by
            .iter()
            .map(|order| {
                if !sortable.contains(&order.field) {
                    return Err(ListError::NotSortable {
                        field: order.field.clone(),
                    });
                }
                let direction = match order.direction.as_deref() {
                    None => SortDirection::Asc,
                    Some(token) => SortDirection::from_token(token).ok_or_else(|| {
                        ListError::InvalidDirection {
                            direction: token.to_string(),
                        }
                    })?,
                };
                Ok(OrderBy {
                    field: order.field.clone(),
                    direction,
                })
            })
            .collect()
    }

    /// Mapping used to order by `field`: the sortable declaration, falling
    /// back to the default order declaration.
    #[must_use]
    pub fn sort_mapping(&self, field: &str) -> Option<&FieldMapping> {
        self.metadata
            .sort_fields()
            .get(field)
            .or_else(|| self.metadata.default_order_fields().get(field))
    }

    /// Sortable and default order keys, duplicates removed, first seen first.
    #[must_use]
    pub fn sortable_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        for field in self
            .metadata
            .sort_fields()
            .keys()
            .chain(self.metadata.default_order_fields().keys())
        {
            if !fields.contains(field) {
                fields.push(field.clone());
            }
        }
        fields
    }

    /// Filterable fields in declaration order.
    #[must_use]
    pub fn filterable_fields(&self) -> Vec<FilterableField> {
        self.metadata
            .filter_fields()
            .iter()
            .map(|(field, mapping)| FilterableField {
                field: field.clone(),
                operators: mapping.operators.clone(),
                title: mapping.title.clone(),
            })
            .collect()
    }
}

fn parse_filter(entry: &Value) -> Result<Filter, ListError> {
    let present = |value: Option<&Value>| value.filter(|value| !value.is_null()).cloned();

    let field = present(entry.get("field")).ok_or(ListError::MalformedFilter)?;
    let operator = present(entry.get("operator")).ok_or(ListError::MalformedFilter)?;
    let value = entry.get("value");
    let from = present(value.and_then(|value| value.get("from"))).ok_or(ListError::MalformedFilter)?;
    let to = present(value.and_then(|value| value.get("to")));

    Ok(Filter::new(
        value_text(&field),
        value_text(&operator),
        FilterValue { from, to },
    ))
}
