//! # Request Extraction & Normalization
//!
//! Backend independent part of list processing. A [`ListQueryExtractor`]
//! pulls filters, search, ordering and pagination out of the request
//! parameters, validates them against [`ListMetadata`](crate::mapping::ListMetadata)
//! and normalizes operators and values for one [`OperatorDialect`].
//!
//! ## Request shape
//!
//! ```rust,ignore
//! // ?page=2&page_limit=20
//! // &order_by[field]=title&order_by[direction]=DESC
//! // &filters[0][field]=status&filters[0][operator]=eq&filters[0][value][from]=published
//! // &filters[1][field]=views&filters[1][operator]=btw&filters[1][value][from]=10&filters[1][value][to]=99
//! // &filters[search]=rust__AND__async runtime
//! ```
//!
//! Search strings split on `__AND__` into terms; every term must match, and a
//! term matches when one search field contains all of its words.

pub mod extract;
pub mod normalize;
pub mod pagination;
pub mod search;
pub mod sort;

pub use extract::{ListQueryExtractor, ResolvedFilter};
pub use pagination::PageRequest;

use serde_json::Value;

use crate::errors::ListError;
use crate::mapping::FieldMapping;
use crate::models::FilterOperator;

/// Operator vocabulary of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorDialect {
    /// Every operator; the LIKE family collapses to `like`.
    Relational,
    /// Equality, ranges and (not) contains only; operators stay as sent.
    SearchIndex,
}

impl OperatorDialect {
    const SEARCH_INDEX_OPERATORS: [FilterOperator; 8] = [
        FilterOperator::Eq,
        FilterOperator::Neq,
        FilterOperator::Lt,
        FilterOperator::Lte,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::Like,
        FilterOperator::NLike,
    ];

    #[must_use]
    pub fn accepts(self, operator: FilterOperator) -> bool {
        match self {
            Self::Relational => true,
            Self::SearchIndex => Self::SEARCH_INDEX_OPERATORS.contains(&operator),
        }
    }

    /// Operator used for dispatch. Normalizing twice gives the same result.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::UnknownOperator`] for symbols outside the dialect.
    pub fn normalize_operator(self, symbol: &str) -> Result<FilterOperator, ListError> {
        let operator = FilterOperator::from_symbol(symbol)
            .filter(|operator| self.accepts(*operator))
            .ok_or_else(|| ListError::UnknownOperator {
                operator: symbol.to_string(),
            })?;

        Ok(match self {
            Self::Relational if operator.is_like_family() => FilterOperator::Like,
            _ => operator,
        })
    }

    /// Relational values get wildcards and lists; search index values are
    /// only formatted.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NonScalarValue`] or [`ListError::InvalidDate`].
    pub fn normalize_value(
        self,
        field: &str,
        operator: FilterOperator,
        value: &Value,
        mapping: Option<&FieldMapping>,
    ) -> Result<Value, ListError> {
        match self {
            Self::Relational => normalize::normalize_value(field, operator, value, mapping),
            Self::SearchIndex => normalize::normalize_scalar(field, operator, value, mapping),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relational_like_family_collapses() {
        for symbol in ["like", "nlike", "rlike", "llike"] {
            assert_eq!(
                OperatorDialect::Relational.normalize_operator(symbol).unwrap(),
                FilterOperator::Like
            );
        }
        assert_eq!(
            OperatorDialect::Relational.normalize_operator("notIn").unwrap(),
            FilterOperator::NotIn
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for dialect in [OperatorDialect::Relational, OperatorDialect::SearchIndex] {
            for operator in FilterOperator::ALL {
                if let Ok(once) = dialect.normalize_operator(operator.symbol()) {
                    let twice = dialect.normalize_operator(once.symbol()).unwrap();
                    assert_eq!(once, twice);
                }
            }
        }
    }

    #[test]
    fn test_search_index_subset() {
        let dialect = OperatorDialect::SearchIndex;
        assert_eq!(dialect.normalize_operator("nlike").unwrap(), FilterOperator::NLike);
        for symbol in ["btw", "in", "notIn", "isNull", "isNotNull", "rlike", "llike"] {
            assert!(matches!(
                dialect.normalize_operator(symbol),
                Err(ListError::UnknownOperator { .. })
            ));
        }
    }

    #[test]
    fn test_search_index_values_have_no_wildcards() {
        let value = OperatorDialect::SearchIndex
            .normalize_value("title", FilterOperator::Like, &Value::from("Rust"), None)
            .unwrap();
        assert_eq!(value, Value::from("Rust"));
    }
}
