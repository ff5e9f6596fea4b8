use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use utoipa::ToSchema;

/// Comparison operators a filter may carry.
///
/// The wire symbols are the lower camel case names (`eq`, `notIn`,
/// `isNotNull`, ...). Which subset a backend accepts is decided by its
/// [`OperatorDialect`](crate::filtering::OperatorDialect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum FilterOperator {
    #[serde(rename = "eq")]
    Eq,
    #[serde(rename = "neq")]
    Neq,
    #[serde(rename = "lt")]
    Lt,
    #[serde(rename = "lte")]
    Lte,
    #[serde(rename = "gt")]
    Gt,
    #[serde(rename = "gte")]
    Gte,
    /// Between `value.from` and `value.to`
    #[serde(rename = "btw")]
    Btw,
    /// Contains
    #[serde(rename = "like")]
    Like,
    /// Does not contain
    #[serde(rename = "nlike")]
    NLike,
    /// Starts with
    #[serde(rename = "rlike")]
    RLike,
    /// Ends with
    #[serde(rename = "llike")]
    LLike,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "notIn")]
    NotIn,
    #[serde(rename = "isNull")]
    IsNull,
    #[serde(rename = "isNotNull")]
    IsNotNull,
}

impl FilterOperator {
    pub const ALL: [Self; 15] = [
        Self::Eq,
        Self::Neq,
        Self::Lt,
        Self::Lte,
        Self::Gt,
        Self::Gte,
        Self::Btw,
        Self::Like,
        Self::NLike,
        Self::RLike,
        Self::LLike,
        Self::In,
        Self::NotIn,
        Self::IsNull,
        Self::IsNotNull,
    ];

    /// Parse a wire symbol, `None` if the symbol is unknown.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Btw => "btw",
            Self::Like => "like",
            Self::NLike => "nlike",
            Self::RLike => "rlike",
            Self::LLike => "llike",
            Self::In => "in",
            Self::NotIn => "notIn",
            Self::IsNull => "isNull",
            Self::IsNotNull => "isNotNull",
        }
    }

    #[must_use]
    pub const fn is_like_family(self) -> bool {
        matches!(self, Self::Like | Self::NLike | Self::RLike | Self::LLike)
    }

    /// Operators whose value is a list rather than a scalar.
    #[must_use]
    pub const fn takes_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Filter value as sent by the client: `{"from": ..., "to": ...}`.
///
/// Every operator reads `from`; only `btw` also reads `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterValue {
    pub from: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Value>,
}

impl FilterValue {
    #[must_use]
    pub fn new(from: impl Into<Value>) -> Self {
        Self {
            from: from.into(),
            to: None,
        }
    }

    #[must_use]
    pub fn range(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self {
            from: from.into(),
            to: Some(to.into()),
        }
    }
}

/// One `(field, operator, value)` triple extracted from a request.
///
/// The operator is kept as the raw symbol the client sent; it is checked
/// against the backend's operator set during validation, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    field: String,
    operator: String,
    value: FilterValue,
}

impl Filter {
    #[must_use]
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value,
        }
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub fn operator(&self) -> &str {
        &self.operator
    }

    #[must_use]
    pub fn value(&self) -> &FilterValue {
        &self.value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse the exact `ASC`/`DESC` tokens; anything else is rejected.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Ordering intent before validation: the direction token is still raw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderByRequest {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

impl OrderByRequest {
    #[must_use]
    pub fn new(field: impl Into<String>, direction: Option<&str>) -> Self {
        Self {
            field: field.into(),
            direction: direction.map(str::to_string),
        }
    }
}

/// Validated ordering: the field is sortable and the direction is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Entry of the filterable fields listing exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FilterableField {
    pub field: String,
    pub operators: Vec<FilterOperator>,
    pub title: String,
}
