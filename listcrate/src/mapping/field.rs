use serde::{Deserialize, Serialize};

use crate::models::{FilterOperator, SortDirection};

/// How a relation field is joined onto the root entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JoinType {
    LeftJoin,
    RightJoin,
    InnerJoin,
    Join,
}

impl JoinType {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "leftJoin" => Some(Self::LeftJoin),
            "rightJoin" => Some(Self::RightJoin),
            "innerJoin" => Some(Self::InnerJoin),
            "join" => Some(Self::Join),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_sea_orm(self) -> sea_orm::JoinType {
        match self {
            Self::LeftJoin => sea_orm::JoinType::LeftJoin,
            Self::RightJoin => sea_orm::JoinType::RightJoin,
            Self::InnerJoin => sea_orm::JoinType::InnerJoin,
            Self::Join => sea_orm::JoinType::Join,
        }
    }
}

/// Where a field lives relative to the root entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldTarget {
    /// Column of the root entity.
    Direct,
    /// Column reached through the association `join_field`.
    Relation {
        join_field: String,
        join_type: JoinType,
    },
}

/// Value type of a filterable field; drives value formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Date,
    Datetime,
    Boolean,
}

impl FieldType {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "text" => Some(Self::Text),
            "date" => Some(Self::Date),
            "datetime" => Some(Self::Datetime),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::Datetime)
    }
}

/// Validated description of one field for one capability (sort, filter,
/// search or default order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Key the client refers to the field by.
    pub field: String,
    pub target: FieldTarget,
    /// Resolved column or property path, `alias.column` for relation fields.
    pub name: String,
    /// Accepted operators; only meaningful for filter mappings.
    pub operators: Vec<FilterOperator>,
    pub title: String,
    pub field_type: FieldType,
    /// Output format for date and datetime filter values.
    pub format: Option<String>,
    /// Filter field that also takes part in global search.
    pub global_search: bool,
    /// Computed expression (e.g. an aggregate alias) rather than a column.
    pub derived: bool,
    /// Only meaningful for default order mappings.
    pub direction: SortDirection,
}

impl FieldMapping {
    /// Direct mapping with every optional attribute at its default.
    #[must_use]
    pub fn direct(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            name: field.clone(),
            title: field.clone(),
            field,
            target: FieldTarget::Direct,
            operators: Vec::new(),
            field_type: FieldType::Text,
            format: None,
            global_search: false,
            derived: false,
            direction: SortDirection::Asc,
        }
    }

    #[must_use]
    pub fn join_field(&self) -> Option<&str> {
        match &self.target {
            FieldTarget::Relation { join_field, .. } => Some(join_field),
            FieldTarget::Direct => None,
        }
    }

    #[must_use]
    pub fn is_relation(&self) -> bool {
        matches!(self.target, FieldTarget::Relation { .. })
    }

    #[must_use]
    pub fn accepts(&self, operator: FilterOperator) -> bool {
        self.operators.contains(&operator)
    }
}
