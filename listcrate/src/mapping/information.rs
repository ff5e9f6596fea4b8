//! Raw, unvalidated list declarations as written by developers, either in code
//! or in a mapping file.
//!
//! Every field list accepts two shapes:
//!
//! ```yaml
//! sortableFields: [title, createdAt]
//! filterFields:
//!   status:
//!     operators: [eq, neq]
//!   category:
//!     target: relation
//!     name: category.title
//!     joinField: category
//!     joinType: leftJoin
//!     operators: [eq, like]
//!     globalSearch: true
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::field::{FieldType, JoinType};
use crate::models::{FilterOperator, SortDirection};

/// Options of a single declared field. String-typed attributes are validated
/// when metadata is built so unknown values produce a [`crate::MappingError`]
/// naming the field instead of a parse error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Older spelling of `name` used by filter fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operators: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_search: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

impl FieldOptions {
    #[must_use]
    pub fn direct() -> Self {
        Self {
            target: Some("direct".to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn relation(join_field: impl Into<String>, join_type: JoinType) -> Self {
        let join_type = match join_type {
            JoinType::LeftJoin => "leftJoin",
            JoinType::RightJoin => "rightJoin",
            JoinType::InnerJoin => "innerJoin",
            JoinType::Join => "join",
        };
        Self {
            target: Some("relation".to_string()),
            join_field: Some(join_field.into()),
            join_type: Some(join_type.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn operators(mut self, operators: &[FilterOperator]) -> Self {
        self.operators = Some(operators.iter().map(|op| op.symbol().to_string()).collect());
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn field_type(mut self, field_type: FieldType) -> Self {
        let name = match field_type {
            FieldType::Text => "text",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Boolean => "boolean",
        };
        self.field_type = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    #[must_use]
    pub fn global_search(mut self) -> Self {
        self.global_search = Some(true);
        self
    }

    #[must_use]
    pub fn derived(mut self) -> Self {
        self.derived = Some(true);
        self
    }

    #[must_use]
    pub fn direction(mut self, direction: SortDirection) -> Self {
        self.direction = Some(direction.as_str().to_string());
        self
    }
}

/// A field list: plain names or an ordered map of name to options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldDeclarations {
    Names(Vec<String>),
    Options(IndexMap<String, Option<FieldOptions>>),
}

impl Default for FieldDeclarations {
    fn default() -> Self {
        Self::Names(Vec::new())
    }
}

impl FieldDeclarations {
    /// Declared fields in declaration order; bare names get default options.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Option<FieldOptions>)> {
        match self {
            Self::Names(names) => names.iter().map(|name| (name.clone(), None)).collect(),
            Self::Options(map) => map
                .iter()
                .map(|(name, options)| (name.clone(), options.clone()))
                .collect(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, options: FieldOptions) {
        if let Self::Names(names) = self {
            let map = names.drain(..).map(|name| (name, None)).collect();
            *self = Self::Options(map);
        }
        if let Self::Options(map) = self {
            map.insert(name.into(), Some(options));
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Names(names) => names.is_empty(),
            Self::Options(map) => map.is_empty(),
        }
    }
}

/// Everything declared for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingInformation {
    #[serde(default)]
    pub sortable_fields: FieldDeclarations,
    #[serde(default)]
    pub filter_fields: FieldDeclarations,
    #[serde(default)]
    pub search_fields: FieldDeclarations,
    #[serde(default)]
    pub default_order_fields: FieldDeclarations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

impl MappingInformation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sortable(mut self, field: impl Into<String>, options: FieldOptions) -> Self {
        self.sortable_fields.push(field, options);
        self
    }

    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, options: FieldOptions) -> Self {
        self.filter_fields.push(field, options);
        self
    }

    #[must_use]
    pub fn search(mut self, field: impl Into<String>, options: FieldOptions) -> Self {
        self.search_fields.push(field, options);
        self
    }

    #[must_use]
    pub fn default_order(mut self, field: impl Into<String>, options: FieldOptions) -> Self {
        self.default_order_fields.push(field, options);
        self
    }

    #[must_use]
    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by = Some(column.into());
        self
    }
}
