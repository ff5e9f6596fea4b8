use chrono::format::{Item, StrftimeItems};
use indexmap::IndexMap;
use serde::Serialize;

use super::field::{FieldMapping, FieldTarget, FieldType, JoinType};
use super::information::{FieldDeclarations, FieldOptions, MappingInformation};
use crate::errors::MappingError;
use crate::models::{FilterOperator, SortDirection};

/// Validated list capabilities of one entity type.
///
/// Built once per entity and shared read-only afterwards; every map keeps the
/// declaration order of the source it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListMetadata {
    sort_fields: IndexMap<String, FieldMapping>,
    filter_fields: IndexMap<String, FieldMapping>,
    search_fields: IndexMap<String, FieldMapping>,
    default_order_fields: IndexMap<String, FieldMapping>,
    group_by: Option<String>,
}

impl ListMetadata {
    /// Apply defaults to the raw declarations and validate them.
    ///
    /// Filter fields flagged `globalSearch` join the search mappings unless a
    /// search field with the same key was declared explicitly.
    ///
    /// # Errors
    ///
    /// Returns a [`MappingError`] naming the first broken field declaration.
    pub fn from_information(information: &MappingInformation) -> Result<Self, MappingError> {
        let sort_fields = build_mappings(&information.sortable_fields, Capability::Sort)?;
        let filter_fields = build_mappings(&information.filter_fields, Capability::Filter)?;
        let mut search_fields = build_mappings(&information.search_fields, Capability::Search)?;
        let default_order_fields =
            build_mappings(&information.default_order_fields, Capability::DefaultOrder)?;

        for (field, mapping) in &filter_fields {
            if mapping.global_search && !search_fields.contains_key(field) {
                search_fields.insert(field.clone(), mapping.clone());
            }
        }

        let group_by = information
            .group_by
            .as_ref()
            .filter(|column| !column.is_empty())
            .cloned();

        Ok(Self {
            sort_fields,
            filter_fields,
            search_fields,
            default_order_fields,
            group_by,
        })
    }

    /// Parse and validate a YAML mapping document.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Yaml`] for unparsable documents and the
    /// validation errors of [`ListMetadata::from_information`].
    pub fn from_yaml_str(yaml: &str) -> Result<Self, MappingError> {
        let information: MappingInformation = serde_yaml::from_str(yaml)?;
        Self::from_information(&information)
    }

    #[must_use]
    pub fn sort_fields(&self) -> &IndexMap<String, FieldMapping> {
        &self.sort_fields
    }

    #[must_use]
    pub fn filter_fields(&self) -> &IndexMap<String, FieldMapping> {
        &self.filter_fields
    }

    #[must_use]
    pub fn search_fields(&self) -> &IndexMap<String, FieldMapping> {
        &self.search_fields
    }

    #[must_use]
    pub fn default_order_fields(&self) -> &IndexMap<String, FieldMapping> {
        &self.default_order_fields
    }

    #[must_use]
    pub fn group_by(&self) -> Option<&str> {
        self.group_by.as_deref()
    }

    /// Every relation mapping across the sort, filter and search capabilities.
    pub fn relation_mappings(&self) -> impl Iterator<Item = &FieldMapping> {
        self.sort_fields
            .values()
            .chain(self.filter_fields.values())
            .chain(self.search_fields.values())
            .chain(self.default_order_fields.values())
            .filter(|mapping| mapping.is_relation())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capability {
    Sort,
    Filter,
    Search,
    DefaultOrder,
}

fn build_mappings(
    declarations: &FieldDeclarations,
    capability: Capability,
) -> Result<IndexMap<String, FieldMapping>, MappingError> {
    declarations
        .entries()
        .into_iter()
        .map(|(field, options)| {
            let options = options.unwrap_or_default();
            let mapping = build_mapping(&field, &options, capability)?;
            Ok((field, mapping))
        })
        .collect()
}

fn build_mapping(
    field: &str,
    options: &FieldOptions,
    capability: Capability,
) -> Result<FieldMapping, MappingError> {
    let mut mapping = FieldMapping::direct(field);
    mapping.target = build_target(field, options)?;

    let name = match capability {
        Capability::Filter => options.name.as_ref().or(options.filter_field.as_ref()),
        _ => options.name.as_ref(),
    };
    if let Some(name) = name {
        mapping.name.clone_from(name);
    }
    if let Some(title) = &options.title {
        mapping.title.clone_from(title);
    }
    if let Some(field_type) = &options.field_type {
        mapping.field_type =
            FieldType::from_name(field_type).ok_or_else(|| MappingError::UnknownFieldType {
                field: field.to_string(),
                field_type: field_type.clone(),
            })?;
    }
    if let Some(format) = &options.format
        && mapping.field_type.is_temporal()
        && StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
    {
        return Err(MappingError::InvalidDateFormat {
            field: field.to_string(),
            format: format.clone(),
        });
    }
    mapping.format.clone_from(&options.format);
    mapping.global_search = options.global_search.unwrap_or(false);
    mapping.derived = options.derived.unwrap_or(false);

    if capability == Capability::Filter {
        let operators = options
            .operators
            .as_ref()
            .ok_or_else(|| MappingError::MissingOperators {
                field: field.to_string(),
            })?;
        mapping.operators = operators
            .iter()
            .map(|symbol| {
                FilterOperator::from_symbol(symbol).ok_or_else(|| MappingError::UnknownOperator {
                    field: field.to_string(),
                    operator: symbol.clone(),
                })
            })
            .collect::<Result<_, _>>()?;
    }

    if let Some(direction) = &options.direction {
        mapping.direction =
            SortDirection::from_token(direction).ok_or_else(|| MappingError::InvalidDirection {
                field: field.to_string(),
                direction: direction.clone(),
            })?;
    }

    Ok(mapping)
}

fn build_target(field: &str, options: &FieldOptions) -> Result<FieldTarget, MappingError> {
    match options.target.as_deref().unwrap_or("direct") {
        "direct" => Ok(FieldTarget::Direct),
        "relation" => {
            let (Some(join_field), Some(join_type)) = (&options.join_field, &options.join_type)
            else {
                return Err(MappingError::MissingJoin {
                    field: field.to_string(),
                });
            };
            let join_type =
                JoinType::from_name(join_type).ok_or_else(|| MappingError::UnknownJoinType {
                    field: field.to_string(),
                    join_type: join_type.clone(),
                })?;
            Ok(FieldTarget::Relation {
                join_field: join_field.clone(),
                join_type,
            })
        }
        other => Err(MappingError::UnknownTarget {
            field: field.to_string(),
            target: other.to_string(),
        }),
    }
}
