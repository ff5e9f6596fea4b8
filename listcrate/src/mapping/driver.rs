use std::collections::HashMap;

use super::information::MappingInformation;
use super::metadata::ListMetadata;
use crate::errors::MappingError;

/// Source of raw list declarations, looked up by entity identifier.
pub trait MetadataDriver: Send + Sync {
    /// Raw declarations for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::MissingMetadata`] when nothing is declared for
    /// the entity, or the driver's own loading error.
    fn mapping_information(&self, entity: &str) -> Result<MappingInformation, MappingError>;

    /// Validated metadata for `entity`.
    ///
    /// # Errors
    ///
    /// Propagates loading errors and declaration validation errors.
    fn list_metadata(&self, entity: &str) -> Result<ListMetadata, MappingError> {
        let information = self.mapping_information(entity)?;
        ListMetadata::from_information(&information)
    }
}

/// Declarations registered in code at startup.
///
/// ```rust,ignore
/// let driver = StaticDriver::new().with(
///     "posts",
///     MappingInformation::new()
///         .sortable("title", FieldOptions::direct())
///         .filter("status", FieldOptions::direct().operators(&[FilterOperator::Eq])),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticDriver {
    entities: HashMap<String, MappingInformation>,
}

impl StaticDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, entity: impl Into<String>, information: MappingInformation) -> Self {
        self.register(entity, information);
        self
    }

    pub fn register(&mut self, entity: impl Into<String>, information: MappingInformation) {
        self.entities.insert(entity.into(), information);
    }
}

impl MetadataDriver for StaticDriver {
    fn mapping_information(&self, entity: &str) -> Result<MappingInformation, MappingError> {
        self.entities
            .get(entity)
            .cloned()
            .ok_or_else(|| MappingError::MissingMetadata {
                entity: entity.to_string(),
            })
    }
}
