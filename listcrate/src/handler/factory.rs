use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::sync::Arc;

use super::EntityListHandler;
use crate::config::ListHandlerConfig;
use crate::errors::ListError;
use crate::mapping::ListMetadataManager;
use crate::source::{ArrayListSource, ListEntity, OrmListSource, Row, SearchIndexClient, SearchIndexListSource};

/// Builds list handlers from cached metadata and one shared configuration.
#[derive(Debug, Clone)]
pub struct EntityListHandlerFactory {
    manager: Arc<ListMetadataManager>,
    config: ListHandlerConfig,
}

impl EntityListHandlerFactory {
    #[must_use]
    pub fn new(manager: Arc<ListMetadataManager>, config: ListHandlerConfig) -> Self {
        Self { manager, config }
    }

    #[must_use]
    pub fn manager(&self) -> &ListMetadataManager {
        &self.manager
    }

    #[must_use]
    pub fn config(&self) -> &ListHandlerConfig {
        &self.config
    }

    /// Handler over entity `E`, with metadata looked up by its table name.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Mapping`] when the metadata cannot be loaded, or
    /// [`ListError::UnknownAssociation`] when a relation mapping does not
    /// match an association of `E`.
    pub fn orm_handler<E: ListEntity>(
        &self,
        db: DatabaseConnection,
    ) -> Result<EntityListHandler<OrmListSource<E>>, ListError> {
        let metadata = self.manager.get(E::default().table_name())?;
        let source = OrmListSource::new(metadata, self.config.clone(), db)?;
        Ok(EntityListHandler::new(source))
    }

    /// Handler over the search index documents of `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Mapping`] when the metadata cannot be loaded.
    pub fn search_index_handler<C: SearchIndexClient>(
        &self,
        entity: &str,
        client: C,
    ) -> Result<EntityListHandler<SearchIndexListSource<C>>, ListError> {
        let metadata = self.manager.get(entity)?;
        Ok(EntityListHandler::new(SearchIndexListSource::new(
            metadata,
            self.config.clone(),
            client,
        )))
    }

    /// Handler over rows already held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Mapping`] when the metadata cannot be loaded.
    pub fn array_handler(
        &self,
        entity: &str,
        rows: Vec<Row>,
    ) -> Result<EntityListHandler<ArrayListSource>, ListError> {
        let metadata = self.manager.get(entity)?;
        Ok(EntityListHandler::new(ArrayListSource::new(
            metadata,
            self.config.clone(),
            rows,
        )))
    }

    /// Like [`Self::array_handler`], keeping only the JSON objects of `values`.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Mapping`] when the metadata cannot be loaded.
    pub fn array_handler_from_values(
        &self,
        entity: &str,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<EntityListHandler<ArrayListSource>, ListError> {
        let metadata = self.manager.get(entity)?;
        Ok(EntityListHandler::new(ArrayListSource::from_values(
            metadata,
            self.config.clone(),
            values,
        )))
    }
}
