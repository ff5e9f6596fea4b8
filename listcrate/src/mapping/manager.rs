use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::driver::MetadataDriver;
use super::metadata::ListMetadata;
use crate::errors::MappingError;

/// Process-wide registry of validated list metadata.
///
/// Metadata is built on first use and shared as `Arc<ListMetadata>`; entries
/// are never mutated after insertion.
pub struct ListMetadataManager {
    driver: Box<dyn MetadataDriver>,
    cache: RwLock<HashMap<String, Arc<ListMetadata>>>,
}

impl ListMetadataManager {
    #[must_use]
    pub fn new(driver: impl MetadataDriver + 'static) -> Self {
        Self {
            driver: Box::new(driver),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Metadata for `entity`, loading and caching it on first access.
    ///
    /// # Errors
    ///
    /// Returns the driver's [`MappingError`]; failed lookups are not cached.
    pub fn get(&self, entity: &str) -> Result<Arc<ListMetadata>, MappingError> {
        if let Some(metadata) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity)
        {
            return Ok(Arc::clone(metadata));
        }

        let metadata = Arc::new(self.driver.list_metadata(entity)?);
        tracing::debug!(entity, "List metadata loaded");

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            cache.entry(entity.to_string()).or_insert(metadata),
        ))
    }

    /// Load every listed entity up front so definition errors surface at
    /// startup.
    ///
    /// # Errors
    ///
    /// Returns the first [`MappingError`] encountered.
    pub fn warm_up<I, S>(&self, entities: I) -> Result<(), MappingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entity in entities {
            self.get(entity.as_ref())?;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_cached(&self, entity: &str) -> bool {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(entity)
    }
}

impl std::fmt::Debug for ListMetadataManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached: Vec<String> = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        f.debug_struct("ListMetadataManager")
            .field("cached", &cached)
            .finish_non_exhaustive()
    }
}
