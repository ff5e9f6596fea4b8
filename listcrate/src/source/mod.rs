//! List backends.
//!
//! Every backend implements [`ListSource`]: the same request produces a page
//! of items through [`ListSource::process_source`] and the unpaginated total
//! through [`ListSource::items_count`]. Backends share request extraction
//! through [`ListQueryExtractor`](crate::filtering::ListQueryExtractor) and
//! differ only in how filters, search, ordering and paging are translated.

pub mod array;
pub mod orm;
pub mod search_index;

pub use array::{ArrayListSource, Row};
pub use orm::{ListEntity, OrmListSource, RelationalQuery, RelationalQueryBuilder};
pub use search_index::{SearchIndexClient, SearchIndexListSource, SearchIndexQueryBuilder};

use async_trait::async_trait;

use crate::errors::ListError;
use crate::models::FilterableField;
use crate::request::RequestParameters;

/// Backend producing list pages for one entity type.
///
/// A source may memoize per-request work between `process_source` and
/// `items_count`; it is not meant to serve two requests at once.
#[async_trait]
pub trait ListSource: Send {
    type Item: Send;

    /// Filtered, searched, ordered and paginated items.
    async fn process_source(
        &mut self,
        request: &dyn RequestParameters,
    ) -> Result<Vec<Self::Item>, ListError>;

    /// Number of items matching filters and search, ignoring pagination.
    async fn items_count(&mut self, request: &dyn RequestParameters) -> Result<u64, ListError>;

    fn sortable_fields(&self) -> Vec<String>;

    fn filterable_fields(&self) -> Vec<FilterableField>;
}
