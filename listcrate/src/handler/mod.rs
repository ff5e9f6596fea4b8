//! # Entity List Handlers
//!
//! An [`EntityListHandler`] is the public face of one list: it forwards to a
//! [`ListSource`] and passes fetched items through a [`ListResultConverter`].
//! [`EntityListHandlerFactory`] wires sources to cached metadata.
//!
//! ```rust,ignore
//! let factory = EntityListHandlerFactory::new(manager, config);
//! let mut handler = factory
//!     .orm_handler::<post::Entity>(db)?
//!     .with_converter(|post: post::Model| PostSummary::from(post));
//!
//! let page = handler.page(&request).await?;
//! ```

mod factory;
mod result;

pub use factory::EntityListHandlerFactory;
pub use result::{ListResultConverter, NoConvertResultConverter};

use axum::{
    Json,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::ListError;
use crate::models::FilterableField;
use crate::request::RequestParameters;
use crate::source::ListSource;

/// Header carrying the unpaginated total of a [`ListPage`] response.
pub const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

/// One page of results with the total matching count.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T: Serialize> IntoResponse for ListPage<T> {
    fn into_response(self) -> Response {
        let total = HeaderValue::from(self.total);
        let mut response = (StatusCode::OK, Json(self)).into_response();
        response.headers_mut().insert(TOTAL_COUNT_HEADER, total);
        response
    }
}

/// List of one entity type backed by source `S`.
pub struct EntityListHandler<S, C = NoConvertResultConverter> {
    source: S,
    converter: C,
}

impl<S: ListSource> EntityListHandler<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            converter: NoConvertResultConverter,
        }
    }
}

impl<S, C> EntityListHandler<S, C>
where
    S: ListSource,
    C: ListResultConverter<S::Item>,
{
    /// Replace the result converter.
    #[must_use]
    pub fn with_converter<D>(self, converter: D) -> EntityListHandler<S, D>
    where
        D: ListResultConverter<S::Item>,
    {
        EntityListHandler {
            source: self.source,
            converter,
        }
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Converted page of items for `request`.
    ///
    /// # Errors
    ///
    /// Returns the source's [`ListError`].
    pub async fn results(&mut self, request: &dyn RequestParameters) -> Result<Vec<C::Output>, ListError> {
        let items = self.source.process_source(request).await?;
        Ok(self.converter.convert(items))
    }

    /// Items matching the request's filters and search, ignoring pagination.
    ///
    /// # Errors
    ///
    /// Returns the source's [`ListError`].
    pub async fn items_count(&mut self, request: &dyn RequestParameters) -> Result<u64, ListError> {
        self.source.items_count(request).await
    }

    /// Results together with the total count.
    ///
    /// # Errors
    ///
    /// Returns the source's [`ListError`].
    pub async fn page(&mut self, request: &dyn RequestParameters) -> Result<ListPage<C::Output>, ListError> {
        let items = self.results(request).await?;
        let total = self.items_count(request).await?;
        Ok(ListPage { items, total })
    }

    #[must_use]
    pub fn sortable_fields(&self) -> Vec<String> {
        self.source.sortable_fields()
    }

    #[must_use]
    pub fn filterable_fields(&self) -> Vec<FilterableField> {
        self.source.filterable_fields()
    }
}
