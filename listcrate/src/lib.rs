pub mod config;
pub mod errors;
pub mod filtering;
pub mod handler;
pub mod mapping;
pub mod models;
pub mod request;
pub mod source;

pub use config::{ListHandlerConfig, SEARCH_TERM_SEPARATOR};
pub use errors::{ConfigError, ListError, MappingError};
pub use handler::{
    EntityListHandler, EntityListHandlerFactory, ListPage, ListResultConverter,
    NoConvertResultConverter,
};
pub use mapping::{
    FieldMapping, FieldOptions, FieldTarget, FieldType, JoinType, ListMetadata,
    ListMetadataManager, MappingInformation, MetadataDriver, StaticDriver, YamlDriver,
};
pub use models::{Filter, FilterOperator, FilterValue, FilterableField, OrderBy, SortDirection};
pub use request::{ListRequest, RequestParameters};
pub use source::{
    ArrayListSource, ListEntity, ListSource, OrmListSource, SearchIndexClient,
    SearchIndexListSource,
};
