//! Declarative list metadata: which fields of an entity can be sorted,
//! filtered and searched, and how they map onto columns or index fields.
//!
//! Declarations come from a [`MetadataDriver`] (in code through
//! [`StaticDriver`], or from mapping files through [`YamlDriver`]), are
//! validated into an immutable [`ListMetadata`], and are cached per entity by
//! [`ListMetadataManager`].

pub mod driver;
pub mod field;
pub mod information;
pub mod manager;
pub mod metadata;
pub mod yaml;

pub use driver::{MetadataDriver, StaticDriver};
pub use field::{FieldMapping, FieldTarget, FieldType, JoinType};
pub use information::{FieldDeclarations, FieldOptions, MappingInformation};
pub use manager::ListMetadataManager;
pub use metadata::ListMetadata;
pub use yaml::YamlDriver;
