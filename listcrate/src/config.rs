//! Handler configuration: which request keys carry pagination, sorting,
//! filters and search, plus the fallback page size.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

/// Separator that splits a search string into independently matched terms.
pub const SEARCH_TERM_SEPARATOR: &str = "__AND__";

fn default_page_nr_param_name() -> String {
    "page".to_string()
}

fn default_page_limit_param_name() -> String {
    "page_limit".to_string()
}

fn default_sort_param_name() -> String {
    "order_by".to_string()
}

fn default_filters_param_name() -> String {
    "filters".to_string()
}

fn default_search_param_name() -> String {
    "search".to_string()
}

const fn default_page_limit() -> u64 {
    10
}

/// Parameter name bindings shared by every list source.
///
/// ```yaml
/// page_nr_param_name: p
/// default_page_limit: 25
/// metadata_directory: config/list_mapping
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListHandlerConfig {
    #[serde(default = "default_page_nr_param_name")]
    pub page_nr_param_name: String,

    #[serde(default = "default_page_limit_param_name")]
    pub page_limit_param_name: String,

    #[serde(default = "default_sort_param_name")]
    pub sort_param_name: String,

    #[serde(default = "default_filters_param_name")]
    pub filters_param_name: String,

    /// Key inside the filters container that holds the free-text search.
    #[serde(default = "default_search_param_name")]
    pub search_param_name: String,

    /// Page size used when a page beyond the first is requested without one.
    #[serde(default = "default_page_limit")]
    pub default_page_limit: u64,

    /// Directory scanned by [`crate::mapping::YamlDriver`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_directory: Option<PathBuf>,
}

impl Default for ListHandlerConfig {
    fn default() -> Self {
        Self {
            page_nr_param_name: default_page_nr_param_name(),
            page_limit_param_name: default_page_limit_param_name(),
            sort_param_name: default_sort_param_name(),
            filters_param_name: default_filters_param_name(),
            search_param_name: default_search_param_name(),
            default_page_limit: default_page_limit(),
            metadata_directory: None,
        }
    }
}

impl ListHandlerConfig {
    /// Load configuration from a YAML string
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] when the document does not parse.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Yaml`] when it does not parse.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    #[must_use]
    pub fn with_default_page_limit(mut self, limit: u64) -> Self {
        self.default_page_limit = limit;
        self
    }

    #[must_use]
    pub fn with_metadata_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.metadata_directory = Some(directory.into());
        self
    }
}
