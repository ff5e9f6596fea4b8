use std::path::{Path, PathBuf};

use super::driver::MetadataDriver;
use super::information::MappingInformation;
use crate::errors::MappingError;

/// Reads one mapping file per entity from a directory.
///
/// The file for entity `Post` is `<directory>/post.yml`, falling back to
/// `<directory>/post.yaml`.
#[derive(Debug, Clone)]
pub struct YamlDriver {
    directory: PathBuf,
}

impl YamlDriver {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn mapping_file(&self, entity: &str) -> Option<PathBuf> {
        let stem = entity.to_lowercase();
        ["yml", "yaml"]
            .into_iter()
            .map(|extension| self.directory.join(format!("{stem}.{extension}")))
            .find(|path| path.is_file())
    }
}

impl MetadataDriver for YamlDriver {
    fn mapping_information(&self, entity: &str) -> Result<MappingInformation, MappingError> {
        let missing = || MappingError::MissingMetadata {
            entity: entity.to_string(),
        };

        let path = self.mapping_file(entity).ok_or_else(missing)?;
        tracing::debug!(entity, path = %path.display(), "Loading list mapping file");

        let content = std::fs::read_to_string(&path)?;
        let document: serde_yaml::Value = serde_yaml::from_str(&content)?;
        if document.is_null() {
            return Err(missing());
        }

        Ok(serde_yaml::from_value(document)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_reads_lowercased_file_name() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("post.yml"),
            "sortableFields: [title]\ngroupBy: id\n",
        )
        .unwrap();

        let driver = YamlDriver::new(dir.path());
        let metadata = driver.list_metadata("Post").unwrap();
        assert!(metadata.sort_fields().contains_key("title"));
        assert_eq!(metadata.group_by(), Some("id"));
    }

    #[test]
    fn test_yaml_extension_fallback() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tag.yaml"), "searchFields: [label]\n").unwrap();

        let metadata = YamlDriver::new(dir.path()).list_metadata("tag").unwrap();
        assert!(metadata.search_fields().contains_key("label"));
    }

    #[test]
    fn test_missing_and_empty_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("empty.yml"), "~\n").unwrap();
        let driver = YamlDriver::new(dir.path());

        assert!(matches!(
            driver.list_metadata("absent"),
            Err(MappingError::MissingMetadata { .. })
        ));
        assert!(matches!(
            driver.list_metadata("empty"),
            Err(MappingError::MissingMetadata { .. })
        ));
    }

    #[test]
    fn test_broken_yaml() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("post.yml"), "sortableFields: [title\n").unwrap();

        assert!(matches!(
            YamlDriver::new(dir.path()).list_metadata("post"),
            Err(MappingError::Yaml(_))
        ));
    }
}
