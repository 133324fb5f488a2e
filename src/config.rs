use crate::error::{BuildError, ConfigError};
use crate::naming::is_identifier;
use crate::utils::yaml_error_span;
use miette::NamedSource;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub const CONFIG_FILE: &str = "config.yaml";

/// The extension's `config.yaml`. Keys other than `name` and `namespace` are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtensionConfig {
    pub name: String,
    pub namespace: String,
}

impl ExtensionConfig {
    /// Reads and validates `config.yaml` from the extension root.
    ///
    /// # Errors
    /// Returns a `ConfigError` if the file is missing, malformed, or fails
    /// validation, and an I/O error if it cannot be read.
    pub fn load(root: &Path) -> Result<Self, BuildError> {
        let path = root.join(CONFIG_FILE);
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::NotFound { path }.into());
            }
            Err(e) => return Err(BuildError::io(path, e)),
        };
        let config = Self::parse(&source, &path.display().to_string())?;
        log::debug!("Loaded {} for extension `{}`", path.display(), config.name);
        Ok(config)
    }

    /// Parses and validates configuration text. `file_name` is used for error
    /// reporting only.
    ///
    /// # Errors
    /// Returns a `ConfigError` if the text is not valid YAML, is missing a
    /// required key, or fails validation.
    pub fn parse(source: &str, file_name: &str) -> Result<Self, ConfigError> {
        let config: ExtensionConfig =
            serde_yaml::from_str(source).map_err(|err| ConfigError::Malformed {
                src: NamedSource::new(file_name, source.to_string()),
                span: yaml_error_span(source, &err),
                message: err.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the name is non-empty and the namespace is a
    /// dot-separated list of identifiers.
    ///
    /// # Errors
    /// Returns `ConfigError::EmptyName` or `ConfigError::InvalidNamespace`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        let invalid = |reason: String| ConfigError::InvalidNamespace {
            namespace: self.namespace.clone(),
            reason,
        };
        if self.namespace.is_empty() {
            return Err(invalid("namespace is empty".to_string()));
        }
        for segment in self.namespace.split('.') {
            if segment.is_empty() {
                return Err(invalid("contains an empty segment".to_string()));
            }
            if !is_identifier(segment) {
                return Err(invalid(format!("`{segment}` is not an identifier")));
            }
        }
        Ok(())
    }
}
