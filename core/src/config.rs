//! Ingest configuration.
//!
//! Controls the shape of the export being read and how it is persisted.
//! Every field has a default, so an empty YAML document is valid.
//!
//! # Example YAML
//!
//! ```yaml
//! target_depth: 4
//! max_nesting: 256
//! batch_size: 10000
//! strict: false
//! ```

use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};

/// Depth, counted from the document root at 1, of persisted elements.
pub const DEFAULT_TARGET_DEPTH: usize = 4;

/// Element levels accepted inside one top-level element.
pub const DEFAULT_MAX_NESTING: usize = 256;

/// Rows committed per store transaction.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Settings for one ingest run.
///
/// # Examples
///
/// ```
/// use te_core::IngestConfig;
///
/// let config = IngestConfig::default();
/// assert_eq!(config.target_depth, 4);
/// assert_eq!(config.batch_size, 10_000);
/// assert!(!config.strict);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Depth at which a closing tag marks a complete business element.
    pub target_depth: usize,
    /// Deepest element nesting accepted below a top-level element.
    pub max_nesting: usize,
    /// Maximum number of records held in one open transaction.
    pub batch_size: usize,
    /// Reject duplicate and missing identifiers instead of tolerating them.
    pub strict: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            target_depth: DEFAULT_TARGET_DEPTH,
            max_nesting: DEFAULT_MAX_NESTING,
            batch_size: DEFAULT_BATCH_SIZE,
            strict: false,
        }
    }
}

impl IngestConfig {
    /// Loads configuration from a YAML file and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if parsing fails, or [`ConfigError::Invalid`]
    /// if a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let config: Self = serde_yaml::from_reader(BufReader::new(file))?;
        config.validate()?;
        debug!(path = %path.display(), ?config, "Loaded ingest config");
        Ok(config)
    }

    /// Checks that depth and batch size are usable.
    pub fn validate(&self) -> Result<()> {
        if self.target_depth == 0 {
            return Err(ConfigError::Invalid(
                "target_depth must be at least 1".to_string(),
            ));
        }
        if self.max_nesting == 0 {
            return Err(ConfigError::Invalid(
                "max_nesting must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: IngestConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, IngestConfig::default());
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let config: IngestConfig = serde_yaml::from_str("batch_size: 50\nstrict: true\n").unwrap();
        assert_eq!(config.batch_size, 50);
        assert!(config.strict);
        assert_eq!(config.target_depth, DEFAULT_TARGET_DEPTH);
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = IngestConfig {
            batch_size: 0,
            ..IngestConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = IngestConfig {
            target_depth: 0,
            ..IngestConfig::default()
        };
        assert!(config.validate().is_err());

        let config = IngestConfig {
            max_nesting: 0,
            ..IngestConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_nesting_from_yaml() {
        let config: IngestConfig = serde_yaml::from_str("max_nesting: 32\n").unwrap();
        assert_eq!(config.max_nesting, 32);
        assert_eq!(config.target_depth, DEFAULT_TARGET_DEPTH);
        assert_eq!(IngestConfig::default().max_nesting, DEFAULT_MAX_NESTING);
    }

    #[test]
    fn test_load_missing_file() {
        let err = IngestConfig::load("/nonexistent/te-config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
