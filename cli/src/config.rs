//! Application configuration loaded from YAML.
//!
//! # Example YAML
//!
//! ```yaml
//! name: tool
//! about: Does useful things
//! version: "1.2.0"
//! validate: true
//! allow_pdb: true
//! debug_flag: true
//! obj:
//!   region: eu-north-1
//! ```
//!
//! Every key is optional. `obj` seeds the context namespace that the root
//! callback and commands share.

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Settings for a [`Cli`](crate::Cli).
///
/// # Examples
///
/// ```
/// use command_model::CliConfig;
///
/// let config = CliConfig::from_yaml_str("name: tool\nvalidate: false\n").unwrap();
/// assert_eq!(config.name, "tool");
/// assert!(!config.validate);
/// assert!(config.allow_pdb);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Program name used in usage output.
    pub name: String,
    /// Description shown in help output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    /// Version reported by `--version`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Validate command arguments unless a command opts out.
    pub validate: bool,
    /// Allow post-mortem reporting unless a command opts out.
    pub allow_pdb: bool,
    /// Install the global `--pdb` flag.
    pub debug_flag: bool,
    /// Initial context namespace.
    pub obj: Map<String, Value>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            name: "cli".to_string(),
            about: None,
            version: None,
            validate: true,
            allow_pdb: true,
            debug_flag: false,
            obj: Map::new(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Parses configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if parsing fails.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be written, or
    /// [`ConfigError::Yaml`] if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
name: tool
about: Does useful things
version: "1.2.0"
validate: false
debug_flag: true
obj:
  region: eu-north-1
  retries: 3
"#
    }

    #[test]
    fn test_parse_sample() {
        let config = CliConfig::from_yaml_str(sample_yaml()).unwrap();
        assert_eq!(config.name, "tool");
        assert_eq!(config.version.as_deref(), Some("1.2.0"));
        assert!(!config.validate);
        assert!(config.allow_pdb);
        assert!(config.debug_flag);
        assert_eq!(config.obj.get("retries"), Some(&json!(3)));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = CliConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cli.yaml");
        let config = CliConfig::from_yaml_str(sample_yaml()).unwrap();

        config.save(&path).unwrap();
        let loaded = CliConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = CliConfig::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_rejects_wrong_types() {
        let err = CliConfig::from_yaml_str("validate: sometimes").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }
}
