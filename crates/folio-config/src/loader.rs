//! Configuration loading from TOML, YAML and JSON sources

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::PaginationConfig;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Reading the configuration file failed
    #[error("I/O error: {0}")]
    Io(String),

    /// The file extension does not name a supported format
    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// The source could not be parsed
    #[error("Parse error ({format}): {message}")]
    Parse {
        /// Format that was being parsed
        format: ConfigFormat,
        /// Parser message
        message: String,
    },

    /// The parsed configuration violates a constraint
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// A requested page size is outside the allowed range
    #[error("Invalid page size {requested}: must be between 1 and {max}")]
    PageSize {
        /// Size that was requested
        requested: usize,
        /// Largest size allowed
        max: usize,
    },
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Supported configuration formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML
    #[cfg(feature = "toml")]
    Toml,
    /// YAML
    #[cfg(feature = "yaml")]
    Yaml,
    /// JSON
    Json,
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            #[cfg(feature = "toml")]
            Self::Toml => "toml",
            #[cfg(feature = "yaml")]
            Self::Yaml => "yaml",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

impl ConfigFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            #[cfg(feature = "toml")]
            "toml" => Ok(Self::Toml),
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Loads and validates [`PaginationConfig`]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file, choosing the format by extension
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<PaginationConfig, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let contents = tokio::fs::read_to_string(path).await?;
        debug!("loading {} configuration from {}", format, path.display());
        Self::from_str(&contents, format)
    }

    /// Parse configuration from a string in the given format
    pub fn from_str(contents: &str, format: ConfigFormat) -> Result<PaginationConfig, ConfigError> {
        let parse_err = |message: String| ConfigError::Parse { format, message };
        let config: PaginationConfig = match format {
            #[cfg(feature = "toml")]
            ConfigFormat::Toml => toml::from_str(contents).map_err(|e| parse_err(e.to_string()))?,
            #[cfg(feature = "yaml")]
            ConfigFormat::Yaml => {
                serde_yaml::from_str(contents).map_err(|e| parse_err(e.to_string()))?
            }
            ConfigFormat::Json => {
                serde_json::from_str(contents).map_err(|e| parse_err(e.to_string()))?
            }
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("folio.json")).unwrap(),
            ConfigFormat::Json
        );
        #[cfg(feature = "yaml")]
        assert_eq!(
            ConfigFormat::from_path(Path::new("folio.YML")).unwrap(),
            ConfigFormat::Yaml
        );
        assert!(matches!(
            ConfigFormat::from_path(Path::new("folio.ini")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        assert!(ConfigFormat::from_path(Path::new("folio")).is_err());
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let config = ConfigLoader::from_str(r#"{"default_page_size": 10}"#, ConfigFormat::Json)
            .unwrap();
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.max_page_size, Some(100));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let err = ConfigLoader::from_str(r#"{"default_page_size": 0}"#, ConfigFormat::Json)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_source() {
        let err = ConfigLoader::from_str("{not json", ConfigFormat::Json).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Parse {
                format: ConfigFormat::Json,
                ..
            }
        ));
    }
}
