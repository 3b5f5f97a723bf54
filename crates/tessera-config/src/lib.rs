use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Surface quirks to work around. All off unless the host opts in.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuirkConfig {
    /// Selection objects may carry several ranges (one per table cell)
    pub multi_range_selection: bool,
    /// A selection ending on a trailing line break is reported one line too far
    pub trailing_line_break: bool,
    /// Composition may start inside a zero-width placeholder
    pub composition_in_placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    pub retries: u32,
    pub delay_ms: u64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            retries: 5,
            delay_ms: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Render generations an unseen node keeps its key for
    pub sweep_age: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { sweep_age: 8 }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub quirks: QuirkConfig,
    pub focus: FocusConfig,
    pub registry: RegistryConfig,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        Ok(Some(config))
    }

    /// Loads the config at `config_path`, falling back to defaults when there is none
    pub fn load_or_default<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        Ok(Self::load_from_path(config_path)?.unwrap_or_default())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/tessera");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/tessera/config.toml"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.focus.retries, 5);
        assert_eq!(config.focus.delay_ms, 10);
        assert_eq!(config.registry.sweep_age, 8);
        assert_eq!(config.quirks, QuirkConfig::default());
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [quirks]
            trailing_line_break = true

            [focus]
            retries = 2
            "#,
        )
        .unwrap();

        assert!(config.quirks.trailing_line_break);
        assert!(!config.quirks.multi_range_selection);
        assert_eq!(config.focus.retries, 2);
        assert_eq!(config.focus.delay_ms, 10);
        assert_eq!(config.registry, RegistryConfig::default());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = Config {
            quirks: QuirkConfig {
                multi_range_selection: true,
                trailing_line_break: false,
                composition_in_placeholder: true,
            },
            focus: FocusConfig {
                retries: 3,
                delay_ms: 25,
            },
            registry: RegistryConfig { sweep_age: 2 },
        };

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_load_nonexistent_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&config_path).unwrap();
        assert!(result.is_none());

        let config = Config::load_or_default(&config_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_written_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut original = Config::default();
        original.quirks.composition_in_placeholder = true;
        original.registry.sweep_age = 1;

        std::fs::write(&config_path, toml::to_string_pretty(&original).unwrap()).unwrap();

        let loaded = Config::load_from_path(&config_path).unwrap().unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");

        std::fs::write(&config_path, "[focus\nretries = ").unwrap();

        let result = Config::load_from_path(&config_path);
        assert!(matches!(result, Err(ConfigError::ConfigParseError { .. })));
    }

    #[test]
    fn test_load_wrong_type() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("wrong.toml");

        std::fs::write(&config_path, "[focus]\nretries = \"lots\"\n").unwrap();

        let result = Config::load_from_path(&config_path);
        assert!(matches!(result, Err(ConfigError::ConfigParseError { .. })));
    }
}
