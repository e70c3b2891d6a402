use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::remote::DEFAULT_API_BASE_URL;

const DEFAULT_SYNC_WINDOW_DAYS: i64 = 30;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Remote calendar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Calendar API root; the public Google endpoint when unset
    pub api_base_url: Option<String>,
    /// OAuth bearer token for the calendar account
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    /// Days either side of today pulled by `calendar sync`
    pub sync_window_days: i64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            access_token: None,
            sync_window_days: DEFAULT_SYNC_WINDOW_DAYS,
        }
    }
}

impl CalendarConfig {
    /// Returns true if a token is available for remote calls
    pub fn is_configured(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub calendar: CalendarConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    calendar: Option<CalendarConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let default_db_path = Self::default_data_dir().join("fitpal.db");

        let mut database_path = ConfigValue::new(default_db_path, ConfigSource::Default);
        let mut config_file = None;
        let mut calendar = CalendarConfig::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                // Resolve relative paths against config file's directory
                let resolved_path = if db_path.is_relative() {
                    path.parent().map(|p| p.join(&db_path)).unwrap_or(db_path)
                } else {
                    db_path
                };
                database_path = ConfigValue::new(resolved_path, ConfigSource::File);
            }
            if let Some(calendar_config) = file_config.calendar {
                calendar = calendar_config;
            }
        }

        if let Ok(db_path) = std::env::var("FITPAL_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("FITPAL_CALENDAR_URL") {
            calendar.api_base_url = Some(url);
        }
        if let Ok(token) = std::env::var("FITPAL_CALENDAR_TOKEN") {
            calendar.access_token = Some(token);
        }

        Ok(Self {
            database_path,
            config_file,
            calendar,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/fitpal/
    /// - macOS: ~/Library/Application Support/fitpal/
    /// - Windows: %APPDATA%/fitpal/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitpal")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/fitpal/
    /// - macOS: ~/Library/Application Support/fitpal/
    /// - Windows: %APPDATA%/fitpal/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitpal")
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert!(config
            .database_path
            .value
            .to_string_lossy()
            .contains("fitpal.db"));
        assert_eq!(config.database_path.source, ConfigSource::Default);
        assert_eq!(config.config_file, None);
        assert_eq!(config.calendar.sync_window_days, 30);
        assert_eq!(config.calendar.base_url(), DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database_path: /custom/path/db.sqlite").unwrap();
        writeln!(file, "calendar:").unwrap();
        writeln!(file, "  api_base_url: http://localhost:9000/v3").unwrap();
        writeln!(file, "  access_token: tok").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(
            config.database_path.value,
            PathBuf::from("/custom/path/db.sqlite")
        );
        assert_eq!(config.database_path.source, ConfigSource::File);
        assert_eq!(config.config_file, Some(config_path));
        assert_eq!(config.calendar.base_url(), "http://localhost:9000/v3");
        assert!(config.calendar.is_configured());
        // Unset keys in the calendar section keep their defaults
        assert_eq!(config.calendar.sync_window_days, 30);
    }

    #[test]
    fn test_relative_database_path() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database_path: data/fitpal.db").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(
            config.database_path.value,
            temp_dir.path().join("data/fitpal.db")
        );
    }

    #[test]
    #[ignore] // Run with --ignored; env vars can pollute parallel tests
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database_path: /from/file.db").unwrap();

        std::env::set_var("FITPAL_DATABASE_PATH", "/from/env.db");
        std::env::set_var("FITPAL_CALENDAR_TOKEN", "envtoken");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.database_path.value, PathBuf::from("/from/env.db"));
        assert_eq!(config.database_path.source, ConfigSource::Environment);
        assert_eq!(config.calendar.access_token.as_deref(), Some("envtoken"));

        std::env::remove_var("FITPAL_DATABASE_PATH");
        std::env::remove_var("FITPAL_CALENDAR_TOKEN");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_token_not_serialized() {
        let calendar = CalendarConfig {
            access_token: Some("secret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&calendar).unwrap();
        assert!(!json.contains("secret"));
    }
}
