// src/config/loader.rs
//! Layered configuration loader: defaults, TOML files, environment overrides

use crate::config::{constants::paths, PipelineConfig};
use crate::error::TgError;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info};

/// Configuration loader merging every discovered source
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: String,
    current_config: Arc<RwLock<PipelineConfig>>,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Configuration validation errors: {}", .0.join("; "))]
    ValidationError(Vec<String>),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for TgError {
    fn from(err: ConfigError) -> Self {
        TgError::configuration("loader", err.to_string())
    }
}

impl ConfigLoader {
    /// Create a loader over the standard configuration locations
    pub fn new() -> Self {
        Self::with_paths(Self::discover_config_paths())
    }

    /// Create loader with custom paths, applied in order
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            env_prefix: paths::ENV_PREFIX.to_string(),
            current_config: Arc::new(RwLock::new(PipelineConfig::default())),
        }
    }

    /// Override the environment variable prefix (default `TG_`)
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load and validate the merged pipeline configuration
    pub fn load(&mut self) -> Result<PipelineConfig, ConfigError> {
        let config = self.load_and_merge_configs()?;
        *self.current_config.write() = config.clone();

        info!(
            sources = self.config_paths.iter().filter(|p| p.exists()).count(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Get current configuration
    pub fn get_current_config(&self) -> PipelineConfig {
        self.current_config.read().clone()
    }

    /// Validate a single configuration file on top of the defaults
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let mut merged = Self::default_value()?;
        Self::merge_toml_values(&mut merged, self.load_config_file(path)?);
        Self::into_config(merged).map(|_| ())
    }

    /// Export current configuration to file
    pub fn export_config<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let config = self.get_current_config();
        let toml_content =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Get configuration file modification times
    pub fn get_config_timestamps(&self) -> Vec<(PathBuf, Option<SystemTime>)> {
        self.config_paths
            .iter()
            .map(|path| {
                let timestamp = std::fs::metadata(path)
                    .and_then(|meta| meta.modified())
                    .ok();
                (path.clone(), timestamp)
            })
            .collect()
    }

    fn load_and_merge_configs(&self) -> Result<PipelineConfig, ConfigError> {
        let mut merged_config = Self::default_value()?;

        for config_path in &self.config_paths {
            match self.load_config_file(config_path) {
                Ok(file_config) => {
                    debug!(path = %config_path.display(), "Merging configuration file");
                    Self::merge_toml_values(&mut merged_config, file_config);
                }
                // Every location is optional
                Err(ConfigError::FileNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        self.apply_environment_overrides(&mut merged_config);

        Self::into_config(merged_config)
    }

    fn default_value() -> Result<toml::Value, ConfigError> {
        toml::Value::try_from(PipelineConfig::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn into_config(value: toml::Value) -> Result<PipelineConfig, ConfigError> {
        let config: PipelineConfig = value.try_into().map_err(|e: toml::de::Error| {
            ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
        })?;

        config
            .validate_consistency()
            .map_err(ConfigError::ValidationError)?;
        Ok(config)
    }

    fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<toml::Value, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: toml::Value = toml::from_str(&content)?;

        Ok(config)
    }

    fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
        match (base, overlay) {
            (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
                for (key, value) in overlay_table {
                    if let Some(base_value) = base_table.get_mut(&key) {
                        Self::merge_toml_values(base_value, value);
                    } else {
                        base_table.insert(key, value);
                    }
                }
            }
            (base_value, overlay_value) => {
                *base_value = overlay_value;
            }
        }
    }

    /// `TG_SIGNAL__SAMPLING_RATE_HZ=125` sets `signal.sampling_rate_hz`
    fn apply_environment_overrides(&self, config: &mut toml::Value) {
        for (key, value) in std::env::vars() {
            let Some(stripped) = key.strip_prefix(&self.env_prefix) else {
                continue;
            };
            let parts: Vec<String> = stripped
                .split("__")
                .filter(|part| !part.is_empty())
                .map(|part| part.to_lowercase())
                .collect();
            if parts.is_empty() {
                continue;
            }

            debug!(variable = %key, "Applying environment override");
            Self::set_nested_value(config, &parts, Self::parse_env_value(&value));
        }
    }

    fn parse_env_value(value: &str) -> toml::Value {
        if let Ok(int_val) = value.parse::<i64>() {
            toml::Value::Integer(int_val)
        } else if let Ok(float_val) = value.parse::<f64>() {
            toml::Value::Float(float_val)
        } else if let Ok(bool_val) = value.parse::<bool>() {
            toml::Value::Boolean(bool_val)
        } else if value.trim_start().starts_with('[') {
            // Arrays such as `[0, 3]`
            toml::from_str::<toml::Table>(&format!("v = {}", value))
                .ok()
                .and_then(|mut table| table.remove("v"))
                .unwrap_or_else(|| toml::Value::String(value.to_string()))
        } else {
            toml::Value::String(value.to_string())
        }
    }

    fn set_nested_value(config: &mut toml::Value, parts: &[String], value: toml::Value) {
        let mut current = config;

        for (i, part) in parts.iter().enumerate() {
            let toml::Value::Table(table) = current else {
                return;
            };
            if i == parts.len() - 1 {
                table.insert(part.clone(), value);
                return;
            }
            current = table
                .entry(part.clone())
                .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
        }
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // System-wide configuration
        paths.push(PathBuf::from(paths::SYSTEM_CONFIG_PATH));

        // User configuration
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(paths::USER_CONFIG_DIR).join("config.toml"));
        }

        // Local configurations (in order of precedence)
        paths.push(PathBuf::from(paths::DEFAULT_CONFIG_FILE));
        paths.push(PathBuf::from(paths::LOCAL_CONFIG_FILE));

        paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var_os("USERPROFILE").map(PathBuf::from)
        }
        #[cfg(not(target_os = "windows"))]
        {
            std::env::var_os("HOME").map(PathBuf::from)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingMode;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "{}", content).unwrap();
        temp_file
    }

    #[test]
    fn test_config_loader_creation() {
        let loader = ConfigLoader::new();
        assert!(!loader.config_paths().is_empty());
    }

    #[test]
    #[serial]
    fn test_load_defaults_without_files() {
        let mut loader = ConfigLoader::with_paths(vec![PathBuf::from("/nonexistent/tg.toml")]);
        let config = loader.load().unwrap();
        assert_eq!(config.signal.sampling_rate_hz, 250);
    }

    #[test]
    #[serial]
    fn test_files_merge_in_order() {
        let first = write_config(
            r#"
[signal]
sampling_rate_hz = 125
channel_count = 4
        "#,
        );
        let second = write_config(
            r#"
[signal]
channel_count = 16

[processing]
mode = "wavelet"
        "#,
        );

        let mut loader =
            ConfigLoader::with_paths(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        let config = loader.load().unwrap();

        assert_eq!(config.signal.sampling_rate_hz, 125);
        assert_eq!(config.signal.channel_count, 16);
        assert_eq!(config.processing.mode, ProcessingMode::TimeFrequency);
    }

    #[test]
    fn test_config_file_validation() {
        let loader = ConfigLoader::with_paths(Vec::new());
        let valid = write_config(
            r#"
[signal]
sampling_rate_hz = 125
window_seconds = 5
        "#,
        );
        assert!(loader.validate_config_file(valid.path()).is_ok());

        let invalid = write_config(
            r#"
[signal]
sampling_rate_hz = 500
        "#,
        );
        assert!(matches!(
            loader.validate_config_file(invalid.path()),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let loader = ConfigLoader::with_paths(Vec::new());
        let broken = write_config("[signal\nsampling_rate_hz = ");
        assert!(matches!(
            loader.validate_config_file(broken.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        unsafe {
            std::env::set_var("TGTEST_SIGNAL__SAMPLING_RATE_HZ", "125");
            std::env::set_var("TGTEST_PROCESSING__MODE", "time_domain");
        }

        let mut loader = ConfigLoader::with_paths(Vec::new()).with_env_prefix("TGTEST_");
        let result = loader.load();

        unsafe {
            std::env::remove_var("TGTEST_SIGNAL__SAMPLING_RATE_HZ");
            std::env::remove_var("TGTEST_PROCESSING__MODE");
        }

        let config = result.unwrap();
        assert_eq!(config.signal.sampling_rate_hz, 125);
        assert_eq!(config.processing.mode, ProcessingMode::TimeDomain);
    }

    #[test]
    #[serial]
    fn test_invalid_environment_override_rejected() {
        unsafe {
            std::env::set_var("TGBAD_SIGNAL__CHANNEL_COUNT", "6");
        }

        let mut loader = ConfigLoader::with_paths(Vec::new()).with_env_prefix("TGBAD_");
        let result = loader.load();

        unsafe {
            std::env::remove_var("TGBAD_SIGNAL__CHANNEL_COUNT");
        }

        let err: TgError = result.unwrap_err().into();
        assert!(matches!(err, TgError::Configuration { .. }));
    }

    #[test]
    fn test_parse_env_array() {
        let value = ConfigLoader::parse_env_value("[0, 3]");
        assert_eq!(value.as_array().map(|a| a.len()), Some(2));
        assert_eq!(ConfigLoader::parse_env_value("0.5"), toml::Value::Float(0.5));
    }

    #[test]
    fn test_config_export() {
        let loader = ConfigLoader::with_paths(Vec::new());
        let temp_file = NamedTempFile::new().unwrap();

        assert!(loader.export_config(temp_file.path()).is_ok());

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("[signal]"));
        assert!(content.contains("sampling_rate_hz = 250"));
    }
}
