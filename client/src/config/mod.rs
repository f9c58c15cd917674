//! Configuration management

use anyhow::{Context, Result};
use meter::catalog::builtin_targets;
use meter::{MeasurementConfig, Target};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_PATH: &str = "hifi-jitter.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Duplicate target id: {0}")]
    DuplicateTarget(String),

    #[error("max_history must be greater than zero")]
    ZeroHistory,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub measurement: MeasurementConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Appended to the built-in catalog
    #[serde(default)]
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_true")]
    pub use_colors: bool,
    #[serde(default)]
    pub show_guidance: bool,
    #[serde(default = "default_export_directory")]
    pub export_directory: String,
    #[serde(default = "default_chart_width")]
    pub chart_width: u32,
    #[serde(default = "default_chart_height")]
    pub chart_height: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_database_path() -> String {
    "hifi-jitter.db".to_string()
}

fn default_max_history() -> usize {
    100
}

fn default_export_directory() -> String {
    ".".to_string()
}

fn default_chart_width() -> u32 {
    1200
}

fn default_chart_height() -> u32 {
    600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            max_history: default_max_history(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            use_colors: true,
            show_guidance: false,
            export_directory: default_export_directory(),
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| "Failed to parse config file")?;

        Ok(config)
    }

    /// Load `path`; the default path may be absent, an explicit one may not.
    /// Callers validate after applying command line overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P, explicit: bool) -> Result<Self> {
        if !explicit && !path.as_ref().exists() {
            debug!("No config at {:?}, using defaults", path.as_ref());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> Result<()> {
        self.measurement
            .validate()
            .context("Invalid [measurement] section")?;

        if self.storage.max_history == 0 {
            return Err(ConfigError::ZeroHistory.into());
        }

        for target in &self.targets {
            target
                .validate()
                .with_context(|| format!("Invalid target {}", target.id))?;
        }

        let mut seen = HashSet::new();
        for target in self.all_targets() {
            if !seen.insert(target.id.clone()) {
                return Err(ConfigError::DuplicateTarget(target.id).into());
            }
        }

        Ok(())
    }

    /// Built-in catalog followed by configured targets
    pub fn all_targets(&self) -> Vec<Target> {
        let mut targets = builtin_targets();
        targets.extend(self.targets.iter().cloned());
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter::ProbeStrategy;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        let config = Config::load(file.path()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.measurement, MeasurementConfig::default());
        assert_eq!(config.storage.max_history, 100);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.all_targets().len(), 6);
    }

    #[test]
    fn test_custom_target_and_measurement() {
        let file = write_config(
            r#"
[measurement]
sample_count = 20
interval_ms = 250

[[targets]]
id = "deezer"
display_name = "Deezer"
tier_label = "HiFi"
bitrate_label = "16bit/44.1kHz (FLAC)"
probe_strategy = "opaque-head"
endpoints = ["https://e-cdns-proxy.dzcdn.net"]
"#,
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.measurement.sample_count, 20);
        assert_eq!(config.measurement.warmup_count, 5);

        let targets = config.all_targets();
        let deezer = targets.last().unwrap();
        assert_eq!(deezer.id, "deezer");
        assert_eq!(deezer.probe_strategy, ProbeStrategy::OpaqueHead);
    }

    #[test]
    fn test_zero_samples_rejected() {
        let file = write_config("[measurement]\nsample_count = 0\n");
        let config = Config::load(file.path()).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let file = write_config(
            r#"
[[targets]]
id = "tidal"
display_name = "TIDAL mirror"
tier_label = "-"
bitrate_label = "-"
probe_strategy = "image-load"
endpoints = ["https://example.com"]
"#,
        );
        let err = Config::load(file.path()).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate target id"));
    }

    #[test]
    fn test_missing_default_path_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(Config::load_or_default(&path, false).is_ok());
        assert!(Config::load_or_default(&path, true).is_err());
    }
}
