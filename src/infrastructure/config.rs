//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Telemetry output directory cannot be empty")]
    EmptyTelemetryDir,

    #[error("Pool root cannot be empty")]
    EmptyPoolRoot,

    #[error("Baseline root cannot be empty")]
    EmptyBaselineRoot,

    #[error("Meta policy path cannot be empty")]
    EmptyPolicyPath,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .showrunner/config.yaml (project config)
    /// 3. .showrunner/local.yaml (project local overrides, optional)
    /// 4. Environment variables (SHOWRUNNER_* prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.showrunner/) so several
    /// pipelines can coexist on one machine with independent pools and
    /// baselines.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".showrunner/config.yaml"))
            .merge(Yaml::file(".showrunner/local.yaml"))
            .merge(Env::prefixed("SHOWRUNNER_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.telemetry.output_dir.is_empty() {
            return Err(ConfigError::EmptyTelemetryDir);
        }
        if config.pool.root.is_empty() {
            return Err(ConfigError::EmptyPoolRoot);
        }
        if config.baseline.root.is_empty() {
            return Err(ConfigError::EmptyBaselineRoot);
        }
        if config.policy.path.is_empty() {
            return Err(ConfigError::EmptyPolicyPath);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
