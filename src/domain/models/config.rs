//! Configuration model for the pipeline core.

use serde::{Deserialize, Serialize};

/// Main configuration structure for showrunner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Telemetry output configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Cross-project run pool configuration.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Baseline (gold/pending/history) configuration.
    #[serde(default)]
    pub baseline: BaselineConfig,

    /// Meta policy output configuration.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telemetry: TelemetryConfig::default(),
            pool: PoolConfig::default(),
            baseline: BaselineConfig::default(),
            policy: PolicyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Where finalized run records are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TelemetryConfig {
    /// Directory for finalized run record files.
    #[serde(default = "default_telemetry_dir")]
    pub output_dir: String,
}

fn default_telemetry_dir() -> String {
    ".showrunner/runs".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            output_dir: default_telemetry_dir(),
        }
    }
}

/// Root of the cross-project pool scanned by the meta-aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PoolConfig {
    /// One subdirectory per project id.
    #[serde(default = "default_pool_root")]
    pub root: String,
}

fn default_pool_root() -> String {
    ".showrunner/pool".to_string()
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            root: default_pool_root(),
        }
    }
}

/// Root of the gold/pending/history baseline directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BaselineConfig {
    #[serde(default = "default_baseline_root")]
    pub root: String,
}

fn default_baseline_root() -> String {
    ".showrunner/baseline".to_string()
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            root: default_baseline_root(),
        }
    }
}

/// Where the generated meta policy file lands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PolicyConfig {
    #[serde(default = "default_policy_path")]
    pub path: String,
}

fn default_policy_path() -> String {
    ".showrunner/meta_policy.json".to_string()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            path: default_policy_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.telemetry.output_dir, ".showrunner/runs");
        assert_eq!(config.pool.root, ".showrunner/pool");
        assert_eq!(config.baseline.root, ".showrunner/baseline");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"logging": {"level": "debug"}}"#).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.policy.path, ".showrunner/meta_policy.json");
    }
}
