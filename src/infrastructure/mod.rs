//! Infrastructure layer module
//!
//! External concerns behind the domain and service layers:
//! - Configuration management (figment hierarchical loading)
//! - JSON file storage for run records, policy files, and baseline slots

pub mod config;
pub mod storage;

pub use config::{ConfigError, ConfigLoader};
