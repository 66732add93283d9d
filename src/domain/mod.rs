//! Domain layer for the showrunner pipeline core
//!
//! This module contains pure domain models and the core error taxonomy.

pub mod errors;
pub mod models;

// Re-export error types for convenient access
pub use errors::{CoreError, CoreResult};
