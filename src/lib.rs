//! Showrunner - Adaptive Generation Policy Engine
//!
//! Showrunner is the adaptive policy and regression-gated baseline core of
//! an episodic script-generation pipeline. It turns raw per-run telemetry
//! into a health score, derives generation-control parameters through a
//! rule-based policy engine, learns project-class priors from historical
//! runs across many projects, and promotes a canonical "gold" baseline only
//! after a reproducible double confirmation.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure models and the core error taxonomy
//! - **Service Layer** (`services`): Recording, aggregation, policy
//!   evaluation, meta-aggregation, and baseline promotion
//! - **Infrastructure Layer** (`infrastructure`): Configuration and JSON
//!   file storage
//! - **CLI Layer** (`cli`): Command-line interface for batch operations
//!
//! # Example
//!
//! ```
//! use showrunner::domain::models::telemetry::{ScenePattern, UnitEventPatch, UnitRange};
//! use showrunner::services::TelemetryRecorder;
//!
//! let mut recorder = TelemetryRecorder::new();
//! recorder.start("run-001", "project-a", UnitRange::new(1, 2));
//! recorder
//!     .record_unit(UnitEventPatch::new(1).with_pattern(ScenePattern::Action))
//!     .unwrap();
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{CoreError, CoreResult};
pub use domain::models::{
    AdaptiveParams, AdaptiveSnapshot, BucketStats, CadenceBias, CadenceTag, Config, MetaPolicy,
    MetaPolicyBias, ParamsProvenance, PolicyDecision, ProjectProfile, RunAggregate, RunRecord,
    ScenePattern, UnitEvent, UnitEventPatch, UnitRange, ValidationOutcome,
};
pub use infrastructure::{ConfigError, ConfigLoader};
pub use services::{FinalizedRun, GateOutcome, PromotionGate, TelemetryRecorder};
