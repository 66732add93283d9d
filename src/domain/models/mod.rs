pub mod aggregate;
pub mod bucket;
pub mod config;
pub mod policy;
pub mod telemetry;

pub use aggregate::{RetryStats, RunAggregate};
pub use bucket::{
    BucketEntry, BucketStats, LengthClass, MetaPolicy, MetaPolicyBias, ProjectProfile,
    UNKNOWN_GENRE,
};
pub use config::{
    BaselineConfig, Config, LoggingConfig, PolicyConfig, PoolConfig, TelemetryConfig,
};
pub use policy::{
    AdaptiveParams, AdaptiveSnapshot, CadenceBias, ParamsProvenance, PolicyDecision,
};
pub use telemetry::{
    CadenceTag, PostHocSignals, RunRecord, ScenePattern, UnitEvent, UnitEventPatch, UnitRange,
    ValidationOutcome,
};
