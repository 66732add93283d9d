pub mod aggregation;
pub mod meta_aggregator;
pub mod policy_engine;
pub mod promotion_gate;
pub mod recorder;

pub use meta_aggregator::PooledRun;
pub use promotion_gate::{GateOutcome, PromotionGate};
pub use recorder::{FinalizedRun, TelemetryRecorder};
