//! Adaptive generation-control parameters.
//!
//! Parameters are recomputed fresh for every run and are never a source of
//! truth on their own; callers snapshot them (with provenance) into the run
//! record for audit.

use serde::{Deserialize, Serialize};

/// Bias applied to the generator's cadence selection for the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CadenceBias {
    Normal,
    SpikeUp,
    SpikeDown,
}

impl CadenceBias {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::SpikeUp => "spike_up",
            Self::SpikeDown => "spike_down",
        }
    }
}

/// Control parameters the generation controller consumes before its next
/// unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveParams {
    pub cadence_bias: CadenceBias,
    /// Retry budget per unit; the policy engine only ever emits 2, 3, or 4.
    pub retry_budget: u32,
    /// Continuous pressure dial, clamped to [0.8, 1.2].
    pub pressure_multiplier: f64,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            cadence_bias: CadenceBias::Normal,
            retry_budget: 3,
            pressure_multiplier: 1.0,
        }
    }
}

/// Where a set of adaptive parameters came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamsProvenance {
    /// Defaults stood; no rule fired and no prior was merged.
    Default,
    /// Derived from the previous run's own aggregate.
    PriorRun,
    /// Previous-run evidence merged with a cross-project bucket prior.
    CrossProjectPrior,
    /// Seeded from the gold baseline record.
    Baseline,
}

impl ParamsProvenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::PriorRun => "prior_run",
            Self::CrossProjectPrior => "cross_project_prior",
            Self::Baseline => "baseline",
        }
    }
}

/// Audit snapshot stored on a run record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveSnapshot {
    pub params: AdaptiveParams,
    pub provenance: ParamsProvenance,
}

/// Tagged result of a policy evaluation: either state-only (rules over the
/// run's own aggregate) or merged with a cross-project prior. The tag is
/// the provenance, which makes the 0.3 confidence threshold a visible,
/// testable branch rather than a silent blend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub params: AdaptiveParams,
    pub provenance: ParamsProvenance,
}

impl PolicyDecision {
    /// Convert into the audit snapshot callers attach to a run record.
    pub fn into_snapshot(self) -> AdaptiveSnapshot {
        AdaptiveSnapshot {
            params: self.params,
            provenance: self.provenance,
        }
    }

    pub fn merged_with_prior(&self) -> bool {
        self.provenance == ParamsProvenance::CrossProjectPrior
    }
}
