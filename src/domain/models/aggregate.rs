//! Derived per-run statistics.
//!
//! An aggregate is a pure function of a run's ordered unit events; it is
//! computed at finalization and never hand-edited afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::telemetry::CadenceTag;

/// Retry statistics across a run's units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryStats {
    /// Mean retry count (0 for an empty run).
    pub avg: f64,
    /// Nearest-rank 95th percentile: `sorted[floor((n-1) * 0.95)]`.
    pub p95: f64,
}

impl Default for RetryStats {
    fn default() -> Self {
        Self { avg: 0.0, p95: 0.0 }
    }
}

/// Derived statistics block for a finalized run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunAggregate {
    /// Tally of classification patterns across units.
    pub pattern_counts: BTreeMap<String, u32>,
    /// False when any two adjacent units share a classification pattern.
    pub no_consecutive_repeat: bool,
    /// Tally of cadence tags; units without one count as normal.
    pub cadence_counts: BTreeMap<String, u32>,
    /// Tally of pressure tags, for units that carry one.
    pub pressure_counts: BTreeMap<String, u32>,
    /// Retry statistics.
    pub retry: RetryStats,
    /// `max(0, 100 - 20 * |errors| - 5 * |warnings|)`.
    pub health_score: u32,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl RunAggregate {
    /// An aggregate for a run with no events: all counters zero, perfect
    /// health.
    pub fn empty() -> Self {
        Self {
            pattern_counts: BTreeMap::new(),
            no_consecutive_repeat: true,
            cadence_counts: BTreeMap::new(),
            pressure_counts: BTreeMap::new(),
            retry: RetryStats::default(),
            health_score: 100,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Spike observations out of all cadence observations for this run.
    pub fn spike_count(&self) -> u32 {
        self.cadence_counts
            .get(CadenceTag::Spike.as_str())
            .copied()
            .unwrap_or(0)
    }

    /// Total cadence observations for this run.
    pub fn cadence_total(&self) -> u32 {
        self.cadence_counts.values().sum()
    }
}
