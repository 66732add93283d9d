//! Cross-project learning types: buckets, statistics, and priors.
//!
//! Projects are partitioned into buckets by genre and length class; each
//! bucket's historical runs yield statistics and a confidence-weighted
//! policy prior. Everything here is fully recomputed on each aggregation
//! pass; there is no incremental state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::policy::CadenceBias;

/// Genre sentinel for projects that cannot be classified. Runs under it are
/// excluded from learning entirely rather than pooled into a garbage bucket.
pub const UNKNOWN_GENRE: &str = "unknown";

/// Length class of a project by its total unit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LengthClass {
    Short,
    Mid,
    Long,
}

impl LengthClass {
    /// SHORT up to 60 units, MID up to 120, LONG beyond.
    pub fn classify(total_units: u32) -> Self {
        if total_units <= 60 {
            Self::Short
        } else if total_units <= 120 {
            Self::Mid
        } else {
            Self::Long
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "SHORT",
            Self::Mid => "MID",
            Self::Long => "LONG",
        }
    }
}

/// Project classification used only to compute a bucket key. Derived from
/// project metadata at bucketing time; never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectProfile {
    pub genre: String,
    pub total_units: u32,
}

impl ProjectProfile {
    pub fn new(genre: impl Into<String>, total_units: u32) -> Self {
        Self {
            genre: genre.into(),
            total_units,
        }
    }

    /// A profile for a project whose metadata could not be resolved.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_GENRE, 0)
    }

    pub fn is_unknown(&self) -> bool {
        self.genre.is_empty() || self.genre == UNKNOWN_GENRE
    }

    /// `genre__LENGTHCLASS` key, or `None` when the genre is unclassifiable.
    pub fn bucket_key(&self) -> Option<String> {
        if self.is_unknown() {
            return None;
        }
        Some(format!(
            "{}__{}",
            self.genre,
            LengthClass::classify(self.total_units).as_str()
        ))
    }
}

/// Per-bucket statistics across historical runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    pub sample_count: usize,
    pub mean_score: f64,
    /// Nearest-rank p95 over each run's own p95 retries.
    pub p95_retries: f64,
    /// `runs_with_any_error / sample_count`.
    pub error_rate_raw: f64,
    /// Beta(1,1) posterior mean: `(runs_with_any_error + 1) / (sample_count + 2)`.
    pub error_rate_smoothed: f64,
    /// Spike cadence observations over all cadence observations, pooled
    /// across the bucket.
    pub mean_spike_ratio: f64,
    pub mean_warning_count: f64,
    pub mean_error_count: f64,
}

/// Confidence-weighted policy prior for one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaPolicyBias {
    pub cadence_bias: CadenceBias,
    pub retry_budget: u32,
    pub pressure_multiplier: f64,
    /// `min(1, n/10)`, capped at 0.25 for sample-starved buckets (n < 5).
    pub confidence: f64,
    /// One line per triggered derivation rule. Mandatory output: the merge
    /// step downstream is unauditable without it.
    pub rationale: Vec<String>,
}

/// One bucket's entry in the meta policy file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketEntry {
    pub bias: MetaPolicyBias,
    pub stats: BucketStats,
}

/// Versioned, timestamped map from bucket key to derived bias and stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaPolicy {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub buckets: BTreeMap<String, BucketEntry>,
}

impl MetaPolicy {
    /// Look up the prior for a project, if its bucket has one.
    pub fn bias_for(&self, profile: &ProjectProfile) -> Option<&MetaPolicyBias> {
        let key = profile.bucket_key()?;
        self.buckets.get(&key).map(|entry| &entry.bias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_class_boundaries() {
        assert_eq!(LengthClass::classify(0), LengthClass::Short);
        assert_eq!(LengthClass::classify(60), LengthClass::Short);
        assert_eq!(LengthClass::classify(61), LengthClass::Mid);
        assert_eq!(LengthClass::classify(120), LengthClass::Mid);
        assert_eq!(LengthClass::classify(121), LengthClass::Long);
    }

    #[test]
    fn test_bucket_key_format() {
        let profile = ProjectProfile::new("noir", 80);
        assert_eq!(profile.bucket_key().as_deref(), Some("noir__MID"));
    }

    #[test]
    fn test_unknown_genre_has_no_bucket() {
        assert!(ProjectProfile::unknown().bucket_key().is_none());
        assert!(ProjectProfile::new("", 10).bucket_key().is_none());
        assert!(ProjectProfile::new(UNKNOWN_GENRE, 200).bucket_key().is_none());
    }
}
