//! Cross-project meta-aggregation: pool scan, bucketing, bucket statistics,
//! and bias derivation.
//!
//! The pool is one directory per project id, each holding finalized run
//! record files plus a `project.json` metadata file. Every aggregation pass
//! recomputes bucket statistics from scratch; there is no incremental
//! state. Malformed files are logged and skipped, never fatal.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::bucket::{
    BucketEntry, BucketStats, MetaPolicy, MetaPolicyBias, ProjectProfile,
};
use crate::domain::models::policy::CadenceBias;
use crate::domain::models::telemetry::RunRecord;
use crate::infrastructure::storage;
use crate::services::aggregation::nearest_rank_p95;

/// Per-project metadata file inside a pool directory.
pub const PROJECT_META_FILE: &str = "project.json";

/// Version string stamped into generated policy files.
pub const META_POLICY_VERSION: &str = "1.0";

/// Buckets with fewer than this many samples have their confidence capped.
const SMALL_SAMPLE_FLOOR: usize = 5;

/// Confidence ceiling for sample-starved buckets.
const SMALL_SAMPLE_CONFIDENCE_CAP: f64 = 0.25;

/// One pool run paired with its project's profile.
#[derive(Debug, Clone)]
pub struct PooledRun {
    pub project_id: String,
    pub profile: ProjectProfile,
    pub record: RunRecord,
}

/// Walk the pool: one subdirectory per project, every JSON file inside read
/// as a run record. Records are kept only when they expose a non-empty run
/// id and an aggregate block; anything else is skipped with a warning.
pub fn scan_pool(root: &Path) -> CoreResult<Vec<PooledRun>> {
    let mut runs = Vec::new();

    let entries = fs::read_dir(root).map_err(|e| CoreError::io(root, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CoreError::io(root, e))?;
        let project_dir = entry.path();
        if !project_dir.is_dir() {
            continue;
        }
        let project_id = entry.file_name().to_string_lossy().into_owned();

        let meta_path = project_dir.join(PROJECT_META_FILE);
        let profile = match storage::read_json::<ProjectProfile>(&meta_path) {
            Ok(profile) => profile,
            Err(err) => {
                warn!(
                    project_id = %project_id,
                    error = %err,
                    "project metadata unreadable; treating genre as unknown"
                );
                ProjectProfile::unknown()
            }
        };

        let files = fs::read_dir(&project_dir).map_err(|e| CoreError::io(&project_dir, e))?;
        for file in files {
            let file = file.map_err(|e| CoreError::io(&project_dir, e))?;
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json")
                || path.file_name().and_then(|n| n.to_str()) == Some(PROJECT_META_FILE)
            {
                continue;
            }

            match storage::read_json::<RunRecord>(&path) {
                Ok(record) if !record.run_id.is_empty() && record.aggregate.is_some() => {
                    runs.push(PooledRun {
                        project_id: project_id.clone(),
                        profile: profile.clone(),
                        record,
                    });
                }
                Ok(_) => {
                    warn!(path = %path.display(), "run record incomplete; skipped");
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "malformed run record; skipped");
                }
            }
        }
    }

    Ok(runs)
}

/// Group runs by bucket key. Runs whose genre cannot be classified are
/// excluded from learning entirely rather than pooled under a sentinel key.
pub fn bucket_runs(runs: Vec<PooledRun>) -> BTreeMap<String, Vec<PooledRun>> {
    let mut buckets: BTreeMap<String, Vec<PooledRun>> = BTreeMap::new();
    for run in runs {
        match run.profile.bucket_key() {
            Some(key) => buckets.entry(key).or_default().push(run),
            None => {
                debug!(
                    project_id = %run.project_id,
                    run_id = %run.record.run_id,
                    "unknown genre; excluded from learning"
                );
            }
        }
    }
    buckets
}

/// Compute per-bucket statistics across finalized runs.
///
/// The error rate is smoothed with a Beta(1,1) posterior mean,
/// `(runs_with_errors + 1) / (n + 2)`, so a one-run bucket with one error
/// reads as 2/3 rather than certainty.
pub fn aggregate_bucket(runs: &[PooledRun]) -> BucketStats {
    let n = runs.len();
    if n == 0 {
        return BucketStats {
            sample_count: 0,
            mean_score: 0.0,
            p95_retries: 0.0,
            error_rate_raw: 0.0,
            error_rate_smoothed: 0.5,
            mean_spike_ratio: 0.0,
            mean_warning_count: 0.0,
            mean_error_count: 0.0,
        };
    }

    let mut scores = 0.0;
    let mut p95s = Vec::with_capacity(n);
    let mut runs_with_errors = 0usize;
    let mut spike_observations = 0u64;
    let mut cadence_observations = 0u64;
    let mut warning_total = 0usize;
    let mut error_total = 0usize;

    for run in runs {
        // scan_pool only admits records with an aggregate.
        let Some(aggregate) = run.record.aggregate.as_ref() else {
            continue;
        };
        scores += f64::from(aggregate.health_score);
        p95s.push(aggregate.retry.p95);
        if aggregate.has_errors() {
            runs_with_errors += 1;
        }
        spike_observations += u64::from(aggregate.spike_count());
        cadence_observations += u64::from(aggregate.cadence_total());
        warning_total += aggregate.warnings.len();
        error_total += aggregate.errors.len();
    }

    let mean_spike_ratio = if cadence_observations == 0 {
        0.0
    } else {
        spike_observations as f64 / cadence_observations as f64
    };

    BucketStats {
        sample_count: n,
        mean_score: scores / n as f64,
        p95_retries: nearest_rank_p95(&p95s),
        error_rate_raw: runs_with_errors as f64 / n as f64,
        error_rate_smoothed: (runs_with_errors as f64 + 1.0) / (n as f64 + 2.0),
        mean_spike_ratio,
        mean_warning_count: warning_total as f64 / n as f64,
        mean_error_count: error_total as f64 / n as f64,
    }
}

/// Derive the confidence-weighted policy prior for a bucket.
///
/// Confidence is `min(1, n/10)` and additionally capped at 0.25 when the
/// bucket has fewer than five samples: a sample-starved bucket may never
/// assert strong confidence, however extreme its ratios. Each triggered
/// rule appends a rationale line; the trail is mandatory output, since the
/// downstream merge is unauditable without it.
pub fn derive_bias(stats: &BucketStats) -> MetaPolicyBias {
    let mut confidence = (stats.sample_count as f64 / 10.0).min(1.0);
    if stats.sample_count < SMALL_SAMPLE_FLOOR {
        confidence = confidence.min(SMALL_SAMPLE_CONFIDENCE_CAP);
    }

    let mut bias = MetaPolicyBias {
        cadence_bias: CadenceBias::Normal,
        retry_budget: 3,
        pressure_multiplier: 1.0,
        confidence,
        rationale: Vec::new(),
    };

    // Independent rules; more than one may fire.
    if stats.mean_score < 60.0 || stats.error_rate_smoothed > 0.2 {
        bias.cadence_bias = CadenceBias::SpikeUp;
        bias.rationale.push(format!(
            "cadence prior SPIKE_UP: mean score {:.1}, smoothed error rate {:.2}",
            stats.mean_score, stats.error_rate_smoothed
        ));
    }
    if stats.p95_retries > 1.5 {
        bias.retry_budget = 4;
        bias.rationale.push(format!(
            "retry budget prior 4: bucket p95 retries {:.2} above 1.5",
            stats.p95_retries
        ));
    }
    if stats.mean_warning_count >= 3.0 {
        bias.pressure_multiplier = 0.9;
        bias.rationale.push(format!(
            "pressure prior 0.9: mean warning count {:.1} at or above 3",
            stats.mean_warning_count
        ));
    }

    bias
}

/// Scan the pool and build the versioned, timestamped bucket policy map.
pub fn build_policy(pool_root: &Path) -> CoreResult<MetaPolicy> {
    let runs = scan_pool(pool_root)?;
    let total_runs = runs.len();
    let buckets = bucket_runs(runs);

    let mut entries = BTreeMap::new();
    for (key, bucket) in &buckets {
        let stats = aggregate_bucket(bucket);
        let bias = derive_bias(&stats);
        entries.insert(key.clone(), BucketEntry { bias, stats });
    }

    info!(
        pool = %pool_root.display(),
        runs = total_runs,
        buckets = entries.len(),
        "built meta policy"
    );

    Ok(MetaPolicy {
        version: META_POLICY_VERSION.to_string(),
        generated_at: Utc::now(),
        buckets: entries,
    })
}

/// Persist a policy file, creating parent directories as needed.
pub fn write_policy(path: &Path, policy: &MetaPolicy) -> CoreResult<()> {
    storage::write_json(path, policy)
}
