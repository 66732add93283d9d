//! End-to-end flow: record runs, finalize into a pool, build the meta
//! policy, evaluate adaptive parameters with the learned prior, and walk a
//! candidate through the promotion gate.

use std::path::Path;

use tempfile::TempDir;

use showrunner::domain::models::bucket::ProjectProfile;
use showrunner::domain::models::policy::ParamsProvenance;
use showrunner::domain::models::telemetry::{
    CadenceTag, ScenePattern, UnitEventPatch, UnitRange, ValidationOutcome,
};
use showrunner::infrastructure::storage;
use showrunner::services::meta_aggregator::{self, PROJECT_META_FILE};
use showrunner::services::policy_engine;
use showrunner::services::promotion_gate::{GateOutcome, PromotionGate};
use showrunner::services::TelemetryRecorder;
use showrunner::CadenceBias;

const PATTERNS: [ScenePattern; 3] = [
    ScenePattern::Dialogue,
    ScenePattern::Action,
    ScenePattern::Reflection,
];

/// Record a run of `units` alternating patterns; the first `failing` units
/// carry a validation failure.
fn record_run(pool_project: &Path, run_id: &str, units: u32, failing: u32) {
    let mut recorder = TelemetryRecorder::new();
    recorder.start(run_id, "noir-show", UnitRange::new(1, units));

    for index in 1..=units {
        let mut patch = UnitEventPatch::new(index)
            .with_pattern(PATTERNS[(index as usize - 1) % PATTERNS.len()])
            .with_cadence(if index % 4 == 0 {
                CadenceTag::Spike
            } else {
                CadenceTag::Normal
            });
        if index <= failing {
            patch = patch
                .with_validation(ValidationOutcome::failed(vec!["scene rejected".to_string()]));
        }
        recorder.record_unit(patch).unwrap();
    }

    recorder.finalize(pool_project).unwrap();
}

#[test]
fn test_full_pipeline_learns_prior_and_promotes_baseline() {
    let temp = TempDir::new().unwrap();
    let pool = temp.path().join("pool");
    let project_dir = pool.join("noir-show");

    std::fs::create_dir_all(&project_dir).unwrap();
    let profile = ProjectProfile::new("noir", 40);
    storage::write_json(&project_dir.join(PROJECT_META_FILE), &profile).unwrap();

    // Six historical runs, each with one validation failure: enough samples
    // for a 0.6-confidence bucket, and a smoothed error rate of 7/8.
    for i in 0..6 {
        record_run(&project_dir, &format!("run-{i:03}"), 12, 1);
    }

    // Build and persist the meta policy.
    let policy = meta_aggregator::build_policy(&pool).unwrap();
    let policy_path = temp.path().join("meta_policy.json");
    meta_aggregator::write_policy(&policy_path, &policy).unwrap();

    let entry = policy.buckets.get("noir__SHORT").unwrap();
    assert_eq!(entry.stats.sample_count, 6);
    assert!((entry.stats.error_rate_raw - 1.0).abs() < f64::EPSILON);
    assert!((entry.stats.error_rate_smoothed - 7.0 / 8.0).abs() < 1e-9);
    assert_eq!(entry.bias.cadence_bias, CadenceBias::SpikeUp);
    assert!((entry.bias.confidence - 0.6).abs() < 1e-9);
    assert!(!entry.bias.rationale.is_empty());

    // A fresh healthy run, finalized and then combined with the prior.
    let mut recorder = TelemetryRecorder::new();
    recorder.start("run-candidate", "noir-show", UnitRange::new(1, 12));
    for index in 1..=12 {
        recorder
            .record_unit(
                UnitEventPatch::new(index)
                    .with_pattern(PATTERNS[(index as usize - 1) % PATTERNS.len()]),
            )
            .unwrap();
    }

    let runs_dir = temp.path().join("runs");
    let finalized = recorder.finalize(&runs_dir).unwrap();
    let aggregate = finalized.record.aggregate.as_ref().unwrap();
    assert_eq!(aggregate.health_score, 100);

    // Evaluate against the reloaded policy file, as a controller would.
    let reloaded = storage::read_json::<showrunner::MetaPolicy>(&policy_path).unwrap();
    let prior = reloaded.bias_for(&profile).unwrap();

    let decision = policy_engine::evaluate(aggregate, Some(prior));
    // The healthy run alone would keep defaults, but the confident bucket
    // prior pushes cadence up.
    assert_eq!(decision.provenance, ParamsProvenance::CrossProjectPrior);
    assert_eq!(decision.params.cadence_bias, CadenceBias::SpikeUp);
    assert_eq!(decision.params.retry_budget, 3);

    // Walk the candidate through the promotion gate: pending, then gold.
    let gate = PromotionGate::new(temp.path().join("baseline"));
    assert_eq!(
        gate.submit(&finalized.record).unwrap(),
        GateOutcome::PendingCreated
    );
    let outcome = gate.submit(&finalized.record).unwrap();
    assert!(outcome.is_promoted());

    let gold = gate.gold().unwrap().unwrap();
    assert_eq!(gold.run_id, "run-candidate");
    assert_eq!(gold.aggregate.unwrap().health_score, 100);
    assert!(gate.pending().unwrap().is_none());
}

#[test]
fn test_unknown_genre_projects_never_influence_the_policy() {
    let temp = TempDir::new().unwrap();
    let pool = temp.path().join("pool");

    // A classifiable project and an unclassifiable one.
    let known = pool.join("noir-show");
    std::fs::create_dir_all(&known).unwrap();
    storage::write_json(
        &known.join(PROJECT_META_FILE),
        &ProjectProfile::new("noir", 40),
    )
    .unwrap();
    record_run(&known, "run-known", 8, 0);

    let unknown = pool.join("mystery-meat");
    std::fs::create_dir_all(&unknown).unwrap();
    // No project.json at all: the profile degrades to the unknown sentinel.
    record_run(&unknown, "run-unknown", 8, 5);

    let policy = meta_aggregator::build_policy(&pool).unwrap();
    assert_eq!(policy.buckets.len(), 1);
    let entry = policy.buckets.get("noir__SHORT").unwrap();
    // Only the classifiable project contributed samples.
    assert_eq!(entry.stats.sample_count, 1);
    assert!((entry.stats.error_rate_raw - 0.0).abs() < f64::EPSILON);
}
