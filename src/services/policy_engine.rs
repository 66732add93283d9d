//! Rule-based derivation of adaptive generation parameters.
//!
//! The cascade runs over a single run's aggregate; an optional
//! cross-project prior is merged afterwards, and only when its confidence
//! clears a fixed floor. Callers must snapshot the returned parameters and
//! provenance into the run record; the decision itself is never persisted
//! as a source of truth.

use crate::domain::models::aggregate::RunAggregate;
use crate::domain::models::bucket::MetaPolicyBias;
use crate::domain::models::policy::{
    AdaptiveParams, CadenceBias, ParamsProvenance, PolicyDecision,
};

/// A prior below this confidence cannot override a run's own evidence.
pub const MERGE_CONFIDENCE_FLOOR: f64 = 0.3;

/// Evaluate the rule cascade and, when warranted, merge the bucket prior.
///
/// Rules are evaluated unconditionally in order; a later rule may override
/// fields set by an earlier one:
/// 1. score < 60 or p95 retries >= 2: spike cadence up, budget 4,
///    pressure 0.9.
/// 2. any error: budget 4.
/// 3. three or more warnings: pressure 0.85.
/// 4. otherwise the defaults stand (normal / 3 / 1.0).
///
/// The merge is asymmetric on purpose: cadence is a categorical choice
/// where ties resolve to empirical history, so the prior's value wins
/// outright; extra retries are cheap and safe, so the more generous budget
/// wins; pressure is a continuous dial blended (0.6 prior / 0.4 state) and
/// clamped to [0.8, 1.2] to avoid abrupt jumps.
pub fn evaluate(aggregate: &RunAggregate, prior: Option<&MetaPolicyBias>) -> PolicyDecision {
    let mut params = AdaptiveParams::default();
    let mut rule_fired = false;

    if aggregate.health_score < 60 || aggregate.retry.p95 >= 2.0 {
        params.cadence_bias = CadenceBias::SpikeUp;
        params.retry_budget = 4;
        params.pressure_multiplier = 0.9;
        rule_fired = true;
    }

    if !aggregate.errors.is_empty() {
        params.retry_budget = 4;
        rule_fired = true;
    }

    if aggregate.warnings.len() >= 3 {
        params.pressure_multiplier = 0.85;
        rule_fired = true;
    }

    if let Some(bias) = prior {
        if bias.confidence >= MERGE_CONFIDENCE_FLOOR {
            let merged = AdaptiveParams {
                cadence_bias: bias.cadence_bias,
                retry_budget: params.retry_budget.max(bias.retry_budget),
                pressure_multiplier: (0.6 * bias.pressure_multiplier
                    + 0.4 * params.pressure_multiplier)
                    .clamp(0.8, 1.2),
            };
            return PolicyDecision {
                params: merged,
                provenance: ParamsProvenance::CrossProjectPrior,
            };
        }
    }

    PolicyDecision {
        params,
        provenance: if rule_fired {
            ParamsProvenance::PriorRun
        } else {
            ParamsProvenance::Default
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::aggregate::{RetryStats, RunAggregate};

    fn aggregate(score: u32, p95: f64, warnings: usize, errors: usize) -> RunAggregate {
        let mut agg = RunAggregate::empty();
        agg.health_score = score;
        agg.retry = RetryStats { avg: 0.0, p95 };
        agg.warnings = (0..warnings).map(|i| format!("warning {i}")).collect();
        agg.errors = (0..errors).map(|i| format!("error {i}")).collect();
        agg
    }

    fn prior(confidence: f64) -> MetaPolicyBias {
        MetaPolicyBias {
            cadence_bias: CadenceBias::SpikeDown,
            retry_budget: 2,
            pressure_multiplier: 1.1,
            confidence,
            rationale: vec!["bucket history".into()],
        }
    }

    #[test]
    fn test_low_score_triggers_spike_up() {
        let decision = evaluate(&aggregate(55, 2.5, 0, 0), None);
        assert_eq!(decision.params.cadence_bias, CadenceBias::SpikeUp);
        assert_eq!(decision.params.retry_budget, 4);
        assert!((decision.params.pressure_multiplier - 0.9).abs() < f64::EPSILON);
        assert_eq!(decision.provenance, ParamsProvenance::PriorRun);
    }

    #[test]
    fn test_healthy_run_keeps_defaults() {
        let decision = evaluate(&aggregate(90, 0.5, 0, 0), None);
        assert_eq!(decision.params.cadence_bias, CadenceBias::Normal);
        assert_eq!(decision.params.retry_budget, 3);
        assert!((decision.params.pressure_multiplier - 1.0).abs() < f64::EPSILON);
        assert_eq!(decision.provenance, ParamsProvenance::Default);
    }

    #[test]
    fn test_warning_rule_overrides_pressure_from_rule_one() {
        let decision = evaluate(&aggregate(50, 2.5, 3, 0), None);
        assert_eq!(decision.params.cadence_bias, CadenceBias::SpikeUp);
        assert_eq!(decision.params.retry_budget, 4);
        assert!((decision.params.pressure_multiplier - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn test_errors_alone_raise_retry_budget() {
        let decision = evaluate(&aggregate(80, 0.0, 0, 1), None);
        assert_eq!(decision.params.retry_budget, 4);
        assert_eq!(decision.params.cadence_bias, CadenceBias::Normal);
        assert_eq!(decision.provenance, ParamsProvenance::PriorRun);
    }

    #[test]
    fn test_low_confidence_prior_is_ignored() {
        let decision = evaluate(&aggregate(90, 0.0, 0, 0), Some(&prior(0.25)));
        assert_eq!(decision.params, AdaptiveParams::default());
        assert_eq!(decision.provenance, ParamsProvenance::Default);
        assert!(!decision.merged_with_prior());
    }

    #[test]
    fn test_confident_prior_merges_asymmetrically() {
        // State: SPIKE_UP / 4 / 0.9 from rule 1.
        let decision = evaluate(&aggregate(55, 2.5, 0, 0), Some(&prior(0.8)));
        // Prior cadence wins outright, even against rule 1.
        assert_eq!(decision.params.cadence_bias, CadenceBias::SpikeDown);
        // max(state 4, prior 2) = 4.
        assert_eq!(decision.params.retry_budget, 4);
        // 0.6 * 1.1 + 0.4 * 0.9 = 1.02.
        assert!((decision.params.pressure_multiplier - 1.02).abs() < 1e-9);
        assert_eq!(decision.provenance, ParamsProvenance::CrossProjectPrior);
        assert!(decision.merged_with_prior());
    }

    #[test]
    fn test_merge_clamps_pressure_to_bounds() {
        let mut b = prior(1.0);
        b.pressure_multiplier = 2.0;
        let decision = evaluate(&aggregate(95, 0.0, 0, 0), Some(&b));
        // 0.6 * 2.0 + 0.4 * 1.0 = 1.6, clamped to 1.2.
        assert!((decision.params.pressure_multiplier - 1.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_merge_at_exact_confidence_floor() {
        let decision = evaluate(&aggregate(90, 0.0, 0, 0), Some(&prior(0.3)));
        assert_eq!(decision.provenance, ParamsProvenance::CrossProjectPrior);
    }
}
