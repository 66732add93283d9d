//! Pure aggregation and health scoring over a run's unit events.
//!
//! Everything here is a deterministic function of the ordered event
//! sequence. The retry p95 definition and the 20/5-weighted health score
//! are load-bearing for the policy engine and the promotion gate and must
//! not drift.

use std::collections::BTreeMap;

use crate::domain::models::aggregate::{RetryStats, RunAggregate};
use crate::domain::models::telemetry::{CadenceTag, UnitEvent};

/// Appended once when any two adjacent units share a pattern, no matter how
/// many adjacent repeats the run contains.
pub const CONSECUTIVE_REPEAT_ERROR: &str =
    "consecutive units share the same narrative pattern";

/// Appended when at least half of the units needed retries.
pub const HIGH_RETRY_WARNING: &str = "high retry frequency: half or more units needed retries";

/// Appended when the retry p95 reaches 2.
pub const RETRY_P95_WARNING: &str = "p95 retries >= 2";

/// Nearest-rank 95th percentile: `sorted[floor((n-1) * 0.95)]`, no
/// interpolation. Returns 0 for an empty slice.
pub fn nearest_rank_p95(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let index = ((sorted.len() - 1) as f64 * 0.95).floor() as usize;
    sorted[index]
}

/// `max(0, 100 - 20 * errors - 5 * warnings)`.
pub fn health_score(error_count: usize, warning_count: usize) -> u32 {
    let raw = 100_i64 - 20 * error_count as i64 - 5 * warning_count as i64;
    raw.max(0) as u32
}

/// Compute the full aggregate block for an ordered unit-event sequence.
///
/// An empty sequence yields a valid aggregate: all counters zero, the
/// repeat invariant holding, and a health score of 100.
pub fn aggregate_events(events: &[UnitEvent]) -> RunAggregate {
    let mut pattern_counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut cadence_counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut pressure_counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut errors: Vec<String> = Vec::new();
    let mut no_consecutive_repeat = true;
    let mut retries: Vec<f64> = Vec::with_capacity(events.len());
    let mut retried_units = 0usize;

    let mut previous_pattern = None;
    for event in events {
        if let Some(pattern) = event.pattern {
            *pattern_counts.entry(pattern.as_str().to_string()).or_insert(0) += 1;
            if no_consecutive_repeat && previous_pattern == Some(pattern) {
                no_consecutive_repeat = false;
                errors.push(CONSECUTIVE_REPEAT_ERROR.to_string());
            }
        }
        previous_pattern = event.pattern;

        let cadence = event.cadence.unwrap_or(CadenceTag::Normal);
        *cadence_counts.entry(cadence.as_str().to_string()).or_insert(0) += 1;

        if let Some(pressure) = &event.pressure {
            *pressure_counts.entry(pressure.clone()).or_insert(0) += 1;
        }

        if !event.validation.passed {
            errors.push(format!(
                "episode {}: {}",
                event.index,
                event.validation.errors.join("; ")
            ));
        }

        if let Some(signals) = &event.post_hoc {
            if signals.concreteness == Some(false) {
                warnings.push(format!("episode {}: weak concreteness signal", event.index));
            }
            if signals.consequence == Some(false) {
                warnings.push(format!("episode {}: weak consequence signal", event.index));
            }
        }

        retries.push(f64::from(event.retries));
        if event.retries > 0 {
            retried_units += 1;
        }
    }

    let avg = if retries.is_empty() {
        0.0
    } else {
        retries.iter().sum::<f64>() / retries.len() as f64
    };
    let p95 = nearest_rank_p95(&retries);

    // Fixed thresholds; intentionally not configurable.
    if !events.is_empty() && retried_units as f64 / events.len() as f64 >= 0.5 {
        warnings.push(HIGH_RETRY_WARNING.to_string());
    }
    if p95 >= 2.0 {
        warnings.push(RETRY_P95_WARNING.to_string());
    }

    let health_score = health_score(errors.len(), warnings.len());

    RunAggregate {
        pattern_counts,
        no_consecutive_repeat,
        cadence_counts,
        pressure_counts,
        retry: RetryStats { avg, p95 },
        health_score,
        warnings,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::telemetry::{
        PostHocSignals, ScenePattern, UnitEventPatch, ValidationOutcome,
    };

    fn unit(index: u32, pattern: ScenePattern) -> UnitEvent {
        UnitEventPatch::new(index).with_pattern(pattern).into_event()
    }

    #[test]
    fn test_empty_run_is_perfectly_healthy() {
        let agg = aggregate_events(&[]);
        assert_eq!(agg.health_score, 100);
        assert!(agg.no_consecutive_repeat);
        assert!(agg.pattern_counts.is_empty());
        assert!(agg.warnings.is_empty());
        assert!(agg.errors.is_empty());
        assert!((agg.retry.avg - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pattern_and_cadence_tallies() {
        let mut events = vec![
            unit(1, ScenePattern::Action),
            unit(2, ScenePattern::Dialogue),
            unit(3, ScenePattern::Action),
        ];
        events[1].cadence = Some(CadenceTag::Spike);

        let agg = aggregate_events(&events);
        assert_eq!(agg.pattern_counts.get("action"), Some(&2));
        assert_eq!(agg.pattern_counts.get("dialogue"), Some(&1));
        // Missing cadence defaults to normal.
        assert_eq!(agg.cadence_counts.get("normal"), Some(&2));
        assert_eq!(agg.cadence_counts.get("spike"), Some(&1));
    }

    #[test]
    fn test_consecutive_repeat_flagged_exactly_once() {
        let events = vec![
            unit(1, ScenePattern::Action),
            unit(2, ScenePattern::Action),
            unit(3, ScenePattern::Action),
            unit(4, ScenePattern::Dialogue),
            unit(5, ScenePattern::Dialogue),
        ];

        let agg = aggregate_events(&events);
        assert!(!agg.no_consecutive_repeat);
        let repeats = agg
            .errors
            .iter()
            .filter(|e| *e == CONSECUTIVE_REPEAT_ERROR)
            .count();
        assert_eq!(repeats, 1);
    }

    #[test]
    fn test_validation_failures_become_error_lines() {
        let mut events = vec![unit(4, ScenePattern::Reflection)];
        events[0].validation =
            ValidationOutcome::failed(vec!["empty beat".into(), "no dialogue".into()]);

        let agg = aggregate_events(&events);
        assert_eq!(agg.errors, vec!["episode 4: empty beat; no dialogue"]);
        // 100 - 20 * 1 = 80
        assert_eq!(agg.health_score, 80);
    }

    #[test]
    fn test_post_hoc_weak_signals_warn_per_flag_per_unit() {
        let mut events = vec![
            unit(1, ScenePattern::Action),
            unit(2, ScenePattern::Dialogue),
        ];
        events[0].post_hoc = Some(PostHocSignals {
            concreteness: Some(false),
            consequence: Some(false),
        });
        events[1].post_hoc = Some(PostHocSignals {
            concreteness: Some(true),
            consequence: Some(false),
        });

        let agg = aggregate_events(&events);
        assert_eq!(
            agg.warnings,
            vec![
                "episode 1: weak concreteness signal",
                "episode 1: weak consequence signal",
                "episode 2: weak consequence signal",
            ]
        );
        // 100 - 5 * 3 = 85
        assert_eq!(agg.health_score, 85);
    }

    #[test]
    fn test_p95_nearest_rank_definition() {
        // For [0,1,2,3,4]: index = floor(4 * 0.95) = 3, value 3.
        assert!((nearest_rank_p95(&[0.0, 1.0, 2.0, 3.0, 4.0]) - 3.0).abs() < f64::EPSILON);
        assert!((nearest_rank_p95(&[]) - 0.0).abs() < f64::EPSILON);
        assert!((nearest_rank_p95(&[7.0]) - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_retry_warnings_at_fixed_thresholds() {
        let mut events: Vec<UnitEvent> = (1..=4)
            .map(|i| {
                unit(
                    i,
                    if i % 2 == 0 {
                        ScenePattern::Action
                    } else {
                        ScenePattern::Dialogue
                    },
                )
            })
            .collect();
        events[0].retries = 2;
        events[1].retries = 3;

        let agg = aggregate_events(&events);
        // Half the units retried, and p95 of [2,3,0,0] = 3.
        assert!(agg.warnings.iter().any(|w| w == HIGH_RETRY_WARNING));
        assert!(agg.warnings.iter().any(|w| w == RETRY_P95_WARNING));
        assert!((agg.retry.p95 - 3.0).abs() < f64::EPSILON);
        assert!((agg.retry.avg - 1.25).abs() < f64::EPSILON);
        // 100 - 5 * 2 = 90
        assert_eq!(agg.health_score, 90);
    }

    #[test]
    fn test_health_score_floors_at_zero() {
        assert_eq!(health_score(6, 0), 0);
        assert_eq!(health_score(4, 4), 0);
        assert_eq!(health_score(0, 0), 100);
        assert_eq!(health_score(1, 3), 65);
    }

    #[test]
    fn test_units_without_pattern_do_not_trip_repeat_check() {
        let mut events = vec![
            unit(1, ScenePattern::Action),
            UnitEvent::new(2),
            unit(3, ScenePattern::Action),
        ];
        events[1].cadence = Some(CadenceTag::Normal);

        let agg = aggregate_events(&events);
        assert!(agg.no_consecutive_repeat);
        assert_eq!(agg.pattern_counts.get("action"), Some(&2));
    }
}
