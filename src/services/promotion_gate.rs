//! Regression-gated baseline promotion.
//!
//! Three named slots under one baseline directory: `gold/` holds the single
//! canonical last-known-good run record, `pending/` at most one candidate
//! awaiting reconfirmation, and `history/` an append-only archive of
//! superseded gold records. Absence of gold or pending is a valid state,
//! not an error.
//!
//! Promotion requires double confirmation: a candidate that passes the gate
//! becomes pending, and only becomes gold when re-submitted (same run id)
//! and re-passing. A single passing sample is not trusted as
//! representative. Note this triggers on the *same run id* submitted twice,
//! not on two different passing runs; that is a deliberate, revisitable
//! choice carried over from the gate's observed behavior.
//!
//! The read-modify-write across pending and gold is not atomic; deployments
//! should keep at most one submission in flight per baseline directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::telemetry::RunRecord;
use crate::infrastructure::storage;

/// Minimum health score a candidate must reach when no gold record exists.
pub const COLD_START_MIN_SCORE: u32 = 80;

/// Retry p95 ceiling for gate passage.
pub const MAX_P95_RETRIES: f64 = 1.0;

/// Outcome of one gate submission. Rejection is a normal outcome, not an
/// error; only storage failures raise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The candidate failed the gate; gold and pending are untouched.
    Rejected { reasons: Vec<String> },
    /// First pass: the candidate is now pending, awaiting reconfirmation.
    PendingCreated,
    /// A different candidate passed while another was pending; the slot now
    /// holds the new candidate and nobody was promoted.
    PendingReplaced { previous_run_id: String },
    /// Reconfirmed: the candidate is the new gold. When a previous gold
    /// existed, `archived` is its history copy.
    Promoted { archived: Option<PathBuf> },
}

impl GateOutcome {
    pub fn is_promoted(&self) -> bool {
        matches!(self, Self::Promoted { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// The gold/pending/history state machine rooted at a baseline directory.
#[derive(Debug, Clone)]
pub struct PromotionGate {
    root: PathBuf,
}

impl PromotionGate {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn gold_path(&self) -> PathBuf {
        self.root.join("gold").join("gold.json")
    }

    fn pending_path(&self) -> PathBuf {
        self.root.join("pending").join("pending.json")
    }

    fn history_dir(&self) -> PathBuf {
        self.root.join("history")
    }

    /// Current gold record, if one exists.
    pub fn gold(&self) -> CoreResult<Option<RunRecord>> {
        Self::read_slot(&self.gold_path())
    }

    /// Current pending candidate, if one exists.
    pub fn pending(&self) -> CoreResult<Option<RunRecord>> {
        Self::read_slot(&self.pending_path())
    }

    fn read_slot(path: &Path) -> CoreResult<Option<RunRecord>> {
        if !path.exists() {
            return Ok(None);
        }
        storage::read_json(path).map(Some)
    }

    /// Reasons the candidate fails the gate; empty means it passes.
    fn gate_failures(&self, candidate: &RunRecord) -> CoreResult<Vec<String>> {
        let mut reasons = Vec::new();

        let Some(aggregate) = candidate.aggregate.as_ref() else {
            return Ok(vec!["candidate has no aggregate; finalize it first".to_string()]);
        };

        let min_score = match self.gold()? {
            Some(gold) => gold
                .aggregate
                .as_ref()
                .map_or(COLD_START_MIN_SCORE, |a| a.health_score),
            None => COLD_START_MIN_SCORE,
        };

        if aggregate.health_score < min_score {
            reasons.push(format!(
                "health score {} below gate minimum {}",
                aggregate.health_score, min_score
            ));
        }
        if !aggregate.errors.is_empty() {
            reasons.push(format!("{} aggregate error(s) present", aggregate.errors.len()));
        }
        if aggregate.retry.p95 > MAX_P95_RETRIES {
            reasons.push(format!(
                "retry p95 {:.2} above {:.1}",
                aggregate.retry.p95, MAX_P95_RETRIES
            ));
        }

        Ok(reasons)
    }

    /// Submit a candidate run. Gate failure performs zero writes; gold is
    /// only ever overwritten by a reconfirmed promotion, after its previous
    /// bytes are copied into history.
    pub fn submit(&self, candidate: &RunRecord) -> CoreResult<GateOutcome> {
        let reasons = self.gate_failures(candidate)?;
        if !reasons.is_empty() {
            debug!(
                run_id = %candidate.run_id,
                reasons = ?reasons,
                "candidate rejected by gate"
            );
            return Ok(GateOutcome::Rejected { reasons });
        }

        match self.pending()? {
            None => {
                storage::write_json(&self.pending_path(), candidate)?;
                debug!(run_id = %candidate.run_id, "candidate is now pending reconfirmation");
                Ok(GateOutcome::PendingCreated)
            }
            Some(pending) if pending.run_id == candidate.run_id => {
                let archived = self.archive_gold()?;
                storage::write_json(&self.gold_path(), candidate)?;
                fs::remove_file(self.pending_path())
                    .map_err(|e| CoreError::io(self.pending_path(), e))?;
                info!(
                    run_id = %candidate.run_id,
                    archived = archived.as_ref().map(|p| p.display().to_string()),
                    "candidate reconfirmed and promoted to gold"
                );
                Ok(GateOutcome::Promoted { archived })
            }
            Some(pending) => {
                storage::write_json(&self.pending_path(), candidate)?;
                debug!(
                    previous = %pending.run_id,
                    run_id = %candidate.run_id,
                    "pending candidate replaced; no promotion"
                );
                Ok(GateOutcome::PendingReplaced {
                    previous_run_id: pending.run_id,
                })
            }
        }
    }

    /// Copy the current gold bytes into history under a timestamped name.
    fn archive_gold(&self) -> CoreResult<Option<PathBuf>> {
        let gold_path = self.gold_path();
        let Some(gold) = Self::read_slot(&gold_path)? else {
            return Ok(None);
        };
        let history_dir = self.history_dir();
        fs::create_dir_all(&history_dir).map_err(|e| CoreError::io(&history_dir, e))?;

        let stamp = Utc::now().format("%Y%m%dT%H%M%S");
        let archive = history_dir.join(format!("gold_{stamp}_{}.json", gold.run_id));
        // Byte-for-byte copy of the stored record.
        fs::copy(&gold_path, &archive).map_err(|e| CoreError::io(&archive, e))?;
        Ok(Some(archive))
    }
}
