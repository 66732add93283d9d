//! Implementation of the `showrunner gate` command.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::config::Config;
use crate::domain::models::policy::{AdaptiveSnapshot, ParamsProvenance};
use crate::domain::models::telemetry::RunRecord;
use crate::infrastructure::storage;
use crate::services::policy_engine;
use crate::services::promotion_gate::{GateOutcome, PromotionGate};

#[derive(Args, Debug)]
pub struct GateArgs {
    #[command(subcommand)]
    pub command: GateCommands,
}

#[derive(Subcommand, Debug)]
pub enum GateCommands {
    /// Submit a finalized run record as a baseline candidate
    Submit {
        /// Path to the run record file
        #[arg(long)]
        record: PathBuf,

        /// Baseline directory (gold/pending/history)
        #[arg(long)]
        baseline: Option<PathBuf>,
    },
    /// Show the current gold and pending state
    Show {
        /// Baseline directory (gold/pending/history)
        #[arg(long)]
        baseline: Option<PathBuf>,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct GateSubmitOutput {
    pub run_id: String,
    pub outcome: String,
    pub reasons: Vec<String>,
    pub archived: Option<PathBuf>,
}

impl CommandOutput for GateSubmitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("{}: {}", self.run_id, self.outcome)];
        for reason in &self.reasons {
            lines.push(format!("  - {reason}"));
        }
        if let Some(archived) = &self.archived {
            lines.push(format!("  previous gold archived to {}", archived.display()));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct GateShowOutput {
    pub gold_run_id: Option<String>,
    pub gold_score: Option<u32>,
    pub pending_run_id: Option<String>,
    /// Parameters a controller would start from if it seeded off the
    /// current gold record.
    pub baseline_params: Option<AdaptiveSnapshot>,
}

impl CommandOutput for GateShowOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        match (&self.gold_run_id, self.gold_score) {
            (Some(id), Some(score)) => lines.push(format!("gold: {id} (score {score})")),
            _ => lines.push("gold: none (cold start)".to_string()),
        }
        match &self.pending_run_id {
            Some(id) => lines.push(format!("pending: {id} (awaiting reconfirmation)")),
            None => lines.push("pending: none".to_string()),
        }
        if let Some(snapshot) = &self.baseline_params {
            lines.push(format!(
                "baseline params: cadence {} / retry budget {} / pressure {:.2}",
                snapshot.params.cadence_bias.as_str(),
                snapshot.params.retry_budget,
                snapshot.params.pressure_multiplier
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn execute(args: GateArgs, config: &Config, json_mode: bool) -> Result<()> {
    match args.command {
        GateCommands::Submit { record, baseline } => {
            let baseline =
                baseline.unwrap_or_else(|| PathBuf::from(&config.baseline.root));
            let candidate: RunRecord = storage::read_json(&record)
                .with_context(|| format!("failed to read run record {}", record.display()))?;

            let gate = PromotionGate::new(&baseline);
            let outcome = gate
                .submit(&candidate)
                .context("gate submission failed")?;

            let (label, reasons, archived) = match outcome {
                GateOutcome::Rejected { reasons } => ("rejected", reasons, None),
                GateOutcome::PendingCreated => ("pending (awaiting reconfirmation)", vec![], None),
                GateOutcome::PendingReplaced { previous_run_id } => (
                    "pending (replaced previous candidate)",
                    vec![format!("replaced {previous_run_id}")],
                    None,
                ),
                GateOutcome::Promoted { archived } => ("promoted to gold", vec![], archived),
            };

            output(
                &GateSubmitOutput {
                    run_id: candidate.run_id,
                    outcome: label.to_string(),
                    reasons,
                    archived,
                },
                json_mode,
            );
            Ok(())
        }
        GateCommands::Show { baseline } => {
            let baseline =
                baseline.unwrap_or_else(|| PathBuf::from(&config.baseline.root));
            let gate = PromotionGate::new(&baseline);
            let gold = gate.gold().context("failed to read gold slot")?;
            let pending = gate.pending().context("failed to read pending slot")?;

            let baseline_params = gold.as_ref().and_then(|record| {
                record.aggregate.as_ref().map(|aggregate| AdaptiveSnapshot {
                    params: policy_engine::evaluate(aggregate, None).params,
                    provenance: ParamsProvenance::Baseline,
                })
            });

            output(
                &GateShowOutput {
                    gold_run_id: gold.as_ref().map(|r| r.run_id.clone()),
                    gold_score: gold
                        .as_ref()
                        .and_then(|r| r.aggregate.as_ref().map(|a| a.health_score)),
                    pending_run_id: pending.map(|r| r.run_id),
                    baseline_params,
                },
                json_mode,
            );
            Ok(())
        }
    }
}
