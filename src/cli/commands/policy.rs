//! Implementation of the `showrunner policy` command.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::config::Config;
use crate::services::meta_aggregator;

#[derive(Args, Debug)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommands,
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommands {
    /// Scan the run pool and rebuild the bucket policy file
    Build {
        /// Pool root directory (one subdirectory per project id)
        #[arg(long)]
        pool: Option<PathBuf>,

        /// Output path for the meta policy file
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct PolicyBuildOutput {
    pub success: bool,
    pub buckets: usize,
    pub policy_path: PathBuf,
    pub bucket_keys: Vec<String>,
}

impl CommandOutput for PolicyBuildOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Built meta policy with {} bucket(s) at {}",
            self.buckets,
            self.policy_path.display()
        )];
        for key in &self.bucket_keys {
            lines.push(format!("  - {key}"));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn execute(args: PolicyArgs, config: &Config, json_mode: bool) -> Result<()> {
    match args.command {
        PolicyCommands::Build { pool, out } => {
            let pool = pool.unwrap_or_else(|| PathBuf::from(&config.pool.root));
            let out = out.unwrap_or_else(|| PathBuf::from(&config.policy.path));

            let policy = meta_aggregator::build_policy(&pool)
                .with_context(|| format!("failed to build policy from pool {}", pool.display()))?;
            meta_aggregator::write_policy(&out, &policy)
                .with_context(|| format!("failed to write policy to {}", out.display()))?;

            output(
                &PolicyBuildOutput {
                    success: true,
                    buckets: policy.buckets.len(),
                    policy_path: out,
                    bucket_keys: policy.buckets.keys().cloned().collect(),
                },
                json_mode,
            );
            Ok(())
        }
    }
}
