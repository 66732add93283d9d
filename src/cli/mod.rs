//! Command-line interface for the batch and operational surfaces of the
//! pipeline core: meta policy builds and baseline gate submissions.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use output::CommandOutput;

/// Adaptive policy and baseline engine for episodic generation pipelines.
#[derive(Parser, Debug)]
#[command(name = "showrunner", version, about)]
pub struct Cli {
    /// Emit machine-readable JSON instead of human output
    #[arg(long, global = true)]
    pub json: bool,

    /// Load configuration from a specific file instead of .showrunner/
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and persist the cross-project meta policy
    Policy(commands::policy::PolicyArgs),
    /// Submit candidates to, and inspect, the baseline promotion gate
    Gate(commands::gate::GateArgs),
}

/// Print an error in the requested mode and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let value = serde_json::json!({ "success": false, "error": format!("{err:#}") });
        eprintln!("{value}");
    } else {
        eprintln!("error: {err:#}");
    }
    std::process::exit(1);
}
