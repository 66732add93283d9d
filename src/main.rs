//! Showrunner CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use showrunner::cli::{Cli, Commands};
use showrunner::domain::models::Config;
use showrunner::infrastructure::ConfigLoader;

/// Configured level is the default; `RUST_LOG` still overrides it.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    let fmt_layer = if config.logging.format == "json" {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

fn main() {
    let cli = Cli::parse();

    let config = match cli.config.as_ref() {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => showrunner::cli::handle_error(err, cli.json),
    };

    init_tracing(&config);

    let result = match cli.command {
        Commands::Policy(args) => {
            showrunner::cli::commands::policy::execute(args, &config, cli.json)
        }
        Commands::Gate(args) => showrunner::cli::commands::gate::execute(args, &config, cli.json),
    };

    if let Err(err) = result {
        showrunner::cli::handle_error(err, cli.json);
    }
}
