//! # Orbit Directory CLI
//!
//! Entry point for `orbit-directory`: parses flags, installs tracing through
//! the observability crate and dispatches to a command.

mod cli;
mod commands;
mod error;
mod replay;

use anyhow::Result;
use clap::Parser;
use observability::{LogFormat, ObservabilityConfig};
use tracing::{debug, error, info};

use cli::{Cli, Commands};
use commands::{run_info, run_replay, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // .env may provide ORBIT_DIRECTORY_* defaults, so load it before parsing
    let dotenv = dotenvy::dotenv().ok();

    let cli = Cli::parse();
    observability::init_with_config(observability_config(&cli))?;

    if let Some(path) = dotenv {
        debug!(path = %path.display(), "Loaded environment file");
    }

    match &cli.command {
        Commands::Run(args) => info!(
            version = env!("CARGO_PKG_VERSION"),
            config = %args.config.display(),
            fixture = %args.fixture.display(),
            "Orbit Directory CLI starting replay"
        ),
        Commands::Validate(args) => info!(
            version = env!("CARGO_PKG_VERSION"),
            config = %args.config.display(),
            "Orbit Directory CLI validating configuration"
        ),
        Commands::Info(args) => info!(
            version = env!("CARGO_PKG_VERSION"),
            config = %args.config.display(),
            "Orbit Directory CLI reading configuration"
        ),
    }

    let result = match &cli.command {
        Commands::Run(args) => run_replay(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        error!(error = %e, "Command failed");
    }

    result
}

/// Map CLI flags onto the tracing setup
///
/// The Prometheus listener is left to `run --metrics-port`.
fn observability_config(cli: &Cli) -> ObservabilityConfig {
    let default_log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    ObservabilityConfig {
        log_format: match cli.log_format {
            cli::LogFormat::Json => LogFormat::Json,
            cli::LogFormat::Pretty => LogFormat::Pretty,
            cli::LogFormat::Compact => LogFormat::Compact,
        },
        metrics_port: None,
        default_log_level: default_log_level.to_string(),
    }
}
