//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Orbit Directory - nearby-user directory session driver
#[derive(Parser, Debug)]
#[command(
    name = "orbit-directory",
    author,
    version,
    about = "Nearby-user directory session driver",
    long_about = "Loads a directory snapshot, keeps it in sync with real-time change \n\
                  events and prints the users within the configured radius.\n\n\
                  The `run` command replays a JSON fixture against an in-memory backend."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "ORBIT_DIRECTORY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "ORBIT_DIRECTORY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a fixture through a directory session
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display resolved configuration
    Info(InfoArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "orbit.toml",
        env = "ORBIT_DIRECTORY_CONFIG"
    )]
    pub config: PathBuf,

    /// Replay fixture (JSON): account, entries, events, locations
    #[arg(short, long, env = "ORBIT_DIRECTORY_FIXTURE")]
    pub fixture: PathBuf,

    /// Case-insensitive search over names and interests
    #[arg(long)]
    pub search: Option<String>,

    /// Only show users sharing this interest (repeatable)
    #[arg(long = "interest")]
    pub interests: Vec<String>,

    /// Override proximity radius in meters
    #[arg(long, env = "ORBIT_DIRECTORY_RADIUS")]
    pub radius: Option<f64>,

    /// Replay timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "ORBIT_DIRECTORY_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "ORBIT_DIRECTORY_METRICS_PORT")]
    pub metrics_port: u16,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "orbit.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "orbit.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args() {
        let cli = Cli::parse_from([
            "orbit-directory",
            "-v",
            "run",
            "--fixture",
            "replay.json",
            "--interest",
            "rust",
            "--interest",
            "chess",
            "--radius",
            "2500",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("orbit.toml"));
                assert_eq!(args.interests, vec!["rust", "chess"]);
                assert_eq!(args.radius, Some(2500.0));
                assert_eq!(args.metrics_port, 0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["orbit-directory", "-q", "-v", "info"]);
        assert!(result.is_err());
    }
}
