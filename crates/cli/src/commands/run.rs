//! `run` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use contracts::{AccountIdentity, DirectoryEntry, SessionConfig};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::replay::{Fixture, Replay, ReplayConfig, ReplayOutcome, StatsReport};

/// JSON output of a replay
#[derive(Serialize)]
struct RunReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<&'a AccountIdentity>,
    visible: &'a [DirectoryEntry],
    all_interests: &'a [String],
    stats: StatsReport,
}

/// Execute the `run` command
pub async fn run_replay(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if let Some(radius) = args.radius {
        if !radius.is_finite() || radius <= 0.0 {
            anyhow::bail!("--radius must be finite and > 0, got {radius}");
        }
        info!(radius_m = radius, "Overriding proximity radius from CLI");
        config.proximity.radius_meters = radius;
    }

    let fixture = Fixture::load(&args.fixture)?;
    info!(
        entries = fixture.entries.len(),
        events = fixture.events.len(),
        locations = fixture.locations.len(),
        anonymous = fixture.account.is_none(),
        "Fixture loaded"
    );

    let replay = Replay::new(build_replay_config(args, config, fixture));

    let timeout = args.timeout;
    let shutdown = async move {
        if timeout == 0 {
            shutdown_signal().await;
        } else {
            tokio::select! {
                _ = shutdown_signal() => {}
                _ = tokio::time::sleep(Duration::from_secs(timeout)) => {
                    warn!(timeout_secs = timeout, "Replay timeout reached");
                }
            }
        }
    };

    info!("Starting replay...");
    let outcome = replay.run(shutdown).await.context("Replay execution failed")?;

    info!(
        visible = outcome.visible.len(),
        messages = outcome.stats.run.messages_received,
        duration_secs = outcome.stats.duration.as_secs_f64(),
        "Replay completed"
    );

    if args.json {
        let report = RunReport {
            account: outcome.account.as_ref(),
            visible: &outcome.visible,
            all_interests: &outcome.all_interests,
            stats: outcome.stats.report(),
        };
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        print_outcome(&outcome);
        outcome.stats.print_summary();
    }

    Ok(())
}

fn build_replay_config(args: &RunArgs, session: SessionConfig, fixture: Fixture) -> ReplayConfig {
    ReplayConfig {
        session,
        fixture,
        search: args.search.clone().filter(|s| !s.is_empty()),
        interests: args.interests.clone(),
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    }
}

/// Wait for Ctrl+C or SIGTERM
///
/// If a handler cannot be installed that source never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn print_outcome(outcome: &ReplayOutcome) {
    println!("\n=== Nearby Users ===\n");
    match &outcome.account {
        Some(account) => println!("Signed in as {} ({})", account.name, account.id),
        None => println!("Signed in anonymously"),
    }

    if outcome.visible.is_empty() {
        println!("\nNobody nearby.");
    } else {
        println!("\nVisible ({}):", outcome.visible.len());
        for (i, entry) in outcome.visible.iter().enumerate() {
            let prefix = if i == outcome.visible.len() - 1 { "└─" } else { "├─" };
            let interests = entry.joined_interests();
            if interests.is_empty() {
                println!("   {} {} [{}]", prefix, entry.name, entry.id);
            } else {
                println!("   {} {} [{}] - {}", prefix, entry.name, entry.id, interests);
            }
        }
    }

    if !outcome.all_interests.is_empty() {
        println!("\nInterests: {}", outcome.all_interests.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    use crate::cli::{Cli, Commands};

    const CONFIG: &str = r#"
[backend]
endpoint = "https://example.test/v1"
project_id = "orbit"
database_id = "db"
"#;

    fn temp(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn run_args(config: &NamedTempFile, fixture: &NamedTempFile, extra: &[&str]) -> RunArgs {
        let mut argv = vec![
            "orbit-directory".to_string(),
            "run".into(),
            "--config".into(),
            config.path().display().to_string(),
            "--fixture".into(),
            fixture.path().display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_with_fixture() {
        let config = temp(".toml", CONFIG);
        let fixture = temp(
            ".json",
            r#"{
                "account": { "id": "acc-ada", "email": "ada@example.test", "password": "pw", "name": "Ada" },
                "entries": [
                    { "$id": "d1", "accountId": "acc-ada", "name": "Ada" },
                    { "$id": "d2", "accountId": "acc-bo", "name": "Bo", "latitude": 0.001, "longitude": 0.0 }
                ],
                "locations": [ { "latitude": 0.0, "longitude": 0.0 } ]
            }"#,
        );
        let args = run_args(&config, &fixture, &["--json", "--timeout", "5"]);
        run_replay(&args).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_config() {
        let fixture = temp(".json", "{}");
        let config = temp(".toml", CONFIG);
        let mut args = run_args(&config, &fixture, &[]);
        args.config = "/nonexistent/orbit.toml".into();
        let err = run_replay(&args).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_rejects_bad_radius() {
        let config = temp(".toml", CONFIG);
        let fixture = temp(".json", "{}");
        let args = run_args(&config, &fixture, &["--radius", "-5"]);
        assert!(run_replay(&args).await.is_err());
    }

    #[test]
    fn test_empty_search_is_dropped() {
        let config = temp(".toml", CONFIG);
        let fixture = temp(".json", "{}");
        let args = run_args(&config, &fixture, &["--search", ""]);
        let session = config_loader::ConfigLoader::load_from_path(config.path()).unwrap();
        let replay = build_replay_config(&args, session, Fixture::default());
        assert!(replay.search.is_none());
        assert!(replay.metrics_port.is_none());
    }
}
