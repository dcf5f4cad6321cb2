//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{Backoff, DeletePolicy, SessionConfig};

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    backend: BackendInfo,
    radius_meters: f64,
    retry: RetryInfo,
    realtime: RealtimeInfo,
}

#[derive(Serialize)]
struct BackendInfo {
    endpoint: String,
    project_id: String,
    database_id: String,
    collection_id: String,
}

#[derive(Serialize)]
struct RetryInfo {
    max_attempts: u32,
    backoff: Backoff,
}

#[derive(Serialize)]
struct RealtimeInfo {
    channel: String,
    delete_policy: DeletePolicy,
    event_buffer: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn build_config_info(config: &SessionConfig) -> ConfigInfo {
    ConfigInfo {
        version: format!("{:?}", config.version),
        backend: BackendInfo {
            endpoint: config.backend.endpoint.clone(),
            project_id: config.backend.project_id.clone(),
            database_id: config.backend.database_id.clone(),
            collection_id: config.backend.collection_id.clone(),
        },
        radius_meters: config.proximity.radius_meters,
        retry: RetryInfo {
            max_attempts: config.retry.max_attempts,
            backoff: config.retry.backoff,
        },
        realtime: RealtimeInfo {
            channel: config.realtime_channel(),
            delete_policy: config.realtime.delete_policy,
            event_buffer: config.realtime.event_buffer,
        },
    }
}

fn describe_backoff(backoff: &Backoff) -> String {
    match backoff {
        Backoff::None => "none".to_string(),
        Backoff::Fixed { delay_ms } => format!("fixed {delay_ms} ms"),
        Backoff::Exponential { base_ms, max_ms } => {
            format!("exponential {base_ms} ms, capped at {max_ms} ms")
        }
    }
}

fn print_config_info(config: &SessionConfig) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Orbit Directory Configuration                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🌐 Backend");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Endpoint: {}", config.backend.endpoint);
    println!("   ├─ Project: {}", config.backend.project_id);
    println!("   ├─ Database: {}", config.backend.database_id);
    println!("   └─ Collection: {}", config.backend.collection_id);

    println!("\n📍 Proximity");
    println!("   └─ Radius: {} m", config.proximity.radius_meters);

    println!("\n🔁 Retry");
    println!("   ├─ Max attempts: {}", config.retry.max_attempts);
    println!("   └─ Backoff: {}", describe_backoff(&config.retry.backoff));

    println!("\n📡 Real-time");
    println!("   ├─ Channel: {}", config.realtime_channel());
    println!("   ├─ Delete policy: {:?}", config.realtime.delete_policy);
    println!("   └─ Buffer: {}", config.realtime.event_buffer);

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_info_json_shape() {
        let config = ConfigLoader::load_from_str(
            r#"
[backend]
endpoint = "https://example.test/v1"
project_id = "orbit"
database_id = "db"

[retry]
backoff = { kind = "fixed", delay_ms = 200 }
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let json = serde_json::to_value(build_config_info(&config)).unwrap();
        assert_eq!(json["backend"]["collection_id"], "users");
        assert_eq!(json["retry"]["backoff"]["kind"], "fixed");
        assert_eq!(json["realtime"]["delete_policy"], "remove_any");
        assert_eq!(
            json["realtime"]["channel"],
            "databases.db.collections.users.documents"
        );
    }

    #[test]
    fn test_describe_backoff() {
        assert_eq!(describe_backoff(&Backoff::None), "none");
        assert_eq!(
            describe_backoff(&Backoff::Exponential {
                base_ms: 10,
                max_ms: 80
            }),
            "exponential 10 ms, capped at 80 ms"
        );
    }
}
