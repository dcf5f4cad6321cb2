//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{Backoff, DeletePolicy, SessionConfig};

use crate::cli::ValidateArgs;

/// Radius above which a warning is emitted
const WIDE_RADIUS_METERS: f64 = 100_000.0;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    endpoint: String,
    project_id: String,
    database_id: String,
    collection_id: String,
    channel: String,
    radius_meters: f64,
    max_attempts: u32,
    delete_policy: DeletePolicy,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(summarize(&config)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn summarize(config: &SessionConfig) -> ConfigSummary {
    ConfigSummary {
        version: format!("{:?}", config.version),
        endpoint: config.backend.endpoint.clone(),
        project_id: config.backend.project_id.clone(),
        database_id: config.backend.database_id.clone(),
        collection_id: config.backend.collection_id.clone(),
        channel: config.realtime_channel(),
        radius_meters: config.proximity.radius_meters,
        max_attempts: config.retry.max_attempts,
        delete_policy: config.realtime.delete_policy,
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &SessionConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.proximity.radius_meters > WIDE_RADIUS_METERS {
        warnings.push(format!(
            "proximity.radius_meters is {} - most of the directory will be visible",
            config.proximity.radius_meters
        ));
    }

    if config.retry.backoff == Backoff::None && config.retry.max_attempts > 1 {
        warnings.push("retry.backoff is none - retries run back to back".to_string());
    }

    if config.realtime.delete_policy == DeletePolicy::Ignore {
        warnings.push(
            "realtime.delete_policy is ignore - deleted users stay visible until reload"
                .to_string(),
        );
    }

    if config.backend.endpoint.starts_with("http://") {
        warnings.push("backend.endpoint is not using TLS".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Endpoint: {}", summary.endpoint);
            println!("  Project: {}", summary.project_id);
            println!(
                "  Collection: {}/{}",
                summary.database_id, summary.collection_id
            );
            println!("  Channel: {}", summary.channel);
            println!("  Radius: {} m", summary.radius_meters);
            println!("  Max attempts: {}", summary.max_attempts);
            println!("  Delete policy: {:?}", summary.delete_policy);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
