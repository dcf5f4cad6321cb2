//! Config validation
//!
//! Two passes:
//! - field rules declared with `#[validate(..)]` on the contract types
//! - cross-field rules that the derive cannot express
//!
//! Rules:
//! - backend ids non-empty, endpoint is http(s)
//! - radius_meters finite and > 0
//! - 1 <= retry.max_attempts <= 20
//! - exponential backoff base_ms <= max_ms
//! - realtime.event_buffer within 1..=65536

use ::validator::{Validate, ValidationErrors, ValidationErrorsKind};
use contracts::{Backoff, ContractError, SessionConfig};

/// Validate a parsed SessionConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &SessionConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_endpoint(config)?;
    validate_radius(config)?;
    validate_backoff(config)?;
    Ok(())
}

fn validate_fields(config: &SessionConfig) -> Result<(), ContractError> {
    match config.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let (field, message) = first_error("", &errors)
                .unwrap_or_else(|| (String::from("<root>"), String::from("invalid value")));
            Err(ContractError::config_validation(field, message))
        }
    }
}

/// Depth-first search for the first field error, with a dotted path.
/// Keys are sorted so the reported error is stable across runs.
fn first_error(prefix: &str, errors: &ValidationErrors) -> Option<(String, String)> {
    let mut keys: Vec<_> = errors.errors().keys().collect();
    keys.sort();

    for key in keys {
        let path = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        };
        match &errors.errors()[key] {
            ValidationErrorsKind::Field(field_errors) => {
                if let Some(err) = field_errors.first() {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_error(&path, inner) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_error(&format!("{path}[{idx}]"), inner) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

fn validate_endpoint(config: &SessionConfig) -> Result<(), ContractError> {
    let endpoint = &config.backend.endpoint;
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(ContractError::config_validation(
            "backend.endpoint",
            format!("endpoint must start with http:// or https://, got '{endpoint}'"),
        ));
    }
    Ok(())
}

fn validate_radius(config: &SessionConfig) -> Result<(), ContractError> {
    let radius = config.proximity.radius_meters;
    if !radius.is_finite() || radius <= 0.0 {
        return Err(ContractError::config_validation(
            "proximity.radius_meters",
            format!("radius_meters must be finite and > 0, got {radius}"),
        ));
    }
    Ok(())
}

fn validate_backoff(config: &SessionConfig) -> Result<(), ContractError> {
    if let Backoff::Exponential { base_ms, max_ms } = config.retry.backoff {
        if base_ms > max_ms {
            return Err(ContractError::config_validation(
                "retry.backoff",
                format!("base_ms ({base_ms}) must be <= max_ms ({max_ms})"),
            ));
        }
    }
    Ok(())
}
