//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce `SessionConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("orbit.toml")).unwrap();
//! println!("Radius: {}m", config.proximity.radius_meters);
//! ```

mod parser;
mod validator;

pub use contracts::SessionConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<SessionConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<SessionConfig, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Serialize SessionConfig to TOML string
    pub fn to_toml(config: &SessionConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize SessionConfig to JSON string
    pub fn to_json(config: &SessionConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<SessionConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Backoff, DeletePolicy};
    use std::io::Write;

    const MINIMAL_TOML: &str = r#"
[backend]
endpoint = "https://cloud.appwrite.io/v1"
project_id = "orbit"
database_id = "orbit-db"
"#;

    #[test]
    fn test_load_from_str_defaults() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(config.backend.collection_id, "users");
        assert_eq!(config.proximity.radius_meters, 10_000.0);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff, Backoff::None);
        assert_eq!(config.realtime.delete_policy, DeletePolicy::RemoveAny);
    }

    #[test]
    fn test_full_toml() {
        let content = r#"
version = "V1"

[backend]
endpoint = "http://localhost/v1"
project_id = "p"
database_id = "d"
collection_id = "people"

[proximity]
radius_meters = 2500.0

[retry]
max_attempts = 5
backoff = { kind = "exponential", base_ms = 50, max_ms = 400 }

[realtime]
delete_policy = "current_user_only"
event_buffer = 32
"#;
        let config = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        assert_eq!(config.backend.collection_id, "people");
        assert_eq!(config.proximity.radius_meters, 2500.0);
        assert_eq!(
            config.retry.backoff,
            Backoff::Exponential {
                base_ms: 50,
                max_ms: 400
            }
        );
        assert_eq!(config.realtime.delete_policy, DeletePolicy::CurrentUserOnly);
        assert_eq!(config.realtime.event_buffer, 32);
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let again = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(config.backend.database_id, again.backend.database_id);
        assert_eq!(config.retry.max_attempts, again.retry.max_attempts);
    }

    #[test]
    fn test_toml_to_json() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let again = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config.backend.endpoint, again.backend.endpoint);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[backend]
endpoint = "https://cloud.appwrite.io/v1"
project_id = "orbit"
database_id = "orbit-db"

[proximity]
radius_meters = -1.0
"#;
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("radius_meters"), "got: {err}");
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(MINIMAL_TOML.as_bytes()).unwrap();
        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.backend.project_id, "orbit");
    }

    #[test]
    fn test_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }
}
