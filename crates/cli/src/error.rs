//! Error types for CLI operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Fixture file not found
    #[error("Fixture file not found: {path}")]
    FixtureNotFound { path: String },

    /// Fixture is not valid JSON or has the wrong shape
    #[error("Failed to parse fixture {path}: {message}")]
    FixtureParse { path: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn fixture_not_found(path: impl Into<String>) -> Self {
        Self::FixtureNotFound { path: path.into() }
    }

    pub fn fixture_parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FixtureParse {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
