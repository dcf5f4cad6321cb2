//! Layered error definitions
//!
//! Categorized by source: backend / auth / decode / retry / config

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Backend Errors =====
    /// Backend unreachable or request failed in transit
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Update/delete target does not exist
    #[error("{what} not found: {key}")]
    NotFound { what: String, key: String },

    /// Malformed payload from the backend or the real-time stream
    #[error("decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ===== Auth Errors =====
    /// No active session or credentials rejected
    #[error("auth error: {message}")]
    Auth { message: String },

    // ===== Retry Errors =====
    /// Bounded retry gave up
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        #[source]
        last_error: Box<ContractError>,
    },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create not-found error
    pub fn not_found(what: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            what: what.into(),
            key: key.into(),
        }
    }

    /// Create decode error without an underlying source
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            source: None,
        }
    }

    /// Create auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether repeating the same call could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<serde_json::Error> for ContractError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
