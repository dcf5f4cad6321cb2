//! Account workflow error types

use contracts::ContractError;
use thiserror::Error;

/// Account specific error
#[derive(Debug, Error)]
pub enum AccountError {
    /// Operation needs an active session
    #[error("not signed in")]
    NotLoggedIn,

    /// Account could not be created
    #[error("failed to create account for '{email}': {message}")]
    AccountCreationFailed { email: String, message: String },

    /// Credentials rejected or session could not be opened
    #[error("failed to sign in '{email}': {message}")]
    LoginFailed { email: String, message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl AccountError {
    pub fn account_creation(email: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AccountCreationFailed {
            email: email.into(),
            message: message.into(),
        }
    }

    pub fn login(email: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LoginFailed {
            email: email.into(),
            message: message.into(),
        }
    }

    /// Whether a bounded retry gave up
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, Self::Contract(ContractError::RetryExhausted { .. }))
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, AccountError>;
