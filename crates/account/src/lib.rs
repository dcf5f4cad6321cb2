//! # Account
//!
//! Sign-in state and sign-up provisioning.
//!
//! Responsibilities:
//! - Track who is signed in (`AuthSession`)
//! - Create account + directory entry as one unit, with compensation
//!   (`Provisioner`)
//! - In-memory `AuthService` for tests and the CLI replay

pub mod auth;
pub mod error;
pub mod mock_auth;
pub mod provisioning;

pub use auth::{AuthSession, AuthState};
pub use contracts::{AccountId, AccountIdentity, AuthService};
pub use error::{AccountError, Result};
pub use mock_auth::{AuthOp, MockAuthService};
pub use provisioning::{Provisioned, Provisioner};
