//! # Contracts
//!
//! Shared interface contracts for the directory sync workspace: data model,
//! identifiers, errors, configuration and collaborator traits.
//! Business crates depend on this crate, never the other way round.
//!
//! ## Keys
//! - `EntryId` is the backend storage key, used by the real-time stream
//! - `AccountId` is the business key; the cache holds one entry per account

mod backend;
mod config;
mod entry;
mod error;
mod event;
mod ids;
mod query;

pub use backend::{AccountIdentity, AuthService, DirectoryBackend, LocalAuthService, LocalDirectoryBackend};
pub use config::*;
pub use entry::{Coordinate, DirectoryEntry};
pub use error::*;
pub use event::{ChangeEvent, EventKind, RealtimeMessage};
pub use ids::{AccountId, EntryId};
pub use query::Query;
