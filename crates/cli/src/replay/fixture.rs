//! Replay fixture format.

use std::path::Path;

use contracts::{AccountId, Coordinate, DirectoryEntry, RealtimeMessage};
use serde::Deserialize;

use crate::error::{CliError, Result};

/// Everything a replay needs, loaded from one JSON file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    /// Who signs in; `None` runs an anonymous session
    pub account: Option<FixtureAccount>,
    /// Directory contents before the replay starts
    pub entries: Vec<DirectoryEntry>,
    /// Real-time messages, delivered in order
    pub events: Vec<RealtimeMessage>,
    /// Location fixes, delivered in order
    pub locations: Vec<Coordinate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureAccount {
    /// Fixed account id so fixture entries can refer to it
    #[serde(default)]
    pub id: Option<AccountId>,
    pub email: String,
    pub password: String,
    pub name: String,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::fixture_not_found(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| CliError::fixture_parse(path.display().to_string(), e.to_string()))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}
