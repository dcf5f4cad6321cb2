//! DirectoryEntry - user profile record mirrored from the directory backend
//!
//! Distinct from the auth account record ([`AccountIdentity`](crate::AccountIdentity)).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

use crate::{AccountId, EntryId};

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and inside the WGS84 degree ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Directory entry
///
/// `account_id` is the business key: the cache keeps at most one entry per
/// account. `id` is the backend storage key and is what the real-time stream
/// refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    /// Storage id (`$id` on the wire)
    #[serde(alias = "$id")]
    pub id: EntryId,

    /// Owning account
    pub account_id: AccountId,

    /// Display name
    pub name: String,

    /// Free-form tags, no duplicates
    #[serde(default, deserialize_with = "deserialize_interests")]
    pub interests: Option<Vec<String>>,

    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,
}

impl DirectoryEntry {
    /// Create an entry without interests or location
    pub fn new(id: impl Into<EntryId>, account_id: impl Into<AccountId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            account_id: account_id.into(),
            name: name.into(),
            interests: None,
            latitude: None,
            longitude: None,
        }
    }

    /// Builder-style interests setter
    pub fn with_interests<I, S>(mut self, interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_interests(interests);
        self
    }

    /// Builder-style coordinate setter
    pub fn with_coordinate(mut self, coordinate: Coordinate) -> Self {
        self.set_coordinate(coordinate);
        self
    }

    /// Replace interests, dropping exact duplicates (first occurrence wins)
    pub fn set_interests<I, S>(&mut self, interests: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interests = Some(dedup(interests.into_iter().map(Into::into)));
    }

    /// Replace the reported position
    pub fn set_coordinate(&mut self, coordinate: Coordinate) {
        self.latitude = Some(coordinate.latitude);
        self.longitude = Some(coordinate.longitude);
    }

    /// Position, only when both components were reported
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinate::new(latitude, longitude)),
            _ => None,
        }
    }

    /// Interests joined with single spaces (empty when absent)
    pub fn joined_interests(&self) -> String {
        self.interests
            .as_deref()
            .map(|tags| tags.join(" "))
            .unwrap_or_default()
    }

    /// Whether any of `tags` is among this entry's interests
    pub fn shares_interest_with(&self, tags: &[String]) -> bool {
        match self.interests.as_deref() {
            Some(own) => own.iter().any(|tag| tags.contains(tag)),
            None => false,
        }
    }
}

fn dedup(tags: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.filter(|tag| seen.insert(tag.clone())).collect()
}

fn deserialize_interests<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<String>>::deserialize(deserializer)?;
    Ok(raw.map(|tags| dedup(tags.into_iter())))
}
