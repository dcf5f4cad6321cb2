//! Real-time change events
//!
//! The real-time source delivers raw messages; decoding turns the payload into
//! a [`DirectoryEntry`] and the event name into an [`EventKind`].

use serde::{Deserialize, Serialize};

use crate::{ContractError, DirectoryEntry};

/// Raw frame as delivered by the real-time subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeMessage {
    /// Event names, e.g. `databases.db.collections.users.documents.doc-1.update`
    #[serde(default)]
    pub events: Vec<String>,

    /// Channels the message was published on
    #[serde(default)]
    pub channels: Vec<String>,

    /// Document body
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// What happened to the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Create,
    Update,
    Delete,
}

impl EventKind {
    /// Classify from event names; the last recognised suffix wins and an
    /// unrecognised name falls back to `Update`
    pub fn from_event_names<S: AsRef<str>>(names: &[S]) -> Self {
        names
            .iter()
            .rev()
            .find_map(|name| match name.as_ref().rsplit('.').next() {
                Some("create") => Some(Self::Create),
                Some("update") => Some(Self::Update),
                Some("delete") => Some(Self::Delete),
                _ => None,
            })
            .unwrap_or(Self::Update)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Decoded change
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: EventKind,
    pub entry: DirectoryEntry,
}

impl RealtimeMessage {
    /// Build a message the way the backend would publish it
    pub fn for_entry(kind: EventKind, channel: &str, entry: &DirectoryEntry) -> Result<Self, ContractError> {
        Ok(Self {
            events: vec![format!("{channel}.{}.{}", entry.id, kind.as_str())],
            channels: vec![channel.to_string()],
            payload: serde_json::to_value(entry)?,
        })
    }

    /// Decode payload and event kind
    ///
    /// # Errors
    /// `Decode` when the payload is missing or not a directory entry.
    pub fn decode(&self) -> Result<ChangeEvent, ContractError> {
        if self.payload.is_null() {
            return Err(ContractError::decode("real-time message has no payload"));
        }
        let entry = DirectoryEntry::deserialize(&self.payload)?;
        Ok(ChangeEvent {
            kind: EventKind::from_event_names(&self.events),
            entry,
        })
    }
}
