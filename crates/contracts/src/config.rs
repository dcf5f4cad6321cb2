//! SessionConfig - Config Loader output
//!
//! Backend location, proximity radius, retry policy and real-time handling.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Default proximity radius in meters
pub const DEFAULT_RADIUS_METERS: f64 = 10_000.0;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete session configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionConfig {
    #[serde(default)]
    pub version: ConfigVersion,

    #[validate(nested)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub proximity: ProximityConfig,

    #[serde(default)]
    #[validate(nested)]
    pub retry: RetryConfig,

    #[serde(default)]
    #[validate(nested)]
    pub realtime: RealtimeConfig,
}

impl SessionConfig {
    /// Configuration pointing at `endpoint` with defaults everywhere else
    pub fn for_backend(backend: BackendConfig) -> Self {
        Self {
            version: ConfigVersion::V1,
            backend,
            proximity: ProximityConfig::default(),
            retry: RetryConfig::default(),
            realtime: RealtimeConfig::default(),
        }
    }

    /// Real-time channel carrying directory document changes
    pub fn realtime_channel(&self) -> String {
        format!(
            "databases.{}.collections.{}.documents",
            self.backend.database_id, self.backend.collection_id
        )
    }
}

/// Directory backend coordinates
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BackendConfig {
    #[validate(length(min = 1, message = "endpoint cannot be empty"))]
    pub endpoint: String,

    #[validate(length(min = 1, message = "project_id cannot be empty"))]
    pub project_id: String,

    #[validate(length(min = 1, message = "database_id cannot be empty"))]
    pub database_id: String,

    #[serde(default = "default_collection_id")]
    #[validate(length(min = 1, message = "collection_id cannot be empty"))]
    pub collection_id: String,
}

fn default_collection_id() -> String {
    "users".to_string()
}

/// Proximity gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityConfig {
    /// Radius in meters, closed interval
    #[serde(default = "default_radius")]
    pub radius_meters: f64,
}

fn default_radius() -> f64 {
    DEFAULT_RADIUS_METERS
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            radius_meters: DEFAULT_RADIUS_METERS,
        }
    }
}

/// Bounded retry for dependent create-then-link workflows
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    #[validate(range(min = 1, max = 20, message = "max_attempts must be within 1..=20"))]
    pub max_attempts: u32,

    #[serde(default)]
    pub backoff: Backoff,
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: Backoff::None,
        }
    }
}

/// Wait between retry attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Retry immediately
    #[default]
    None,
    /// Constant delay
    Fixed { delay_ms: u64 },
    /// Doubling delay starting at `base_ms`, capped at `max_ms`
    Exponential { base_ms: u64, max_ms: u64 },
}

impl Backoff {
    /// Delay after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match *self {
            Self::None => Duration::ZERO,
            Self::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Self::Exponential { base_ms, max_ms } => {
                let shift = attempt.saturating_sub(1).min(31);
                let delay = base_ms.saturating_mul(1u64 << shift);
                Duration::from_millis(delay.min(max_ms))
            }
        }
    }
}

/// What a real-time delete does to the cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Remove whichever entry was deleted
    #[default]
    RemoveAny,
    /// Only react when the current user's entry is deleted
    CurrentUserOnly,
    /// Never remove on real-time deletes
    Ignore,
}

/// Real-time subscription handling
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RealtimeConfig {
    #[serde(default)]
    pub delete_policy: DeletePolicy,

    /// Capacity of the real-time and location channels
    #[serde(default = "default_event_buffer")]
    #[validate(range(min = 1, max = 65536, message = "event_buffer must be within 1..=65536"))]
    pub event_buffer: usize,
}

fn default_event_buffer() -> usize {
    256
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            delete_policy: DeletePolicy::default(),
            event_buffer: default_event_buffer(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_caps() {
        let backoff = Backoff::Exponential {
            base_ms: 100,
            max_ms: 350,
        };
        assert_eq!(backoff.delay_after(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_after(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_after(3), Duration::from_millis(350));
        assert_eq!(backoff.delay_after(40), Duration::from_millis(350));
    }

    #[test]
    fn test_channel_name() {
        let config = SessionConfig::for_backend(BackendConfig {
            endpoint: "https://example.test/v1".into(),
            project_id: "orbit".into(),
            database_id: "db".into(),
            collection_id: "users".into(),
        });
        assert_eq!(config.realtime_channel(), "databases.db.collections.users.documents");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.proximity.radius_meters, DEFAULT_RADIUS_METERS);
    }

    #[test]
    fn test_backoff_serde_tagged() {
        let backoff: Backoff = serde_json::from_str(r#"{"kind":"fixed","delay_ms":25}"#).unwrap();
        assert_eq!(backoff, Backoff::Fixed { delay_ms: 25 });
    }
}
