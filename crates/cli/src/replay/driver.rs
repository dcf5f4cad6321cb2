//! Replay driver - wires auth, directory session and fixture feeds together.
//!
//! Runs entirely against in-memory collaborators; no backend is contacted.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use account::{AuthSession, MockAuthService, Provisioner};
use anyhow::{Context, Result};
use contracts::{AccountIdentity, DirectoryEntry, SessionConfig};
use directory_sync::{DirectorySession, MockConfig, MockDirectoryBackend};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{Fixture, ReplayStats};

/// Replay configuration
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Loaded session configuration
    pub session: SessionConfig,

    /// Replay input
    pub fixture: Fixture,

    /// Search text applied before the replay starts
    pub search: Option<String>,

    /// Interest selection applied before the replay starts
    pub interests: Vec<String>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// What the replay ended with
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    /// Signed-in account, if any
    pub account: Option<AccountIdentity>,
    /// Final filtered, nearby view
    pub visible: Vec<DirectoryEntry>,
    /// Every tag seen in the directory
    pub all_interests: Vec<String>,
    pub stats: ReplayStats,
}

pub struct Replay {
    config: ReplayConfig,
}

impl Replay {
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }

    /// Run until the fixture is exhausted or `shutdown` resolves
    pub async fn run<S>(self, shutdown: S) -> Result<ReplayOutcome>
    where
        S: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let ReplayConfig {
            session: config,
            fixture,
            search,
            interests,
            metrics_port,
        } = self.config;

        if let Some(port) = metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Collaborators
        let backend = MockDirectoryBackend::with_config(MockConfig {
            channel: Some(config.realtime_channel()),
            ..Default::default()
        });
        backend.seed(fixture.entries);

        let mut auth = MockAuthService::new();
        if let Some(ref fa) = fixture.account {
            auth = match &fa.id {
                Some(id) => auth.with_identity(
                    AccountIdentity {
                        id: id.clone(),
                        email: fa.email.clone(),
                        name: fa.name.clone(),
                    },
                    &fa.password,
                ),
                None => auth.with_account(&fa.email, &fa.password, &fa.name),
            };
        }

        let directory = Arc::new(DirectorySession::new(Arc::new(backend), &config));
        let auth_session = Arc::new(AuthSession::new(Arc::new(auth)));
        let provisioner = Provisioner::new(
            Arc::clone(&auth_session),
            Arc::clone(&directory),
            config.retry.clone(),
        );

        // Snapshot
        let entries_loaded = directory
            .initialize()
            .await
            .context("Failed to load directory snapshot")?;
        info!(entries = entries_loaded, "Directory snapshot loaded");

        // Sign in
        let account = match &fixture.account {
            Some(fa) => {
                let account = auth_session
                    .login(&fa.email, &fa.password)
                    .await
                    .context("Failed to sign in fixture account")?;
                let entry = provisioner
                    .ensure_entry(&account)
                    .await
                    .context("Failed to provision directory entry")?;
                info!(account_id = %account.id, entry_id = %entry.id, "Signed in");
                Some(account)
            }
            None => {
                let account = auth_session
                    .login_anonymous()
                    .await
                    .context("Failed to open anonymous session")?;
                info!(account_id = %account.id, "Signed in anonymously");
                None
            }
        };

        // View inputs
        if let Some(text) = search {
            directory.set_search_text(text).await;
        }
        if !interests.is_empty() {
            directory.set_selected_interests(interests).await;
        }

        // Feeds
        let buffer = config.realtime.event_buffer;
        let (realtime_tx, realtime_rx) = mpsc::channel(buffer);
        let (location_tx, location_rx) = mpsc::channel(buffer);

        let events = fixture.events;
        let realtime_feed = tokio::spawn(async move {
            for message in events {
                if realtime_tx.send(message).await.is_err() {
                    debug!("real-time receiver closed");
                    break;
                }
            }
        });

        let locations = fixture.locations;
        let location_feed = tokio::spawn(async move {
            for fix in locations {
                if location_tx.send(fix).await.is_err() {
                    debug!("location receiver closed");
                    break;
                }
            }
        });

        let run = directory.run(realtime_rx, location_rx, shutdown).await;

        // Feeds end once their receivers are dropped
        realtime_feed.abort();
        location_feed.abort();

        let state = directory.state();
        let stats = ReplayStats {
            entries_loaded,
            run,
            visible: state.visible.len(),
            duration: start_time.elapsed(),
            session: directory.metrics_summary().await,
        };

        Ok(ReplayOutcome {
            account,
            visible: state.visible.clone(),
            all_interests: state.all_interests.clone(),
            stats,
        })
    }
}
