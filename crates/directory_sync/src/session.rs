//! Directory session
//!
//! Owns the cache and publishes an immutable [`DirectoryState`] after every
//! change. Writers are serialized by one mutex that is never held across a
//! backend call.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use contracts::{
    AccountId, ContractError, Coordinate, DeletePolicy, DirectoryBackend, DirectoryEntry, Query,
    RealtimeMessage, SessionConfig,
};
use observability::{
    record_cache_size, record_event_applied, record_event_rejected, MetricsSummary,
    SessionMetricsAggregator,
};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::cache::{Applied, ReconcilingCache, ViewQuery};
use crate::loader::SnapshotLoader;
use crate::proximity::ProximityFilter;

/// Published snapshot of everything a directory screen renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryState {
    /// Full cache in display order
    pub entries: Vec<DirectoryEntry>,
    pub current_user: Option<DirectoryEntry>,
    pub current_location: Option<Coordinate>,
    pub search_text: String,
    pub selected_interests: Vec<String>,
    /// Filtered, nearby entries excluding the current user
    pub visible: Vec<DirectoryEntry>,
    pub all_interests: Vec<String>,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

/// Counters from one [`DirectorySession::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionRunStats {
    pub messages_received: u64,
    pub messages_rejected: u64,
    pub location_fixes: u64,
    pub location_failures: u64,
}

#[derive(Debug, Default)]
struct SessionInner {
    cache: ReconcilingCache,
    view: ViewQuery,
    is_loading: bool,
    last_error: Option<String>,
    stats: SessionMetricsAggregator,
}

pub struct DirectorySession<B> {
    backend: Arc<B>,
    loader: SnapshotLoader<B>,
    proximity: ProximityFilter,
    delete_policy: DeletePolicy,
    inner: Mutex<SessionInner>,
    state_tx: watch::Sender<Arc<DirectoryState>>,
}

impl<B: DirectoryBackend> DirectorySession<B> {
    pub fn new(backend: Arc<B>, config: &SessionConfig) -> Self {
        let (state_tx, _) = watch::channel(Arc::new(DirectoryState::default()));
        Self {
            loader: SnapshotLoader::new(Arc::clone(&backend)),
            backend,
            proximity: ProximityFilter::new(config.proximity.radius_meters),
            delete_policy: config.realtime.delete_policy,
            inner: Mutex::new(SessionInner::default()),
            state_tx,
        }
    }

    /// Receiver that sees every published state
    pub fn subscribe(&self) -> watch::Receiver<Arc<DirectoryState>> {
        self.state_tx.subscribe()
    }

    /// Latest published state
    pub fn state(&self) -> Arc<DirectoryState> {
        Arc::clone(&self.state_tx.borrow())
    }

    pub fn proximity(&self) -> &ProximityFilter {
        &self.proximity
    }

    pub async fn metrics_summary(&self) -> MetricsSummary {
        self.inner.lock().await.stats.summary()
    }

    /// Clear the last error and load the full directory
    #[instrument(name = "session_initialize", skip(self))]
    pub async fn initialize(&self) -> Result<usize, ContractError> {
        self.inner.lock().await.last_error = None;
        self.reload(None).await
    }

    /// Replace the cache with a fresh snapshot
    ///
    /// On failure the cache is left as it was and the error is recorded.
    #[instrument(name = "session_reload", skip(self, queries))]
    pub async fn reload(&self, queries: Option<&[Query]>) -> Result<usize, ContractError> {
        {
            let mut inner = self.inner.lock().await;
            inner.is_loading = true;
            self.publish(&mut inner);
        }

        let started = Instant::now();
        let result = self.loader.load(queries).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let mut inner = self.inner.lock().await;
        inner.is_loading = false;
        inner.stats.record_load(result.is_ok(), latency_ms);
        match result {
            Ok(entries) => {
                inner.cache.replace_all(entries);
                let count = inner.cache.len();
                self.publish(&mut inner);
                Ok(count)
            }
            Err(err) => {
                inner.last_error = Some(err.to_string());
                self.publish(&mut inner);
                Err(err)
            }
        }
    }

    pub async fn set_current_user(&self, account_id: AccountId) {
        let mut inner = self.inner.lock().await;
        debug!(account_id = %account_id, "current user set");
        inner.cache.set_current_user(account_id);
        self.publish(&mut inner);
    }

    pub async fn clear_current_user(&self) {
        let mut inner = self.inner.lock().await;
        inner.cache.clear_current_user();
        self.publish(&mut inner);
    }

    pub async fn current_user(&self) -> Option<DirectoryEntry> {
        self.inner.lock().await.cache.current_user()
    }

    /// Create the session's own entry
    ///
    /// The created entry becomes the current user.
    #[instrument(name = "session_create_user", skip(self, entry), fields(account_id = %entry.account_id))]
    pub async fn create_user(&self, entry: DirectoryEntry) -> Result<DirectoryEntry, ContractError> {
        let result = self.backend.create_user(&entry).await;

        let mut inner = self.inner.lock().await;
        match result {
            Ok(created) => {
                info!(entry_id = %created.id, "directory entry created");
                inner.cache.apply_create(created.clone());
                inner.cache.set_current_entry(created.clone());
                self.publish(&mut inner);
                Ok(created)
            }
            Err(err) => self.fail(&mut inner, err),
        }
    }

    #[instrument(name = "session_update_user", skip(self, entry), fields(account_id = %account_id))]
    pub async fn update_user(
        &self,
        account_id: &AccountId,
        entry: DirectoryEntry,
    ) -> Result<DirectoryEntry, ContractError> {
        let result = self.backend.update_user(account_id, &entry).await;

        let mut inner = self.inner.lock().await;
        match result {
            Ok(Some(updated)) => {
                debug!(entry_id = %updated.id, "directory entry updated");
                inner.cache.apply_update(updated.clone());
                self.publish(&mut inner);
                Ok(updated)
            }
            Ok(None) => self.fail(
                &mut inner,
                ContractError::not_found("directory entry", account_id.as_str()),
            ),
            Err(err) => self.fail(&mut inner, err),
        }
    }

    /// Delete the entry owned by `account_id`
    #[instrument(name = "session_delete_user", skip(self), fields(account_id = %account_id))]
    pub async fn delete_user(&self, account_id: &AccountId) -> Result<(), ContractError> {
        let id = {
            let mut inner = self.inner.lock().await;
            let cached = inner.cache.get(account_id).map(|entry| entry.id.clone());
            match cached {
                Some(id) => id,
                None => {
                    return self.fail(
                        &mut inner,
                        ContractError::not_found("directory entry", account_id.as_str()),
                    )
                }
            }
        };

        let result = self.backend.delete_user(&id).await;

        let mut inner = self.inner.lock().await;
        match result {
            Ok(()) => {
                info!(entry_id = %id, "directory entry deleted");
                inner.cache.remove(account_id);
                self.publish(&mut inner);
                Ok(())
            }
            Err(err) => self.fail(&mut inner, err),
        }
    }

    /// Record a location fix and push it to the current user's entry
    ///
    /// Invalid fixes are dropped. Without a current user only the reference
    /// location changes.
    #[instrument(name = "session_update_location", skip(self))]
    pub async fn update_current_location(
        &self,
        coordinate: Coordinate,
    ) -> Result<Option<DirectoryEntry>, ContractError> {
        if !coordinate.is_valid() {
            warn!(?coordinate, "ignoring invalid location fix");
            return Ok(None);
        }

        let current = {
            let mut inner = self.inner.lock().await;
            inner.view.reference = Some(coordinate);
            self.publish(&mut inner);
            inner.cache.current_user()
        };

        let Some(mut entry) = current else {
            debug!("no current user, location kept locally");
            return Ok(None);
        };
        let account_id = entry.account_id.clone();
        entry.set_coordinate(coordinate);
        self.update_user(&account_id, entry).await.map(Some)
    }

    /// Decode a real-time message and apply it to the cache
    #[instrument(name = "session_handle_message", skip(self, message))]
    pub async fn handle_message(&self, message: RealtimeMessage) -> Result<Applied, ContractError> {
        let change = match message.decode() {
            Ok(change) => change,
            Err(err) => {
                record_event_rejected("decode");
                warn!(error = %err, events = ?message.events, "dropping undecodable message");
                self.inner.lock().await.stats.record_decode_failure();
                return Err(err);
            }
        };

        let kind = change.kind;
        let mut inner = self.inner.lock().await;
        let applied = inner.cache.apply(change, self.delete_policy);
        debug!(kind = kind.as_str(), ?applied, "real-time change applied");

        inner.stats.record_event(kind, applied != Applied::Ignored);
        record_event_applied(kind, applied.as_str());
        if applied != Applied::Ignored {
            self.publish(&mut inner);
        }
        Ok(applied)
    }

    pub async fn set_search_text(&self, text: impl Into<String>) {
        let mut inner = self.inner.lock().await;
        inner.view.search_text = text.into();
        self.publish(&mut inner);
    }

    /// Add the tag to the selection, or remove it if already selected
    pub async fn toggle_interest(&self, interest: &str) {
        let mut inner = self.inner.lock().await;
        let selected = &mut inner.view.selected_interests;
        match selected.iter().position(|tag| tag == interest) {
            Some(index) => {
                selected.remove(index);
            }
            None => selected.push(interest.to_string()),
        }
        self.publish(&mut inner);
    }

    pub async fn set_selected_interests(&self, interests: Vec<String>) {
        let mut inner = self.inner.lock().await;
        inner.view.selected_interests = interests;
        self.publish(&mut inner);
    }

    /// Filtered, nearby entries for the current inputs
    pub async fn view(&self) -> Vec<DirectoryEntry> {
        let inner = self.inner.lock().await;
        inner.cache.view(&inner.view, &self.proximity)
    }

    pub async fn all_interests(&self) -> Vec<String> {
        self.inner.lock().await.cache.all_interests()
    }

    /// Consume real-time messages and location fixes until both channels
    /// close or `shutdown` resolves
    ///
    /// Per-item failures are logged and counted; the loop keeps going.
    pub async fn run<S>(
        &self,
        mut realtime: mpsc::Receiver<RealtimeMessage>,
        mut locations: mpsc::Receiver<Coordinate>,
        shutdown: S,
    ) -> SessionRunStats
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut stats = SessionRunStats::default();
        let mut realtime_open = true;
        let mut locations_open = true;

        info!("directory subscription started");

        while realtime_open || locations_open {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }

                message = realtime.recv(), if realtime_open => match message {
                    Some(message) => {
                        stats.messages_received += 1;
                        if self.handle_message(message).await.is_err() {
                            stats.messages_rejected += 1;
                        }
                    }
                    None => {
                        debug!("real-time channel closed");
                        realtime_open = false;
                    }
                },

                fix = locations.recv(), if locations_open => match fix {
                    Some(coordinate) => {
                        stats.location_fixes += 1;
                        if let Err(err) = self.update_current_location(coordinate).await {
                            warn!(error = %err, "location update failed");
                            stats.location_failures += 1;
                        }
                    }
                    None => {
                        debug!("location channel closed");
                        locations_open = false;
                    }
                },
            }
        }

        info!(
            messages = stats.messages_received,
            rejected = stats.messages_rejected,
            location_fixes = stats.location_fixes,
            "directory subscription stopped"
        );
        stats
    }

    fn fail<T>(&self, inner: &mut SessionInner, err: ContractError) -> Result<T, ContractError> {
        warn!(error = %err, "directory operation failed");
        inner.last_error = Some(err.to_string());
        self.publish(inner);
        Err(err)
    }

    fn publish(&self, inner: &mut SessionInner) {
        let visible = inner.cache.view(&inner.view, &self.proximity);
        inner.stats.record_visible(visible.len());
        record_cache_size(inner.cache.len(), visible.len());

        let state = DirectoryState {
            entries: inner.cache.entries(),
            current_user: inner.cache.current_user(),
            current_location: inner.view.reference,
            search_text: inner.view.search_text.clone(),
            selected_interests: inner.view.selected_interests.clone(),
            visible,
            all_interests: inner.cache.all_interests(),
            is_loading: inner.is_loading,
            last_error: inner.last_error.clone(),
        };
        self.state_tx.send_replace(Arc::new(state));
    }
}
