//! In-memory directory backend
//!
//! Used by tests and the CLI replay. Supports failure injection and emits
//! real-time messages for its own writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{
    AccountId, ContractError, DirectoryBackend, DirectoryEntry, EntryId, EventKind, Query,
    RealtimeMessage,
};
use tokio::sync::mpsc;
use tracing::{debug, instrument};

/// Channel stamped on messages when none is configured
pub const DEFAULT_MOCK_CHANNEL: &str = "databases.mock.collections.users.documents";

/// Backend operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    List,
    Get,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Default, Clone)]
pub struct MockConfig {
    /// Number of upcoming calls to fail, per operation
    pub failures: HashMap<MockOp, u32>,
    /// Channel for emitted real-time messages
    pub channel: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    documents: Vec<DirectoryEntry>,
    failures: HashMap<MockOp, u32>,
    calls: HashMap<MockOp, u32>,
    queries: Vec<Vec<Query>>,
    subscribers: Vec<mpsc::Sender<RealtimeMessage>>,
}

/// Cloning shares the underlying collection
#[derive(Debug, Clone)]
pub struct MockDirectoryBackend {
    state: Arc<Mutex<MockState>>,
    next_id: Arc<AtomicU32>,
    channel: Arc<str>,
}

impl MockDirectoryBackend {
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Self {
        let channel = config
            .channel
            .unwrap_or_else(|| DEFAULT_MOCK_CHANNEL.to_string());
        Self {
            state: Arc::new(Mutex::new(MockState {
                failures: config.failures,
                ..Default::default()
            })),
            next_id: Arc::new(AtomicU32::new(1)),
            channel: channel.into(),
        }
    }

    /// Start with `entries` already stored
    pub fn with_entries(entries: impl IntoIterator<Item = DirectoryEntry>) -> Self {
        let backend = Self::new();
        backend.seed(entries);
        backend
    }

    /// Store entries directly, bypassing failures and notifications
    pub fn seed(&self, entries: impl IntoIterator<Item = DirectoryEntry>) {
        let mut state = self.lock();
        for mut entry in entries {
            if entry.id.is_empty() {
                entry.id = self.allocate_id();
            }
            state.documents.push(entry);
        }
    }

    /// Fail the next `times` calls of `op` with a transport error
    pub fn fail_next(&self, op: MockOp, times: u32) {
        self.lock().failures.insert(op, times);
    }

    /// Fail every call of `op` until [`heal`](Self::heal)
    pub fn fail_always(&self, op: MockOp) {
        self.fail_next(op, u32::MAX);
    }

    pub fn heal(&self, op: MockOp) {
        self.lock().failures.remove(&op);
    }

    pub fn call_count(&self, op: MockOp) -> u32 {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Query lists passed to `list_users`, oldest first
    pub fn recorded_queries(&self) -> Vec<Vec<Query>> {
        self.lock().queries.clone()
    }

    pub fn documents(&self) -> Vec<DirectoryEntry> {
        self.lock().documents.clone()
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Receive a message for every successful write from now on
    pub fn subscribe(&self, capacity: usize) -> mpsc::Receiver<RealtimeMessage> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.lock().subscribers.push(tx);
        rx
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_id(&self) -> EntryId {
        EntryId::from(format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    /// Count the call and consume one injected failure, if any
    fn enter(&self, state: &mut MockState, op: MockOp) -> Result<(), ContractError> {
        *state.calls.entry(op).or_default() += 1;
        if let Some(remaining) = state.failures.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                debug!(?op, remaining = *remaining, "injected failure");
                return Err(ContractError::transport(format!("mock {op:?} failure")));
            }
        }
        Ok(())
    }

    fn notify(&self, state: &mut MockState, kind: EventKind, entry: &DirectoryEntry) {
        let message = match RealtimeMessage::for_entry(kind, &self.channel, entry) {
            Ok(message) => message,
            Err(err) => {
                debug!(error = %err, "cannot encode notification");
                return;
            }
        };
        state.subscribers.retain(|tx| match tx.try_send(message.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("subscriber full, dropping message");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }
}

impl Default for MockDirectoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryBackend for MockDirectoryBackend {
    #[instrument(name = "mock_list_users", skip(self, queries), fields(query_count = queries.len()))]
    async fn list_users(&self, queries: &[Query]) -> Result<Vec<DirectoryEntry>, ContractError> {
        let mut state = self.lock();
        self.enter(&mut state, MockOp::List)?;
        state.queries.push(queries.to_vec());
        Ok(state.documents.clone())
    }

    #[instrument(name = "mock_get_user", skip(self), fields(account_id = %account_id))]
    async fn get_user(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<DirectoryEntry>, ContractError> {
        let mut state = self.lock();
        self.enter(&mut state, MockOp::Get)?;
        Ok(state
            .documents
            .iter()
            .find(|doc| doc.account_id == *account_id)
            .cloned())
    }

    #[instrument(name = "mock_create_user", skip(self, entry), fields(account_id = %entry.account_id))]
    async fn create_user(&self, entry: &DirectoryEntry) -> Result<DirectoryEntry, ContractError> {
        let mut state = self.lock();
        self.enter(&mut state, MockOp::Create)?;

        let mut created = entry.clone();
        if created.id.is_empty() {
            created.id = self.allocate_id();
        }
        state.documents.push(created.clone());
        self.notify(&mut state, EventKind::Create, &created);
        Ok(created)
    }

    #[instrument(name = "mock_update_user", skip(self, entry), fields(account_id = %account_id))]
    async fn update_user(
        &self,
        account_id: &AccountId,
        entry: &DirectoryEntry,
    ) -> Result<Option<DirectoryEntry>, ContractError> {
        let mut state = self.lock();
        self.enter(&mut state, MockOp::Update)?;

        let Some(doc) = state
            .documents
            .iter_mut()
            .find(|doc| doc.account_id == *account_id)
        else {
            return Ok(None);
        };
        let id = doc.id.clone();
        *doc = entry.clone();
        doc.id = id;
        let updated = doc.clone();
        self.notify(&mut state, EventKind::Update, &updated);
        Ok(Some(updated))
    }

    #[instrument(name = "mock_delete_user", skip(self), fields(id = %id))]
    async fn delete_user(&self, id: &EntryId) -> Result<(), ContractError> {
        let mut state = self.lock();
        self.enter(&mut state, MockOp::Delete)?;

        let Some(index) = state.documents.iter().position(|doc| doc.id == *id) else {
            return Err(ContractError::not_found("document", id.as_str()));
        };
        let removed = state.documents.remove(index);
        self.notify(&mut state, EventKind::Delete, &removed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(account: &str, name: &str) -> DirectoryEntry {
        DirectoryEntry::new("", account, name)
    }

    #[tokio::test]
    async fn test_create_assigns_ids() {
        let backend = MockDirectoryBackend::new();
        let a = backend.create_user(&entry("acc-1", "Ada")).await.unwrap();
        let b = backend.create_user(&entry("acc-2", "Bo")).await.unwrap();
        assert_eq!(a.id, "doc-1");
        assert_eq!(b.id, "doc-2");
        assert_eq!(backend.documents().len(), 2);
    }

    #[tokio::test]
    async fn test_update_keeps_storage_id() {
        let backend = MockDirectoryBackend::new();
        let created = backend.create_user(&entry("acc-1", "Ada")).await.unwrap();
        let updated = backend
            .update_user(&AccountId::new("acc-1"), &entry("acc-1", "Ada L."))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Ada L.");
    }

    #[tokio::test]
    async fn test_update_unknown_account() {
        let backend = MockDirectoryBackend::new();
        let result = backend
            .update_user(&AccountId::new("ghost"), &entry("ghost", "G"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let backend = MockDirectoryBackend::new();
        let err = backend.delete_user(&EntryId::new("nope")).await.unwrap_err();
        assert!(matches!(err, ContractError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let backend = MockDirectoryBackend::new();
        backend.fail_next(MockOp::List, 2);
        assert!(backend.list_users(&[]).await.is_err());
        assert!(backend.list_users(&[]).await.is_err());
        assert!(backend.list_users(&[]).await.is_ok());
        assert_eq!(backend.call_count(MockOp::List), 3);
    }

    #[tokio::test]
    async fn test_records_queries() {
        let backend = MockDirectoryBackend::new();
        let queries = vec![Query::limit(10)];
        backend.list_users(&queries).await.unwrap();
        assert_eq!(backend.recorded_queries(), vec![queries]);
    }

    #[tokio::test]
    async fn test_subscribers_see_writes() {
        let backend = MockDirectoryBackend::new();
        let mut rx = backend.subscribe(8);
        let created = backend.create_user(&entry("acc-1", "Ada")).await.unwrap();
        backend.delete_user(&created.id).await.unwrap();

        let first = rx.recv().await.unwrap().decode().unwrap();
        assert_eq!(first.kind, EventKind::Create);
        let second = rx.recv().await.unwrap().decode().unwrap();
        assert_eq!(second.kind, EventKind::Delete);
        assert_eq!(second.entry.id, created.id);
    }
}
