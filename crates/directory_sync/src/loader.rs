//! One-shot directory snapshot.

use std::sync::Arc;
use std::time::Instant;

use contracts::{ContractError, DirectoryBackend, DirectoryEntry, Query};
use observability::record_snapshot_load;
use tracing::{info, instrument, warn};

/// Fetches the full directory from the backend
#[derive(Debug)]
pub struct SnapshotLoader<B> {
    backend: Arc<B>,
}

impl<B> Clone for SnapshotLoader<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: DirectoryBackend> SnapshotLoader<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Fetch every entry matching `queries`, in backend order
    ///
    /// Queries are passed through untouched; `None` means no filter.
    #[instrument(
        name = "snapshot_load",
        skip(self, queries),
        fields(query_count = queries.map_or(0, <[Query]>::len))
    )]
    pub async fn load(
        &self,
        queries: Option<&[Query]>,
    ) -> Result<Vec<DirectoryEntry>, ContractError> {
        let started = Instant::now();
        let result = self.backend.list_users(queries.unwrap_or_default()).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(entries) => {
                record_snapshot_load(true, entries.len(), latency_ms);
                info!(entries = entries.len(), latency_ms, "snapshot loaded");
            }
            Err(err) => {
                record_snapshot_load(false, 0, latency_ms);
                warn!(error = %err, latency_ms, "snapshot load failed");
            }
        }
        result
    }
}
