//! # Directory Sync
//!
//! Keeps a local mirror of the remote user directory and derives the
//! "nearby" view from it.
//!
//! - `SnapshotLoader`: one-shot fetch of the full directory
//! - `ReconcilingCache`: applies real-time create/update/delete
//! - `ProximityFilter`: haversine radius gate, fail-closed without a location
//! - `DirectorySession`: observable state, serialized writes, subscription loop
//!
//! ## Example
//!
//! ```ignore
//! use directory_sync::{DirectorySession, MockDirectoryBackend};
//!
//! let backend = Arc::new(MockDirectoryBackend::new());
//! let session = DirectorySession::new(backend, &config);
//! session.initialize().await?;
//! session.update_current_location(Coordinate::new(51.04, -114.07)).await?;
//!
//! for entry in session.state().visible.iter() {
//!     println!("{}", entry.name);
//! }
//! ```

mod cache;
mod geo;
mod loader;
mod mock;
mod proximity;
pub mod retry;
mod session;

pub use cache::{Applied, ReconcilingCache, ViewQuery};
pub use geo::{haversine_distance, EARTH_RADIUS_METERS};
pub use loader::SnapshotLoader;
pub use mock::{MockConfig, MockDirectoryBackend, MockOp, DEFAULT_MOCK_CHANNEL};
pub use proximity::ProximityFilter;
pub use retry::retry;
pub use session::{DirectorySession, DirectoryState, SessionRunStats};

pub use contracts::{
    ChangeEvent, Coordinate, DeletePolicy, DirectoryBackend, DirectoryEntry, EventKind, Query,
    RealtimeMessage,
};
