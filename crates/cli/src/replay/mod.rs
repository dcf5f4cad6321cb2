//! Fixture replay module.

mod driver;
mod fixture;
mod stats;

pub use driver::{Replay, ReplayConfig, ReplayOutcome};
pub use fixture::Fixture;
pub use stats::{ReplayStats, StatsReport};
