//! Replay statistics.

use std::time::Duration;

use directory_sync::SessionRunStats;
use observability::MetricsSummary;
use serde::Serialize;

/// Statistics from a replay run
#[derive(Debug, Clone, Default)]
pub struct ReplayStats {
    /// Entries in the initial snapshot
    pub entries_loaded: usize,

    /// Subscription loop counters
    pub run: SessionRunStats,

    /// Entries in the final filtered view
    pub visible: usize,

    /// Total duration of the replay
    pub duration: Duration,

    /// Session metrics aggregator summary
    pub session: MetricsSummary,
}

impl ReplayStats {
    /// Messages handled per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.run.messages_received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Rejected messages as percentage
    pub fn reject_rate(&self) -> f64 {
        if self.run.messages_received > 0 {
            (self.run.messages_rejected as f64 / self.run.messages_received as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn report(&self) -> StatsReport {
        StatsReport {
            entries_loaded: self.entries_loaded,
            messages_received: self.run.messages_received,
            messages_rejected: self.run.messages_rejected,
            location_fixes: self.run.location_fixes,
            location_failures: self.run.location_failures,
            events_applied: self.session.events_applied,
            events_ignored: self.session.events_ignored,
            visible: self.visible,
            duration_ms: self.duration.as_secs_f64() * 1000.0,
        }
    }

    pub fn print_summary(&self) {
        println!("\n=== Replay Statistics ===\n");
        println!("Overview");
        println!("   ├─ Duration: {:.3}s", self.duration.as_secs_f64());
        println!("   ├─ Snapshot entries: {}", self.entries_loaded);
        println!("   ├─ Messages received: {}", self.run.messages_received);
        println!(
            "   ├─ Messages rejected: {} ({:.2}%)",
            self.run.messages_rejected,
            self.reject_rate()
        );
        println!("   ├─ Throughput: {:.2} msg/s", self.throughput());
        println!(
            "   ├─ Location fixes: {} ({} failed)",
            self.run.location_fixes, self.run.location_failures
        );
        println!("   └─ Visible entries: {}", self.visible);

        println!("\n{}", self.session);
    }
}

/// Serializable counters for `--json`
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub entries_loaded: usize,
    pub messages_received: u64,
    pub messages_rejected: u64,
    pub location_fixes: u64,
    pub location_failures: u64,
    pub events_applied: u64,
    pub events_ignored: u64,
    pub visible: usize,
    pub duration_ms: f64,
}
