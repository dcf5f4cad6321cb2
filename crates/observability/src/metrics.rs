//! Directory session metrics
//!
//! `metrics` facade recorders plus an in-memory aggregator for end-of-run
//! summaries.

use contracts::EventKind;
use metrics::{counter, gauge, histogram};

/// Record a snapshot load attempt
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_snapshot_load;
///
/// let started = Instant::now();
/// let entries = backend.list_users(&[]).await?;
/// record_snapshot_load(true, entries.len(), started.elapsed().as_secs_f64() * 1000.0);
/// ```
pub fn record_snapshot_load(success: bool, entries: usize, latency_ms: f64) {
    let status = if success { "success" } else { "failure" };
    counter!("orbit_directory_snapshot_loads_total", "status" => status).increment(1);
    histogram!("orbit_directory_snapshot_latency_ms").record(latency_ms);
    if success {
        gauge!("orbit_directory_snapshot_entries").set(entries as f64);
    }
}

/// Record a real-time change that reached the cache
pub fn record_event_applied(kind: EventKind, outcome: &'static str) {
    counter!(
        "orbit_directory_events_applied_total",
        "kind" => kind.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a real-time message that never reached the cache
pub fn record_event_rejected(reason: &'static str) {
    counter!("orbit_directory_events_rejected_total", "reason" => reason).increment(1);
}

/// Record cache and visible-view sizes after a state change
pub fn record_cache_size(entries: usize, visible: usize) {
    gauge!("orbit_directory_cache_entries").set(entries as f64);
    gauge!("orbit_directory_visible_entries").set(visible as f64);
}

/// Record a failed attempt inside a bounded retry
pub fn record_retry_attempt(operation: &str) {
    counter!(
        "orbit_directory_retry_attempts_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// In-memory session statistics
#[derive(Debug, Clone, Default)]
pub struct SessionMetricsAggregator {
    pub snapshot_loads: u64,
    pub failed_loads: u64,
    pub creates: u64,
    pub updates: u64,
    pub deletes: u64,
    /// Changes that left the cache untouched (policy or absent target)
    pub ignored: u64,
    pub decode_failures: u64,
    pub load_latency_ms: RunningStats,
    pub visible_entries: RunningStats,
}

impl SessionMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_load(&mut self, success: bool, latency_ms: f64) {
        if success {
            self.snapshot_loads += 1;
        } else {
            self.failed_loads += 1;
        }
        self.load_latency_ms.push(latency_ms);
    }

    /// `changed` is false when the cache ignored the event
    pub fn record_event(&mut self, kind: EventKind, changed: bool) {
        if !changed {
            self.ignored += 1;
            return;
        }
        match kind {
            EventKind::Create => self.creates += 1,
            EventKind::Update => self.updates += 1,
            EventKind::Delete => self.deletes += 1,
        }
    }

    pub fn record_decode_failure(&mut self) {
        self.decode_failures += 1;
    }

    pub fn record_visible(&mut self, count: usize) {
        self.visible_entries.push(count as f64);
    }

    pub fn summary(&self) -> MetricsSummary {
        let events = self.creates + self.updates + self.deletes + self.ignored;
        MetricsSummary {
            snapshot_loads: self.snapshot_loads,
            failed_loads: self.failed_loads,
            events_applied: self.creates + self.updates + self.deletes,
            events_ignored: self.ignored,
            decode_failures: self.decode_failures,
            ignore_rate: if events > 0 {
                self.ignored as f64 / events as f64 * 100.0
            } else {
                0.0
            },
            load_latency_ms: StatsSummary::from(&self.load_latency_ms),
            visible_entries: StatsSummary::from(&self.visible_entries),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Point-in-time summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub snapshot_loads: u64,
    pub failed_loads: u64,
    pub events_applied: u64,
    pub events_ignored: u64,
    pub decode_failures: u64,
    pub ignore_rate: f64,
    pub load_latency_ms: StatsSummary,
    pub visible_entries: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Directory Session Summary ===")?;
        writeln!(
            f,
            "Snapshot loads: {} ok, {} failed",
            self.snapshot_loads, self.failed_loads
        )?;
        writeln!(f, "Events applied: {}", self.events_applied)?;
        writeln!(
            f,
            "Events ignored: {} ({:.2}%)",
            self.events_ignored, self.ignore_rate
        )?;
        writeln!(f, "Decode failures: {}", self.decode_failures)?;
        writeln!(f, "Load latency (ms): {}", self.load_latency_ms)?;
        writeln!(f, "Visible entries: {}", self.visible_entries)?;
        Ok(())
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
