//! Per-operation timing, an optional observability side channel.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

/// Accumulated time for one named operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimingEntry {
    pub total: Duration,
    pub count: u64,
}

/// Mark-start/mark-end timers keyed by operation name.
///
/// Nothing here can fail: an unmatched `mark_end` is logged and ignored.
#[derive(Debug, Default)]
pub struct Timings {
    open: HashMap<String, Vec<Instant>>,
    totals: BTreeMap<String, TimingEntry>,
}

impl Timings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_start(&mut self, operation: &str) {
        self.open
            .entry(operation.to_string())
            .or_default()
            .push(Instant::now());
    }

    pub fn mark_end(&mut self, operation: &str) {
        let Some(started) = self.open.get_mut(operation).and_then(Vec::pop) else {
            debug!(operation, "mark_end without a matching mark_start");
            return;
        };
        let elapsed = started.elapsed();
        trace!(operation, elapsed_us = elapsed.as_micros() as u64, "timing");
        let entry = self.totals.entry(operation.to_string()).or_default();
        entry.total += elapsed;
        entry.count += 1;
    }

    pub fn get(&self, operation: &str) -> Option<TimingEntry> {
        self.totals.get(operation).copied()
    }

    /// Completed operations, sorted by name.
    pub fn entries(&self) -> impl Iterator<Item = (&str, TimingEntry)> + '_ {
        self.totals.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
