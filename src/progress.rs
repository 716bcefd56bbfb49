//! Progress tracking for check cycles
//!
//! Workers record each finished item with a relaxed atomic increment, so the
//! counters can be shared across the pool without locking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Live counters for one cycle.
#[derive(Debug)]
pub struct CycleProgress {
    total: u64,
    checked: AtomicU64,
    updated: AtomicU64,
    unchanged: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    start_time: Instant,
}

/// How one item ended, as far as the counters are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemResult {
    Updated,
    Unchanged,
    Skipped,
    Failed,
}

impl CycleProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total: total as u64,
            checked: AtomicU64::new(0),
            updated: AtomicU64::new(0),
            unchanged: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record an item as finished
    pub fn record(&self, result: ItemResult) {
        self.checked.fetch_add(1, Ordering::Relaxed);
        let counter = match result {
            ItemResult::Updated => &self.updated,
            ItemResult::Unchanged => &self.unchanged,
            ItemResult::Skipped => &self.skipped,
            ItemResult::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn checked(&self) -> u64 {
        self.checked.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            total: self.total,
            checked: self.checked(),
            updated: self.updated.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            elapsed: self.start_time.elapsed(),
        }
    }
}

/// Snapshot of the counters at cycle end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub total: u64,
    pub checked: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub skipped: u64,
    pub failed: u64,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checked {}/{} items in {:.1}s: {} updated, {} unchanged, {} skipped, {} failed",
            self.checked,
            self.total,
            self.elapsed.as_secs_f32(),
            self.updated,
            self.unchanged,
            self.skipped,
            self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counts_from_many_threads() {
        let progress = Arc::new(CycleProgress::new(40));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let progress = Arc::clone(&progress);
                thread::spawn(move || {
                    for _ in 0..10 {
                        progress.record(if i == 0 { ItemResult::Failed } else { ItemResult::Updated });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = progress.summary();
        assert_eq!(summary.checked, 40);
        assert_eq!(summary.updated, 30);
        assert_eq!(summary.failed, 10);
        assert!(summary.to_string().starts_with("checked 40/40 items"));
    }
}
