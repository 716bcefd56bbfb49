//! Bounded worker pool for check cycles.
//!
//! Every job runs start to finish on one pool thread. Items share nothing but the snapshot
//! store, whose per-item files never overlap, so no coordination is needed between jobs.

use std::collections::HashSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn};

use crate::check::{CheckOutcome, Checker, Download, TrackedItem};
use crate::error::WatchError;
use crate::progress::{CycleProgress, CycleSummary, ItemResult};
use crate::snapshot::SnapshotStore;

/// One item to check together with its current downloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckJob {
    pub item: TrackedItem,
    #[serde(default)]
    pub downloads: Vec<Download>,
}

/// Result of one job; errors are flattened to their message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobResult {
    Done { item: String, outcome: CheckOutcome },
    Failed { item: String, error: String },
}

impl JobResult {
    pub fn item(&self) -> &str {
        match self {
            JobResult::Done { item, .. } | JobResult::Failed { item, .. } => item,
        }
    }
}

/// Runs every job on a pool of `max_workers` threads (`0` = one per CPU).
///
/// Only the first job for a given item id is kept. Results come back in job order.
pub fn run_cycle<S: SnapshotStore>(
    checker: &Checker<S>,
    jobs: Vec<CheckJob>,
    max_workers: usize,
) -> Result<(Vec<JobResult>, CycleSummary), WatchError> {
    let num_workers = if max_workers == 0 { num_cpus::get() } else { max_workers };

    let mut seen = HashSet::new();
    let jobs: Vec<CheckJob> = jobs
        .into_iter()
        .filter(|job| {
            let fresh = seen.insert(job.item.id.clone());
            if !fresh {
                warn!(item = %job.item.id, "duplicate job for item in one cycle, dropped");
            }
            fresh
        })
        .collect();

    info!(items = jobs.len(), workers = num_workers, "starting check cycle");
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_workers)
        .thread_name(|i| format!("check-worker-{i}"))
        .build()?;
    let progress = CycleProgress::new(jobs.len());

    let results = pool.install(|| jobs.par_iter().map(|job| run_job(checker, job, &progress)).collect::<Vec<_>>());

    let summary = progress.summary();
    info!(%summary, "check cycle finished");
    Ok((results, summary))
}

fn run_job<S: SnapshotStore>(checker: &Checker<S>, job: &CheckJob, progress: &CycleProgress) -> JobResult {
    let span = info_span!("item", id = %job.item.id, name = %job.item.name);
    let _entered = span.enter();

    match checker.check(&job.item, &job.downloads) {
        Ok(outcome) => {
            progress.record(match &outcome {
                CheckOutcome::Unchanged => ItemResult::Unchanged,
                CheckOutcome::Skipped => ItemResult::Skipped,
                CheckOutcome::Updated(_) => ItemResult::Updated,
            });
            JobResult::Done {
                item: job.item.id.clone(),
                outcome,
            }
        }
        Err(e) => {
            error!(error = %e, "check failed, item skipped this cycle");
            progress.record(ItemResult::Failed);
            JobResult::Failed {
                item: job.item.id.clone(),
                error: e.to_string(),
            }
        }
    }
}
