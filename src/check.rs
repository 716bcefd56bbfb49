//! # Item Checks
//!
//! Runs the whole pipeline for one tracked item:
//!
//! 1. load the item's snapshot
//! 2. compare the download listing (cheap pre-check, may stop here)
//! 3. optionally archive newly listed downloads
//! 4. extract every download below a per-item work root, reconciling or collecting hashes
//! 5. render the change report
//! 6. save the updated snapshot
//!
//! A check that fails before step 6 leaves the stored snapshot untouched. A dry-run
//! checker runs the whole diff but skips steps 3 and 6.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::changes::{self, DiffEntry};
use crate::error::WatchError;
use crate::extract::{Extractor, FlatCollector};
use crate::fsx::{self as fs, item_key, sanitize_component};
use crate::reconcile::Reconciler;
use crate::render::ReportTree;
use crate::snapshot::{compare_listing, Listing, Snapshot, SnapshotStore};

/// What is tracked inside an item's packages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TrackingMode {
    /// The full file tree, nested archives included.
    #[default]
    Hierarchical,
    /// Only files with one extension, as a flat `path -> hash` map.
    Attribute { extension: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemSettings {
    /// Text encoding of zip entry names, e.g. `cp932`.
    pub encoding: Option<String>,
    pub show_changelog: bool,
    pub archive_new: bool,
    pub tracking: TrackingMode,
}

impl Default for ItemSettings {
    fn default() -> Self {
        Self {
            encoding: None,
            show_changelog: true,
            archive_new: false,
            tracking: TrackingMode::Hierarchical,
        }
    }
}

/// One storefront purchase being monitored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub settings: ItemSettings,
}

/// A currently obtainable file of a tracked item, already fetched to `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Download {
    pub id: String,
    pub filename: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeReport {
    pub entries: Vec<DiffEntry>,
    /// `None` when the item hides its changelog.
    pub markup: Option<String>,
    pub digest: String,
}

impl ChangeReport {
    pub fn new(entries: Vec<DiffEntry>, with_markup: bool) -> Self {
        let tree = ReportTree::from_entries(&entries);
        Self {
            markup: with_markup.then(|| tree.to_markup()),
            digest: tree.to_digest(),
            entries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    /// Whether the item's owner should hear about this check.
    pub notify: bool,
    pub report: Option<ChangeReport>,
    pub display_names: Vec<String>,
    pub previous_display_names: Vec<String>,
    pub archived: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum CheckOutcome {
    /// The listing matched the snapshot; nothing was extracted or saved.
    Unchanged,
    /// The storefront listed no downloads; nothing was saved.
    Skipped,
    Updated(UpdateReport),
}

/// Runs checks against one snapshot store.
#[derive(Debug)]
pub struct Checker<S> {
    store: S,
    work_dir: PathBuf,
    archive_dir: PathBuf,
    dry_run: bool,
}

impl<S: SnapshotStore> Checker<S> {
    pub fn new(store: S, work_dir: impl Into<PathBuf>, archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            work_dir: work_dir.into(),
            archive_dir: archive_dir.into(),
            dry_run: false,
        }
    }

    /// Reports without archiving downloads or saving snapshots.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Checks `item` against its current `downloads`, which are consumed by extraction.
    pub fn check(&self, item: &TrackedItem, downloads: &[Download]) -> Result<CheckOutcome, WatchError> {
        let previous = self.store.load(&item.id)?;
        let identifiers: Vec<String> = downloads.iter().map(|d| d.id.clone()).collect();

        match compare_listing(&previous.ordered_identifiers, &identifiers) {
            Listing::Unchanged => {
                debug!(item = %item.id, "listing unchanged");
                return Ok(CheckOutcome::Unchanged);
            }
            Listing::Empty => {
                warn!(item = %item.id, "storefront listed no downloads, skipping");
                return Ok(CheckOutcome::Skipped);
            }
            Listing::Changed => {}
        }

        let settings = &item.settings;
        let archived = if settings.archive_new && !self.dry_run {
            self.archive_new_downloads(&previous, downloads)?
        } else {
            Vec::new()
        };

        let mut updated = previous.clone();
        updated.ordered_identifiers = identifiers;
        updated.display_names = downloads.iter().map(|d| d.filename.clone()).collect();

        let (notify, report) = match &settings.tracking {
            TrackingMode::Hierarchical if !settings.show_changelog => (true, None),
            TrackingMode::Hierarchical => {
                let work = WorkRoot::create(self.work_root_for(&item.id))?;
                let extractor = Extractor::new(work.path(), settings.encoding.as_deref())?;
                let mut reconciler = Reconciler::new(&previous.root);
                for download in downloads {
                    extractor.expand(&download.path, &download.filename, &mut reconciler);
                }
                let reconciled = reconciler.finish();
                let entries = reconciled.entries();
                updated.root = reconciled.into_tree();
                (changes::has_changes(&entries), Some(ChangeReport::new(entries, true)))
            }
            TrackingMode::Attribute { extension } => {
                let work = WorkRoot::create(self.work_root_for(&item.id))?;
                let extractor = Extractor::new(work.path(), settings.encoding.as_deref())?;
                let mut collector = FlatCollector::new(extension);
                for download in downloads {
                    extractor.expand(&download.path, &download.filename, &mut collector);
                }
                let current = collector.into_records();
                let entries = changes::flat_entries(&previous.flat_hashes, &current);
                updated.flat_hashes = current;
                let notify = changes::has_changes(&entries);
                (notify, Some(ChangeReport::new(entries, settings.show_changelog)))
            }
        };

        let entries = report.as_ref().map_or(0, |r| r.entries.len());
        if self.dry_run {
            info!(item = %item.id, notify, entries, "dry run, snapshot not saved");
        } else {
            self.store.save(&item.id, &updated)?;
            info!(item = %item.id, notify, entries, "snapshot updated");
        }

        Ok(CheckOutcome::Updated(UpdateReport {
            notify,
            report,
            display_names: updated.display_names,
            previous_display_names: previous.display_names,
            archived,
        }))
    }

    fn work_root_for(&self, item_id: &str) -> PathBuf {
        self.work_dir.join(item_key(item_id))
    }

    /// Copies downloads absent from the previous listing into a timestamped folder.
    fn archive_new_downloads(&self, previous: &Snapshot, downloads: &[Download]) -> Result<Vec<PathBuf>, WatchError> {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        let folder = self.archive_dir.join(stamp);
        let mut archived = Vec::new();

        for download in downloads.iter().filter(|d| !previous.ordered_identifiers.contains(&d.id)) {
            fs::create_dir_all(&folder).map_err(WatchError::io(&folder))?;
            let target = folder.join(sanitize_component(&download.filename));
            fs::copy(&download.path, &target).map_err(WatchError::io(&download.path))?;
            info!(download = %download.id, path = %target.display(), "archived new download");
            archived.push(target);
        }
        Ok(archived)
    }
}

/// Per-item scratch directory, removed when dropped.
struct WorkRoot {
    path: PathBuf,
}

impl WorkRoot {
    /// Clears anything left over from an interrupted check before handing out the path.
    fn create(path: PathBuf) -> Result<Self, WatchError> {
        if path.exists() {
            fs::remove_dir_all(&path).map_err(WatchError::io(&path))?;
        }
        fs::create_dir_all(&path).map_err(WatchError::io(&path))?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkRoot {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!(path = %self.path.display(), error = %e, "work root cleanup failed");
            }
        }
    }
}
