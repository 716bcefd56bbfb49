//! # parcelwatch Core Library
//!
//! Detects what changed in the downloadable files of storefront purchases between two
//! checks. Downloads are expanded recursively (zip, tar family and asset bundles, nested
//! to any depth), every node is hashed, and the result is reconciled against the last
//! stored snapshot into Added, Deleted, Changed and Renamed entries.
//!
//! ## Key Modules
//!
//! - [`extract`]: recursive expansion of downloads into a per-item work root.
//! - [`reconcile`]: the mark/reconcile diff pass over a snapshot tree.
//! - [`changes`] and [`render`]: ordered change lists and their HTML and text forms.
//! - [`check`]: the per-item pipeline tying the above to a [`snapshot::SnapshotStore`].
//! - [`workers`]: the bounded pool that runs a cycle of checks.
//!
//! ## Examples
//!
//! ```no_run
//! use parcelwatch::check::{Checker, Download, ItemSettings, TrackedItem};
//! use parcelwatch::snapshot::JsonSnapshotStore;
//!
//! let checker = Checker::new(JsonSnapshotStore::new("./version"), "./process", "./archive");
//! let item = TrackedItem { id: "4242".into(), name: "Avatar".into(), settings: ItemSettings::default() };
//! let downloads = vec![Download { id: "1".into(), filename: "avatar.zip".into(), path: "./downloads/avatar.zip".into() }];
//! let outcome = checker.check(&item, &downloads)?;
//! # Ok::<(), parcelwatch::error::WatchError>(())
//! ```

pub mod archive;
pub mod changes;
pub mod check;
pub mod cli;
pub mod cli_runner;
pub mod config;
pub mod error;
pub mod extract;
pub mod hash;
pub mod logging;
pub mod progress;
pub mod reconcile;
pub mod render;
pub mod snapshot;
pub mod workers;

// Cross-platform filesystem wrapper
pub mod fsx;

pub use error::WatchError;
