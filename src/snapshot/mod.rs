//! # Snapshots
//!
//! A [`Snapshot`] is the persisted record of what was last observed for one tracked item:
//! the download listing, the names shown to users, the reconciled file tree and, for
//! reduced single-attribute tracking, a flat `path -> hash` map.
//!
//! Snapshots are plain values. A check loads one, derives an updated copy through a diff
//! pass and hands it back to the [`SnapshotStore`] for persistence; nothing is shared
//! between items.

pub mod store;

pub use store::{JsonSnapshotStore, SnapshotStore};

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::hash::NodeHash;

/// Classification of a node during one diff pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Unchanged,
    Added,
    Deleted,
    Changed,
    Renamed,
}

impl Status {
    /// Human-readable tag appended to rendered labels; `None` for unchanged nodes.
    pub fn tag(self) -> Option<&'static str> {
        match self {
            Status::Unchanged => None,
            Status::Added => Some("Added"),
            Status::Deleted => Some("Deleted"),
            Status::Changed => Some("Changed"),
            Status::Renamed => Some("Renamed"),
        }
    }
}

/// Children of a node, keyed by name, in discovery order.
pub type Tree = IndexMap<String, Node>;

/// One file-system entry inside a package tree.
///
/// A node that was a nested archive keeps the content hash of the archive itself and also
/// holds the expanded children; directories carry [`NodeHash::Directory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub hash: NodeHash,
    #[serde(default, rename = "files", skip_serializing_if = "IndexMap::is_empty")]
    pub children: Tree,

    // --- transient diff state, never persisted ---
    #[serde(skip)]
    pub status: Status,
    #[serde(skip)]
    pub renamed_from: Option<String>,
    /// Set on a Deleted node whose hash was claimed by a rename elsewhere.
    #[serde(skip)]
    pub superseded: bool,
}

impl Node {
    pub fn new(hash: NodeHash, status: Status) -> Self {
        Self {
            hash,
            children: Tree::new(),
            status,
            renamed_from: None,
            superseded: false,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.hash.is_directory()
    }

    /// Display label: the name, or `old → new` for a rename.
    pub fn label(&self, name: &str) -> String {
        match (&self.status, &self.renamed_from) {
            (Status::Renamed, Some(old)) => format!("{old} → {name}"),
            _ => name.to_string(),
        }
    }

    /// Clears transient diff state on this node only.
    pub fn reset_status(&mut self) {
        self.status = Status::Unchanged;
        self.renamed_from = None;
        self.superseded = false;
    }
}

/// Looks up the node at `path` (a chain of names from the root).
pub fn node_at<'a>(tree: &'a Tree, path: &[String]) -> Option<&'a Node> {
    let (first, rest) = path.split_first()?;
    let mut node = tree.get(first)?;
    for part in rest {
        node = node.children.get(part)?;
    }
    Some(node)
}

/// Mutable variant of [`node_at`].
pub fn node_at_mut<'a>(tree: &'a mut Tree, path: &[String]) -> Option<&'a mut Node> {
    let (first, rest) = path.split_first()?;
    let mut node = tree.get_mut(first)?;
    for part in rest {
        node = node.children.get_mut(part)?;
    }
    Some(node)
}

/// Persisted per-item record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Opaque download identifiers, in listing order.
    #[serde(rename = "identifiers")]
    pub ordered_identifiers: Vec<String>,
    /// File names shown to end users.
    #[serde(rename = "display-names")]
    pub display_names: Vec<String>,
    /// Last reconciled package tree.
    #[serde(rename = "tree")]
    pub root: Tree,
    /// Reduced-mode `path -> hash` map, independent of `root`.
    #[serde(rename = "flat-hashes")]
    pub flat_hashes: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.ordered_identifiers.is_empty() && self.root.is_empty() && self.flat_hashes.is_empty()
    }
}

/// Outcome of the cheap listing pre-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    /// Same length and same first/last identifiers: skip extraction entirely.
    Unchanged,
    /// Something in the listing differs.
    Changed,
    /// The listing differs but the storefront returned nothing; treated as unreliable.
    Empty,
}

/// Compares the previously recorded identifier list with the current one using only the
/// length and the first and last elements.
pub fn compare_listing(previous: &[String], current: &[String]) -> Listing {
    let same = previous.len() == current.len() && previous.first() == current.first() && previous.last() == current.last();
    if same {
        Listing::Unchanged
    } else if current.is_empty() {
        Listing::Empty
    } else {
        Listing::Changed
    }
}
