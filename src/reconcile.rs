//! # Snapshot Reconciliation
//!
//! Classifies freshly extracted nodes against the previous snapshot tree.
//!
//! 1. **Mark**: a working copy of the previous tree is tagged Deleted throughout, and a
//!    `hash -> last seen name` correlation map is built (directories never take part).
//! 2. **Reconcile**: every observed node is looked up at the same path. Found with the
//!    same hash → Unchanged; found with a different hash → Changed (hash overwritten); not
//!    found but correlated to a differently named old node → Renamed, and the old node is
//!    marked superseded so it does not also report Deleted; otherwise → Added.
//! 3. Whatever was never revisited stays Deleted and is pruned when the reconciled tree is
//!    turned back into a persistable one.
//!
//! The previous tree is only read, so repeating a pass over the same snapshot and the same
//! observation yields the same classification.

use std::collections::HashMap;

use tracing::debug;

use crate::changes::{self, DiffEntry};
use crate::extract::NodeSink;
use crate::hash::NodeHash;
use crate::snapshot::{node_at_mut, Node, Status, Tree};

#[derive(Debug, Clone)]
struct Correlation {
    name: String,
    path: Vec<String>,
}

/// One diff pass over a tracked item's tree.
#[derive(Debug)]
pub struct Reconciler {
    working: Tree,
    correlations: HashMap<String, Correlation>,
}

impl Reconciler {
    /// Runs the mark phase over a copy of `previous`.
    pub fn new(previous: &Tree) -> Self {
        let mut working = previous.clone();
        let mut correlations = HashMap::new();
        let mut chain = Vec::new();
        mark(&mut working, &mut chain, &mut correlations);
        Self { working, correlations }
    }

    /// Reconciles one observed node. Parents must be observed before their children.
    pub fn reconcile(&mut self, path: &[String], hash: &NodeHash) -> Status {
        let Some((name, parents)) = path.split_last() else {
            return Status::Unchanged;
        };

        let mut siblings = &mut self.working;
        for part in parents {
            siblings = &mut siblings
                .entry(part.clone())
                .or_insert_with(|| Node::new(NodeHash::Directory, Status::Added))
                .children;
        }

        if let Some(node) = siblings.get_mut(name) {
            node.renamed_from = None;
            node.superseded = false;
            if node.hash == *hash {
                node.status = Status::Unchanged;
            } else {
                node.hash = hash.clone();
                node.status = Status::Changed;
            }
            return node.status;
        }

        let renamed = hash
            .digest()
            .and_then(|digest| self.correlations.get(digest))
            .filter(|old| old.name != *name)
            .cloned();

        let mut node = Node::new(hash.clone(), Status::Added);
        if let Some(old) = &renamed {
            node.status = Status::Renamed;
            node.renamed_from = Some(old.name.clone());
        }
        let status = node.status;
        siblings.insert(name.clone(), node);

        if let Some(old) = renamed {
            debug!(from = %old.path.join("/"), to = %path.join("/"), "rename detected");
            if let Some(previous) = node_at_mut(&mut self.working, &old.path) {
                previous.superseded = true;
            }
        }
        status
    }

    /// Ends the pass.
    pub fn finish(self) -> ReconciledTree {
        ReconciledTree { root: self.working }
    }
}

impl NodeSink for Reconciler {
    fn observe(&mut self, path: &[String], hash: &NodeHash) {
        self.reconcile(path, hash);
    }
}

fn mark(tree: &mut Tree, chain: &mut Vec<String>, correlations: &mut HashMap<String, Correlation>) {
    for (name, node) in tree.iter_mut() {
        chain.push(name.clone());
        node.status = Status::Deleted;
        node.renamed_from = None;
        node.superseded = false;
        if let Some(digest) = node.hash.digest() {
            correlations.insert(
                digest.to_string(),
                Correlation {
                    name: name.clone(),
                    path: chain.clone(),
                },
            );
        }
        mark(&mut node.children, chain, correlations);
        chain.pop();
    }
}

/// A fully classified tree, ready to be reported and persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledTree {
    root: Tree,
}

impl ReconciledTree {
    pub fn root(&self) -> &Tree {
        &self.root
    }

    /// The ordered change list for this pass.
    pub fn entries(&self) -> Vec<DiffEntry> {
        changes::build_entries(&self.root)
    }

    /// Drops Deleted nodes and clears all transient state, giving the tree to persist.
    pub fn into_tree(mut self) -> Tree {
        prune(&mut self.root);
        self.root
    }
}

fn prune(tree: &mut Tree) {
    tree.retain(|_, node| node.status != Status::Deleted);
    for node in tree.values_mut() {
        node.reset_status();
        prune(&mut node.children);
    }
}
