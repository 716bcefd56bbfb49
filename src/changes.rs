//! Ordered change lists derived from a reconciled tree or from two flat hash maps.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::snapshot::{Status, Tree};

/// One line of a change report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    pub depth: usize,
    pub label: String,
    pub status: Status,
}

impl DiffEntry {
    pub fn new(depth: usize, label: impl Into<String>, status: Status) -> Self {
        Self {
            depth,
            label: label.into(),
            status,
        }
    }
}

/// Projects a reconciled tree into its pre-order change list.
///
/// Unchanged nodes only appear as context for changes beneath them, which keeps every
/// entry at most one level deeper than the entry before it. Deleted subtrees are reported
/// by their root alone.
pub fn build_entries(root: &Tree) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    walk(root, 0, &mut entries);
    entries
}

fn walk(tree: &Tree, depth: usize, out: &mut Vec<DiffEntry>) {
    for (name, node) in tree {
        match node.status {
            Status::Deleted => {
                if !node.superseded {
                    out.push(DiffEntry::new(depth, name.as_str(), Status::Deleted));
                }
            }
            Status::Unchanged => {
                let mut below = Vec::new();
                walk(&node.children, depth + 1, &mut below);
                if !below.is_empty() {
                    out.push(DiffEntry::new(depth, name.as_str(), Status::Unchanged));
                    out.append(&mut below);
                }
            }
            status => {
                out.push(DiffEntry::new(depth, node.label(name), status));
                walk(&node.children, depth + 1, out);
            }
        }
    }
}

/// Compares two reduced-mode `path -> hash` maps.
///
/// Entries are all at depth 0 and grouped Added, Changed, Deleted; each group is sorted
/// by path.
pub fn flat_entries(previous: &BTreeMap<String, String>, current: &BTreeMap<String, String>) -> Vec<DiffEntry> {
    let mut added = Vec::new();
    let mut changed = Vec::new();
    for (path, hash) in current {
        match previous.get(path) {
            None => added.push(path),
            Some(old) if old != hash => changed.push(path),
            Some(_) => {}
        }
    }
    let deleted = previous.keys().filter(|path| !current.contains_key(*path));

    // BTreeMap iteration is already sorted, so each group comes out in path order.
    added
        .into_iter()
        .map(|p| DiffEntry::new(0, p.as_str(), Status::Added))
        .chain(changed.into_iter().map(|p| DiffEntry::new(0, p.as_str(), Status::Changed)))
        .chain(deleted.map(|p| DiffEntry::new(0, p.as_str(), Status::Deleted)))
        .collect()
}

/// Whether a change list reports anything beyond context lines.
pub fn has_changes(entries: &[DiffEntry]) -> bool {
    entries.iter().any(|e| e.status != Status::Unchanged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::NodeHash;
    use crate::snapshot::Node;

    fn node(status: Status) -> Node {
        Node::new(NodeHash::Content(format!("{status:?}")), status)
    }

    fn flat(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn shape(entries: &[DiffEntry]) -> Vec<(usize, &str, Status)> {
        entries.iter().map(|e| (e.depth, e.label.as_str(), e.status)).collect()
    }

    #[test]
    fn unchanged_ancestors_are_kept_only_as_context() {
        let mut inner = Node::new(NodeHash::Directory, Status::Unchanged);
        inner.children.insert("same.txt".into(), node(Status::Unchanged));
        inner.children.insert("new.txt".into(), node(Status::Added));
        let mut quiet = Node::new(NodeHash::Directory, Status::Unchanged);
        quiet.children.insert("still.txt".into(), node(Status::Unchanged));
        let mut pkg = node(Status::Unchanged);
        pkg.children.insert("Inner".into(), inner);
        pkg.children.insert("Quiet".into(), quiet);

        let mut root = Tree::new();
        root.insert("pkg.zip".into(), pkg);

        assert_eq!(
            shape(&build_entries(&root)),
            vec![(0, "pkg.zip", Status::Unchanged), (1, "Inner", Status::Unchanged), (2, "new.txt", Status::Added)]
        );
    }

    #[test]
    fn deleted_subtrees_report_only_their_root() {
        let mut gone = Node::new(NodeHash::Directory, Status::Deleted);
        gone.children.insert("child.txt".into(), node(Status::Deleted));
        let mut superseded = node(Status::Deleted);
        superseded.superseded = true;

        let mut root = Tree::new();
        root.insert("Gone".into(), gone);
        root.insert("old.txt".into(), superseded);

        assert_eq!(shape(&build_entries(&root)), vec![(0, "Gone", Status::Deleted)]);
    }

    #[test]
    fn depths_never_skip_a_level() {
        let mut c = Node::new(NodeHash::Directory, Status::Unchanged);
        c.children.insert("leaf".into(), node(Status::Changed));
        let mut b = Node::new(NodeHash::Directory, Status::Unchanged);
        b.children.insert("c".into(), c);
        let mut a = Node::new(NodeHash::Directory, Status::Added);
        a.children.insert("b".into(), b);
        let mut root = Tree::new();
        root.insert("a".into(), a);
        root.insert("z".into(), node(Status::Added));

        let entries = build_entries(&root);
        let mut previous = 0;
        for entry in &entries {
            assert!(entry.depth <= previous + 1);
            previous = entry.depth;
        }
        assert_eq!(entries.len(), 5);
    }

    #[test]
    fn reduced_mode_reports_new_attribute_file() {
        let previous = flat(&[("a/x.fbx", "H1")]);
        let current = flat(&[("a/x.fbx", "H1"), ("a/y.fbx", "H9")]);
        let entries = flat_entries(&previous, &current);
        assert_eq!(entries, vec![DiffEntry::new(0, "a/y.fbx", Status::Added)]);
        assert!(has_changes(&entries));
    }

    #[test]
    fn reduced_mode_groups_and_sorts() {
        let previous = flat(&[("b.fbx", "1"), ("a.fbx", "1"), ("d.fbx", "1"), ("c.fbx", "1")]);
        let current = flat(&[("b.fbx", "2"), ("a.fbx", "2"), ("z.fbx", "1"), ("y.fbx", "1")]);
        assert_eq!(
            shape(&flat_entries(&previous, &current)),
            vec![
                (0, "y.fbx", Status::Added),
                (0, "z.fbx", Status::Added),
                (0, "a.fbx", Status::Changed),
                (0, "b.fbx", Status::Changed),
                (0, "c.fbx", Status::Deleted),
                (0, "d.fbx", Status::Deleted),
            ]
        );
    }

    #[test]
    fn context_lines_alone_are_not_changes() {
        assert!(!has_changes(&[]));
        assert!(!has_changes(&[DiffEntry::new(0, "dir", Status::Unchanged)]));
        assert!(has_changes(&[DiffEntry::new(0, "a → b", Status::Renamed)]));
    }
}
