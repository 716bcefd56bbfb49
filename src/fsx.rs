//! Filesystem wrapper used by the extractor.
//!
//! Re-exports `std::fs` so call-sites can `use crate::fsx as fs;` and adds the few
//! helpers extraction needs on top of it: moves that survive crossing a device boundary,
//! immediate-children listing in discovery order, and [`WorkingPath`], the per-node
//! scratch location whose release runs from a scope guard on every exit path.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::WatchError;

pub use std::fs::*;

/// Moves `from` to `to`, falling back to copy + remove when a rename is not possible
/// (for example across filesystems). Moving a path onto itself is a no-op.
pub fn move_path(from: &Path, to: &Path) -> Result<(), WatchError> {
    if from == to {
        return Ok(());
    }
    if let Some(parent) = to.parent() {
        create_dir_all(parent).map_err(WatchError::io(parent))?;
    }
    match rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) if from.is_dir() => {
            copy_tree(from, to)?;
            remove_dir_all(from).map_err(WatchError::io(from))
        }
        Err(_) => {
            copy(from, to).map_err(WatchError::io(to))?;
            remove_file(from).map_err(WatchError::io(from))
        }
    }
}

/// Copies a directory tree, creating `to` and any missing directories below it.
pub fn copy_tree(from: &Path, to: &Path) -> Result<(), WatchError> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| WatchError::Io {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| from.to_path_buf()),
            source: e.into(),
        })?;
        let rel = entry.path().strip_prefix(from).map_err(|_| WatchError::Io {
            source: io::Error::new(io::ErrorKind::Other, "walked outside of source tree"),
            path: entry.path().to_path_buf(),
        })?;
        let target = to.join(rel);
        if entry.file_type().is_dir() {
            create_dir_all(&target).map_err(WatchError::io(&target))?;
        } else {
            copy(entry.path(), &target).map_err(WatchError::io(&target))?;
        }
    }
    Ok(())
}

/// Lists the immediate children of `dir` as `(name, path)` pairs, sorted by name.
/// The listing is collected up front so callers may move or delete entries while
/// iterating the result.
pub fn list_children(dir: &Path) -> Result<Vec<(String, PathBuf)>, WatchError> {
    let mut children = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| WatchError::Io {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        children.push((name, entry.into_path()));
    }
    Ok(children)
}

/// Turns a declared name into a single safe path component.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Encodes an item identifier as a single path component, distinct ids giving distinct
/// components. `%`, separators and NUL are percent-escaped, as are all-dot names.
pub fn item_key(id: &str) -> String {
    if id.is_empty() {
        return "%".to_string();
    }
    if id.chars().all(|c| c == '.') {
        return "%2E".repeat(id.len());
    }
    let mut key = String::with_capacity(id.len());
    for c in id.chars() {
        match c {
            '%' => key.push_str("%25"),
            '/' => key.push_str("%2F"),
            '\\' => key.push_str("%5C"),
            '\0' => key.push_str("%00"),
            _ => key.push(c),
        }
    }
    key
}

/// How a [`WorkingPath`] is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    /// A single file, or a directory that is removed only once empty.
    Entry,
    /// An extraction directory, removed recursively.
    Tree,
}

/// Scratch location for one node while it is being processed.
#[derive(Debug)]
pub struct WorkingPath {
    pub path: PathBuf,
    pub cleanup: Cleanup,
}

impl WorkingPath {
    pub fn new(path: PathBuf) -> Self {
        Self { path, cleanup: Cleanup::Entry }
    }

    /// Removes the working path according to its cleanup mode. Never fails: anything
    /// left behind is logged and later swept away with the item's work root.
    pub fn release(self) {
        let result = match self.cleanup {
            Cleanup::Tree => remove_dir_all(&self.path),
            Cleanup::Entry if self.path.is_dir() => remove_dir(&self.path),
            Cleanup::Entry => remove_file(&self.path),
        };
        match result {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => debug!(path = %self.path.display(), error = %e, "working path not released"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn move_path_moves_files_and_dirs() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.txt");
        write(&src, b"a").unwrap();
        let dst = dir.path().join("nested/deeper/a.txt");
        move_path(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(read(&dst).unwrap(), b"a");

        let src_dir = dir.path().join("tree");
        create_dir_all(src_dir.join("inner")).unwrap();
        write(src_dir.join("inner/b.txt"), b"b").unwrap();
        let dst_dir = dir.path().join("moved");
        move_path(&src_dir, &dst_dir).unwrap();
        assert_eq!(read(dst_dir.join("inner/b.txt")).unwrap(), b"b");
    }

    #[test]
    fn move_onto_itself_is_noop() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("same.bin");
        write(&p, b"x").unwrap();
        move_path(&p, &p).unwrap();
        assert!(p.exists());
    }

    #[test]
    fn sanitize_component_strips_separators() {
        assert_eq!(sanitize_component("a/b\\c.zip"), "a_b_c.zip");
        assert_eq!(sanitize_component(".."), "_");
        assert_eq!(sanitize_component("モデル.zip"), "モデル.zip");
    }

    #[test]
    fn item_keys_do_not_collide() {
        assert_eq!(item_key("4242"), "4242");
        assert_eq!(item_key("a/b"), "a%2Fb");
        assert_ne!(item_key("a/b"), item_key("a_b"));
        assert_ne!(item_key("a/b"), item_key("a%2Fb"));
        assert_eq!(item_key("a%2Fb"), "a%252Fb");
        assert_eq!(item_key(".."), "%2E%2E");
        assert_ne!(item_key(""), item_key("_"));
    }

    #[test]
    fn entry_release_keeps_non_empty_directories() {
        let dir = tempdir().unwrap();
        let full = dir.path().join("full");
        create_dir_all(&full).unwrap();
        write(full.join("x"), b"x").unwrap();
        WorkingPath::new(full.clone()).release();
        assert!(full.exists());

        let empty = dir.path().join("empty");
        create_dir_all(&empty).unwrap();
        WorkingPath::new(empty.clone()).release();
        assert!(!empty.exists());

        let tree = WorkingPath { path: full.clone(), cleanup: Cleanup::Tree };
        tree.release();
        assert!(!full.exists());

        // Missing paths are fine.
        WorkingPath::new(dir.path().join("never-created")).release();
    }
}
