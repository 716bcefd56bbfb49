//! # Recursive Extraction
//!
//! Expands downloaded packages into a per-item work root, recursing through nested
//! archives and directories, and reports every node it discovers to a [`NodeSink`].
//!
//! Every node gets a working path (`<work root>/<declared name>/<child>/...`). Nested
//! entries are expanded in place: a child already lives at its working path, so an inner
//! archive is moved aside to a staging file and its directory is created where the file
//! used to be. Each working path is released by a scope guard on every exit path:
//!
//! - expanded archives: removed recursively
//! - plain directories: removed once empty
//! - everything else: the single working file is removed
//!
//! A failure on one node is logged and only that subtree is abandoned; siblings carry on.
//! The extractor consumes its inputs: top-level sources are moved into the work root.

mod flat;

pub use flat::FlatCollector;

use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use tracing::{debug, error, warn};

use crate::archive;
use crate::error::WatchError;
use crate::fsx::{self as fs, sanitize_component, Cleanup, WorkingPath};
use crate::hash::NodeHash;

/// Receives nodes in pre-order (parents before their children) as they are extracted.
pub trait NodeSink {
    /// `path` is the chain of names from the declared top-level file down to this node.
    fn observe(&mut self, path: &[String], hash: &NodeHash);
}

/// Recursive extractor bound to one item's work root.
#[derive(Debug)]
pub struct Extractor {
    work_root: PathBuf,
    encoding: Option<&'static Encoding>,
}

impl Extractor {
    /// Creates an extractor writing below `work_root`, which must be private to one item.
    ///
    /// `encoding_hint` names the text encoding used for archive entry names. An unknown
    /// label is logged and ignored.
    pub fn new(work_root: impl Into<PathBuf>, encoding_hint: Option<&str>) -> Result<Self, WatchError> {
        let work_root = work_root.into();
        fs::create_dir_all(&work_root).map_err(WatchError::io(&work_root))?;

        let encoding = encoding_hint.and_then(|label| {
            let resolved = archive::resolve_encoding(label);
            if resolved.is_none() {
                warn!(encoding = label, "unknown archive name encoding, using default decoding");
            }
            resolved
        });

        Ok(Self { work_root, encoding })
    }

    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    /// Expands the downloaded file at `source`, declared as `declared_name`, reporting every
    /// node to `sink`. Never fails: errors are logged per node.
    pub fn expand(&self, source: &Path, declared_name: &str, sink: &mut dyn NodeSink) {
        let working = self.work_root.join(sanitize_component(declared_name));
        self.expand_node(source, declared_name, &working, &[], sink);
    }

    /// Processes one node: hash, unpack into `working`, report, recurse, release.
    fn expand_node(&self, source: &Path, name: &str, working: &Path, parent: &[String], sink: &mut dyn NodeSink) {
        let mut chain = parent.to_vec();
        chain.push(name.to_string());

        let mut guard = scopeguard::guard(WorkingPath::new(working.to_path_buf()), WorkingPath::release);

        let hash = match NodeHash::of_path(source) {
            Ok(hash) => hash,
            Err(e) => {
                error!(path = %chain.join("/"), error = %e, "hashing failed, subtree skipped");
                return;
            }
        };

        let expanded = match self.unpack_into(source, name, &hash, &mut *guard) {
            Ok(expanded) => expanded,
            Err(e) => {
                error!(path = %chain.join("/"), error = %e, "extraction failed, subtree skipped");
                return;
            }
        };

        sink.observe(&chain, &hash);

        if !expanded {
            return;
        }
        let children = match fs::list_children(&guard.path) {
            Ok(children) => children,
            Err(e) => {
                error!(path = %chain.join("/"), error = %e, "listing failed, subtree skipped");
                return;
            }
        };
        for (child_name, child_path) in children {
            self.expand_node(&child_path, &child_name, &child_path, &chain, sink);
        }
    }

    /// Places `source` at the guarded working path, unpacking archives. Returns whether
    /// the working path is now a directory whose children should be visited.
    fn unpack_into(&self, source: &Path, name: &str, hash: &NodeHash, guard: &mut WorkingPath) -> Result<bool, WatchError> {
        if hash.is_directory() {
            fs::move_path(source, &guard.path)?;
            return Ok(true);
        }

        let container = archive::classify(name);
        if !container.is_archive() {
            fs::move_path(source, &guard.path)?;
            return Ok(false);
        }

        // Stage the archive bytes aside; the staged copy is deleted when `staged` drops.
        let staged = tempfile::Builder::new()
            .prefix(".staged-")
            .tempfile_in(&self.work_root)
            .map_err(WatchError::io(&self.work_root))?
            .into_temp_path();
        fs::move_path(source, &staged)?;

        guard.cleanup = Cleanup::Tree;
        fs::create_dir_all(&guard.path).map_err(WatchError::io(&guard.path))?;
        debug!(archive = name, kind = ?container, "unpacking");
        archive::unpack(container, &staged, &guard.path, self.encoding, &self.work_root)?;
        Ok(true)
    }
}

/// Collects every observed node as `(path, hash)`; handy for inspection and tests.
impl NodeSink for Vec<(Vec<String>, NodeHash)> {
    fn observe(&mut self, path: &[String], hash: &NodeHash) {
        self.push((path.to_vec(), hash.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::FileOptions;

    type Seen = Vec<(Vec<String>, NodeHash)>;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut writer = zip::ZipWriter::new(fs::File::create(path).unwrap());
        for (name, data) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    fn joined(seen: &[(Vec<String>, NodeHash)]) -> Vec<String> {
        let mut paths: Vec<String> = seen.iter().map(|(p, _)| p.join("/")).collect();
        paths.sort();
        paths
    }

    #[test]
    fn plain_file_is_hashed_and_released() {
        let downloads = tempdir().unwrap();
        let work = tempdir().unwrap();
        let src = downloads.path().join("readme.txt");
        fs::write(&src, b"hello").unwrap();

        let extractor = Extractor::new(work.path(), None).unwrap();
        let mut seen = Seen::new();
        extractor.expand(&src, "readme.txt", &mut seen);

        assert_eq!(seen, vec![(vec!["readme.txt".to_string()], NodeHash::from_bytes(b"hello"))]);
        assert!(fs::list_children(work.path()).unwrap().is_empty());
    }

    #[test]
    fn nested_archives_are_expanded_recursively() {
        let downloads = tempdir().unwrap();
        let work = tempdir().unwrap();

        let inner = downloads.path().join("inner.zip");
        write_zip(&inner, &[("deep/model.fbx", &b"mesh"[..])]);
        let inner_bytes = fs::read(&inner).unwrap();
        let outer = downloads.path().join("outer.zip");
        write_zip(&outer, &[("inner.zip", inner_bytes.as_slice()), ("notes.txt", &b"n"[..])]);
        let outer_hash = NodeHash::from_file(&outer).unwrap();

        let extractor = Extractor::new(work.path(), None).unwrap();
        let mut seen = Seen::new();
        extractor.expand(&outer, "outer.zip", &mut seen);

        assert_eq!(seen[0], (vec!["outer.zip".to_string()], outer_hash));
        assert_eq!(
            joined(&seen),
            vec![
                "outer.zip",
                "outer.zip/inner.zip",
                "outer.zip/inner.zip/deep",
                "outer.zip/inner.zip/deep/model.fbx",
                "outer.zip/notes.txt",
            ]
        );
        let deep = seen.iter().find(|(p, _)| p.len() == 3).unwrap();
        assert!(deep.1.is_directory());
        let inner_seen = seen.iter().find(|(p, _)| p.join("/") == "outer.zip/inner.zip").unwrap();
        assert_eq!(inner_seen.1, NodeHash::from_bytes(&inner_bytes));

        assert!(fs::list_children(work.path()).unwrap().is_empty(), "work root must be empty");
    }

    #[test]
    fn broken_nested_archive_does_not_stop_siblings() {
        let downloads = tempdir().unwrap();
        let work = tempdir().unwrap();
        let outer = downloads.path().join("pack.zip");
        write_zip(&outer, &[("broken.zip", &b"not a zip at all"[..]), ("ok.txt", &b"fine"[..])]);

        let extractor = Extractor::new(work.path(), None).unwrap();
        let mut seen = Seen::new();
        extractor.expand(&outer, "pack.zip", &mut seen);

        assert_eq!(joined(&seen), vec!["pack.zip", "pack.zip/ok.txt"]);
        assert!(fs::list_children(work.path()).unwrap().is_empty());
    }

    #[test]
    fn broken_top_level_archive_leaves_nothing_behind() {
        let downloads = tempdir().unwrap();
        let work = tempdir().unwrap();
        let src = downloads.path().join("bad.zip");
        fs::write(&src, b"garbage").unwrap();

        let extractor = Extractor::new(work.path(), None).unwrap();
        let mut seen = Seen::new();
        extractor.expand(&src, "bad.zip", &mut seen);

        assert!(seen.is_empty());
        assert!(fs::list_children(work.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_source_is_contained() {
        let work = tempdir().unwrap();
        let extractor = Extractor::new(work.path(), Some("cp932")).unwrap();
        let mut seen = Seen::new();
        extractor.expand(&work.path().join("nope.bin"), "nope.bin", &mut seen);
        assert!(seen.is_empty());
    }

    #[test]
    fn plain_directories_are_walked() {
        let downloads = tempdir().unwrap();
        let work = tempdir().unwrap();
        let src = downloads.path().join("Assets");
        fs::create_dir_all(src.join("Sub")).unwrap();
        fs::write(src.join("Sub/a.mat"), b"m").unwrap();

        let extractor = Extractor::new(work.path(), None).unwrap();
        let mut seen = Seen::new();
        extractor.expand(&src, "Assets", &mut seen);

        assert_eq!(joined(&seen), vec!["Assets", "Assets/Sub", "Assets/Sub/a.mat"]);
        assert!(seen[0].1.is_directory());
        assert!(fs::list_children(work.path()).unwrap().is_empty());
    }
}
