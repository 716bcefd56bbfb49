//! Reduced single-attribute tracking: a flat `path -> hash` map of matching files.

use std::collections::BTreeMap;

use super::NodeSink;
use crate::hash::NodeHash;

/// Records content hashes of files whose name ends with one extension, ignoring
/// hierarchy and every other file.
#[derive(Debug, Clone)]
pub struct FlatCollector {
    suffix: String,
    records: BTreeMap<String, String>,
}

impl FlatCollector {
    /// `extension` may be given with or without its leading dot; matching ignores case.
    pub fn new(extension: &str) -> Self {
        let trimmed = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        Self {
            suffix: format!(".{trimmed}"),
            records: BTreeMap::new(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        name.to_ascii_lowercase().ends_with(&self.suffix)
    }

    pub fn records(&self) -> &BTreeMap<String, String> {
        &self.records
    }

    pub fn into_records(self) -> BTreeMap<String, String> {
        self.records
    }
}

impl NodeSink for FlatCollector {
    fn observe(&mut self, path: &[String], hash: &NodeHash) {
        let (Some(name), Some(digest)) = (path.last(), hash.digest()) else {
            return;
        };
        if self.matches(name) {
            self.records.insert(path.join("/"), digest.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn records_only_matching_files() {
        let mut collector = FlatCollector::new("FBX");
        collector.observe(&path(&["a.zip"]), &NodeHash::Content("zip".into()));
        collector.observe(&path(&["a.zip", "Models"]), &NodeHash::Directory);
        collector.observe(&path(&["a.zip", "Models", "body.fbx"]), &NodeHash::Content("h1".into()));
        collector.observe(&path(&["a.zip", "Models", "HEAD.Fbx"]), &NodeHash::Content("h2".into()));
        collector.observe(&path(&["a.zip", "readme.txt"]), &NodeHash::Content("h3".into()));

        let records = collector.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records["a.zip/Models/body.fbx"], "h1");
        assert_eq!(records["a.zip/Models/HEAD.Fbx"], "h2");
    }

    #[test]
    fn directories_named_like_the_extension_are_ignored() {
        let mut collector = FlatCollector::new(".fbx");
        collector.observe(&path(&["weird.fbx"]), &NodeHash::Directory);
        assert!(collector.records().is_empty());
    }
}
