//! # Report Rendering
//!
//! Rebuilds a nested report from an ordered change list using nothing but each entry's
//! depth, then renders it as an HTML list fragment and as a plain-text digest.
//!
//! Statuses travel as data from the reconciler to the final string; nothing here ever
//! reads a status back out of rendered text.

use std::fmt::Write as _;

use html_escape::encode_text;
use serde::Serialize;

use crate::changes::DiffEntry;
use crate::snapshot::Status;

const COLOR_ADDED: &str = "rgb(125, 164, 68)";
const COLOR_DELETED: &str = "rgb(252, 101, 89)";
const COLOR_CHANGED: &str = "rgb(128, 161, 209)";
const COLOR_NEUTRAL: &str = "rgb(255, 255, 255)";

fn color(status: Status) -> &'static str {
    match status {
        Status::Added => COLOR_ADDED,
        Status::Deleted => COLOR_DELETED,
        Status::Changed => COLOR_CHANGED,
        Status::Unchanged | Status::Renamed => COLOR_NEUTRAL,
    }
}

/// ` (Tag)` suffix, empty for unchanged context lines.
fn suffix(status: Status) -> String {
    status.tag().map(|tag| format!(" ({tag})")).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportNode {
    pub label: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ReportNode>,
}

/// Nested report reconstructed from a change list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportTree {
    pub roots: Vec<ReportNode>,
}

impl ReportTree {
    /// Files each entry under the path formed by truncating a label stack to the entry's
    /// depth. A depth that jumps more than one level is clamped to the next level down.
    /// Repeated labels at the same position merge, the later status winning.
    pub fn from_entries(entries: &[DiffEntry]) -> Self {
        let mut tree = Self::default();
        let mut stack: Vec<usize> = Vec::new();

        for entry in entries {
            stack.truncate(entry.depth);
            let level = level_mut(&mut tree.roots, &stack);
            let index = match level.iter().position(|n| n.label == entry.label) {
                Some(index) => {
                    level[index].status = entry.status;
                    index
                }
                None => {
                    level.push(ReportNode {
                        label: entry.label.clone(),
                        status: entry.status,
                        children: Vec::new(),
                    });
                    level.len() - 1
                }
            };
            stack.push(index);
        }
        tree
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Nested `<ul>`/`<li>` fragment, one colored span per node.
    pub fn to_markup(&self) -> String {
        let mut html = String::new();
        write_markup(&self.roots, &mut html);
        html
    }

    /// One `label (Tag)` line per changed node, unchanged context omitted.
    pub fn to_digest(&self) -> String {
        let mut text = String::new();
        write_digest(&self.roots, &mut text);
        text
    }

    /// Flattens the report back into an ordered change list.
    pub fn to_entries(&self) -> Vec<DiffEntry> {
        let mut entries = Vec::new();
        flatten(&self.roots, 0, &mut entries);
        entries
    }
}

fn level_mut<'a>(roots: &'a mut Vec<ReportNode>, path: &[usize]) -> &'a mut Vec<ReportNode> {
    let mut level = roots;
    for &index in path {
        level = &mut level[index].children;
    }
    level
}

fn write_markup(nodes: &[ReportNode], html: &mut String) {
    html.push_str("<ul>\n");
    for node in nodes {
        let _ = write!(
            html,
            "<li><span style=\"color:{}\">{}{}</span>",
            color(node.status),
            encode_text(&node.label),
            suffix(node.status)
        );
        if node.children.is_empty() {
            html.push_str("</li>\n");
        } else {
            html.push('\n');
            write_markup(&node.children, html);
            html.push_str("</li>\n");
        }
    }
    html.push_str("</ul>\n");
}

fn write_digest(nodes: &[ReportNode], text: &mut String) {
    for node in nodes {
        if node.status != Status::Unchanged {
            let _ = writeln!(text, "{}{}", node.label, suffix(node.status));
        }
        write_digest(&node.children, text);
    }
}

fn flatten(nodes: &[ReportNode], depth: usize, out: &mut Vec<DiffEntry>) {
    for node in nodes {
        out.push(DiffEntry::new(depth, node.label.clone(), node.status));
        flatten(&node.children, depth + 1, out);
    }
}

/// Wraps a markup fragment in a standalone page.
pub fn changelog_page(title: &str, markup: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>body {{ background: #2b2d31; color: #dbdee1; font-family: sans-serif; }}</style>\n\
         </head>\n<body>\n{markup}</body>\n</html>\n",
        title = encode_text(title),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(depth: usize, label: &str, status: Status) -> DiffEntry {
        DiffEntry::new(depth, label, status)
    }

    /// Reads `(depth, text)` pairs back out of rendered markup by counting open lists.
    fn parse_markup(html: &str) -> Vec<(usize, String)> {
        let mut depth = 0usize;
        let mut items = Vec::new();
        for line in html.lines() {
            if line == "<ul>" {
                depth += 1;
            } else if line == "</ul>" {
                depth -= 1;
            } else if let Some(rest) = line.strip_prefix("<li><span style=\"color:") {
                let start = rest.find("\">").unwrap() + 2;
                let end = rest.find("</span>").unwrap();
                items.push((depth - 1, rest[start..end].to_string()));
            }
        }
        items
    }

    fn sample() -> Vec<DiffEntry> {
        vec![
            e(0, "pkg.zip", Status::Changed),
            e(1, "Models", Status::Unchanged),
            e(2, "body.fbx", Status::Changed),
            e(2, "hair.fbx", Status::Added),
            e(1, "old.txt", Status::Deleted),
            e(0, "readme.txt → notes.txt", Status::Renamed),
        ]
    }

    #[test]
    fn markup_round_trips_depths() {
        let entries = sample();
        let markup = ReportTree::from_entries(&entries).to_markup();
        let expected: Vec<(usize, String)> = entries
            .iter()
            .map(|entry| (entry.depth, format!("{}{}", encode_text(&entry.label), suffix(entry.status))))
            .collect();
        assert_eq!(parse_markup(&markup), expected);
    }

    #[test]
    fn entries_round_trip_through_the_tree() {
        let entries = sample();
        assert_eq!(ReportTree::from_entries(&entries).to_entries(), entries);
    }

    #[test]
    fn markup_colors_and_tags() {
        let markup = ReportTree::from_entries(&sample()).to_markup();
        assert!(markup.starts_with("<ul>\n<li><span style=\"color:rgb(128, 161, 209)\">pkg.zip (Changed)</span>\n<ul>\n"));
        assert!(markup.contains("<li><span style=\"color:rgb(255, 255, 255)\">Models</span>\n"));
        assert!(markup.contains("<li><span style=\"color:rgb(125, 164, 68)\">hair.fbx (Added)</span></li>\n"));
        assert!(markup.contains("<li><span style=\"color:rgb(252, 101, 89)\">old.txt (Deleted)</span></li>\n"));
        assert!(markup.contains("readme.txt → notes.txt (Renamed)</span></li>\n"));
        assert!(markup.ends_with("</ul>\n"));
    }

    #[test]
    fn digest_skips_context_lines() {
        let digest = ReportTree::from_entries(&sample()).to_digest();
        assert_eq!(
            digest,
            "pkg.zip (Changed)\nbody.fbx (Changed)\nhair.fbx (Added)\nold.txt (Deleted)\nreadme.txt → notes.txt (Renamed)\n"
        );
    }

    #[test]
    fn labels_are_escaped_and_parentheses_survive() {
        let entries = vec![e(0, "<b>&(final) (Added)", Status::Changed)];
        let tree = ReportTree::from_entries(&entries);
        assert!(tree.to_markup().contains("&lt;b&gt;&amp;(final) (Added) (Changed)"));
        assert_eq!(tree.to_entries()[0].status, Status::Changed);
        assert_eq!(tree.to_entries()[0].label, "<b>&(final) (Added)");
    }

    #[test]
    fn repeated_labels_merge_and_deep_jumps_clamp() {
        let entries = vec![
            e(0, "dir", Status::Unchanged),
            e(1, "a", Status::Added),
            e(0, "dir", Status::Changed),
            e(3, "deep", Status::Added),
        ];
        let tree = ReportTree::from_entries(&entries);
        assert_eq!(tree.roots.len(), 1);
        assert_eq!(tree.roots[0].status, Status::Changed);
        let labels: Vec<_> = tree.roots[0].children.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "deep"]);
    }

    #[test]
    fn empty_list_renders_an_empty_fragment() {
        let tree = ReportTree::from_entries(&[]);
        assert!(tree.is_empty());
        assert_eq!(tree.to_markup(), "<ul>\n</ul>\n");
        assert_eq!(tree.to_digest(), "");
    }

    #[test]
    fn page_wraps_fragment() {
        let page = changelog_page("Item <1>", "<ul>\n</ul>\n");
        assert!(page.contains("<title>Item &lt;1&gt;</title>"));
        assert!(page.contains("<body>\n<ul>\n</ul>\n</body>"));
    }
}
