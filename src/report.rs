//! Human-readable and JSON reports of a scanned tree.

use serde::Serialize;

use crate::error::Result;
use crate::fs::{DirTree, FileKind, NodeId, ReadState, SortColumn, SortOrder, SortedBySizeIter};

/// Default number of directory levels shown below the root.
pub const DEFAULT_MAX_DEPTH: usize = 2;

/// What a report shows and in which order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub sort_column: SortColumn,
    pub sort_order: SortOrder,
    /// Children with a smaller total size are hidden.
    pub min_size: u64,
    /// Levels shown below the root; 0 shows the root only.
    pub max_depth: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            sort_column: SortColumn::TotalSize,
            sort_order: SortOrder::Descending,
            min_size: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// One node of a JSON report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportNode {
    pub name: String,
    pub kind: &'static str,
    pub own_size: u64,
    pub total_size: u64,
    pub total_blocks: u64,
    pub total_items: usize,
    pub total_files: usize,
    pub total_sub_dirs: usize,
    pub latest_mtime: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_state: Option<&'static str>,
    #[serde(skip_serializing_if = "is_false")]
    pub excluded: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub mount_point: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ReportNode>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Format file size in human-readable form.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    const TB: u64 = 1024 * GB;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Parse a size such as `4096`, `10K`, `1.5M` or `2G` (binary units).
pub fn parse_size(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim();
    let split = s
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let multiplier: u64 = match unit.to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => 1 << 10,
        "M" | "MB" | "MIB" => 1 << 20,
        "G" | "GB" | "GIB" => 1 << 30,
        "T" | "TB" | "TIB" => 1 << 40,
        other => return Err(format!("unknown size unit {other:?}")),
    };
    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid size {s:?}"))?;
    if value < 0.0 {
        return Err(format!("negative size {s:?}"));
    }
    Ok((value * multiplier as f64) as u64)
}

fn kind_label(tree: &DirTree, id: NodeId) -> &'static str {
    if tree.is_dot_entry(id) {
        return "files";
    }
    match tree.stat(id).kind() {
        FileKind::Directory => "dir",
        FileKind::File => "file",
        FileKind::Symlink => "symlink",
        _ => "special",
    }
}

/// Short marker for directories whose content is incomplete or skipped.
fn marker(tree: &DirTree, id: NodeId) -> Option<&'static str> {
    if !tree.is_dir_info(id) || tree.is_dot_entry(id) {
        return None;
    }
    if tree.is_excluded(id) {
        return Some("excluded");
    }
    if tree.is_mount_point(id) {
        return Some("mount point");
    }
    match tree.read_state(id) {
        ReadState::Error => Some("error"),
        ReadState::Aborted => Some("aborted"),
        ReadState::Queued | ReadState::Reading => Some("reading"),
        ReadState::Finished => None,
    }
}

/// Children of `dir` to show, in report order.
pub fn visible_children(tree: &DirTree, dir: NodeId, options: &ReportOptions) -> Vec<NodeId> {
    if options.sort_column == SortColumn::TotalSize {
        return SortedBySizeIter::new(tree, dir, options.min_size, options.sort_order).collect();
    }
    tree.sorted_children(dir, options.sort_column, options.sort_order)
        .iter()
        .copied()
        .filter(|child| tree.total_size(*child) >= options.min_size)
        .collect()
}

/// Build the serializable report tree below `id`.
pub fn build_report(tree: &DirTree, id: NodeId, options: &ReportOptions) -> ReportNode {
    // Pre-order list of (node, parent index), assembled bottom-up.
    let mut order: Vec<(NodeId, usize)> = Vec::new();
    let mut stack = vec![(id, 0usize, 0usize)];
    while let Some((current, depth, parent)) = stack.pop() {
        let index = order.len();
        order.push((current, parent));
        if depth < options.max_depth {
            let children = visible_children(tree, current, options);
            stack.extend(children.into_iter().rev().map(|c| (c, depth + 1, index)));
        }
    }

    let mut children: Vec<Vec<ReportNode>> = std::iter::repeat_with(Vec::new).take(order.len()).collect();
    for index in (1..order.len()).rev() {
        let (node, parent) = order[index];
        let report = report_node(tree, node, take_children(&mut children, index));
        children[parent].push(report);
    }
    report_node(tree, id, take_children(&mut children, 0))
}

/// Siblings are pushed last to first; hand them back in report order.
fn take_children(children: &mut [Vec<ReportNode>], index: usize) -> Vec<ReportNode> {
    let mut taken = std::mem::take(&mut children[index]);
    taken.reverse();
    taken
}

fn report_node(tree: &DirTree, id: NodeId, children: Vec<ReportNode>) -> ReportNode {
    let summary = tree.summary(id);
    let is_dir = tree.is_dir_info(id);
    ReportNode {
        name: tree.name(id).to_string(),
        kind: kind_label(tree, id),
        own_size: tree.size(id),
        total_size: summary.total_size,
        total_blocks: summary.total_blocks,
        total_items: summary.total_items,
        total_files: summary.total_files,
        total_sub_dirs: summary.total_sub_dirs,
        latest_mtime: summary.latest_mtime,
        read_state: (is_dir && !tree.is_dot_entry(id)).then(|| tree.read_state(id).label()),
        excluded: tree.is_excluded(id),
        mount_point: tree.is_mount_point(id),
        children,
    }
}

pub fn render_json(tree: &DirTree, root: NodeId, options: &ReportOptions) -> Result<String> {
    Ok(serde_json::to_string_pretty(&build_report(tree, root, options))?)
}

/// Indented text tree, one line per node:
/// total size, item count, name and an optional marker.
pub fn render_text(tree: &DirTree, root: NodeId, options: &ReportOptions) -> String {
    let mut out = String::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((id, depth)) = stack.pop() {
        out.push_str(&render_line(tree, id, depth));
        if depth < options.max_depth {
            let children = visible_children(tree, id, options);
            stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
        }
    }
    out
}

fn render_line(tree: &DirTree, id: NodeId, depth: usize) -> String {
    let is_dir = tree.is_dir_info(id);
    let suffix = if is_dir && !tree.is_dot_entry(id) && depth > 0 { "/" } else { "" };
    let items = if is_dir {
        tree.total_items(id).to_string()
    } else {
        String::new()
    };
    let mut line = format!(
        "{:>10}  {:>8}  {}{}{}",
        format_size(tree.total_size(id)),
        items,
        "  ".repeat(depth),
        tree.name(id),
        suffix,
    );
    if let Some(marker) = marker(tree, id) {
        line.push_str(&format!("  [{marker}]"));
    }
    line.push('\n');
    line
}
