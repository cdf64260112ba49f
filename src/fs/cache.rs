//! Persisted scans.
//!
//! A cache file is JSON Lines: one header object, then one record per node
//! in pre-order. Records carry the path relative to the scanned root, so a
//! record's parent directory always appears before it. Dot entries are not
//! written; their files are listed under the owning directory and land in
//! a dot entry again when read back.
//!
//! Directories that did not finish reading keep their state, and mount
//! points keep their flag. Paths are the display names, so a name that is
//! not valid UTF-8 comes back in its lossy form.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::fs::dir_node::ReadState;
use crate::fs::node::{FileKind, NodeId};
use crate::fs::tree::DirTree;

pub const CACHE_FORMAT: &str = "dirstat-cache";
pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CacheHeader {
    format: String,
    version: u32,
    /// Absolute path of the scanned directory.
    root: String,
}

/// One node of a persisted scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Slash-separated path relative to the root; empty for the root itself.
    pub path: String,
    pub mode: u32,
    pub size: u64,
    pub mtime: i64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub excluded: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub mount_point: bool,
    /// Set only for directories that did not finish reading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_state: Option<ReadState>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn cache_error(line: usize, message: impl Into<String>) -> AppError {
    AppError::Cache {
        line,
        message: message.into(),
    }
}

/// Write the subtree rooted at `root` to `out`.
pub fn write_cache<W: Write>(tree: &DirTree, root: NodeId, mut out: W) -> Result<()> {
    let header = CacheHeader {
        format: CACHE_FORMAT.to_string(),
        version: CACHE_VERSION,
        root: tree.path(root),
    };
    serde_json::to_writer(&mut out, &header)?;
    writeln!(out)?;

    // Pre-order walk; dot entry contents are listed under their owner.
    let mut count = 0usize;
    let mut stack = vec![(root, String::new())];
    while let Some((id, path)) = stack.pop() {
        let record = record_for(tree, id, path);
        serde_json::to_writer(&mut out, &record)?;
        writeln!(out)?;
        count += 1;

        let mut children = Vec::new();
        push_children(tree, id, &record.path, &mut children);
        stack.extend(children.into_iter().rev());
    }
    out.flush()?;
    info!(root = %header.root, records = count, "cache written");
    Ok(())
}

fn record_for(tree: &DirTree, id: NodeId, path: String) -> CacheRecord {
    let stat = tree.stat(id);
    let is_dir = tree.is_dir_info(id);
    let read_state = Some(tree.read_state(id)).filter(|s| is_dir && *s != ReadState::Finished);
    CacheRecord {
        path,
        mode: stat.mode,
        size: stat.size,
        mtime: stat.mtime,
        excluded: is_dir && tree.is_excluded(id),
        mount_point: tree.is_mount_point(id),
        read_state,
    }
}

/// Collect `dir`'s children with their record paths, in write order.
fn push_children(tree: &DirTree, dir: NodeId, path: &str, out: &mut Vec<(NodeId, String)>) {
    for child in tree.children(dir) {
        if tree.is_dot_entry(child) {
            push_children(tree, child, path, out);
            continue;
        }
        let name = tree.name(child);
        let child_path = if path.is_empty() {
            name.to_string()
        } else {
            format!("{path}/{name}")
        };
        out.push((child, child_path));
    }
}

/// Read state of a restored directory. A read that was still running when
/// the cache was written can never finish, so it comes back aborted.
fn restored_state(record: &CacheRecord) -> ReadState {
    match record.read_state {
        None | Some(ReadState::Finished) => ReadState::Finished,
        Some(ReadState::Error) => ReadState::Error,
        Some(ReadState::Aborted | ReadState::Queued | ReadState::Reading) => ReadState::Aborted,
    }
}

/// Read a cache file into `tree` and make its root the tree's root.
///
/// Restored directories are `Finished` unless the record says otherwise;
/// dot entries are cleaned up the same way as after a live read.
pub fn read_cache<R: BufRead>(tree: &mut DirTree, input: R) -> Result<NodeId> {
    let mut lines = input.lines().enumerate();

    let header_line = match lines.next() {
        Some((_, line)) => line?,
        None => return Err(cache_error(1, "empty cache file")),
    };
    let header: CacheHeader =
        serde_json::from_str(&header_line).map_err(|e| cache_error(1, e.to_string()))?;
    if header.format != CACHE_FORMAT {
        return Err(cache_error(1, format!("unknown format {:?}", header.format)));
    }
    if header.version != CACHE_VERSION {
        return Err(cache_error(1, format!("unsupported version {}", header.version)));
    }

    let mut dirs: HashMap<String, NodeId> = HashMap::new();
    let mut root = None;

    for (index, line) in lines {
        let line_no = index + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: CacheRecord =
            serde_json::from_str(&line).map_err(|e| cache_error(line_no, e.to_string()))?;
        let is_dir = FileKind::from_mode(record.mode) == FileKind::Directory;

        if record.path.is_empty() {
            if root.is_some() {
                return Err(cache_error(line_no, "duplicate root record"));
            }
            if !is_dir {
                return Err(cache_error(line_no, "root record is not a directory"));
            }
            let id = tree.new_dir_from_cache(None, &header.root, record.mode, record.size, record.mtime);
            tree.set_root(id);
            tree.set_read_state(id, restored_state(&record));
            tree.set_excluded(id, record.excluded);
            tree.set_mount_point(id, record.mount_point);
            dirs.insert(String::new(), id);
            root = Some(id);
            continue;
        }

        let (parent_path, name) = record.path.rsplit_once('/').unwrap_or(("", record.path.as_str()));
        let Some(&parent) = dirs.get(parent_path) else {
            return Err(cache_error(
                line_no,
                format!("parent directory of {:?} not seen", record.path),
            ));
        };

        if is_dir {
            let id = tree.new_dir_from_cache(Some(parent), name, record.mode, record.size, record.mtime);
            tree.set_read_state(id, restored_state(&record));
            tree.set_excluded(id, record.excluded);
            tree.set_mount_point(id, record.mount_point);
            dirs.insert(record.path.clone(), id);
        } else {
            tree.new_file_from_cache(Some(parent), name, record.mode, record.size, record.mtime);
        }
    }

    let root = root.ok_or_else(|| cache_error(1, "no root record"))?;
    tree.finalize_all(root);
    debug!(dirs = dirs.len(), "cache directories restored");
    info!(root = %header.root, items = tree.total_items(root), "cache read");
    Ok(root)
}
