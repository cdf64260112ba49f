//! Lazily recomputed subtree statistics.
//!
//! Every mutation marks the touched directory and its ancestors dirty; the
//! first accessor call on a dirty directory recomputes it together with the
//! dirty directories below it, deepest first, and stores the results.

use crate::fs::dir_node::{DirNode, Summary};
use crate::fs::node::{NodeId, NodeKind};
use crate::fs::tree::DirTree;

impl DirTree {
    /// Aggregated statistics of `id`'s subtree, recomputed if dirty.
    ///
    /// Leaves report their own size, blocks and mtime with zero counts.
    pub fn summary(&self, id: NodeId) -> Summary {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Leaf => Summary {
                total_size: node.stat.size,
                total_blocks: node.stat.blocks,
                latest_mtime: node.stat.mtime,
                ..Summary::default()
            },
            NodeKind::Dir(dir) => {
                if dir.summary_dirty.get() {
                    self.recalc(id);
                }
                dir.summary.get()
            }
        }
    }

    pub fn total_size(&self, id: NodeId) -> u64 {
        self.summary(id).total_size
    }

    pub fn total_blocks(&self, id: NodeId) -> u64 {
        self.summary(id).total_blocks
    }

    /// Number of items below `id`, not counting `id` itself.
    pub fn total_items(&self, id: NodeId) -> usize {
        self.summary(id).total_items
    }

    /// Number of directories below `id`; dot entries do not count.
    pub fn total_sub_dirs(&self, id: NodeId) -> usize {
        self.summary(id).total_sub_dirs
    }

    /// Number of plain files below `id`.
    pub fn total_files(&self, id: NodeId) -> usize {
        self.summary(id).total_files
    }

    pub fn latest_mtime(&self, id: NodeId) -> i64 {
        self.summary(id).latest_mtime
    }

    /// Recompute the summary of directory `id` and of every dirty directory
    /// below it, deepest first.
    pub(crate) fn recalc(&self, id: NodeId) {
        let mut stack = vec![(id, false)];
        while let Some((current, children_done)) = stack.pop() {
            if children_done {
                self.recalc_local(current);
                continue;
            }
            stack.push((current, true));
            for child in self.children(current) {
                if self.node(child).as_dir().is_some_and(DirNode::is_summary_dirty) {
                    stack.push((child, false));
                }
            }
        }
    }

    /// Recompute the summary of directory `id` from its direct children,
    /// whose summaries must be clean.
    ///
    /// Excluded directories hold no children, so they only contribute their
    /// own entry.
    fn recalc_local(&self, id: NodeId) {
        let node = self.node(id);
        let Some(dir) = node.as_dir() else {
            return;
        };

        let mut sum = Summary {
            total_size: node.stat.size,
            total_blocks: node.stat.blocks,
            latest_mtime: node.stat.mtime,
            ..Summary::default()
        };

        for child in self.children(id) {
            let child_sum = self.summary(child);
            sum.total_size += child_sum.total_size;
            sum.total_blocks += child_sum.total_blocks;
            sum.total_items += child_sum.total_items + 1;
            sum.total_sub_dirs += child_sum.total_sub_dirs;
            sum.total_files += child_sum.total_files;

            if self.is_dir(child) && !self.is_dot_entry(child) {
                sum.total_sub_dirs += 1;
            }
            if self.is_file(child) {
                sum.total_files += 1;
            }
            sum.latest_mtime = sum.latest_mtime.max(child_sum.latest_mtime);
        }

        dir.summary.set(sum);
        dir.summary_dirty.set(false);
    }
}
