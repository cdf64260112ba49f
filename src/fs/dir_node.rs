use std::cell::{Cell, RefCell};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::fs::node::NodeId;
use crate::fs::sort::{SortColumn, SortOrder};

/// Display name of every dot entry.
pub const DOT_ENTRY_NAME: &str = "<Files>";

/// Lifecycle of a directory read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadState {
    /// Waiting in the read queue.
    #[default]
    Queued,
    /// Read in progress.
    Reading,
    /// Read finished and OK.
    Finished,
    /// Read aborted upon user request.
    Aborted,
    /// Error while reading.
    Error,
}

impl ReadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ReadState::Finished | ReadState::Aborted | ReadState::Error)
    }

    pub fn label(self) -> &'static str {
        match self {
            ReadState::Queued => "queued",
            ReadState::Reading => "reading",
            ReadState::Finished => "finished",
            ReadState::Aborted => "aborted",
            ReadState::Error => "error",
        }
    }
}

/// Aggregated statistics over a whole subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total_size: u64,
    pub total_blocks: u64,
    pub total_items: usize,
    pub total_sub_dirs: usize,
    pub total_files: usize,
    pub latest_mtime: i64,
}

/// Children of a directory ordered for one (column, order) key.
#[derive(Debug, Clone)]
pub(crate) struct SortCache {
    pub(crate) column: SortColumn,
    pub(crate) order: SortOrder,
    pub(crate) children: Arc<[NodeId]>,
}

/// Directory-specific state of a node.
///
/// The aggregate and sort caches live in cells so that queries can fill them
/// lazily through a shared borrow of the tree.
#[derive(Debug, Default)]
pub struct DirNode {
    /// Direct children in no particular order. Never contains the dot entry.
    pub(crate) children: Vec<NodeId>,
    pub(crate) dot_entry: Option<NodeId>,
    pub(crate) is_dot_entry: bool,
    pub(crate) excluded: bool,
    pub(crate) locked: bool,
    pub(crate) touched: bool,
    pub(crate) pending_read_jobs: usize,
    pub(crate) read_state: ReadState,
    pub(crate) summary: Cell<Summary>,
    pub(crate) summary_dirty: Cell<bool>,
    pub(crate) sort_cache: RefCell<Option<SortCache>>,
}

impl DirNode {
    pub(crate) fn new(is_dot_entry: bool) -> Self {
        Self {
            is_dot_entry,
            summary_dirty: Cell::new(true),
            ..Self::default()
        }
    }

    pub fn dot_entry(&self) -> Option<NodeId> {
        self.dot_entry
    }

    pub fn is_dot_entry(&self) -> bool {
        self.is_dot_entry
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    pub fn pending_read_jobs(&self) -> usize {
        self.pending_read_jobs
    }

    /// Number of direct children, not counting the dot entry.
    pub fn direct_child_count(&self) -> usize {
        self.children.len()
    }

    pub fn is_summary_dirty(&self) -> bool {
        self.summary_dirty.get()
    }

    pub(crate) fn mark_dirty(&self) {
        self.summary_dirty.set(true);
    }

    pub(crate) fn drop_sort_cache(&self) {
        self.sort_cache.borrow_mut().take();
    }
}
