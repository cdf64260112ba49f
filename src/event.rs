use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::fs::NodeId;

/// Notifications a [`DirTree`](crate::fs::DirTree) sends to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeEvent {
    /// A node was linked into the tree.
    ChildAdded(NodeId),
    /// A node is about to be deleted together with its subtree.
    DeletingChild(NodeId),
    /// All children of a directory were deleted.
    SubtreeCleared(NodeId),
    /// A directory read job completed (successfully or with an error).
    ReadJobFinished(NodeId),
    /// A directory read job was cancelled.
    ReadJobAborted(NodeId),
    /// No read job is pending anywhere below the root.
    Finished(NodeId),
}

/// Running counters over the events of one scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    pub items_added: usize,
    pub dirs_read: usize,
    pub dirs_aborted: usize,
    pub items_deleted: usize,
}

/// Items between two progress log lines.
pub const PROGRESS_LOG_INTERVAL: usize = 10_000;

impl ScanProgress {
    /// Fold one event into the counters. Returns true once the tree is finished.
    pub fn apply(&mut self, event: TreeEvent) -> bool {
        match event {
            TreeEvent::ChildAdded(_) => {
                self.items_added += 1;
                if self.items_added % PROGRESS_LOG_INTERVAL == 0 {
                    info!(items = self.items_added, dirs = self.dirs_read, "scanning");
                }
            }
            TreeEvent::DeletingChild(_) => self.items_deleted += 1,
            TreeEvent::SubtreeCleared(id) => debug!(dir = ?id, "subtree cleared"),
            TreeEvent::ReadJobFinished(_) => self.dirs_read += 1,
            TreeEvent::ReadJobAborted(_) => self.dirs_aborted += 1,
            TreeEvent::Finished(_) => return true,
        }
        false
    }
}

/// Consume tree events until the channel closes, logging progress.
///
/// Returns the final counters.
pub async fn track_progress(mut rx: mpsc::UnboundedReceiver<TreeEvent>) -> ScanProgress {
    let mut progress = ScanProgress::default();
    while let Some(event) = rx.recv().await {
        if progress.apply(event) {
            info!(
                items = progress.items_added,
                dirs = progress.dirs_read,
                aborted = progress.dirs_aborted,
                "tree finished"
            );
        }
    }
    progress
}
