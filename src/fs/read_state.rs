//! Directory read lifecycle: read states, pending job counters and the
//! per-directory finalization that runs once a directory's own read is done.

use tracing::debug;

use crate::event::TreeEvent;
use crate::fs::dir_node::ReadState;
use crate::fs::node::NodeId;
use crate::fs::tree::DirTree;

impl DirTree {
    /// Read state of `id`. Dot entries report their parent's state and
    /// leaves count as finished.
    pub fn read_state(&self, id: NodeId) -> ReadState {
        let node = self.node(id);
        match node.as_dir() {
            None => ReadState::Finished,
            Some(dir) if dir.is_dot_entry => match node.parent {
                Some(parent) => self.read_state(parent),
                None => dir.read_state,
            },
            Some(dir) => dir.read_state,
        }
    }

    /// Set the state of the directory read. Counters are left alone.
    pub fn set_read_state(&mut self, id: NodeId, state: ReadState) {
        debug!(dir = %self.name(id), state = state.label(), "read state");
        self.dir_mut(id).read_state = state;
    }

    /// Outstanding read jobs in `id`'s subtree, `id` included.
    pub fn pending_read_jobs(&self, id: NodeId) -> usize {
        self.node(id).as_dir().map_or(0, |d| d.pending_read_jobs)
    }

    /// A subtree is busy while its own read is queued or running, or while
    /// any read job below it is outstanding.
    pub fn is_busy(&self, id: NodeId) -> bool {
        if !self.is_dir_info(id) {
            return false;
        }
        matches!(self.read_state(id), ReadState::Queued | ReadState::Reading)
            || self.pending_read_jobs(id) > 0
    }

    pub fn is_finished(&self, id: NodeId) -> bool {
        !self.is_busy(id)
    }

    /// Notification of a new read job for `dir`; counted on `dir` and every
    /// ancestor.
    pub fn read_job_added(&mut self, dir: NodeId) {
        let mut current = Some(dir);
        while let Some(c) = current {
            self.dir_mut(c).pending_read_jobs += 1;
            current = self.node(c).parent;
        }
    }

    /// Notification of a finished read job for `dir`.
    ///
    /// The read state is not touched; the caller sets it.
    pub fn read_job_finished(&mut self, dir: NodeId) {
        self.unwind_read_job(dir);
        self.emit(TreeEvent::ReadJobFinished(dir));
        self.emit_if_tree_finished();
    }

    /// Notification of a cancelled read job for `dir`. Counters unwind
    /// exactly like [`DirTree::read_job_finished`].
    pub fn read_job_aborted(&mut self, dir: NodeId) {
        self.unwind_read_job(dir);
        self.emit(TreeEvent::ReadJobAborted(dir));
        self.emit_if_tree_finished();
    }

    fn unwind_read_job(&mut self, dir: NodeId) {
        let mut current = Some(dir);
        while let Some(c) = current {
            let d = self.dir_mut(c);
            d.pending_read_jobs = match d.pending_read_jobs.checked_sub(1) {
                Some(n) => n,
                None => panic!("read job for {dir:?} finished without being added"),
            };
            current = self.node(c).parent;
        }
    }

    fn emit_if_tree_finished(&self) {
        if let Some(root) = self.root() {
            if self.pending_read_jobs(root) == 0 && self.is_finished(root) {
                self.emit(TreeEvent::Finished(root));
            }
        }
    }

    /// Finalize this directory level after its own read completed. Reading
    /// its subdirectories may still be going on.
    pub fn finalize_local(&mut self, dir: NodeId) {
        self.cleanup_dot_entries(dir);
    }

    /// Finalize `dir` and every directory below it, children first.
    pub fn finalize_all(&mut self, dir: NodeId) {
        let mut pre_order = Vec::new();
        let mut stack = vec![dir];
        while let Some(current) = stack.pop() {
            pre_order.push(current);
            stack.extend(
                self.dir(current)
                    .children
                    .iter()
                    .copied()
                    .filter(|child| self.is_dir_info(*child)),
            );
        }
        for current in pre_order.into_iter().rev() {
            self.finalize_local(current);
        }
    }

    /// Drop a childless dot entry. When `dir` has no subdirectories, move
    /// the dot entry's files up into `dir` first.
    fn cleanup_dot_entries(&mut self, dir: NodeId) {
        let (dot, has_children) = {
            let d = self.dir(dir);
            if d.is_dot_entry {
                return;
            }
            let Some(dot) = d.dot_entry else {
                return;
            };
            (dot, !d.children.is_empty())
        };

        if !has_children {
            let files = std::mem::take(&mut self.dir_mut(dot).children);
            for file in &files {
                self.node_mut(*file).parent = Some(dir);
            }
            self.dir_mut(dir).children = files;
            self.dir(dot).drop_sort_cache();
            self.dir(dot).mark_dirty();
        }

        if self.dir(dot).children.is_empty() {
            self.set_dot_entry(dir, None);
            self.destroy(dot);
        }

        self.invalidate_upward(dir);
    }
}
