use std::ffi::OsString;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::debug;

use crate::event::TreeEvent;
use crate::fs::dir_node::{DirNode, ReadState, DOT_ENTRY_NAME};
use crate::fs::node::{pseudo_dir_stat, FileKind, Node, NodeId, StatInfo};

/// Arena owning every node of one scanned subtree.
///
/// Nodes are addressed by [`NodeId`]. A node is owned by its parent once
/// linked in; detached nodes are owned by the arena until [`DirTree::destroy`]
/// reclaims them. Ids of destroyed nodes must not be used again.
#[derive(Debug, Default)]
pub struct DirTree {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    root: Option<NodeId>,
    events: Option<mpsc::UnboundedSender<TreeEvent>>,
}

impl DirTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree that forwards its notifications to `events`.
    pub fn with_events(events: mpsc::UnboundedSender<TreeEvent>) -> Self {
        Self {
            events: Some(events),
            ..Self::default()
        }
    }

    /// Stop forwarding notifications. The listener sees its channel close.
    pub fn detach_events(&mut self) {
        self.events = None;
    }

    pub(crate) fn emit(&self, event: TreeEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody listens anymore.
            let _ = tx.send(event);
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    // ── Access ──────────────────────────────────────────────────────────────

    /// Look up a node; `None` for ids whose slot was reclaimed.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale node id {id:?}"),
        }
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match self.nodes.get_mut(id.0).and_then(Option::as_mut) {
            Some(node) => node,
            None => panic!("stale node id {id:?}"),
        }
    }

    pub(crate) fn dir(&self, id: NodeId) -> &DirNode {
        match self.node(id).as_dir() {
            Some(dir) => dir,
            None => panic!("{id:?} ({}) is not a directory node", self.node(id).name),
        }
    }

    pub(crate) fn dir_mut(&mut self, id: NodeId) -> &mut DirNode {
        if !self.node(id).is_dir_info() {
            panic!("{id:?} ({}) is not a directory node", self.node(id).name);
        }
        match self.node_mut(id).as_dir_mut() {
            Some(dir) => dir,
            None => unreachable!(),
        }
    }

    /// Number of live nodes, dot entries included.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Make a detached directory node the root of the tree.
    pub fn set_root(&mut self, id: NodeId) {
        assert!(
            self.node(id).parent.is_none(),
            "the root must not have a parent"
        );
        assert!(self.is_dir_info(id), "the root must be a directory node");
        self.root = Some(id);
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn stat(&self, id: NodeId) -> &StatInfo {
        &self.node(id).stat
    }

    pub fn size(&self, id: NodeId) -> u64 {
        self.node(id).stat.size
    }

    /// True for disk directories, judged by the file type bits.
    pub fn is_dir(&self, id: NodeId) -> bool {
        self.node(id).stat.is_dir()
    }

    /// True for plain files.
    pub fn is_file(&self, id: NodeId) -> bool {
        self.node(id).stat.kind() == FileKind::File
    }

    /// True for nodes that can hold children, whatever their file type.
    pub fn is_dir_info(&self, id: NodeId) -> bool {
        self.node(id).is_dir_info()
    }

    pub fn is_dot_entry(&self, id: NodeId) -> bool {
        self.node(id).is_dot_entry()
    }

    pub fn dot_entry(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).as_dir().and_then(DirNode::dot_entry)
    }

    pub fn is_mount_point(&self, id: NodeId) -> bool {
        self.node(id).mount_point
    }

    pub fn set_mount_point(&mut self, id: NodeId, mount_point: bool) {
        self.node_mut(id).mount_point = mount_point;
    }

    pub fn is_excluded(&self, id: NodeId) -> bool {
        self.node(id).as_dir().is_some_and(DirNode::is_excluded)
    }

    pub fn set_excluded(&mut self, id: NodeId, excluded: bool) {
        self.dir_mut(id).excluded = excluded;
    }

    pub fn is_locked(&self, id: NodeId) -> bool {
        self.node(id).as_dir().is_some_and(DirNode::is_locked)
    }

    pub fn set_locked(&mut self, id: NodeId, locked: bool) {
        self.dir_mut(id).locked = locked;
    }

    pub fn is_touched(&self, id: NodeId) -> bool {
        self.node(id).as_dir().is_some_and(DirNode::is_touched)
    }

    pub fn set_touched(&mut self, id: NodeId, touched: bool) {
        self.dir_mut(id).touched = touched;
    }

    /// Slash-joined path from the root down to `id`. Dot entries add nothing.
    pub fn path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            let node = self.node(c);
            if !node.is_dot_entry() {
                parts.push(node.name.as_str());
            }
            current = node.parent;
        }

        let mut path = String::new();
        for part in parts.into_iter().rev() {
            if !path.is_empty() && !path.ends_with('/') {
                path.push('/');
            }
            path.push_str(part);
        }
        path
    }

    /// Location of `id` on disk, built from the on-disk names.
    pub fn fs_path(&self, id: NodeId) -> PathBuf {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            let node = self.node(c);
            if !node.is_dot_entry() {
                parts.push(node.os_name());
            }
            current = node.parent;
        }
        parts.into_iter().rev().collect()
    }

    /// Record the on-disk name of `id` when its display name is lossy.
    pub fn set_os_name(&mut self, id: NodeId, os_name: OsString) {
        let node = self.node_mut(id);
        node.os_name = (os_name.to_str() != Some(node.name.as_str())).then_some(os_name);
    }

    // ── Construction ────────────────────────────────────────────────────────

    /// Build an empty pseudo directory under `parent`.
    ///
    /// With `as_dot_entry` the new node becomes the parent's dot entry; this
    /// is the only way to create one. A parent can hold one dot entry only.
    pub fn new_dir_info(&mut self, parent: Option<NodeId>, as_dot_entry: bool) -> NodeId {
        if as_dot_entry {
            let Some(parent) = parent else {
                panic!("a dot entry needs a parent");
            };
            let id = self.alloc(Node::dir(
                DOT_ENTRY_NAME.to_string(),
                pseudo_dir_stat(),
                DirNode::new(true),
            ));
            self.set_dot_entry(parent, Some(id));
            id
        } else {
            let id = self.alloc_dir(String::new(), pseudo_dir_stat());
            self.attach(parent, id);
            id
        }
    }

    /// Directory discovered by a live `lstat()`.
    pub fn new_dir(&mut self, name: &str, stat: &StatInfo, parent: Option<NodeId>) -> NodeId {
        let id = self.alloc_dir(name.to_string(), *stat);
        self.attach(parent, id);
        id
    }

    /// Directory restored from a persisted scan.
    pub fn new_dir_from_cache(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        mode: u32,
        size: u64,
        mtime: i64,
    ) -> NodeId {
        let stat = StatInfo::from_cache_fields(mode, size, mtime);
        self.new_dir(name, &stat, parent)
    }

    /// Non-directory entry discovered by a live `lstat()`.
    pub fn new_file(&mut self, name: &str, stat: &StatInfo, parent: Option<NodeId>) -> NodeId {
        let id = self.alloc(Node::leaf(name.to_string(), *stat));
        self.attach(parent, id);
        id
    }

    /// Non-directory entry restored from a persisted scan.
    pub fn new_file_from_cache(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        mode: u32,
        size: u64,
        mtime: i64,
    ) -> NodeId {
        let stat = StatInfo::from_cache_fields(mode, size, mtime);
        self.new_file(name, &stat, parent)
    }

    /// Allocate a real directory together with its empty dot entry.
    fn alloc_dir(&mut self, name: String, stat: StatInfo) -> NodeId {
        let id = self.alloc(Node::dir(name, stat, DirNode::new(false)));
        self.new_dir_info(Some(id), true);
        id
    }

    fn attach(&mut self, parent: Option<NodeId>, id: NodeId) {
        if let Some(parent) = parent {
            self.insert_child(parent, id);
        }
    }

    // ── Linkage ─────────────────────────────────────────────────────────────

    /// Link a detached node into `parent`'s children.
    ///
    /// Non-directory children go to the parent's dot entry when it has one.
    /// The order of children is undefined.
    pub fn insert_child(&mut self, parent: NodeId, child: NodeId) {
        assert!(
            self.node(child).parent.is_none(),
            "{child:?} is already linked under a parent"
        );
        assert!(self.root != Some(child), "the root cannot become a child");

        let target = {
            let dir = self.dir(parent);
            if self.node(child).stat.is_dir() || dir.is_dot_entry {
                parent
            } else {
                dir.dot_entry.unwrap_or(parent)
            }
        };

        self.dir_mut(target).children.push(child);
        self.node_mut(child).parent = Some(target);
        let pending = self.pending_read_jobs(child);
        self.add_pending_upward(Some(target), pending);
        self.child_added(target, child);
    }

    /// Notification that `new_child` was added somewhere below `dir`.
    ///
    /// Marks `dir` and every ancestor dirty so their aggregates and child
    /// order are recomputed on next access.
    pub fn child_added(&self, dir: NodeId, new_child: NodeId) {
        self.invalidate_upward(dir);
        self.emit(TreeEvent::ChildAdded(new_child));
    }

    /// Install or remove `parent`'s dot entry.
    pub fn set_dot_entry(&mut self, parent: NodeId, dot_entry: Option<NodeId>) {
        let current = self.dir(parent).dot_entry;
        match dot_entry {
            Some(new) => {
                if let Some(existing) = current {
                    panic!("{parent:?} already has dot entry {existing:?}");
                }
                assert!(
                    !self.dir(parent).is_dot_entry,
                    "a dot entry cannot have a dot entry"
                );
                assert!(self.is_dot_entry(new), "{new:?} is not a dot entry");
                self.node_mut(new).parent = Some(parent);
            }
            None => {
                if let Some(old) = current {
                    self.node_mut(old).parent = None;
                }
            }
        }
        self.dir_mut(parent).dot_entry = dot_entry;
        self.invalidate_upward(parent);
    }

    /// Remove `child` from `parent`'s children without destroying it.
    ///
    /// Read jobs still pending in the child's subtree leave the ancestors'
    /// counters with it. Must run before the child is destroyed.
    pub fn unlink_child(&mut self, parent: NodeId, child: NodeId) {
        assert_eq!(
            self.node(child).parent,
            Some(parent),
            "{child:?} is not a child of {parent:?}"
        );
        let pending = self.pending_read_jobs(child);
        self.sub_pending_upward(Some(parent), pending);

        if self.dir(parent).dot_entry == Some(child) {
            self.set_dot_entry(parent, None);
            return;
        }

        let dir = self.dir_mut(parent);
        match dir.children.iter().position(|c| *c == child) {
            Some(pos) => {
                dir.children.swap_remove(pos);
            }
            None => panic!("{child:?} missing from the children of {parent:?}"),
        }
        self.node_mut(child).parent = None;
        self.invalidate_upward(parent);
    }

    /// Notification that `deleted` is about to be deleted below `dir`.
    ///
    /// Invalidates the aggregates and sort caches up the chain and unlinks
    /// `deleted` if it is a direct child of `dir`.
    pub fn deleting_child(&mut self, dir: NodeId, deleted: NodeId) {
        self.invalidate_upward(dir);
        self.emit(TreeEvent::DeletingChild(deleted));

        if self.node(deleted).parent == Some(dir) {
            self.unlink_child(dir, deleted);
        }
    }

    /// Delete a node and its whole subtree: detach first, then destroy.
    pub fn delete_subtree(&mut self, id: NodeId) {
        match self.node(id).parent {
            Some(parent) => self.deleting_child(parent, id),
            None => {
                if self.root == Some(id) {
                    self.emit(TreeEvent::DeletingChild(id));
                    self.root = None;
                }
            }
        }
        self.destroy(id);
    }

    /// Reclaim the slots of a detached node and everything below it.
    pub fn destroy(&mut self, id: NodeId) {
        assert!(
            self.node(id).parent.is_none(),
            "{id:?} must be unlinked from its parent before it is destroyed"
        );
        if self.root == Some(id) {
            self.root = None;
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes[current.0].take() else {
                panic!("stale node id {current:?}");
            };
            if let Some(dir) = node.as_dir() {
                stack.extend(dir.children.iter().copied());
                stack.extend(dir.dot_entry);
            }
            self.free.push(current.0);
        }
    }

    /// Recursively delete all children, the dot entry included.
    pub fn clear(&mut self, dir: NodeId) {
        let (children, dot_entry) = {
            let d = self.dir_mut(dir);
            (std::mem::take(&mut d.children), d.dot_entry.take())
        };
        debug!(dir = ?dir, count = children.len(), "clearing children");

        let mut pending = 0;
        for child in children.into_iter().chain(dot_entry) {
            pending += self.pending_read_jobs(child);
            self.node_mut(child).parent = None;
            self.destroy(child);
        }
        self.sub_pending_upward(Some(dir), pending);

        self.invalidate_upward(dir);
        self.emit(TreeEvent::SubtreeCleared(dir));
    }

    /// Return `dir` to its freshly constructed state for a rescan in place.
    ///
    /// Children are deleted, a removed dot entry is restored, the read state
    /// goes back to `Queued`. Read jobs still pending in `dir`'s subtree are
    /// taken off the ancestors' counters.
    pub fn reset(&mut self, dir: NodeId) {
        let has_content = {
            let d = self.dir(dir);
            !d.children.is_empty() || d.dot_entry.is_some()
        };
        if has_content {
            self.clear(dir);
        }

        if !self.dir(dir).is_dot_entry {
            self.new_dir_info(Some(dir), true);
        }

        let outstanding = std::mem::take(&mut self.dir_mut(dir).pending_read_jobs);
        let parent = self.node(dir).parent;
        self.sub_pending_upward(parent, outstanding);

        self.dir_mut(dir).read_state = ReadState::Queued;
        self.invalidate_upward(dir);
    }

    /// Add `count` outstanding read jobs to `from` and every ancestor.
    fn add_pending_upward(&mut self, from: Option<NodeId>, count: usize) {
        if count == 0 {
            return;
        }
        let mut current = from;
        while let Some(c) = current {
            self.dir_mut(c).pending_read_jobs += count;
            current = self.node(c).parent;
        }
    }

    fn sub_pending_upward(&mut self, from: Option<NodeId>, count: usize) {
        if count == 0 {
            return;
        }
        let mut current = from;
        while let Some(c) = current {
            let d = self.dir_mut(c);
            d.pending_read_jobs = d.pending_read_jobs.saturating_sub(count);
            current = self.node(c).parent;
        }
    }

    /// Flag `id` and all its ancestors as needing a recalc, and forget their
    /// cached child order.
    ///
    /// The walk ends at the first ancestor that was already dirty. Everything
    /// above a dirty directory is dirty as well and holds no order that
    /// depends on subtree totals, since building one recalculates the whole
    /// subtree below it.
    pub(crate) fn invalidate_upward(&self, id: NodeId) {
        let mut current = Some(id);
        while let Some(c) = current {
            let node = self.node(c);
            if let Some(dir) = node.as_dir() {
                let was_dirty = dir.is_summary_dirty();
                dir.mark_dirty();
                dir.drop_sort_cache();
                if was_dirty && c != id {
                    break;
                }
            }
            current = node.parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::sort::{SortColumn, SortOrder};
    use crate::fs::test_util::{dir_stat, file_stat};

    fn tree_with_root() -> (DirTree, NodeId) {
        let mut tree = DirTree::new();
        let root = tree.new_dir("/data", &dir_stat(0), None);
        tree.set_root(root);
        (tree, root)
    }

    #[test]
    fn new_dir_gets_an_empty_dot_entry() {
        let (tree, root) = tree_with_root();
        let dot = tree.dot_entry(root).expect("dot entry");
        assert!(tree.is_dot_entry(dot));
        assert_eq!(tree.name(dot), DOT_ENTRY_NAME);
        assert_eq!(tree.parent(dot), Some(root));
        assert!(tree.dot_entry(dot).is_none());
        assert!(tree.is_dir_info(root));
    }

    #[test]
    fn dir_info_holds_even_for_non_directory_mode() {
        let mut tree = DirTree::new();
        let odd = tree.new_dir("odd", &file_stat(10, 0), None);
        assert!(tree.is_dir_info(odd));
        assert!(!tree.is_dir(odd));
    }

    #[test]
    #[should_panic(expected = "already has dot entry")]
    fn second_dot_entry_fails_loudly() {
        let (mut tree, root) = tree_with_root();
        tree.new_dir_info(Some(root), true);
    }

    #[test]
    fn pseudo_dir_links_under_parent() {
        let (mut tree, root) = tree_with_root();
        let pseudo = tree.new_dir_info(Some(root), false);
        assert_eq!(tree.parent(pseudo), Some(root));
        assert!(tree.dot_entry(pseudo).is_some());
    }

    #[test]
    fn files_are_routed_into_the_dot_entry() {
        let (mut tree, root) = tree_with_root();
        let sub = tree.new_dir("sub", &dir_stat(0), Some(root));
        let file = tree.new_file("a.txt", &file_stat(10, 0), Some(root));

        let dot = tree.dot_entry(root).unwrap();
        assert_eq!(tree.parent(sub), Some(root));
        assert_eq!(tree.parent(file), Some(dot));
        assert_eq!(tree.dir(root).children, vec![sub]);
        assert_eq!(tree.dir(dot).children, vec![file]);
    }

    #[test]
    fn cache_constructors_keep_minimal_fields() {
        let (mut tree, root) = tree_with_root();
        let dir = tree.new_dir_from_cache(Some(root), "d", 0o040_755, 4096, 7);
        let file = tree.new_file_from_cache(Some(dir), "f", 0o100_644, 100, 9);
        assert!(tree.is_dir(dir));
        assert_eq!(tree.stat(dir).mtime, 7);
        assert_eq!(tree.size(file), 100);
        assert!(tree.is_file(file));
    }

    #[test]
    fn path_skips_dot_entries() {
        let (mut tree, root) = tree_with_root();
        let sub = tree.new_dir("sub", &dir_stat(0), Some(root));
        let file = tree.new_file("a.txt", &file_stat(1, 0), Some(sub));
        assert_eq!(tree.path(file), "/data/sub/a.txt");
        assert_eq!(tree.path(root), "/data");

        let mut slash = DirTree::new();
        let top = slash.new_dir("/", &dir_stat(0), None);
        let etc = slash.new_dir("etc", &dir_stat(0), Some(top));
        assert_eq!(slash.path(etc), "/etc");
    }

    #[test]
    fn unlink_then_destroy_reclaims_slots() {
        let (mut tree, root) = tree_with_root();
        let sub = tree.new_dir("sub", &dir_stat(0), Some(root));
        tree.new_file("a", &file_stat(1, 0), Some(sub));
        let before = tree.len();

        tree.unlink_child(root, sub);
        assert!(tree.parent(sub).is_none());
        assert!(tree.dir(root).children.is_empty());
        tree.destroy(sub);

        // sub, its dot entry and the file
        assert_eq!(tree.len(), before - 3);
        assert!(tree.get(sub).is_none());
    }

    #[test]
    #[should_panic(expected = "must be unlinked")]
    fn destroying_a_linked_node_panics() {
        let (mut tree, root) = tree_with_root();
        let sub = tree.new_dir("sub", &dir_stat(0), Some(root));
        tree.destroy(sub);
    }

    #[test]
    #[should_panic(expected = "is not a child of")]
    fn unlinking_from_the_wrong_parent_panics() {
        let (mut tree, root) = tree_with_root();
        let a = tree.new_dir("a", &dir_stat(0), Some(root));
        let b = tree.new_dir("b", &dir_stat(0), Some(root));
        tree.unlink_child(a, b);
    }

    #[test]
    #[should_panic(expected = "already linked")]
    fn inserting_a_linked_node_twice_panics() {
        let (mut tree, root) = tree_with_root();
        let a = tree.new_dir("a", &dir_stat(0), Some(root));
        tree.insert_child(root, a);
    }

    #[test]
    fn delete_subtree_detaches_and_notifies() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tree = DirTree::with_events(tx);
        let root = tree.new_dir("/r", &dir_stat(0), None);
        tree.set_root(root);
        let sub = tree.new_dir("sub", &dir_stat(0), Some(root));
        while rx.try_recv().is_ok() {}

        tree.delete_subtree(sub);

        assert!(matches!(rx.try_recv(), Ok(TreeEvent::DeletingChild(id)) if id == sub));
        assert!(tree.dir(root).children.is_empty());
        assert!(tree.get(sub).is_none());
    }

    #[test]
    fn deleting_the_dot_entry_clears_the_field() {
        let (mut tree, root) = tree_with_root();
        let dot = tree.dot_entry(root).unwrap();
        tree.delete_subtree(dot);
        assert!(tree.dot_entry(root).is_none());
        // Files now link directly.
        let file = tree.new_file("f", &file_stat(1, 0), Some(root));
        assert_eq!(tree.parent(file), Some(root));
    }

    #[test]
    fn freed_slots_are_reused() {
        let (mut tree, root) = tree_with_root();
        let file = tree.new_file("f", &file_stat(1, 0), Some(root));
        tree.delete_subtree(file);
        let again = tree.new_file("g", &file_stat(1, 0), Some(root));
        assert_eq!(again.index(), file.index());
        assert_eq!(tree.name(again), "g");
    }

    #[test]
    fn clear_removes_children_and_dot_entry() {
        let (mut tree, root) = tree_with_root();
        tree.new_dir("sub", &dir_stat(0), Some(root));
        tree.new_file("f", &file_stat(1, 0), Some(root));

        tree.clear(root);

        assert!(tree.dir(root).children.is_empty());
        assert!(tree.dot_entry(root).is_none());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn reset_restores_dot_entry_and_queued_state() {
        let (mut tree, root) = tree_with_root();
        let sub = tree.new_dir("sub", &dir_stat(0), Some(root));
        tree.new_file("f", &file_stat(1, 0), Some(sub));
        tree.read_job_added(sub);
        tree.set_read_state(sub, ReadState::Reading);
        tree.clear(sub);
        assert!(tree.dot_entry(sub).is_none());

        tree.reset(sub);

        assert!(tree.dot_entry(sub).is_some());
        assert_eq!(tree.read_state(sub), ReadState::Queued);
        assert_eq!(tree.pending_read_jobs(sub), 0);
        assert_eq!(tree.pending_read_jobs(root), 0);
    }

    #[test]
    fn deleting_a_grandchild_reorders_the_root() {
        let (mut tree, root) = tree_with_root();
        let a = tree.new_dir("a", &dir_stat(0), Some(root));
        let b = tree.new_dir("b", &dir_stat(0), Some(a));
        tree.new_file("big", &file_stat(1000, 0), Some(b));
        let c = tree.new_dir("c", &dir_stat(0), Some(root));
        tree.new_file("mid", &file_stat(500, 0), Some(c));

        let before = tree.sorted_children(root, SortColumn::TotalSize, SortOrder::Descending);
        assert_eq!(&before[..2], &[a, c]);
        assert_eq!(tree.total_size(root), 1500);

        tree.delete_subtree(b);

        let after = tree.sorted_children(root, SortColumn::TotalSize, SortOrder::Descending);
        assert_eq!(&after[..2], &[c, a]);
        assert_eq!(tree.total_size(root), 500);
    }

    #[test]
    fn clearing_a_child_drops_ancestor_caches() {
        let (mut tree, root) = tree_with_root();
        let a = tree.new_dir("a", &dir_stat(0), Some(root));
        let b = tree.new_dir("b", &dir_stat(0), Some(a));
        tree.new_file("f", &file_stat(10, 0), Some(b));
        tree.sorted_children(root, SortColumn::TotalSize, SortOrder::Descending);
        tree.sorted_children(a, SortColumn::TotalSize, SortOrder::Descending);

        tree.clear(b);

        assert!(tree.dir(root).sort_cache.borrow().is_none());
        assert!(tree.dir(a).sort_cache.borrow().is_none());
        assert_eq!(tree.total_size(root), 0);
    }

    #[test]
    fn flags_are_settable() {
        let (mut tree, root) = tree_with_root();
        tree.set_excluded(root, true);
        tree.set_locked(root, true);
        tree.set_touched(root, true);
        tree.set_mount_point(root, true);
        assert!(tree.is_excluded(root));
        assert!(tree.is_locked(root));
        assert!(tree.is_touched(root));
        assert!(tree.is_mount_point(root));
    }
}
