use std::slice;

use crate::fs::node::NodeId;
use crate::fs::sort::{SortColumn, SortOrder};
use crate::fs::tree::DirTree;

/// Unsorted iterator over the direct children of a node.
///
/// Yields the real children in whatever order the directory holds them,
/// then the dot entry (if any) as one more subdirectory-like child. Leaves
/// yield nothing. Does not recurse.
#[derive(Debug, Clone)]
pub struct ChildIter<'a> {
    children: slice::Iter<'a, NodeId>,
    dot_entry: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.children.next().copied().or_else(|| self.dot_entry.take())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.children.len() + usize::from(self.dot_entry.is_some());
        (n, Some(n))
    }
}

impl DirTree {
    /// Iterate over the direct children of `id`, dot entry last.
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        match self.node(id).as_dir() {
            Some(dir) => ChildIter {
                children: dir.children.iter(),
                dot_entry: dir.dot_entry,
            },
            None => ChildIter {
                children: [].iter(),
                dot_entry: None,
            },
        }
    }
}

/// Size-ordered snapshot of a node's children, filtered by a minimum total
/// size.
///
/// The snapshot is taken on construction; the parent must not be mutated
/// while the iterator is in use.
#[derive(Debug, Clone)]
pub struct SortedBySizeIter {
    sorted: Vec<NodeId>,
    current: usize,
}

impl SortedBySizeIter {
    /// Children of `parent` whose total size is at least `min_size`, in
    /// `order`.
    pub fn new(tree: &DirTree, parent: NodeId, min_size: u64, order: SortOrder) -> Self {
        let mut sorted: Vec<NodeId> = tree
            .children(parent)
            .filter(|child| tree.total_size(*child) >= min_size)
            .collect();
        sorted.sort_by(|a, b| tree.compare(*a, *b, SortColumn::TotalSize));
        if order == SortOrder::Descending {
            sorted.reverse();
        }
        Self { sorted, current: 0 }
    }

    /// The child the iterator is positioned on, `None` once exhausted.
    pub fn current(&self) -> Option<NodeId> {
        self.sorted.get(self.current).copied()
    }
}

impl Iterator for SortedBySizeIter {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let item = self.current();
        if item.is_some() {
            self.current += 1;
        }
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.sorted.len() - self.current;
        (n, Some(n))
    }
}

impl ExactSizeIterator for SortedBySizeIter {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::test_util::{dir_stat, file_stat};
    use std::collections::HashSet;

    #[test]
    fn unsorted_yields_each_child_once_with_dot_entry_last() {
        let mut tree = DirTree::new();
        let root = tree.new_dir("/r", &dir_stat(0), None);
        let dirs: Vec<NodeId> = (0..4)
            .map(|i| tree.new_dir(&format!("d{i}"), &dir_stat(0), Some(root)))
            .collect();
        tree.new_file("f", &file_stat(1, 0), Some(root));
        let dot = tree.dot_entry(root).unwrap();

        let seen: Vec<NodeId> = tree.children(root).collect();
        assert_eq!(seen.len(), dirs.len() + 1);
        assert_eq!(tree.children(root).count(), 5);
        assert_eq!(seen.last(), Some(&dot));
        let unique: HashSet<NodeId> = seen.iter().copied().collect();
        assert_eq!(unique.len(), seen.len());
        for d in &dirs {
            assert!(unique.contains(d));
        }
    }

    #[test]
    fn leaf_has_no_children() {
        let mut tree = DirTree::new();
        let root = tree.new_dir("/r", &dir_stat(0), None);
        let f = tree.new_file("f", &file_stat(1, 0), Some(root));
        assert_eq!(tree.children(f).count(), 0);
    }

    #[test]
    fn sorted_by_size_applies_threshold_and_order() {
        let mut tree = DirTree::new();
        let root = tree.new_dir("/r", &dir_stat(0), None);
        tree.delete_subtree(tree.dot_entry(root).unwrap());
        let ids: Vec<NodeId> = [10u64, 50, 200, 5]
            .iter()
            .enumerate()
            .map(|(i, size)| tree.new_file(&format!("f{i}"), &file_stat(*size, 0), Some(root)))
            .collect();

        let mut it = SortedBySizeIter::new(&tree, root, 20, SortOrder::Descending);
        assert_eq!(it.len(), 2);
        assert_eq!(it.current(), Some(ids[2]));
        assert_eq!(it.next(), Some(ids[2]));
        assert_eq!(it.next(), Some(ids[1]));
        assert_eq!(it.next(), None);
        assert_eq!(it.current(), None);

        let sizes: Vec<u64> = SortedBySizeIter::new(&tree, root, 20, SortOrder::Ascending)
            .map(|id| tree.total_size(id))
            .collect();
        assert_eq!(sizes, vec![50, 200]);
    }

    #[test]
    fn sorted_by_size_includes_dot_entry() {
        let mut tree = DirTree::new();
        let root = tree.new_dir("/r", &dir_stat(0), None);
        let sub = tree.new_dir("sub", &dir_stat(0), Some(root));
        tree.new_file("big", &file_stat(1000, 0), Some(root));
        let dot = tree.dot_entry(root).unwrap();

        let order: Vec<NodeId> = SortedBySizeIter::new(&tree, root, 0, SortOrder::Descending).collect();
        assert_eq!(order, vec![dot, sub]);
    }
}
