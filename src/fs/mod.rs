//! In-memory model of a scanned filesystem subtree.

pub mod aggregate;
pub mod cache;
pub mod dir_node;
pub mod exclude;
pub mod iter;
pub mod node;
pub mod read_state;
pub mod reader;
pub mod sort;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_util;

pub use dir_node::{DirNode, ReadState, Summary, DOT_ENTRY_NAME};
pub use iter::{ChildIter, SortedBySizeIter};
pub use node::{FileKind, Node, NodeId, StatInfo};
pub use sort::{SortColumn, SortOrder};
pub use tree::DirTree;
