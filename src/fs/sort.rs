use std::cmp::Ordering;
use std::sync::Arc;

use tracing::warn;

use crate::fs::dir_node::SortCache;
use crate::fs::node::NodeId;
use crate::fs::tree::DirTree;

/// Column children can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    /// Alphabetical (case-insensitive).
    Name,
    /// Aggregated subtree size, default.
    #[default]
    TotalSize,
    /// The entry's own size.
    OwnSize,
    TotalBlocks,
    TotalItems,
    TotalFiles,
    TotalSubDirs,
    /// Newest modification time in the subtree.
    LatestMtime,
}

impl SortColumn {
    /// Parse a column name from config or CLI. Unknown names fall back to total size.
    pub fn parse(s: &str) -> Self {
        match s {
            "name" => SortColumn::Name,
            "size" | "total_size" => SortColumn::TotalSize,
            "own_size" => SortColumn::OwnSize,
            "blocks" => SortColumn::TotalBlocks,
            "items" => SortColumn::TotalItems,
            "files" => SortColumn::TotalFiles,
            "subdirs" => SortColumn::TotalSubDirs,
            "mtime" | "modified" => SortColumn::LatestMtime,
            other => {
                warn!(value = other, "unknown sort column, sorting by size");
                SortColumn::TotalSize
            }
        }
    }

    /// Get the display label for the column.
    pub fn label(&self) -> &'static str {
        match self {
            SortColumn::Name => "Name",
            SortColumn::TotalSize => "Size",
            SortColumn::OwnSize => "Own size",
            SortColumn::TotalBlocks => "Blocks",
            SortColumn::TotalItems => "Items",
            SortColumn::TotalFiles => "Files",
            SortColumn::TotalSubDirs => "Subdirs",
            SortColumn::LatestMtime => "Last modified",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    /// Parse an order from config or CLI. Unknown values fall back to descending.
    pub fn parse(s: &str) -> Self {
        match s {
            "asc" | "ascending" => SortOrder::Ascending,
            "desc" | "descending" => SortOrder::Descending,
            other => {
                warn!(value = other, "unknown sort order, sorting descending");
                SortOrder::Descending
            }
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

impl DirTree {
    /// Ascending comparison of two nodes by `column`; ties break by name,
    /// then by id, so the order is total.
    pub fn compare(&self, a: NodeId, b: NodeId, column: SortColumn) -> Ordering {
        let by_name = || {
            self.name(a)
                .to_lowercase()
                .cmp(&self.name(b).to_lowercase())
                .then_with(|| a.cmp(&b))
        };

        let primary = match column {
            SortColumn::Name => Ordering::Equal,
            SortColumn::TotalSize => self.total_size(a).cmp(&self.total_size(b)),
            SortColumn::OwnSize => self.size(a).cmp(&self.size(b)),
            SortColumn::TotalBlocks => self.total_blocks(a).cmp(&self.total_blocks(b)),
            SortColumn::TotalItems => self.total_items(a).cmp(&self.total_items(b)),
            SortColumn::TotalFiles => self.total_files(a).cmp(&self.total_files(b)),
            SortColumn::TotalSubDirs => self.total_sub_dirs(a).cmp(&self.total_sub_dirs(b)),
            SortColumn::LatestMtime => self.latest_mtime(a).cmp(&self.latest_mtime(b)),
        };
        primary.then_with(by_name)
    }

    /// Direct children of `dir` (dot entry included) sorted by `column` and
    /// `order`.
    ///
    /// The result is cached until the key changes or anything below `dir`
    /// is added or removed; a cache hit returns the very same sequence.
    pub fn sorted_children(&self, dir: NodeId, column: SortColumn, order: SortOrder) -> Arc<[NodeId]> {
        let Some(d) = self.node(dir).as_dir() else {
            return Arc::from(Vec::new());
        };

        if let Some(cache) = d.sort_cache.borrow().as_ref() {
            if cache.column == column && cache.order == order {
                return Arc::clone(&cache.children);
            }
        }

        let mut children: Vec<NodeId> = self.children(dir).collect();
        children.sort_by(|a, b| self.compare(*a, *b, column));
        if order == SortOrder::Descending {
            children.reverse();
        }

        let children: Arc<[NodeId]> = children.into();
        *d.sort_cache.borrow_mut() = Some(SortCache {
            column,
            order,
            children: Arc::clone(&children),
        });
        children
    }

    /// Forget the cached child order of `dir`, and of every directory below
    /// it if `recursive`.
    pub fn drop_sort_cache(&self, dir: NodeId, recursive: bool) {
        let mut stack = vec![dir];
        while let Some(current) = stack.pop() {
            let Some(d) = self.node(current).as_dir() else {
                continue;
            };
            d.drop_sort_cache();
            if recursive {
                stack.extend(self.children(current).filter(|c| self.is_dir_info(*c)));
            }
        }
    }
}
