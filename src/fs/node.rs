use std::ffi::OsString;
use std::fs::Metadata;
#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use crate::fs::dir_node::DirNode;

/// Stable handle of a node inside a [`DirTree`](crate::fs::tree::DirTree) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Slot index inside the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

const S_IFMT: u32 = 0o170_000;
const S_IFSOCK: u32 = 0o140_000;
const S_IFLNK: u32 = 0o120_000;
const S_IFREG: u32 = 0o100_000;
const S_IFBLK: u32 = 0o060_000;
/// File type bits of a directory.
pub const S_IFDIR: u32 = 0o040_000;
const S_IFCHR: u32 = 0o020_000;
const S_IFIFO: u32 = 0o010_000;

/// File type, decoded from the `st_mode` type bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
    Unknown,
}

impl FileKind {
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFREG => FileKind::File,
            S_IFDIR => FileKind::Directory,
            S_IFLNK => FileKind::Symlink,
            S_IFBLK => FileKind::BlockDevice,
            S_IFCHR => FileKind::CharDevice,
            S_IFIFO => FileKind::Fifo,
            S_IFSOCK => FileKind::Socket,
            _ => FileKind::Unknown,
        }
    }
}

/// Raw stat attributes of one filesystem entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatInfo {
    pub mode: u32,
    pub size: u64,
    /// Allocated 512-byte blocks.
    pub blocks: u64,
    /// Modification time in seconds since the epoch.
    pub mtime: i64,
    pub device: u64,
}

impl StatInfo {
    /// The minimal field set a persisted scan keeps for every entry.
    pub fn from_cache_fields(mode: u32, size: u64, mtime: i64) -> Self {
        Self {
            mode,
            size,
            blocks: size.div_ceil(512),
            mtime,
            device: 0,
        }
    }

    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            mode: metadata.mode(),
            size: metadata.size(),
            blocks: metadata.blocks(),
            mtime: metadata.mtime(),
            device: metadata.dev(),
        }
    }

    #[cfg(not(unix))]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        let mode = if file_type.is_dir() {
            S_IFDIR | 0o755
        } else if file_type.is_symlink() {
            S_IFLNK | 0o777
        } else {
            S_IFREG | 0o644
        };
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self {
            mode,
            size: metadata.len(),
            blocks: metadata.len().div_ceil(512),
            mtime,
            device: 0,
        }
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_mode(self.mode)
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == FileKind::Directory
    }
}

/// Attributes of the empty pseudo directories (dot entries, placeholders).
pub(crate) fn pseudo_dir_stat() -> StatInfo {
    StatInfo {
        mode: S_IFDIR,
        ..StatInfo::default()
    }
}

/// Leaf entry or directory.
#[derive(Debug)]
pub enum NodeKind {
    Leaf,
    Dir(DirNode),
}

/// A node in the scanned tree.
#[derive(Debug)]
pub struct Node {
    /// Display name. Lossy for names that are not valid UTF-8.
    pub(crate) name: String,
    /// On-disk name, kept only when `name` could not represent it.
    pub(crate) os_name: Option<OsString>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) stat: StatInfo,
    pub(crate) mount_point: bool,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn leaf(name: String, stat: StatInfo) -> Self {
        Self {
            name,
            os_name: None,
            parent: None,
            stat,
            mount_point: false,
            kind: NodeKind::Leaf,
        }
    }

    pub(crate) fn dir(name: String, stat: StatInfo, dir: DirNode) -> Self {
        Self {
            name,
            os_name: None,
            parent: None,
            stat,
            mount_point: false,
            kind: NodeKind::Dir(dir),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Name as found on disk.
    pub fn os_name(&self) -> OsString {
        self.os_name
            .clone()
            .unwrap_or_else(|| OsString::from(&self.name))
    }

    pub fn stat(&self) -> &StatInfo {
        &self.stat
    }

    pub fn is_mount_point(&self) -> bool {
        self.mount_point
    }

    /// Whether this node can hold children. Independent of the file type bits.
    pub fn is_dir_info(&self) -> bool {
        matches!(self.kind, NodeKind::Dir(_))
    }

    pub fn as_dir(&self) -> Option<&DirNode> {
        match &self.kind {
            NodeKind::Dir(dir) => Some(dir),
            NodeKind::Leaf => None,
        }
    }

    pub(crate) fn as_dir_mut(&mut self) -> Option<&mut DirNode> {
        match &mut self.kind {
            NodeKind::Dir(dir) => Some(dir),
            NodeKind::Leaf => None,
        }
    }

    pub fn is_dot_entry(&self) -> bool {
        self.as_dir().is_some_and(|d| d.is_dot_entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_mode() {
        assert_eq!(FileKind::from_mode(0o100_644), FileKind::File);
        assert_eq!(FileKind::from_mode(0o040_755), FileKind::Directory);
        assert_eq!(FileKind::from_mode(0o120_777), FileKind::Symlink);
        assert_eq!(FileKind::from_mode(0o010_600), FileKind::Fifo);
        assert_eq!(FileKind::from_mode(0), FileKind::Unknown);
    }

    #[test]
    fn cache_fields_derive_blocks() {
        let stat = StatInfo::from_cache_fields(0o100_644, 1025, 42);
        assert_eq!(stat.blocks, 3);
        assert_eq!(stat.mtime, 42);
        assert_eq!(stat.kind(), FileKind::File);
    }

    #[test]
    fn stat_from_real_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.bin");
        std::fs::write(&file, vec![0u8; 3000]).unwrap();

        let stat = StatInfo::from_metadata(&std::fs::symlink_metadata(&file).unwrap());
        assert_eq!(stat.size, 3000);
        assert_eq!(stat.kind(), FileKind::File);

        let dir_stat = StatInfo::from_metadata(&std::fs::symlink_metadata(dir.path()).unwrap());
        assert!(dir_stat.is_dir());
    }

    #[test]
    fn leaf_is_not_dir_info() {
        let node = Node::leaf("a".into(), StatInfo::default());
        assert!(!node.is_dir_info());
        assert!(!node.is_dot_entry());
    }
}
