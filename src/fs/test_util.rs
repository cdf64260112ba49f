use crate::fs::node::{StatInfo, S_IFDIR};

/// Stat attributes of a directory entry with the given own size.
pub(crate) fn dir_stat(size: u64) -> StatInfo {
    StatInfo {
        mode: S_IFDIR | 0o755,
        size,
        blocks: size.div_ceil(512),
        mtime: 0,
        device: 1,
    }
}

/// Stat attributes of a plain file.
pub(crate) fn file_stat(size: u64, mtime: i64) -> StatInfo {
    StatInfo {
        mode: 0o100_644,
        size,
        blocks: size.div_ceil(512),
        mtime,
        device: 1,
    }
}
