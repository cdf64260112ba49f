//! Local directory reader.
//!
//! Reads run on the blocking pool, at most `max_jobs` at a time. Their
//! results come back over a channel to the single task that owns the tree,
//! which links the new nodes in and settles the read job.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::fs::dir_node::ReadState;
use crate::fs::exclude::ExcludeRules;
use crate::fs::node::{NodeId, StatInfo};
use crate::fs::tree::DirTree;

/// Default number of directory reads in flight.
pub const DEFAULT_MAX_JOBS: usize = 8;

/// How the reader walks the filesystem.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub exclude: ExcludeRules,
    /// Descend into directories on other devices.
    pub cross_filesystems: bool,
    pub max_jobs: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exclude: ExcludeRules::default(),
            cross_filesystems: false,
            max_jobs: DEFAULT_MAX_JOBS,
        }
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    /// Display name; lossy when the on-disk name is not valid UTF-8.
    pub name: String,
    pub os_name: OsString,
    pub stat: StatInfo,
}

#[derive(Debug)]
struct ReadJob {
    dir: NodeId,
    path: PathBuf,
}

#[derive(Debug)]
struct ReadOutcome {
    dir: NodeId,
    path: PathBuf,
    result: io::Result<Vec<DirEntryInfo>>,
}

/// List `path` with `lstat()` attributes for every entry.
///
/// Entries that vanish or cannot be stat'ed are skipped.
pub fn read_entries(path: &Path) -> io::Result<Vec<DirEntryInfo>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let metadata = match std::fs::symlink_metadata(entry.path()) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "cannot stat entry");
                continue;
            }
        };
        let os_name = entry.file_name();
        entries.push(DirEntryInfo {
            name: os_name.to_string_lossy().into_owned(),
            os_name,
            stat: StatInfo::from_metadata(&metadata),
        });
    }
    Ok(entries)
}

/// Populates a [`DirTree`] from the local filesystem.
#[derive(Debug)]
pub struct DirReader {
    options: ScanOptions,
    cancel: Arc<AtomicBool>,
    queue: VecDeque<ReadJob>,
}

impl DirReader {
    pub fn new(options: ScanOptions, cancel: Arc<AtomicBool>) -> Self {
        Self {
            options,
            cancel,
            queue: VecDeque::new(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Scan `path` into `tree`, making it the root. Returns the root id.
    pub async fn scan(&mut self, tree: &mut DirTree, path: &Path) -> Result<NodeId> {
        let metadata = tokio::fs::symlink_metadata(path).await?;
        if !metadata.is_dir() {
            return Err(AppError::InvalidPath(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        let root = tree.new_dir(
            &path.to_string_lossy(),
            &StatInfo::from_metadata(&metadata),
            None,
        );
        tree.set_os_name(root, path.as_os_str().to_owned());
        tree.set_root(root);
        info!(path = %path.display(), "scan started");

        self.read_subtree(tree, root, path.to_path_buf()).await;
        info!(
            path = %path.display(),
            items = tree.total_items(root),
            state = tree.read_state(root).label(),
            "scan done"
        );
        Ok(root)
    }

    /// Throw away everything below `dir` and read it again from disk.
    pub async fn refresh(&mut self, tree: &mut DirTree, dir: NodeId) {
        let path = tree.fs_path(dir);
        debug!(path = %path.display(), "refreshing");
        tree.reset(dir);
        self.read_subtree(tree, dir, path).await;
    }

    /// Read directory `dir`, located at `path`, and everything below it.
    pub async fn read_subtree(&mut self, tree: &mut DirTree, dir: NodeId, path: PathBuf) {
        tree.read_job_added(dir);
        self.queue.push_back(ReadJob { dir, path });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut in_flight = 0usize;

        loop {
            if self.is_cancelled() {
                self.abort_queued(tree);
            }

            while in_flight < self.options.max_jobs.max(1) {
                let Some(job) = self.queue.pop_front() else {
                    break;
                };
                tree.set_read_state(job.dir, ReadState::Reading);
                let tx = tx.clone();
                tokio::task::spawn_blocking(move || {
                    let result = read_entries(&job.path);
                    let _ = tx.send(ReadOutcome {
                        dir: job.dir,
                        path: job.path,
                        result,
                    });
                });
                in_flight += 1;
            }

            if in_flight == 0 {
                break;
            }
            let Some(outcome) = rx.recv().await else {
                break;
            };
            in_flight -= 1;
            self.apply(tree, outcome);
        }
    }

    fn abort_queued(&mut self, tree: &mut DirTree) {
        if !self.queue.is_empty() {
            info!(count = self.queue.len(), "aborting queued reads");
        }
        for job in self.queue.drain(..) {
            tree.set_read_state(job.dir, ReadState::Aborted);
            tree.finalize_local(job.dir);
            tree.read_job_aborted(job.dir);
        }
    }

    fn apply(&mut self, tree: &mut DirTree, outcome: ReadOutcome) {
        let ReadOutcome { dir, path, result } = outcome;

        if self.is_cancelled() {
            tree.set_read_state(dir, ReadState::Aborted);
            tree.finalize_local(dir);
            tree.read_job_aborted(dir);
            return;
        }

        match result {
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read directory");
                tree.set_read_state(dir, ReadState::Error);
            }
            Ok(entries) => {
                debug!(path = %path.display(), entries = entries.len(), "directory read");
                let device = tree.stat(dir).device;
                for entry in entries {
                    if entry.stat.is_dir() {
                        self.add_subdir(tree, dir, &path, entry, device);
                    } else {
                        let file = tree.new_file(&entry.name, &entry.stat, Some(dir));
                        tree.set_os_name(file, entry.os_name);
                    }
                }
                tree.set_read_state(dir, ReadState::Finished);
            }
        }
        tree.finalize_local(dir);
        tree.read_job_finished(dir);
    }

    fn add_subdir(
        &mut self,
        tree: &mut DirTree,
        parent: NodeId,
        parent_path: &Path,
        entry: DirEntryInfo,
        parent_device: u64,
    ) {
        let child = tree.new_dir(&entry.name, &entry.stat, Some(parent));
        let path = parent_path.join(&entry.os_name);
        tree.set_os_name(child, entry.os_name);

        if self.options.exclude.matches_name(&entry.name) {
            debug!(path = %path.display(), "excluded");
            tree.set_excluded(child, true);
            tree.set_read_state(child, ReadState::Finished);
            tree.finalize_local(child);
        } else if entry.stat.device != parent_device && !self.options.cross_filesystems {
            info!(path = %path.display(), "not crossing filesystem boundary");
            tree.set_mount_point(child, true);
            tree.set_read_state(child, ReadState::Finished);
            tree.finalize_local(child);
        } else {
            tree.read_job_added(child);
            self.queue.push_back(ReadJob { dir: child, path });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// root/
    ///   alpha/ (a1: 100 bytes, a2: 200 bytes)
    ///   beta/
    ///     gamma/ (g: 50 bytes)
    ///   node_modules/ (junk: 999 bytes)
    ///   top.txt: 10 bytes
    fn setup_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("alpha")).unwrap();
        std::fs::create_dir_all(root.join("beta/gamma")).unwrap();
        std::fs::create_dir_all(root.join("node_modules")).unwrap();
        std::fs::write(root.join("alpha/a1"), vec![b'a'; 100]).unwrap();
        std::fs::write(root.join("alpha/a2"), vec![b'a'; 200]).unwrap();
        std::fs::write(root.join("beta/gamma/g"), vec![b'g'; 50]).unwrap();
        std::fs::write(root.join("node_modules/junk"), vec![b'j'; 999]).unwrap();
        std::fs::write(root.join("top.txt"), vec![b't'; 10]).unwrap();
        dir
    }

    fn reader(exclude: &[&str]) -> DirReader {
        let options = ScanOptions {
            exclude: ExcludeRules::new(exclude.iter().map(|s| s.to_string()).collect()),
            ..ScanOptions::default()
        };
        DirReader::new(options, Arc::new(AtomicBool::new(false)))
    }

    fn find(tree: &DirTree, parent: NodeId, name: &str) -> NodeId {
        tree.children(parent)
            .find(|c| tree.name(*c) == name)
            .unwrap_or_else(|| panic!("{name} not found"))
    }

    #[test]
    fn read_entries_lists_directory() {
        let dir = setup_test_dir();
        let mut names: Vec<String> = read_entries(dir.path())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["alpha", "beta", "node_modules", "top.txt"]);
    }

    #[tokio::test]
    async fn scan_builds_a_finished_tree() {
        let dir = setup_test_dir();
        let mut tree = DirTree::new();
        let root = reader(&[]).scan(&mut tree, dir.path()).await.unwrap();

        assert_eq!(tree.root(), Some(root));
        assert!(tree.is_finished(root));
        assert_eq!(tree.pending_read_jobs(root), 0);
        assert_eq!(tree.read_state(root), ReadState::Finished);
        assert_eq!(tree.total_files(root), 5);
        assert_eq!(tree.total_sub_dirs(root), 4);

        let alpha = find(&tree, root, "alpha");
        // Only files: moved up out of the dot entry.
        assert!(tree.dot_entry(alpha).is_none());
        assert_eq!(tree.total_files(alpha), 2);
        assert!(tree.total_size(alpha) >= 300);

        // Files next to subdirectories stay in the dot entry.
        let dot = tree.dot_entry(root).expect("root keeps its dot entry");
        assert_eq!(tree.children(dot).count(), 1);
    }

    #[tokio::test]
    async fn excluded_directories_are_not_read() {
        let dir = setup_test_dir();
        let mut tree = DirTree::new();
        let root = reader(&["node_modules"]).scan(&mut tree, dir.path()).await.unwrap();

        let skipped = find(&tree, root, "node_modules");
        assert!(tree.is_excluded(skipped));
        assert_eq!(tree.total_files(skipped), 0);
        assert_eq!(tree.total_files(root), 4);
        assert!(tree.is_finished(root));
    }

    #[tokio::test]
    async fn unreadable_directory_is_an_error_state() {
        let dir = setup_test_dir();
        let mut tree = DirTree::new();
        let mut reader = reader(&[]);
        let root = reader.scan(&mut tree, dir.path()).await.unwrap();

        let ghost = tree.new_dir("ghost", &crate::fs::test_util::dir_stat(0), Some(root));
        reader
            .read_subtree(&mut tree, ghost, dir.path().join("ghost"))
            .await;

        assert_eq!(tree.read_state(ghost), ReadState::Error);
        assert_eq!(tree.pending_read_jobs(root), 0);
        assert!(tree.is_finished(root));
        assert_eq!(tree.read_state(root), ReadState::Finished);
    }

    #[tokio::test]
    async fn cancelled_scan_aborts_and_unwinds() {
        let dir = setup_test_dir();
        let mut tree = DirTree::new();
        let cancel = Arc::new(AtomicBool::new(true));
        let mut reader = DirReader::new(ScanOptions::default(), cancel);
        let root = reader.scan(&mut tree, dir.path()).await.unwrap();

        assert_eq!(tree.read_state(root), ReadState::Aborted);
        assert_eq!(tree.pending_read_jobs(root), 0);
        assert!(tree.is_finished(root));
    }

    #[tokio::test]
    async fn refresh_picks_up_new_files() {
        let dir = setup_test_dir();
        let mut tree = DirTree::new();
        let mut reader = reader(&[]);
        let root = reader.scan(&mut tree, dir.path()).await.unwrap();
        let alpha = find(&tree, root, "alpha");
        assert_eq!(tree.total_files(root), 5);

        std::fs::write(dir.path().join("alpha/a3"), b"new").unwrap();
        reader.refresh(&mut tree, alpha).await;

        assert_eq!(tree.total_files(alpha), 3);
        assert_eq!(tree.total_files(root), 6);
        assert!(tree.is_finished(root));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_utf8_names_are_read_and_refreshed() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let raw = OsStr::from_bytes(b"caf\xe9");
        if std::fs::create_dir(dir.path().join(raw)).is_err() {
            // Some filesystems only accept UTF-8 names.
            return;
        }
        std::fs::write(dir.path().join(raw).join("menu"), vec![b'm'; 5000]).unwrap();

        let mut tree = DirTree::new();
        let mut reader = reader(&[]);
        let root = reader.scan(&mut tree, dir.path()).await.unwrap();
        let cafe = find(&tree, root, "caf\u{fffd}");

        assert_eq!(tree.read_state(cafe), ReadState::Finished);
        assert_eq!(tree.total_files(cafe), 1);
        assert_eq!(tree.fs_path(cafe), dir.path().join(raw));

        std::fs::write(dir.path().join(raw).join("wine"), b"red").unwrap();
        reader.refresh(&mut tree, cafe).await;
        assert_eq!(tree.read_state(cafe), ReadState::Finished);
        assert_eq!(tree.total_files(cafe), 2);
    }

    #[tokio::test]
    async fn scanning_a_file_is_rejected() {
        let dir = setup_test_dir();
        let mut tree = DirTree::new();
        let err = reader(&[])
            .scan(&mut tree, &dir.path().join("top.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidPath(_)));
    }
}
