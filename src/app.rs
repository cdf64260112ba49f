use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::event::{track_progress, ScanProgress};
use crate::fs::cache::{read_cache, write_cache};
use crate::fs::reader::DirReader;
use crate::fs::{DirTree, NodeId};
use crate::report;

/// Main application state: the configuration and the tree it works on.
pub struct App {
    config: AppConfig,
    tree: DirTree,
    root: Option<NodeId>,
    cancel: Arc<AtomicBool>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            tree: DirTree::new(),
            root: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn tree(&self) -> &DirTree {
        &self.tree
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Flag that aborts a running scan once set.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn require_root(&self) -> Result<NodeId> {
        self.root.ok_or(AppError::NoTree)
    }

    /// Scan `path` into a fresh tree, replacing the current one.
    pub async fn scan(&mut self, path: &Path) -> Result<ScanProgress> {
        let (tx, rx) = mpsc::unbounded_channel();
        let tracker = tokio::spawn(track_progress(rx));
        self.tree = DirTree::with_events(tx);
        self.root = None;

        let mut reader = DirReader::new(self.config.scan_options(), self.cancel_flag());
        let result = reader.scan(&mut self.tree, path).await;

        self.tree.detach_events();
        let progress = tracker.await.unwrap_or_default();
        self.root = Some(result?);
        Ok(progress)
    }

    /// Read a previously saved scan, replacing the current tree.
    pub fn load_cache(&mut self, path: &Path) -> Result<NodeId> {
        let file = File::open(path)?;
        self.tree = DirTree::new();
        self.root = None;
        let root = read_cache(&mut self.tree, BufReader::new(file))?;
        self.root = Some(root);
        Ok(root)
    }

    pub fn save_cache(&self, path: &Path) -> Result<()> {
        let root = self.require_root()?;
        let file = File::create(path)?;
        write_cache(&self.tree, root, BufWriter::new(file))?;
        info!(path = %path.display(), "cache saved");
        Ok(())
    }

    /// Render the current tree as text, or as JSON if `json` is set.
    pub fn report(&self, json: bool) -> Result<String> {
        let root = self.require_root()?;
        let options = self.config.report_options();
        if json {
            report::render_json(&self.tree, root, &options)
        } else {
            Ok(report::render_text(&self.tree, root, &options))
        }
    }
}
