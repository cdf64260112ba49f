//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--sort`, `--exclude`, `--jobs`, etc.)
//! 2. Explicit `--config` file
//! 3. `$DIRSTAT_CONFIG` environment variable (path to config file)
//! 4. Project-local `.dirstat.toml` in the current working directory
//! 5. Global `~/.config/dirstat/config.toml`
//! 6. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::fs::exclude::ExcludeRules;
use crate::fs::reader::{ScanOptions, DEFAULT_MAX_JOBS};
use crate::fs::{SortColumn, SortOrder};
use crate::report::{ReportOptions, DEFAULT_MAX_DEPTH};

// ── Section configs ──────────────────────────────────────────────────────────

/// Directory reader settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory names never descended into. Replaces the built-in list.
    pub exclude: Option<Vec<String>>,
    /// Descend into directories mounted from other filesystems.
    pub cross_filesystems: Option<bool>,
    /// Maximum number of directory reads in flight.
    pub max_jobs: Option<usize>,
}

/// Report settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ReportConfig {
    /// Sort column: "size", "name", "own_size", "blocks", "items", "files",
    /// "subdirs", "mtime".
    pub sort_by: Option<String>,
    /// "asc" or "desc".
    pub sort_order: Option<String>,
    /// Hide entries smaller than this many bytes.
    pub min_size: Option<u64>,
    /// Directory levels shown below the root.
    pub max_depth: Option<usize>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub scan: ScanConfig,
    pub report: ReportConfig,
}

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path, which is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("DIRSTAT_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".dirstat.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("dirstat").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning logged).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => {
            debug!(path = %path.display(), "config file loaded");
            Some(cfg)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse config file");
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            scan: ScanConfig {
                exclude: other.scan.exclude.clone().or(self.scan.exclude),
                cross_filesystems: other.scan.cross_filesystems.or(self.scan.cross_filesystems),
                max_jobs: other.scan.max_jobs.or(self.scan.max_jobs),
            },
            report: ReportConfig {
                sort_by: other.report.sort_by.clone().or(self.report.sort_by),
                sort_order: other.report.sort_order.clone().or(self.report.sort_order),
                min_size: other.report.min_size.or(self.report.min_size),
                max_depth: other.report.max_depth.or(self.report.max_depth),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Lowest priority first so that higher ones overwrite.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            match load_file(cli_path) {
                Some(file_cfg) => config = config.merge(&file_cfg),
                None => warn!(path = %cli_path.display(), "config file not usable"),
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn exclude_rules(&self) -> ExcludeRules {
        match &self.scan.exclude {
            Some(patterns) => ExcludeRules::new(patterns.clone()),
            None => ExcludeRules::defaults(),
        }
    }

    pub fn cross_filesystems(&self) -> bool {
        self.scan.cross_filesystems.unwrap_or(false)
    }

    pub fn max_jobs(&self) -> usize {
        self.scan.max_jobs.unwrap_or(DEFAULT_MAX_JOBS).max(1)
    }

    pub fn sort_column(&self) -> SortColumn {
        self.report
            .sort_by
            .as_deref()
            .map_or(SortColumn::default(), SortColumn::parse)
    }

    pub fn sort_order(&self) -> SortOrder {
        self.report
            .sort_order
            .as_deref()
            .map_or(SortOrder::default(), SortOrder::parse)
    }

    pub fn min_size(&self) -> u64 {
        self.report.min_size.unwrap_or(0)
    }

    pub fn max_depth(&self) -> usize {
        self.report.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            exclude: self.exclude_rules(),
            cross_filesystems: self.cross_filesystems(),
            max_jobs: self.max_jobs(),
        }
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            sort_column: self.sort_column(),
            sort_order: self.sort_order(),
            min_size: self.min_size(),
            max_depth: self.max_depth(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
