//! Scanned-directory tree with cached aggregates, read-state tracking and
//! size-sorted iteration, plus a local directory reader and reports.

pub mod app;
pub mod config;
pub mod error;
pub mod event;
pub mod fs;
pub mod log_level;
pub mod report;
