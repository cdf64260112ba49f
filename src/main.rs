use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clap::Parser;
use tracing::{debug, warn};

use dirstat::app::App;
use dirstat::config::{AppConfig, ReportConfig, ScanConfig};
use dirstat::error::{self, AppError};
use dirstat::log_level::LogLevel;
use dirstat::report::parse_size;

/// Show where the disk space under a directory went.
#[derive(Parser, Debug)]
#[command(name = "dirstat", version, about)]
struct Cli {
    /// Directory to scan (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Config file, applied on top of the discovered ones
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sort column: size, name, own_size, blocks, items, files, subdirs, mtime
    #[arg(long)]
    sort: Option<String>,

    /// Sort order: asc or desc
    #[arg(long)]
    order: Option<String>,

    /// Hide entries smaller than this (e.g. 4096, 10K, 1.5M)
    #[arg(long, value_parser = parse_size)]
    min_size: Option<u64>,

    /// Directory levels shown below the root
    #[arg(long)]
    depth: Option<usize>,

    /// Directory name not to descend into (repeatable; replaces the defaults)
    #[arg(long)]
    exclude: Vec<String>,

    /// Descend into other mounted filesystems
    #[arg(long)]
    cross_filesystems: bool,

    /// Maximum number of directory reads in flight
    #[arg(long)]
    jobs: Option<usize>,

    /// Load a saved scan instead of reading the disk
    #[arg(long)]
    read_cache: Option<PathBuf>,

    /// Save the scan to this file
    #[arg(long)]
    write_cache: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    #[arg(long, value_enum, default_value_t = LogLevel::default())]
    log_level: LogLevel,
}

impl Cli {
    /// Config overrides taken from the flags that were given.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            scan: ScanConfig {
                exclude: (!self.exclude.is_empty()).then(|| self.exclude.clone()),
                cross_filesystems: self.cross_filesystems.then_some(true),
                max_jobs: self.jobs,
            },
            report: ReportConfig {
                sort_by: self.sort.clone(),
                sort_order: self.order.clone(),
                min_size: self.min_size,
                max_depth: self.depth,
            },
        }
    }
}

fn setup_tracing(level: LogLevel) {
    if let Some(level) = level.to_tracing_level() {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .without_time()
            .compact()
            .init();
    }
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.log_level);
    debug!("Parsed CLI arguments: {cli:?}");

    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));
    let mut app = App::new(config);

    let cancel = app.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, aborting scan");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    if let Some(cache) = &cli.read_cache {
        app.load_cache(cache)?;
    } else {
        let path = cli
            .path
            .canonicalize()
            .map_err(|_| AppError::InvalidPath(format!("{} does not exist", cli.path.display())))?;
        app.scan(&path).await?;
    }

    if let Some(out) = &cli.write_cache {
        app.save_cache(out)?;
    }

    let report = app.report(cli.json)?;
    println!("{}", report.trim_end());
    Ok(())
}
