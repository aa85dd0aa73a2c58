//! CLI entrypoint for `ipsift`.
//!
//! Reads configuration from flags or the environment, connects to the address
//! store, scans one log file, and logs a summary. The exit code tells callers
//! which stage failed.
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ipsift::{
    engine::{DEFAULT_PROGRESS_EVERY, ScanEngine, ScanError},
    io::DEFAULT_MMAP_THRESHOLD_BYTES,
    mongo::{DEFAULT_URI, MongoStore},
    store::{DEFAULT_DATABASE, MemoryStore, StoreGateway},
};
use log::{LevelFilter, error, info, warn};

const EXIT_STORE: u8 = 2;
const EXIT_FILE: u8 = 3;
const EXIT_READ: u8 = 4;
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "ipsift",
    version,
    about = "Extract IPv4 addresses from a log file into public/private collections"
)]
struct Args {
    /// Path to the log file to scan
    #[arg(
        short = 'f',
        long = "log-file",
        env = "LOG_FILE_PATH",
        default_value = "/app/logs/sample.log"
    )]
    log_file: PathBuf,

    /// MongoDB connection string
    #[arg(long = "mongodb-uri", env = "MONGODB_URI", default_value = DEFAULT_URI)]
    mongodb_uri: String,

    /// Database holding the public_ips/private_ips collections
    #[arg(long = "database", env = "MONGODB_DATABASE", default_value = DEFAULT_DATABASE)]
    database: String,

    /// Store connection timeout in seconds
    #[arg(long = "timeout", env = "IPSIFT_TIMEOUT_SECS", default_value_t = 5)]
    timeout_secs: u64,

    /// Use an in-memory store; nothing is persisted
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Override mmap threshold in bytes. If zero, disable mmap.
    #[arg(long = "mmap-threshold", default_value_t = DEFAULT_MMAP_THRESHOLD_BYTES)]
    mmap_threshold: u64,

    /// Log progress every N lines (0 disables)
    #[arg(long = "progress-every", default_value_t = DEFAULT_PROGRESS_EVERY)]
    progress_every: u64,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors (hides the summary)
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn init_logger(verbosity: u8, quiet: bool) {
    let level = match (quiet, verbosity) {
        (true, _) => LevelFilter::Warn,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn install_interrupt_handler() -> Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })
    .context("failed to set Ctrl+C handler")?;
    Ok(stop)
}

fn scan<S: StoreGateway>(store: S, args: &Args, stop: Option<Arc<AtomicBool>>) -> ExitCode {
    let threshold = if args.mmap_threshold == 0 {
        u64::MAX
    } else {
        args.mmap_threshold
    };
    let mut engine = ScanEngine::new(store)
        .with_mmap_threshold(threshold)
        .with_progress_every(args.progress_every);
    if let Some(stop) = stop {
        engine = engine.with_stop_flag(stop);
    }
    match engine.run(&args.log_file) {
        Ok(outcome) if outcome.interrupted => {
            warn!("Processing interrupted by user");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Ok(_) => {
            info!("IP processing completed successfully");
            ExitCode::SUCCESS
        }
        Err(e @ ScanError::Store(_)) => {
            error!("{}. Exiting.", e);
            ExitCode::from(EXIT_STORE)
        }
        Err(e @ ScanError::FileAccess { .. }) => {
            error!("{}", e);
            ExitCode::from(EXIT_FILE)
        }
        Err(e) => {
            error!("IP processing failed: {}", e);
            ExitCode::from(EXIT_READ)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logger(args.verbose, args.quiet);

    let stop = match install_interrupt_handler() {
        Ok(stop) => Some(stop),
        Err(e) => {
            warn!("{:#} (continuing without interrupt handling)", e);
            None
        }
    };

    if args.dry_run {
        info!("dry run: using in-memory store, nothing will be persisted");
        scan(MemoryStore::new(), &args, stop)
    } else {
        let store = MongoStore::new(args.mongodb_uri.clone(), args.database.clone())
            .with_timeout(Duration::from_secs(args.timeout_secs));
        scan(store, &args, stop)
    }
}
