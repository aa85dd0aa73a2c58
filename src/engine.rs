//! Engine: drives one scan of one log file from connect to close.
//!
//! The engine walks `Idle → Connecting → Scanning → Reporting → Closed`, or
//! drops into `Failed` from any non-terminal state. Whatever happens, the
//! store is closed exactly once before [`ScanEngine::run`] returns.
//!
//! Typical usage:
//!
//! ```no_run
//! use ipsift::{engine::ScanEngine, store::MemoryStore};
//! # fn main() -> Result<(), ipsift::engine::ScanError> {
//! let mut engine = ScanEngine::new(MemoryStore::new());
//! let outcome = engine.run("/app/logs/sample.log")?;
//! println!("{} addresses found", outcome.stats.ips_found);
//! # Ok(())
//! # }
//! ```
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info, warn};

use crate::{
    classify::classify,
    dedup::DedupTracker,
    extract::extract_addresses,
    io::{DEFAULT_MMAP_THRESHOLD_BYTES, LineIter, iter_lines_auto},
    report::{StoreCounts, collect_counts, report},
    stats::{CrossCheck, ScanStats},
    store::{InsertOutcome, StoreError, StoreGateway},
};

pub const DEFAULT_PROGRESS_EVERY: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Connecting,
    Scanning,
    Reporting,
    Closed,
    Failed,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("scan already ran (engine is {0})")]
    NotIdle(ScanState),
    #[error("cannot connect to store: {0}")]
    Store(#[source] StoreError),
    #[error("cannot open log file {}: {reason}", path.display())]
    FileAccess { path: PathBuf, reason: String },
    #[error("read error after {} lines: {source}", stats.lines_processed)]
    Read {
        stats: ScanStats,
        #[source]
        source: io::Error,
    },
}

/// Everything known about a scan that reached `Reporting`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub stats: ScanStats,
    pub counts: StoreCounts,
    pub cross_check: CrossCheck,
    /// Distinct addresses seen in the file.
    pub unique_seen: usize,
    /// The stop flag cut the scan short; counters are partial.
    pub interrupted: bool,
}

/// Where a scan reads its lines from.
enum LineSource<'a> {
    File(&'a Path),
    Lines(LineIter),
}

enum PassEnd {
    Eof,
    Stopped,
    ReadError(io::Error),
}

struct Pass {
    stats: ScanStats,
    unique_seen: usize,
    end: PassEnd,
}

pub struct ScanEngine<S: StoreGateway> {
    store: S,
    state: ScanState,
    mmap_threshold: u64,
    progress_every: u64,
    stop: Option<Arc<AtomicBool>>,
}

impl<S: StoreGateway> ScanEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            state: ScanState::Idle,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD_BYTES,
            progress_every: DEFAULT_PROGRESS_EVERY,
            stop: None,
        }
    }

    /// Files at least this large are memory-mapped. `u64::MAX` disables mmap.
    pub fn with_mmap_threshold(mut self, bytes: u64) -> Self {
        self.mmap_threshold = bytes;
        self
    }

    /// Log a progress line every `lines` lines; 0 disables it.
    pub fn with_progress_every(mut self, lines: u64) -> Self {
        self.progress_every = lines;
        self
    }

    /// When the flag is raised the engine stops reading and reports what it
    /// has so far.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run the scan. Only valid from `Idle`; the engine ends in `Closed`.
    pub fn run<P: AsRef<Path>>(&mut self, path: P) -> Result<ScanOutcome, ScanError> {
        self.run_source(LineSource::File(path.as_ref()))
    }

    /// Same as [`run`](Self::run), but over lines that are already open, such
    /// as a reader wrapped with [`crate::io::iter_lines_reader`].
    pub fn run_lines(&mut self, lines: LineIter) -> Result<ScanOutcome, ScanError> {
        self.run_source(LineSource::Lines(lines))
    }

    fn run_source(&mut self, source: LineSource<'_>) -> Result<ScanOutcome, ScanError> {
        if self.state != ScanState::Idle {
            return Err(ScanError::NotIdle(self.state));
        }
        let result = self.drive(source);
        self.store.close();
        self.transition(ScanState::Closed);
        result
    }

    fn transition(&mut self, next: ScanState) {
        debug!("scan state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn drive(&mut self, source: LineSource<'_>) -> Result<ScanOutcome, ScanError> {
        self.transition(ScanState::Connecting);
        if let Err(e) = self.store.connect() {
            self.transition(ScanState::Failed);
            return Err(ScanError::Store(e));
        }

        let (lines, name) = match source {
            LineSource::File(path) => match iter_lines_auto(path, self.mmap_threshold) {
                Ok(lines) => (lines, path.display().to_string()),
                Err(e) => {
                    self.transition(ScanState::Failed);
                    return Err(ScanError::FileAccess {
                        path: path.to_path_buf(),
                        reason: format!("{e:#}"),
                    });
                }
            },
            LineSource::Lines(lines) => (lines, "<reader>".to_string()),
        };

        self.transition(ScanState::Scanning);
        info!("Starting to process log file: {}", name);
        let pass = self.scan_lines(lines);

        let interrupted = match pass.end {
            PassEnd::Eof => {
                info!("Log file processing completed");
                false
            }
            PassEnd::Stopped => {
                warn!(
                    "Processing interrupted after {} lines; reporting partial counters",
                    pass.stats.lines_processed
                );
                true
            }
            PassEnd::ReadError(source) => {
                error!(
                    "Error reading {} after {} lines: {}",
                    name,
                    pass.stats.lines_processed,
                    source
                );
                let counts = collect_counts(&self.store);
                report(&pass.stats, &counts);
                self.transition(ScanState::Failed);
                return Err(ScanError::Read {
                    stats: pass.stats,
                    source,
                });
            }
        };

        self.transition(ScanState::Reporting);
        let counts = collect_counts(&self.store);
        let cross_check = report(&pass.stats, &counts);
        Ok(ScanOutcome {
            stats: pass.stats,
            counts,
            cross_check,
            unique_seen: pass.unique_seen,
            interrupted,
        })
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn scan_lines(&self, lines: LineIter) -> Pass {
        let mut stats = ScanStats::default();
        let mut tracker = DedupTracker::new();
        let mut end = PassEnd::Eof;
        for line in lines {
            if self.stop_requested() {
                end = PassEnd::Stopped;
                break;
            }
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    end = PassEnd::ReadError(e);
                    break;
                }
            };
            scan_line(&self.store, &line, &mut tracker, &mut stats);
            if self.progress_every > 0 && stats.lines_processed % self.progress_every == 0 {
                info!("Processed {} lines...", stats.lines_processed);
            }
        }
        Pass {
            stats,
            unique_seen: tracker.len(),
            end,
        }
    }
}

/// Process one line: count it, then push each of its addresses through the
/// dedup gate and into the store.
///
/// A store failure is logged and counted in `store_errors`; the address stays
/// marked as seen, so it is not retried later in the same scan.
pub fn scan_line<S: StoreGateway + ?Sized>(
    store: &S,
    line: &str,
    tracker: &mut DedupTracker,
    stats: &mut ScanStats,
) {
    stats.lines_processed += 1;
    for addr in extract_addresses(line.trim()) {
        stats.ips_found += 1;
        if tracker.seen(&addr) {
            stats.within_file_duplicates += 1;
            continue;
        }
        tracker.mark_seen(addr);
        let class = classify(&addr);
        match store.insert_if_absent(class, &addr) {
            Ok(outcome) => {
                match outcome {
                    InsertOutcome::Inserted => debug!("Inserted new {} IP: {}", class, addr),
                    InsertOutcome::AlreadyExists => {
                        debug!("Duplicate {} IP already in database: {}", class, addr)
                    }
                }
                stats.record_outcome(class, outcome);
            }
            Err(e) => {
                error!("Error storing IP {}: {}", addr, e);
                stats.store_errors += 1;
            }
        }
    }
}
