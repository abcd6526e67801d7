//! Scan orchestration.
//!
//! [`run_scan`] drives one scan synchronously: it enumerates archives, runs
//! the [`ArchiveScanner`] over each one in order, and reports status and
//! progress to a [`ProgressSink`]. [`ScanEngine`] runs the same driver on a
//! background worker thread and enforces that only one scan is in flight.
//!
//! State machine: `Idle -> Running -> {Completed | Cancelled | Failed} -> Idle`.
//! The engine goes back to `Idle` once the caller collects the report with
//! [`ScanHandle::wait`].

use crate::config::ScanConfig;
use crate::criteria::Criterion;
use crate::error::{Result, SiftError};
use crate::expr::Expression;
use crate::progress::{CancelToken, ChannelProgress, ProgressSink, ScanEvent};
use crate::scanner::{archive_display_name, find_archives, ArchiveScanner};
use crate::types::{count_matches, ResultRow};
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

/// Lifecycle state of a [`ScanEngine`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanState {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// What to scan and what to look for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Folder holding the archives
    pub folder: PathBuf,
    /// Descend into subfolders
    pub recursive: bool,
    /// Criteria in list order; inactive ones are ignored
    pub criteria: Vec<Criterion>,
}

impl ScanRequest {
    /// Create a top-level-only request
    pub fn new(folder: impl Into<PathBuf>, criteria: Vec<Criterion>) -> Self {
        ScanRequest {
            folder: folder.into(),
            recursive: false,
            criteria,
        }
    }

    /// Set whether subfolders are searched
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
}

/// How a scan ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScanOutcome {
    Completed,
    Cancelled,
    /// A run-level failure, with its message
    Failed(String),
}

impl ScanOutcome {
    /// The terminal engine state for this outcome
    pub fn state(&self) -> ScanState {
        match self {
            ScanOutcome::Completed => ScanState::Completed,
            ScanOutcome::Cancelled => ScanState::Cancelled,
            ScanOutcome::Failed(_) => ScanState::Failed,
        }
    }
}

/// Result of a finished scan.
///
/// `rows` holds everything accumulated before the scan stopped, whatever the
/// outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    pub rows: Vec<ResultRow>,
    /// Data rows in `rows`, synthesized headers excluded
    pub matched_rows: usize,
    pub archives_found: usize,
    pub archives_scanned: usize,
    pub archive_errors: usize,
    /// Final status line
    pub message: String,
}

impl ScanReport {
    fn new(outcome: ScanOutcome, rows: Vec<ResultRow>, message: String) -> Self {
        ScanReport {
            outcome,
            matched_rows: count_matches(&rows),
            rows,
            archives_found: 0,
            archives_scanned: 0,
            archive_errors: 0,
            message,
        }
    }
}

/// Run a scan on the current thread.
pub fn run_scan(
    request: &ScanRequest,
    options: &ScanConfig,
    cancel: &CancelToken,
    sink: &dyn ProgressSink,
) -> ScanReport {
    let criteria: Vec<Criterion> = request
        .criteria
        .iter()
        .filter(|c| c.is_active())
        .cloned()
        .collect();
    let expression = Expression::from_criteria(&criteria);
    let scanner =
        ArchiveScanner::new(&criteria, &expression).with_entry_extension(&options.entry_extension);

    info!(
        folder = %request.folder.display(),
        recursive = request.recursive,
        criteria = criteria.len(),
        "Starting scan"
    );
    sink.on_status("Starting search...");

    let archives = match find_archives(
        &request.folder,
        request.recursive,
        &options.archive_extension,
    ) {
        Ok(archives) => archives,
        Err(e) => {
            error!(error = %e, "Scan failed");
            let message = format!("An error occurred: {}", e);
            sink.on_status(&message);
            return ScanReport::new(ScanOutcome::Failed(e.to_string()), Vec::new(), message);
        }
    };

    let total = archives.len();
    let mut rows = Vec::new();
    let mut scanned = 0;
    let mut errors = 0;
    let mut cancelled = false;

    for (i, path) in archives.iter().enumerate() {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let name = archive_display_name(path);
        sink.on_status(&format!("Searching in: {}", name));

        match scanner.scan_file(path, cancel, &mut rows) {
            Ok(stats) => {
                scanned += 1;
                if stats.cancelled {
                    cancelled = true;
                    break;
                }
            }
            Err(e) => {
                errors += 1;
                warn!(archive = %name, error = %e, "Archive skipped");
                sink.on_status(&format!("Error reading {}: {}", name, failure_reason(&e)));
            }
        }

        sink.on_progress((i + 1) as f64 / total as f64 * 100.0);
    }

    // A cancel during the last entry is only visible here
    if cancel.is_cancelled() {
        cancelled = true;
    }

    let matched = count_matches(&rows);
    let (outcome, message) = if cancelled {
        (ScanOutcome::Cancelled, "Search was canceled.".to_string())
    } else {
        (
            ScanOutcome::Completed,
            format!("Search complete. Found {} matching rows.", matched),
        )
    };
    sink.on_status(&message);

    info!(
        archives = total,
        scanned,
        errors,
        matched,
        cancelled,
        "Scan finished"
    );

    let mut report = ScanReport::new(outcome, rows, message);
    report.archives_found = total;
    report.archives_scanned = scanned;
    report.archive_errors = errors;
    report
}

/// Archive errors already carry the archive name; the status line names it
/// separately.
fn failure_reason(err: &SiftError) -> String {
    match err {
        SiftError::Archive { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

/// Snapshot of an engine's state for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanStatus {
    pub state: ScanState,
    /// Latest status line
    pub message: String,
    /// Latest completion percentage
    pub progress: f64,
    /// Matched rows of the last finished scan
    pub matched_rows: usize,
}

/// Forwards events to the handle and mirrors them into the status snapshot.
struct EngineSink {
    channel: ChannelProgress,
    status: Arc<Mutex<ScanStatus>>,
}

impl EngineSink {
    fn finish(&self, report: &ScanReport) {
        let mut status = self.status.lock();
        status.state = report.outcome.state();
        status.matched_rows = report.matched_rows;
        status.message = report.message.clone();
    }
}

impl ProgressSink for EngineSink {
    fn on_status(&self, message: &str) {
        self.status.lock().message = message.to_string();
        self.channel.on_status(message);
    }

    fn on_progress(&self, percent: f64) {
        self.status.lock().progress = percent;
        self.channel.on_progress(percent);
    }
}

/// Runs scans on a background worker, one at a time.
pub struct ScanEngine {
    options: ScanConfig,
    status: Arc<Mutex<ScanStatus>>,
}

impl ScanEngine {
    /// Create an idle engine
    pub fn new(options: ScanConfig) -> Self {
        ScanEngine {
            options,
            status: Arc::new(Mutex::new(ScanStatus::default())),
        }
    }

    /// Current state snapshot
    pub fn status(&self) -> ScanStatus {
        self.status.lock().clone()
    }

    /// Returns true while a scan is in flight
    pub fn is_running(&self) -> bool {
        self.status.lock().state == ScanState::Running
    }

    /// Start a scan on a worker thread.
    ///
    /// Fails with [`SiftError::ScanInProgress`] if a scan is already running.
    pub fn start(&self, request: ScanRequest) -> Result<ScanHandle> {
        {
            let mut status = self.status.lock();
            if status.state == ScanState::Running {
                return Err(SiftError::ScanInProgress);
            }
            *status = ScanStatus {
                state: ScanState::Running,
                ..ScanStatus::default()
            };
        }

        let (channel, events) = ChannelProgress::new();
        let sink = EngineSink {
            channel,
            status: Arc::clone(&self.status),
        };
        let options = self.options.clone();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();

        let spawned = thread::Builder::new()
            .name("csvsift-scan".to_string())
            .spawn(move || {
                let report = run_scan(&request, &options, &worker_cancel, &sink);
                sink.finish(&report);
                report
            });

        match spawned {
            Ok(join) => Ok(ScanHandle {
                events,
                cancel,
                join,
                status: Arc::clone(&self.status),
            }),
            Err(e) => {
                self.status.lock().state = ScanState::Idle;
                Err(SiftError::Internal(format!(
                    "failed to spawn scan worker: {}",
                    e
                )))
            }
        }
    }
}

impl Default for ScanEngine {
    fn default() -> Self {
        ScanEngine::new(ScanConfig::default())
    }
}

/// Caller's side of a running scan.
///
/// The event channel closes when the worker finishes, so iterating
/// [`ScanHandle::events`] ends right before the report is ready.
pub struct ScanHandle {
    events: Receiver<ScanEvent>,
    cancel: CancelToken,
    join: JoinHandle<ScanReport>,
    status: Arc<Mutex<ScanStatus>>,
}

impl ScanHandle {
    /// Status and progress events
    pub fn events(&self) -> &Receiver<ScanEvent> {
        &self.events
    }

    /// A token that cancels this scan
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until the worker is done and collect its report.
    pub fn wait(self) -> Result<ScanReport> {
        let joined = self.join.join();

        let mut status = self.status.lock();
        let result = match joined {
            Ok(report) => Ok(report),
            Err(_) => {
                status.message = "An error occurred: scan worker panicked".to_string();
                Err(SiftError::Internal("scan worker panicked".to_string()))
            }
        };
        // A Running state here belongs to a newer scan.
        if status.state != ScanState::Running || result.is_err() {
            status.state = ScanState::Idle;
        }
        result
    }
}
