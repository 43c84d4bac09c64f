//! The Scanner Runner (C3, §4.3) — runs one scanner against one working
//! copy with a time budget, classifies its outcome, and emits progress
//! events.
//!
//! A scanner is "a contract, not an implementation" (§4.2): the uniform
//! invocation signature is [`ScannerFn`], a closure taking a [`ScanContext`]
//! and returning `Result<ScannerOutcome, ScannerFailure>`. The registry (C2)
//! is what maps a [`crate::ids::ScannerName`] to one of these.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cancel::{CancelToken, Deadline};
use crate::ids::{ProjectId, ScannerName};

/// How often [`run_one`]'s wait loop re-checks the [`CancelToken`] between
/// deadline ticks. Small enough that a mid-scan cancellation (§5, §8
/// scenario 5) is observed promptly; large enough not to spin the waiting
/// thread.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Grace window after a scanner's deadline elapses before its process is
/// force-terminated (§5). This budget is for scanner implementations that
/// shell out to a subprocess: such a `ScannerFn` should send its child a
/// termination signal when `Deadline::is_expired` becomes true, then wait up
/// to `TIMEOUT_GRACE` for it to exit before killing it outright. In-process
/// closures (this crate's built-in scanners) have no subprocess to signal,
/// so `run_one` does not add this grace to the wait it itself performs —
/// see the module-level note on thread cancellation.
pub const TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// Inputs the scanner closure needs to do its work.
#[derive(Clone, Debug)]
pub struct ScanContext {
    /// The project being scanned.
    pub project_id: ProjectId,
    /// Root of the checked-out working copy.
    pub working_copy_path: PathBuf,
    /// Directory the scanner's `<scanner>.json` (if any) is written under.
    pub output_dir: PathBuf,
    /// Per-scanner feature configuration, opaque to the core (§9).
    pub feature_config: serde_json::Value,
}

/// What a scanner closure returns on success.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScannerOutcome {
    /// A short, human-readable summary (shown by the dashboard and stored
    /// in the manifest's `analyses.<scanner>.summary`).
    pub summary: serde_json::Value,
    /// The scanner's full structured findings.
    pub findings: serde_json::Value,
}

/// Why a scanner closure failed, classified per §4.3 step 4.
#[derive(Clone, Debug)]
pub enum ScannerFailure {
    /// An external binary the scanner shells out to is not installed.
    ToolMissing {
        /// The missing binary's name.
        tool: String,
    },
    /// The scanner's own configuration (e.g. a malformed feature override)
    /// was invalid.
    Config(String),
    /// The scanner ran but failed, or produced output that could not be
    /// interpreted (including invalid JSON written to its output file).
    Execution(String),
}

/// The signature every registered scanner implements. Boxed so the registry
/// can hold heterogeneous scanners behind one uniform call site.
pub type ScannerFn = Arc<dyn Fn(&ScanContext) -> Result<ScannerOutcome, ScannerFailure> + Send + Sync>;

/// Final, durable outcome of running one scanner once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerStatus {
    /// Ran to completion and produced a result.
    Complete,
    /// Ran, but failed (timeout, config error, or execution error).
    Failed,
    /// Did not run at all (user skip-list, missing tool, or unmet dependency).
    Skipped,
}

/// Why a scanner was skipped, for the manifest's `analyses.<scanner>` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Explicitly named in the caller's skip list.
    User,
    /// A declared dependency ended `failed` or `skipped`.
    DependencyUnmet,
    /// The slow-scanner policy excluded it on a large repo.
    SlowOnLargeRepo,
    /// Its required external tool is not installed.
    ToolMissing {
        /// The missing binary's name.
        tool: String,
    },
}

/// The durable record of one scanner run, written into the manifest and
/// (on `Complete`) alongside `<output_dir>/<scanner>.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScannerResult {
    /// The scanner's registered name.
    pub scanner: ScannerName,
    /// The scanner implementation's self-reported version string.
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub status: ScannerStatus,
    /// Present iff `status == Skipped`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    pub summary: serde_json::Value,
    pub findings: serde_json::Value,
    /// Present iff `status == Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScannerResult {
    /// Duration of the run, in whole milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds().max(0)
    }

    /// Builds a `skipped` result with no execution having occurred.
    #[must_use]
    pub fn skipped(scanner: ScannerName, reason: SkipReason) -> Self {
        let now = Utc::now();
        Self {
            scanner,
            version: String::new(),
            started_at: now,
            completed_at: now,
            status: ScannerStatus::Skipped,
            skip_reason: Some(reason),
            summary: serde_json::Value::Null,
            findings: serde_json::Value::Null,
            error: None,
        }
    }
}

/// Everything [`run_one`] needs to run a single scanner against a single
/// working copy.
pub struct RunOne<'a> {
    pub project_id: ProjectId,
    pub working_copy_path: &'a Path,
    pub scanner: ScannerName,
    pub version: String,
    pub feature_config: serde_json::Value,
    pub deadline: Deadline,
    pub output_dir: &'a Path,
}

/// Outcome of [`run_one`]'s wait loop, before it is turned into a
/// [`ScannerResult`].
enum WaitOutcome {
    /// The scanner closure returned (successfully or not) before the
    /// deadline or a cancellation.
    Finished(Result<ScannerOutcome, ScannerFailure>),
    /// The deadline elapsed first.
    TimedOut,
    /// `cancel` was set before the scanner closure finished (§5, §8
    /// scenario 5: "in-flight scanners end as `failed(cancelled)`").
    Cancelled,
}

/// Runs one scanner against one working copy, per the §4.3 contract.
///
/// The scanner closure runs on its own thread so a deadline can be enforced
/// without blocking the caller past it. Because this crate ships in-process
/// (not subprocess) built-in scanners, a timed-out closure cannot be force-
/// terminated the way an external process can (§4.3 step 3 describes
/// sending a signal and force-killing; that applies to scanners that shell
/// out to a subprocess, which own a killable child). Here, timing out or
/// cancelling detaches the worker thread and lets it run to completion in
/// the background; its result, if any, arrives after the deadline/cancel and
/// is discarded. The *caller* never waits past the deadline (or, on
/// cancellation, past the next [`CANCEL_POLL_INTERVAL`] tick).
pub fn run_one(
    req: &RunOne<'_>,
    scanner_fn: &ScannerFn,
    sink: &crate::events::EventSink,
    cancel: &CancelToken,
) -> ScannerResult {
    sink.emit(crate::events::ProgressEvent::ScannerProgress {
        project_id: req.project_id.clone(),
        scanner: req.scanner.clone(),
        status: crate::events::ScannerProgressStatus::Started,
        summary: None,
    });

    let started_at = Utc::now();
    let ctx = ScanContext {
        project_id: req.project_id.clone(),
        working_copy_path: req.working_copy_path.to_path_buf(),
        output_dir: req.output_dir.to_path_buf(),
        feature_config: req.feature_config.clone(),
    };
    let scanner_fn = Arc::clone(scanner_fn);

    let (tx, rx) = mpsc::channel();
    let _ = std::thread::Builder::new()
        .name(format!("scanner-{}", req.scanner))
        .spawn(move || {
            let result = scanner_fn(&ctx);
            let _ = tx.send(result);
        });

    let wait = loop {
        let remaining = req.deadline.remaining().unwrap_or(Duration::from_secs(u64::MAX / 2));
        match rx.recv_timeout(remaining.min(CANCEL_POLL_INTERVAL)) {
            Ok(result) => break WaitOutcome::Finished(result),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                break WaitOutcome::Finished(Err(ScannerFailure::Execution(
                    "scanner thread terminated without a result".to_owned(),
                )));
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if req.deadline.is_expired() {
                    break WaitOutcome::TimedOut;
                }
                if cancel.is_cancelled() {
                    break WaitOutcome::Cancelled;
                }
            }
        }
    };
    let completed_at = Utc::now();

    let (status, skip_reason, summary, findings, error) = match wait {
        WaitOutcome::Finished(Ok(ScannerOutcome { summary, findings })) => {
            if let Err(write_err) = write_output(req.output_dir, req.scanner.as_str(), &findings) {
                (
                    ScannerStatus::Failed,
                    None,
                    serde_json::Value::Null,
                    serde_json::Value::Null,
                    Some(write_err),
                )
            } else {
                (ScannerStatus::Complete, None, summary, findings, None)
            }
        }
        WaitOutcome::Finished(Err(ScannerFailure::ToolMissing { tool })) => (
            ScannerStatus::Skipped,
            Some(SkipReason::ToolMissing { tool }),
            serde_json::Value::Null,
            serde_json::Value::Null,
            None,
        ),
        WaitOutcome::Finished(Err(ScannerFailure::Config(detail))) => (
            ScannerStatus::Failed,
            None,
            serde_json::Value::Null,
            serde_json::Value::Null,
            Some(format!("config error: {detail}")),
        ),
        WaitOutcome::Finished(Err(ScannerFailure::Execution(detail))) => (
            ScannerStatus::Failed,
            None,
            serde_json::Value::Null,
            serde_json::Value::Null,
            Some(detail),
        ),
        WaitOutcome::TimedOut => (
            ScannerStatus::Failed,
            None,
            serde_json::Value::Null,
            serde_json::Value::Null,
            Some("timeout".to_owned()),
        ),
        WaitOutcome::Cancelled => (
            ScannerStatus::Failed,
            None,
            serde_json::Value::Null,
            serde_json::Value::Null,
            Some("cancelled".to_owned()),
        ),
    };

    let result = ScannerResult {
        scanner: req.scanner.clone(),
        version: req.version.clone(),
        started_at,
        completed_at,
        status,
        skip_reason,
        summary: summary.clone(),
        findings,
        error: error.clone(),
    };

    sink.emit(crate::events::ProgressEvent::ScannerProgress {
        project_id: req.project_id.clone(),
        scanner: req.scanner.clone(),
        status: status.into(),
        summary: error.or_else(|| summary_to_string(&summary)),
    });

    result
}

fn summary_to_string(summary: &serde_json::Value) -> Option<String> {
    if summary.is_null() { None } else { Some(summary.to_string()) }
}

fn write_output(output_dir: &Path, scanner: &str, findings: &serde_json::Value) -> Result<(), String> {
    let path = output_dir.join(format!("{scanner}.json"));
    std::fs::create_dir_all(output_dir).map_err(|e| e.to_string())?;
    let mut bytes = serde_json::to_vec_pretty(findings).map_err(|e| e.to_string())?;
    bytes.push(b'\n');
    std::fs::write(&path, bytes).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ScannerName {
        ScannerName::new(s).unwrap()
    }

    fn project() -> ProjectId {
        ProjectId::new("octocat", "hello-world").unwrap()
    }

    #[test]
    fn run_one_complete_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, _rx) = crate::events::channel();
        let scanner_fn: ScannerFn = Arc::new(|_ctx| {
            Ok(ScannerOutcome {
                summary: serde_json::json!({"ok": true}),
                findings: serde_json::json!({"packages": []}),
            })
        });
        let req = RunOne {
            project_id: project(),
            working_copy_path: dir.path(),
            scanner: name("sbom"),
            version: "0.1.0".to_owned(),
            feature_config: serde_json::Value::Null,
            deadline: Deadline::after(5),
            output_dir: dir.path(),
        };
        let result = run_one(&req, &scanner_fn, &sink, &CancelToken::new());
        assert_eq!(result.status, ScannerStatus::Complete);
        assert!(dir.path().join("sbom.json").exists());
    }

    #[test]
    fn run_one_tool_missing_is_skipped_with_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, _rx) = crate::events::channel();
        let scanner_fn: ScannerFn = Arc::new(|_ctx| {
            Err(ScannerFailure::ToolMissing {
                tool: "trufflehog".to_owned(),
            })
        });
        let req = RunOne {
            project_id: project(),
            working_copy_path: dir.path(),
            scanner: name("secrets"),
            version: "0.1.0".to_owned(),
            feature_config: serde_json::Value::Null,
            deadline: Deadline::after(5),
            output_dir: dir.path(),
        };
        let result = run_one(&req, &scanner_fn, &sink, &CancelToken::new());
        assert_eq!(result.status, ScannerStatus::Skipped);
        assert!(matches!(result.skip_reason, Some(SkipReason::ToolMissing { .. })));
        assert!(!dir.path().join("secrets.json").exists());
    }

    #[test]
    fn run_one_execution_error_is_failed() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, _rx) = crate::events::channel();
        let scanner_fn: ScannerFn = Arc::new(|_ctx| Err(ScannerFailure::Execution("boom".to_owned())));
        let req = RunOne {
            project_id: project(),
            working_copy_path: dir.path(),
            scanner: name("license"),
            version: "0.1.0".to_owned(),
            feature_config: serde_json::Value::Null,
            deadline: Deadline::after(5),
            output_dir: dir.path(),
        };
        let result = run_one(&req, &scanner_fn, &sink, &CancelToken::new());
        assert_eq!(result.status, ScannerStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn run_one_timeout_is_failed() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, _rx) = crate::events::channel();
        let scanner_fn: ScannerFn = Arc::new(|_ctx| {
            std::thread::sleep(Duration::from_millis(200));
            Ok(ScannerOutcome::default())
        });
        let req = RunOne {
            project_id: project(),
            working_copy_path: dir.path(),
            scanner: name("sbom"),
            version: "0.1.0".to_owned(),
            feature_config: serde_json::Value::Null,
            deadline: Deadline::after(0),
            output_dir: dir.path(),
        };
        let result = run_one(&req, &scanner_fn, &sink, &CancelToken::new());
        assert_eq!(result.status, ScannerStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn run_one_cancelled_mid_scan_is_failed_with_cancelled_error() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, _rx) = crate::events::channel();
        let scanner_fn: ScannerFn = Arc::new(|_ctx| {
            std::thread::sleep(Duration::from_millis(300));
            Ok(ScannerOutcome::default())
        });
        let req = RunOne {
            project_id: project(),
            working_copy_path: dir.path(),
            scanner: name("sbom"),
            version: "0.1.0".to_owned(),
            feature_config: serde_json::Value::Null,
            deadline: Deadline::after(5),
            output_dir: dir.path(),
        };
        let cancel = CancelToken::new();
        let cancel_setter = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            cancel_setter.cancel();
        });
        let result = run_one(&req, &scanner_fn, &sink, &cancel);
        assert_eq!(result.status, ScannerStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("cancelled"));
    }

    #[test]
    fn duration_ms_is_non_negative() {
        let result = ScannerResult::skipped(name("sbom"), SkipReason::User);
        assert!(result.duration_ms() >= 0);
    }
}
