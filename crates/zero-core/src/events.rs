//! The progress event stream (§4.7, §6) — the single channel C5/C4/C6 emit
//! on and the dashboard (or any other subscriber) consumes.
//!
//! The channel is unbounded: per §5, a producer must never block on an
//! event send. An unbounded `mpsc` channel trivially satisfies that (at the
//! cost of memory, which is bounded in practice by the number of scanners
//! and repos in flight, never by wall-clock time) and keeps reliable
//! delivery for every variant — there is no separate "spinner tick" variant
//! in this design to drop, since the dashboard derives its own spinner frame
//! from wall-clock time rather than from the event stream (see
//! `zero-dashboard`).

use std::sync::mpsc;

use crate::ids::{ProjectId, ScannerName};
use crate::runner::ScannerStatus;
use crate::scheduler::ScanOutcome;

/// The scanner lifecycle state carried on [`ProgressEvent::ScannerProgress`].
///
/// Distinct from [`ScannerStatus`]: that type is the *durable* outcome
/// recorded in the manifest (which has no "still running" state), while
/// this one is the transient state the dashboard renders live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScannerProgressStatus {
    /// The scanner began executing.
    Started,
    /// The scanner finished with [`ScannerStatus::Complete`].
    Complete,
    /// The scanner finished with [`ScannerStatus::Failed`].
    Failed,
    /// The scanner finished with [`ScannerStatus::Skipped`].
    Skipped,
}

impl From<ScannerStatus> for ScannerProgressStatus {
    fn from(status: ScannerStatus) -> Self {
        match status {
            ScannerStatus::Complete => Self::Complete,
            ScannerStatus::Failed => Self::Failed,
            ScannerStatus::Skipped => Self::Skipped,
        }
    }
}

/// One phase of the hydrate pipeline, for [`ProgressEvent::PhaseStarted`] /
/// [`ProgressEvent::PhaseFinished`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Phase 1 — cloning.
    Clone,
    /// Phase 2 — scanning.
    Scan,
    /// Phase 3 — cross-repo aggregation.
    Finalize,
}

impl Phase {
    /// Short, user-facing name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Clone => "clone",
            Self::Scan => "scan",
            Self::Finalize => "finalize",
        }
    }
}

/// Outcome of a single repo's clone attempt, for dashboard and history use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloneStatus {
    /// Served from the on-disk cache with no network call.
    CacheHit,
    /// Freshly cloned from the remote.
    Fresh,
    /// The clone failed; the repo is excluded from the scan phase.
    Failed,
}

/// The final, in-memory result of a completed (or cancelled) hydrate run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineResult {
    /// Every project id that was attempted, in Phase 0 order.
    pub project_ids: Vec<ProjectId>,
    /// Count of repos that reached `ready`.
    pub success_count: usize,
    /// Count of repos that failed clone or scan.
    pub failed_count: usize,
}

/// A single message on the shared progress channel.
///
/// Ordering guarantees (§5): within one scanner in one repo, `started` then
/// `ended` is total order. Across repos, no ordering is guaranteed — the
/// dashboard must be able to interleave events for many `ProjectId`s freely.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// A top-level pipeline phase began.
    PhaseStarted(Phase),
    /// A repo's clone attempt began.
    RepoCloneStarted { project_id: ProjectId },
    /// A repo's clone attempt made incremental progress (best-effort; not
    /// every clone backend reports intermediate progress).
    RepoCloneProgress { project_id: ProjectId, detail: String },
    /// A repo's clone attempt finished.
    RepoCloneEnded { project_id: ProjectId, status: CloneStatus },
    /// A repo's scan phase began, naming the scanners that will run.
    RepoScanStarted { project_id: ProjectId, scanners: Vec<ScannerName> },
    /// One scanner within one repo's scan changed state.
    ScannerProgress {
        project_id: ProjectId,
        scanner: ScannerName,
        status: ScannerProgressStatus,
        summary: Option<String>,
    },
    /// A repo's scan phase finished.
    RepoScanEnded { project_id: ProjectId, outcome: ScanOutcome },
    /// A top-level pipeline phase finished.
    PhaseFinished(Phase),
    /// The whole pipeline finished (successfully, partially, or cancelled).
    PipelineFinished(PipelineResult),
}

/// The sending half of the progress channel. A thin wrapper over
/// `mpsc::Sender` so call sites read as domain operations rather than raw
/// channel sends, and so a send failure (subscriber dropped) is silently
/// absorbed — a missing dashboard must never be able to fail a pipeline run.
#[derive(Clone)]
pub struct EventSink(mpsc::Sender<ProgressEvent>);

impl EventSink {
    /// Emits `event`. Never blocks; never fails the caller even if every
    /// receiver has been dropped.
    pub fn emit(&self, event: ProgressEvent) {
        let _ = self.0.send(event);
    }
}

/// Creates a connected `(EventSink, Receiver)` pair. The sink half is cloned
/// to every worker thread; the receiver is owned by a single consumer
/// (typically the dashboard).
#[must_use]
pub fn channel() -> (EventSink, mpsc::Receiver<ProgressEvent>) {
    let (tx, rx) = mpsc::channel();
    (EventSink(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_after_receiver_dropped_does_not_panic() {
        let (sink, rx) = channel();
        drop(rx);
        sink.emit(ProgressEvent::PhaseStarted(Phase::Clone));
    }

    #[test]
    fn events_are_received_in_send_order() {
        let (sink, rx) = channel();
        sink.emit(ProgressEvent::PhaseStarted(Phase::Clone));
        sink.emit(ProgressEvent::PhaseFinished(Phase::Clone));
        assert!(matches!(rx.recv().unwrap(), ProgressEvent::PhaseStarted(Phase::Clone)));
        assert!(matches!(rx.recv().unwrap(), ProgressEvent::PhaseFinished(Phase::Clone)));
    }
}
