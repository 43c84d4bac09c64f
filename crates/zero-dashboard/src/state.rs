//! In-memory view the dashboard redraws from: `{phase, per_repo_state}`
//! (§4.7), rebuilt incrementally as [`ProgressEvent`]s arrive.

use std::collections::BTreeMap;
use std::time::Instant;

use zero_core::events::{CloneStatus, Phase, ProgressEvent, ScannerProgressStatus};
use zero_core::ids::{ProjectId, ScannerName};

/// Where one repo currently sits in the two-phase pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RepoPhase {
    Pending,
    Cloning,
    Cloned,
    Scanning,
    Done { success: bool },
}

/// One repo row's live state (§4.7's `RepoDisplay`).
#[derive(Clone, Debug)]
pub struct RepoDisplay {
    pub project_id: ProjectId,
    pub phase: RepoPhase,
    pub clone_status: Option<CloneStatus>,
    pub scanners_total: usize,
    pub scanners_done: usize,
    pub active_scanner: Option<ScannerName>,
    pub started_at: Instant,
}

impl RepoDisplay {
    fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            phase: RepoPhase::Pending,
            clone_status: None,
            scanners_total: 0,
            scanners_done: 0,
            active_scanner: None,
            started_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// The dashboard's whole in-memory view, updated by [`DashboardState::apply`].
pub struct DashboardState {
    pub phase: Option<Phase>,
    pub order: Vec<ProjectId>,
    pub repos: BTreeMap<ProjectId, RepoDisplay>,
}

impl DashboardState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: None,
            order: Vec::new(),
            repos: BTreeMap::new(),
        }
    }

    fn entry(&mut self, project_id: &ProjectId) -> &mut RepoDisplay {
        if !self.repos.contains_key(project_id) {
            self.order.push(project_id.clone());
            self.repos.insert(project_id.clone(), RepoDisplay::new(project_id.clone()));
        }
        self.repos.get_mut(project_id).unwrap_or_else(|| unreachable!("just inserted"))
    }

    /// Folds one event into the view. Returns `true` if this event is
    /// "urgent" (§4.7: `complete`/`failed` always force an immediate redraw).
    pub fn apply(&mut self, event: &ProgressEvent) -> bool {
        match event {
            ProgressEvent::PhaseStarted(phase) => {
                self.phase = Some(*phase);
                false
            }
            ProgressEvent::PhaseFinished(_) => false,
            ProgressEvent::RepoCloneStarted { project_id } => {
                let repo = self.entry(project_id);
                repo.phase = RepoPhase::Cloning;
                repo.started_at = Instant::now();
                false
            }
            ProgressEvent::RepoCloneProgress { project_id, .. } => {
                self.entry(project_id);
                false
            }
            ProgressEvent::RepoCloneEnded { project_id, status } => {
                let failed = *status == CloneStatus::Failed;
                let repo = self.entry(project_id);
                repo.clone_status = Some(*status);
                repo.phase = if failed { RepoPhase::Done { success: false } } else { RepoPhase::Cloned };
                true
            }
            ProgressEvent::RepoScanStarted { project_id, scanners } => {
                let repo = self.entry(project_id);
                repo.phase = RepoPhase::Scanning;
                repo.scanners_total = scanners.len();
                repo.scanners_done = 0;
                repo.active_scanner = None;
                false
            }
            ProgressEvent::ScannerProgress { project_id, scanner, status, .. } => {
                let repo = self.entry(project_id);
                match status {
                    ScannerProgressStatus::Started => repo.active_scanner = Some(scanner.clone()),
                    ScannerProgressStatus::Complete | ScannerProgressStatus::Failed | ScannerProgressStatus::Skipped => {
                        repo.scanners_done += 1;
                        if repo.active_scanner.as_ref() == Some(scanner) {
                            repo.active_scanner = None;
                        }
                    }
                }
                false
            }
            ProgressEvent::RepoScanEnded { project_id, outcome } => {
                let success = !outcome.any_failed();
                let repo = self.entry(project_id);
                repo.phase = RepoPhase::Done { success };
                true
            }
            ProgressEvent::PipelineFinished(_) => true,
        }
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}
