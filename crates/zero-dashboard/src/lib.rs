//! The Progress Dashboard (C7, §4.7) — a pure consumer of the hydrate
//! pipeline's event stream. Maintains an in-memory view and redraws the
//! terminal on every event, throttled to roughly one redraw per 100ms
//! (always redrawing immediately on `complete`/`failed`).
//!
//! This is not an interactive application: there is no keyboard input, no
//! alternate screen, no raw mode. It only ever moves the cursor up over its
//! own previously-printed lines and re-emits them, so it composes with a
//! normal scrolling terminal the way `cargo build` or `docker compose up`
//! do. When stdout is not a TTY it falls back to one plain line per event.

mod render;
mod state;
mod theme;

use std::io::IsTerminal as _;
use std::path::Path;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use zero_core::events::{PipelineResult, ProgressEvent};
use zero_core::store::paths;

use state::DashboardState;

/// How often the animated frame redraws in the absence of an urgent event.
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Consumes `rx` until the channel closes (the pipeline's [`zero_core::events::EventSink`]
/// is dropped) or a [`ProgressEvent::PipelineFinished`] arrives, whichever
/// comes first, rendering progress as it goes.
///
/// `home` is the artifact-store root, needed only for the final per-repo
/// size/file-count pass (§4.7); it is never read during the animated phase.
///
/// Returns the pipeline's reported result, if one arrived before the
/// channel closed — `None` if the sender was dropped without ever sending
/// `PipelineFinished` (a caller that wants the authoritative result should
/// still prefer [`zero_core::pipeline::hydrate`]'s own return value; this is
/// for the dashboard's own bookkeeping, e.g. deciding whether to print a
/// failure hint).
#[must_use]
pub fn run(rx: &Receiver<ProgressEvent>, home: &Path) -> Option<PipelineResult> {
    if std::io::stdout().is_terminal() {
        run_animated(rx, home)
    } else {
        run_plain(rx)
    }
}

fn run_animated(rx: &Receiver<ProgressEvent>, home: &Path) -> Option<PipelineResult> {
    let mut dash_state = DashboardState::new();
    let mut lines = 0usize;
    let mut last_redraw = Instant::now() - REDRAW_INTERVAL;
    let spinner_offset = rand::random::<u64>() as usize % theme::SPINNER_FRAMES.len();
    let start = Instant::now();
    let mut result = None;

    loop {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(event) => {
                let urgent = dash_state.apply(&event);
                if let ProgressEvent::PipelineFinished(pipeline_result) = &event {
                    result = Some(pipeline_result.clone());
                }
                if urgent || last_redraw.elapsed() >= REDRAW_INTERVAL {
                    lines = render::redraw(&dash_state, lines, spinner_offset, start);
                    last_redraw = Instant::now();
                }
                if result.is_some() {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if last_redraw.elapsed() >= REDRAW_INTERVAL {
                    lines = render::redraw(&dash_state, lines, spinner_offset, start);
                    last_redraw = Instant::now();
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let sizes: Vec<(String, u64, u64)> = dash_state
        .order
        .iter()
        .map(|project_id| {
            let root = paths::working_copy_dir(home, project_id);
            let (bytes, files) = size_and_file_count(&root);
            (project_id.to_string(), bytes, files)
        })
        .collect();
    render::final_frame(&dash_state, lines, &sizes);

    result
}

fn run_plain(rx: &Receiver<ProgressEvent>) -> Option<PipelineResult> {
    let mut result = None;
    while let Ok(event) = rx.recv() {
        render::print_event_line(&event);
        if let ProgressEvent::PipelineFinished(pipeline_result) = &event {
            result = Some(pipeline_result.clone());
            break;
        }
    }
    result
}

/// Walks `root` once, summing file sizes and counting files, skipping
/// `.git`. Best-effort, matching [`zero_core::pipeline`]'s own file-count
/// walk — any unreadable directory simply contributes nothing further.
fn size_and_file_count(root: &Path) -> (u64, u64) {
    let mut total_bytes = 0u64;
    let mut total_files = 0u64;
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.file_name().and_then(|n| n.to_str()) == Some(".git") {
                continue;
            }
            match entry.file_type() {
                Ok(ft) if ft.is_dir() => stack.push(path),
                Ok(ft) if ft.is_file() => {
                    total_files += 1;
                    total_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
                }
                _ => {}
            }
        }
    }
    (total_bytes, total_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zero_core::events::{CloneStatus, Phase};
    use zero_core::ids::ProjectId;

    #[test]
    fn size_and_file_count_skips_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        std::fs::write(dir.path().join("f.txt"), "hello").unwrap();
        let (bytes, files) = size_and_file_count(dir.path());
        assert_eq!(files, 1);
        assert_eq!(bytes, 5);
    }

    #[test]
    fn run_plain_returns_pipeline_result_from_final_event() {
        let (tx, rx) = std::sync::mpsc::channel();
        let project_id = ProjectId::new("octocat", "hello-world").unwrap();
        tx.send(ProgressEvent::PhaseStarted(Phase::Clone)).unwrap();
        tx.send(ProgressEvent::RepoCloneStarted { project_id: project_id.clone() }).unwrap();
        tx.send(ProgressEvent::RepoCloneEnded { project_id: project_id.clone(), status: CloneStatus::Fresh }).unwrap();
        tx.send(ProgressEvent::PipelineFinished(PipelineResult {
            project_ids: vec![project_id],
            success_count: 1,
            failed_count: 0,
        }))
        .unwrap();
        drop(tx);
        let result = run_plain(&rx);
        assert_eq!(result.map(|r| r.success_count), Some(1));
    }
}
