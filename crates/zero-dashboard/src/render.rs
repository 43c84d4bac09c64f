//! Redraw discipline (§4.7): move the cursor up by the previous frame's
//! line count, clear to end of screen, re-emit. Falls back to one line per
//! event when stdout is not a TTY.

use std::io::Write as _;
use std::time::Instant;

use crossterm::cursor::MoveUp;
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};

use crate::state::{DashboardState, RepoDisplay, RepoPhase};
use crate::theme;

fn status_glyph(phase: &RepoPhase, spinner_frame: char) -> (char, Color) {
    match phase {
        RepoPhase::Pending => (theme::ICON_PENDING, theme::PENDING),
        RepoPhase::Cloning => (theme::ICON_CLONING, theme::ACTIVE),
        RepoPhase::Cloned => (spinner_frame, theme::ACTIVE),
        RepoPhase::Scanning => (spinner_frame, theme::ACTIVE),
        RepoPhase::Done { success: true } => (theme::ICON_COMPLETE, theme::COMPLETE),
        RepoPhase::Done { success: false } => (theme::ICON_FAILED, theme::FAILED),
    }
}

/// Renders one repo row, per §4.7's column layout.
fn repo_line(repo: &RepoDisplay, spinner_frame: char) -> String {
    let (glyph, _) = status_glyph(&repo.phase, spinner_frame);
    let mut line = format!("{glyph} {}", repo.project_id);

    match &repo.phase {
        RepoPhase::Scanning => {
            if let Some(scanner) = &repo.active_scanner {
                line.push_str(&format!(" {scanner}"));
            }
            line.push_str(&format!(
                " [{}/{} complete, {} queued]",
                repo.scanners_done,
                repo.scanners_total,
                repo.scanners_total.saturating_sub(repo.scanners_done),
            ));
        }
        RepoPhase::Done { success: false } => line.push_str(" failed"),
        _ => {}
    }

    line.push_str(&format!(" ({}s)", repo.elapsed_secs()));
    line
}

/// Redraws the animated frame, returning the number of lines emitted (for
/// the next call's cursor-up distance).
pub fn redraw(state: &DashboardState, previous_lines: usize, spinner_offset: usize, start: Instant) -> usize {
    let mut out = std::io::stdout();

    if previous_lines > 0 {
        let _ = queue!(out, MoveUp(previous_lines as u16), Clear(ClearType::FromCursorDown));
    }

    let spinner_index = (spinner_offset + (start.elapsed().as_millis() / 100) as usize) % theme::SPINNER_FRAMES.len();
    let spinner_frame = theme::SPINNER_FRAMES[spinner_index];

    let mut lines = 0usize;
    if let Some(phase) = state.phase {
        let _ = queue!(
            out,
            SetForegroundColor(theme::HEADING),
            Print(format!("phase: {}\n", phase.label())),
            ResetColor,
        );
        lines += 1;
    }

    for project_id in &state.order {
        let Some(repo) = state.repos.get(project_id) else { continue };
        let (_, color) = status_glyph(&repo.phase, spinner_frame);
        let _ = queue!(out, SetForegroundColor(color), Print(repo_line(repo, spinner_frame)), ResetColor, Print("\n"));
        lines += 1;
    }

    let _ = out.flush();
    lines
}

/// One line per event, no cursor movement — the non-TTY fallback (§4.7).
pub fn print_event_line(event: &zero_core::events::ProgressEvent) {
    println!("{}", describe_event(event));
}

fn describe_event(event: &zero_core::events::ProgressEvent) -> String {
    use zero_core::events::ProgressEvent;
    match event {
        ProgressEvent::PhaseStarted(phase) => format!("phase started: {}", phase.label()),
        ProgressEvent::PhaseFinished(phase) => format!("phase finished: {}", phase.label()),
        ProgressEvent::RepoCloneStarted { project_id } => format!("{project_id}: clone started"),
        ProgressEvent::RepoCloneProgress { project_id, detail } => format!("{project_id}: clone progress: {detail}"),
        ProgressEvent::RepoCloneEnded { project_id, status } => format!("{project_id}: clone ended: {status:?}"),
        ProgressEvent::RepoScanStarted { project_id, scanners } => {
            format!("{project_id}: scan started ({} scanners)", scanners.len())
        }
        ProgressEvent::ScannerProgress { project_id, scanner, status, .. } => {
            format!("{project_id}: {scanner}: {status:?}")
        }
        ProgressEvent::RepoScanEnded { project_id, outcome } => {
            format!(
                "{project_id}: scan ended ({} failed)",
                outcome.results.iter().filter(|r| r.status == zero_core::runner::ScannerStatus::Failed).count()
            )
        }
        ProgressEvent::PipelineFinished(result) => {
            format!(
                "pipeline finished: {} succeeded, {} failed",
                result.success_count, result.failed_count
            )
        }
    }
}

/// Clears the animated section and prints the settled final frame (§4.7):
/// one line per repo with size/file-count, then a totals summary.
pub fn final_frame(state: &DashboardState, previous_lines: usize, sizes: &[(String, u64, u64)]) {
    let mut out = std::io::stdout();
    if previous_lines > 0 {
        let _ = queue!(out, MoveUp(previous_lines as u16), Clear(ClearType::FromCursorDown));
    }

    for (name, bytes, files) in sizes {
        println!("{} {name}  {}  {files} files", theme::ICON_COMPLETE, human_bytes(*bytes));
    }

    let success = state
        .repos
        .values()
        .filter(|r| matches!(r.phase, RepoPhase::Done { success: true }))
        .count();
    let failed = state
        .repos
        .values()
        .filter(|r| matches!(r.phase, RepoPhase::Done { success: false }))
        .count();

    println!("{success} succeeded, {failed} failed, {} total", state.order.len());
    if failed > 0 {
        println!("run `zero status` for details, or `zero hydrate --retry-failed` to retry");
    }
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
