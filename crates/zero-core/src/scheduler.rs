//! The Per-Repo Scanner Scheduler (C4, §4.4) — runs every scanner requested
//! for one repo, respecting the dependency DAG (C2), the slow-scanner
//! policy, and a bounded worker pool, and propagates skips down the graph.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::mpsc;

use crate::cancel::{CancelToken, Deadline};
use crate::events::EventSink;
use crate::ids::{ProjectId, ScannerName};
use crate::registry::ScannerRegistry;
use crate::runner::{RunOne, ScannerResult, ScannerStatus, SkipReason, run_one};

/// What a scheduler run needs for one repo.
pub struct ScanRequest<'a> {
    pub project_id: ProjectId,
    pub working_copy_path: &'a Path,
    pub output_dir: &'a Path,
    /// Scanners to run, resolved from a profile, each with its own feature
    /// config (see [`crate::registry::ScannerRegistry::resolve_profile`]).
    pub scanners: Vec<(ScannerName, serde_json::Value)>,
    /// Scanners named on the caller's explicit skip list (§4.4).
    pub skip: HashSet<ScannerName>,
    /// File count of the working copy, for the slow-scanner policy (§4.4).
    pub file_count: u64,
    /// Version string stamped into every `ScannerResult` (the orchestrator's
    /// own build version — scanners are in-process and share it).
    pub version: String,
    pub deadline: Deadline,
    pub parallel_scanners: usize,
}

/// The durable result of scanning one repo: every scanner's result, in no
/// particular order (the manifest indexes by scanner name).
#[derive(Clone, Debug, Default)]
pub struct ScanOutcome {
    pub results: Vec<ScannerResult>,
}

impl ScanOutcome {
    /// `true` if any scanner ended `failed`.
    #[must_use]
    pub fn any_failed(&self) -> bool {
        self.results.iter().any(|r| r.status == ScannerStatus::Failed)
    }

    /// Looks up one scanner's result by name.
    #[must_use]
    pub fn get(&self, scanner: &ScannerName) -> Option<&ScannerResult> {
        self.results.iter().find(|r| &r.scanner == scanner)
    }
}

/// Runs every scanner in `req.scanners` for one repo, respecting dependency
/// order and the bounded `req.parallel_scanners` pool.
///
/// Scanners whose dependency failed or was skipped are themselves skipped
/// with [`SkipReason::DependencyUnmet`], cascading down the graph. A scanner
/// declared slow on large repos is skipped with
/// [`SkipReason::SlowOnLargeRepo`] when `req.file_count` exceeds the
/// configured threshold, before any dependency propagation runs. If
/// `cancel` becomes set mid-run, no new scanner is launched and the
/// returned outcome covers only what had already started.
///
/// # Panics
/// Never — an unregistered scanner name in `req.scanners` would be a
/// programmer error from an upstream `resolve_profile` call having already
/// validated names; this function trusts that contract.
#[must_use]
pub fn scan_repo(
    registry: &ScannerRegistry,
    req: &ScanRequest<'_>,
    slow_threshold: u64,
    sink: &EventSink,
    cancel: &CancelToken,
) -> ScanOutcome {
    let feature_config: HashMap<ScannerName, serde_json::Value> = req.scanners.iter().cloned().collect();
    let names: Vec<ScannerName> = req.scanners.iter().map(|(n, _)| n.clone()).collect();
    let ordered = registry
        .topological_order(&names)
        .expect("caller must have already validated the requested scanner set");

    sink.emit(crate::events::ProgressEvent::RepoScanStarted {
        project_id: req.project_id.clone(),
        scanners: ordered.clone(),
    });

    let deps: HashMap<ScannerName, HashSet<ScannerName>> = ordered
        .iter()
        .map(|name| {
            let (descriptor, _) = registry.lookup(name).expect("validated above");
            (name.clone(), descriptor.dependencies.clone())
        })
        .collect();

    let slow = registry.slow_scanners(&ordered);

    let mut forced_skip: HashMap<ScannerName, SkipReason> = HashMap::new();
    for name in &ordered {
        if req.skip.contains(name) {
            forced_skip.insert(name.clone(), SkipReason::User);
        } else if req.file_count > slow_threshold && slow.contains(&name) {
            forced_skip.insert(name.clone(), SkipReason::SlowOnLargeRepo);
        }
    }

    let mut remaining: HashSet<ScannerName> = ordered.iter().cloned().collect();
    let mut results: HashMap<ScannerName, ScannerResult> = HashMap::new();
    let mut in_flight = 0usize;
    let (tx, rx) = mpsc::channel::<ScannerResult>();

    loop {
        // Launch everything newly ready, up to the pool bound.
        let ready: Vec<ScannerName> = ordered
            .iter()
            .filter(|name| remaining.contains(*name))
            .filter(|name| deps[*name].iter().all(|d| results.contains_key(d)))
            .cloned()
            .collect();

        for name in ready {
            if in_flight >= req.parallel_scanners {
                break;
            }
            remaining.remove(&name);

            if let Some(dep_name) = deps[&name].iter().find(|d| {
                results
                    .get(*d)
                    .is_some_and(|r| r.status != ScannerStatus::Complete)
            }) {
                let _ = dep_name;
                let result = ScannerResult::skipped(name.clone(), SkipReason::DependencyUnmet);
                results.insert(name, result);
                continue;
            }

            if let Some(reason) = forced_skip.get(&name) {
                let result = ScannerResult::skipped(name.clone(), reason.clone());
                results.insert(name, result);
                continue;
            }

            // Lost the launch race to cancellation: `name` was already
            // popped from `remaining` above and is deliberately left out of
            // `results` too, rather than recorded as `skipped` — it never
            // started, so per §8 scenario 5 ("not-yet-started scanners do
            // not appear in `analyses`") it must not appear in the manifest
            // at all. Contrast with a scanner already in flight when
            // cancellation lands: `run_one` observes `cancel` mid-wait and
            // still produces a durable `failed(cancelled)` result.
            if cancel.is_cancelled() {
                continue;
            }

            let (_, scanner_fn) = registry.lookup(&name).expect("validated above");
            let scanner_fn = scanner_fn.clone();
            let run_req = RunOne {
                project_id: req.project_id.clone(),
                working_copy_path: req.working_copy_path,
                scanner: name.clone(),
                version: req.version.clone(),
                feature_config: feature_config.get(&name).cloned().unwrap_or(serde_json::Value::Null),
                deadline: req.deadline,
                output_dir: req.output_dir,
            };
            let tx = tx.clone();
            let sink = sink.clone();
            let name_for_thread = name.clone();
            in_flight += 1;
            let cancel_for_thread = cancel.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("repo-scan-{name_for_thread}"))
                .spawn(move || {
                    let result = run_one(&run_req, &scanner_fn, &sink, &cancel_for_thread);
                    let _ = tx.send(result);
                });
            if spawned.is_err() {
                in_flight -= 1;
                let result = ScannerResult::skipped(name.clone(), SkipReason::DependencyUnmet);
                results.insert(name, result);
            }
        }

        if in_flight == 0 {
            // Nothing launched this pass and nothing in flight: either
            // everything is resolved, or cancellation stopped new launches
            // while dependency-blocked scanners remain unresolved forever.
            if remaining.is_empty() || cancel.is_cancelled() {
                break;
            }
            // All remaining are blocked on deps that will never complete
            // (their own dependency chain was forced-skipped); resolve them
            // as dependency-unmet so the loop terminates.
            let blocked: Vec<ScannerName> = remaining.iter().cloned().collect();
            for name in blocked {
                remaining.remove(&name);
                let result = ScannerResult::skipped(name.clone(), SkipReason::DependencyUnmet);
                results.insert(name, result);
            }
            continue;
        }

        if let Ok(result) = rx.recv() {
            in_flight -= 1;
            results.insert(result.scanner.clone(), result);
        }
    }

    sink.emit(crate::events::ProgressEvent::RepoScanEnded {
        project_id: req.project_id.clone(),
        outcome: ScanOutcome {
            results: ordered.iter().filter_map(|n| results.get(n).cloned()).collect(),
        },
    });

    ScanOutcome {
        results: ordered.into_iter().filter_map(|n| results.remove(&n)).collect(),
    }
}
