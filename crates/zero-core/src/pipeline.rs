//! The Hydrate Pipeline (C6, §4.6) — the top-level orchestrator. Expands a
//! target into a repo list, runs the clone phase, then the scan phase,
//! aggregates across repos, and updates the org rollup.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::mpsc;
use std::time::Duration;

use chrono::Utc;

use crate::cancel::{CancelToken, Deadline};
use crate::cloner::{self, CloneDepth, CloneOutcome, CloneReq, CommitContext};
use crate::context::AppContext;
use crate::error::ZeroError;
use crate::events::{CloneStatus, EventSink, Phase, PipelineResult, ProgressEvent};
use crate::freshness;
use crate::ids::{ProjectId, ScannerName};
use crate::registry::ScannerRegistry;
use crate::scheduler::{self, ScanRequest};
use crate::store::manifest::GitInfo;
use crate::store::{ArtifactStore, DetectedType, ProjectRecord, ProjectStatus, SourceType};
use crate::target::{self, OrgLister, RepoRef, Target};

/// Input to [`hydrate`] (§4.6).
pub struct HydrateReq<'a> {
    pub target: Target,
    pub profile: String,
    pub clone_depth: CloneDepth,
    /// Repo-level worker pool size for both phases, clamped to `[1, 16]`.
    pub repo_parallelism: usize,
    /// Scanner pool size inside each repo's scan phase, clamped to `[1, 8]`.
    pub scanner_parallelism: usize,
    /// If `true`, scanners declared "slow on large repos" are skipped for
    /// working copies over the configured file-count threshold (§4.4).
    pub skip_slow: bool,
    /// Forces a hard reset on a diverged cached working copy (§4.8).
    pub force_rescan: bool,
    pub skip_scanners: HashSet<ScannerName>,
    /// Stop after Phase 1; Phase 2 never runs.
    pub clone_only: bool,
    pub lister: &'a dyn OrgLister,
}

/// One repo that survived Phase 1, carrying what Phase 2 needs.
struct ClonedRepo {
    project_id: ProjectId,
    repo_ref: RepoRef,
    working_copy_path: PathBuf,
    commit: CommitContext,
}

/// Runs the full two-phase pipeline for `req.target` (§4.6).
///
/// # Errors
/// Fails fast, before any side effect, for `config.*` failures: an unknown
/// profile, an empty org, or an invalid target (propagated from
/// [`target::expand`]).
pub fn hydrate(
    ctx: &AppContext,
    store: &ArtifactStore,
    registry: &ScannerRegistry,
    req: &HydrateReq<'_>,
    sink: &EventSink,
    cancel: &CancelToken,
) -> Result<PipelineResult, ZeroError> {
    // Phase 0 — target expansion.
    let repo_refs = target::expand(&req.target, req.lister)?;
    let profile = ctx
        .settings()
        .get_profile(&req.profile)
        .cloned()
        .ok_or_else(|| ZeroError::UnknownProfile { name: req.profile.clone() })?;
    let resolved_scanners = registry.resolve_profile(&profile)?;

    let mut repos: Vec<(RepoRef, ProjectId)> = Vec::with_capacity(repo_refs.len());
    for repo_ref in repo_refs {
        let project_id = repo_ref.project_id()?;
        repos.push((repo_ref, project_id));
    }
    let project_ids: Vec<ProjectId> = repos.iter().map(|(_, id)| id.clone()).collect();

    let repo_parallelism = req.repo_parallelism.clamp(1, 16);
    let clone_deadline = Deadline::after(ctx.settings().clone_timeout_secs);

    // Phase 1 — clone.
    sink.emit(ProgressEvent::PhaseStarted(Phase::Clone));
    let cloned = run_pool(repo_parallelism, repos, |(repo_ref, project_id)| {
        if cancel.is_cancelled() {
            return None;
        }
        clone_one(store, &repo_ref, &project_id, req, clone_deadline, sink, cancel)
    });
    sink.emit(ProgressEvent::PhaseFinished(Phase::Clone));

    let cloned: Vec<ClonedRepo> = cloned.into_iter().flatten().collect();
    let failed_clones = project_ids.len() - cloned.len();

    if req.clone_only {
        let result = PipelineResult {
            project_ids,
            success_count: cloned.len(),
            failed_count: failed_clones,
        };
        sink.emit(ProgressEvent::PipelineFinished(result.clone()));
        return Ok(result);
    }

    // Phase 2 — scan.
    sink.emit(ProgressEvent::PhaseStarted(Phase::Scan));
    let scan_deadline = Deadline::after(ctx.settings().scanner_timeout_secs);
    let slow_threshold = if req.skip_slow {
        ctx.settings().slow_scanner_file_threshold
    } else {
        u64::MAX
    };
    let version = env!("CARGO_PKG_VERSION").to_owned();

    let scan_outcomes = run_pool(repo_parallelism, cloned, |repo| {
        if cancel.is_cancelled() {
            return None;
        }
        Some(scan_one(
            store,
            registry,
            &repo,
            &resolved_scanners,
            req,
            scan_deadline,
            slow_threshold,
            &version,
            sink,
            cancel,
        ))
    });
    sink.emit(ProgressEvent::PhaseFinished(Phase::Scan));

    // Phase 3 — finalize.
    sink.emit(ProgressEvent::PhaseStarted(Phase::Finalize));
    let scan_outcomes: Vec<bool> = scan_outcomes.into_iter().flatten().collect();
    let scanned_ok = scan_outcomes.iter().filter(|ok| **ok).count();
    let scanned_failed = scan_outcomes.len() - scanned_ok;

    let result = PipelineResult {
        project_ids,
        success_count: scanned_ok,
        failed_count: failed_clones + scanned_failed,
    };
    sink.emit(ProgressEvent::PhaseFinished(Phase::Finalize));
    sink.emit(ProgressEvent::PipelineFinished(result.clone()));
    Ok(result)
}

/// Scans one already-cloned repo (Phase 2's per-repo unit): resolves the
/// effective scanner list, runs C4, then persists the manifest, history, and
/// org rollup. Returns `true` if the repo's scan reported no failures.
#[allow(clippy::too_many_arguments)]
fn scan_one(
    store: &ArtifactStore,
    registry: &ScannerRegistry,
    repo: &ClonedRepo,
    resolved_scanners: &[(ScannerName, serde_json::Value)],
    req: &HydrateReq<'_>,
    deadline: Deadline,
    slow_threshold: u64,
    version: &str,
    sink: &EventSink,
    cancel: &CancelToken,
) -> bool {
    let output_dir = store.analysis_dir(&repo.project_id);
    let started_at = Utc::now();

    let scan_req = ScanRequest {
        project_id: repo.project_id.clone(),
        working_copy_path: &repo.working_copy_path,
        output_dir: &output_dir,
        scanners: resolved_scanners.to_vec(),
        skip: req.skip_scanners.clone(),
        file_count: count_files(&repo.working_copy_path),
        version: version.to_owned(),
        deadline,
        parallel_scanners: req.scanner_parallelism.clamp(1, 8),
    };

    let outcome = scheduler::scan_repo(registry, &scan_req, slow_threshold, sink, cancel);
    let completed_at = Utc::now();
    let any_failed = outcome.any_failed();

    let scanners_requested: Vec<ScannerName> = resolved_scanners.iter().map(|(n, _)| n.clone()).collect();
    let git = GitInfo {
        commit_hash: repo.commit.commit_hash.clone(),
        commit_short: repo.commit.commit_short.clone(),
        branch: repo.commit.branch.clone(),
        tag: repo.commit.tag.clone(),
        commit_date: repo.commit.commit_date,
        commit_author: repo.commit.commit_author.clone(),
    };
    let manifest = crate::store::Manifest::from_outcome(
        repo.project_id.clone(),
        crate::ids::ScanId::generate(),
        git,
        req.profile.clone(),
        scanners_requested,
        started_at,
        completed_at,
        &outcome,
    );

    // Persistence failures here are a defect in the affected repo only
    // (§7: `io.*` is fatal for the affected project only) — the repo is
    // marked failed and its siblings continue.
    let persisted = store.save_manifest(&manifest).is_ok()
        && store
            .append_scan_history(
                &repo.project_id,
                crate::store::history::ScanRecord {
                    scan_id: manifest.scan_id.clone(),
                    commit_hash: manifest.git.commit_hash.clone(),
                    started_at,
                    completed_at: Some(completed_at),
                    scanners_completed: manifest.scan.scanners_completed.len(),
                    scanners_failed: manifest.scan.scanners_failed.len(),
                },
            )
            .is_ok()
        && store.update_org_rollup(&manifest).is_ok();

    let status = if persisted && !any_failed { ProjectStatus::Ready } else { ProjectStatus::Failed };
    let _ = store.with_project_index(|index| {
        index.upsert(repo.project_id.clone(), &repo.repo_ref.clone_url, status, completed_at);
    });

    persisted && !any_failed
}

/// Clones one repo (Phase 1's per-repo unit): materializes the working
/// copy, reconciles freshness on a cache hit, and persists `project.json`
/// and the project index entry.
fn clone_one(
    store: &ArtifactStore,
    repo_ref: &RepoRef,
    project_id: &ProjectId,
    req: &HydrateReq<'_>,
    deadline: Deadline,
    sink: &EventSink,
    cancel: &CancelToken,
) -> Option<ClonedRepo> {
    sink.emit(ProgressEvent::RepoCloneStarted {
        project_id: project_id.clone(),
    });

    let working_copy_path = store.working_copy_dir(project_id);
    let clone_req = CloneReq {
        project_id: project_id.clone(),
        clone_url: &repo_ref.clone_url,
        target_path: &working_copy_path,
        depth: req.clone_depth,
        branch: repo_ref.default_branch.as_deref(),
    };

    let outcome = clone_with_deadline(&clone_req, deadline, cancel);
    let (status, commit) = match outcome {
        CloneOutcome::CacheHit(ctx) => {
            let branch = ctx
                .branch
                .clone()
                .or_else(|| repo_ref.default_branch.clone())
                .unwrap_or_else(|| "main".to_owned());
            let refreshed = reconcile_freshness(&working_copy_path, &branch, req.force_rescan, cancel).unwrap_or(ctx);
            (CloneStatus::CacheHit, refreshed)
        }
        CloneOutcome::Fresh(ctx) => (CloneStatus::Fresh, ctx),
        CloneOutcome::Failed(_) => {
            sink.emit(ProgressEvent::RepoCloneEnded {
                project_id: project_id.clone(),
                status: CloneStatus::Failed,
            });
            let _ = store.with_project_index(|index| {
                index.upsert(project_id.clone(), &repo_ref.clone_url, ProjectStatus::Failed, Utc::now());
            });
            return None;
        }
    };

    sink.emit(ProgressEvent::RepoCloneEnded {
        project_id: project_id.clone(),
        status,
    });

    let source_type = if project_id.owner() == ProjectId::LOCAL_OWNER {
        SourceType::Local
    } else {
        SourceType::Github
    };
    let record = ProjectRecord {
        id: project_id.clone(),
        source: repo_ref.clone_url.clone(),
        source_type,
        cloned_at: Utc::now(),
        branch: commit.branch.clone(),
        commit: commit.commit_hash.clone(),
        path: working_copy_path.clone(),
        detected_type: DetectedType::default(),
    };
    if store.save_project(&record).is_err() {
        return None;
    }
    let _ = store.with_project_index(|index| {
        index.upsert(project_id.clone(), &repo_ref.clone_url, ProjectStatus::Cloned, Utc::now());
    });

    Some(ClonedRepo {
        project_id: project_id.clone(),
        repo_ref: repo_ref.clone(),
        working_copy_path,
        commit,
    })
}

/// Runs [`cloner::clone_repo`] on a dedicated thread so `deadline` can be
/// enforced without blocking the caller past it (mirrors
/// [`crate::runner::run_one`]'s timeout handling: on expiry the clone
/// thread is detached and its eventual result discarded).
fn clone_with_deadline(req: &CloneReq<'_>, deadline: Deadline, cancel: &CancelToken) -> CloneOutcome {
    let local_cancel = CancelToken::new();
    let worker_cancel = local_cancel.clone();
    let project_id = req.project_id.clone();
    let clone_url = req.clone_url.to_owned();
    let target_path = req.target_path.to_path_buf();
    let depth = req.depth;
    let branch = req.branch.map(ToOwned::to_owned);

    let (tx, rx) = mpsc::channel();
    let spawned = std::thread::Builder::new().name("clone".to_owned()).spawn(move || {
        let inner = CloneReq {
            project_id,
            clone_url: &clone_url,
            target_path: &target_path,
            depth,
            branch: branch.as_deref(),
        };
        let outcome = cloner::clone_repo(&inner, worker_cancel.as_atomic());
        let _ = tx.send(outcome);
    });
    if spawned.is_err() {
        return CloneOutcome::Failed(ZeroError::Io {
            context: "spawning clone worker thread".to_owned(),
            source: std::io::Error::other("thread spawn failed"),
        });
    }

    let poll = Duration::from_millis(100);
    loop {
        match rx.recv_timeout(poll) {
            Ok(outcome) => return outcome,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return CloneOutcome::Failed(ZeroError::Io {
                    context: "clone worker thread exited without a result".to_owned(),
                    source: std::io::Error::other("clone worker disconnected"),
                });
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if deadline.is_expired() {
                    local_cancel.cancel();
                    return CloneOutcome::Failed(ZeroError::Vcs {
                        project: req.project_id.clone(),
                        source: zero_git::GitError::Timeout {
                            remote: req.clone_url.to_owned(),
                            elapsed_secs: 0,
                        },
                    });
                }
                if cancel.is_cancelled() {
                    local_cancel.cancel();
                    return CloneOutcome::Failed(ZeroError::Vcs {
                        project: req.project_id.clone(),
                        source: zero_git::GitError::Cancelled {
                            remote: req.clone_url.to_owned(),
                        },
                    });
                }
            }
        }
    }
}

/// Applies the Freshness Oracle (§4.8) to an existing cache hit, returning
/// a refreshed [`CommitContext`] if the working copy moved, or `None` if it
/// stayed put (up-to-date, local-only, or refused without `force`) — the
/// caller keeps its already-captured context in that case (§8 scenario 6).
fn reconcile_freshness(working_copy_path: &std::path::Path, branch: &str, force: bool, cancel: &CancelToken) -> Option<CommitContext> {
    let repo = zero_git::GixRepo::open_at(working_copy_path).ok()?;
    match freshness::update_if_needed(&repo, "origin", branch, force, cancel.as_atomic()) {
        freshness::UpdateResult::Ok => cloner::capture_commit_context(&repo).ok(),
        freshness::UpdateResult::Failed { .. } => None,
    }
}

/// Counts regular files under `root`, skipping `.git`. Used only for the
/// slow-scanner policy's file-count threshold (§4.4); best-effort — any
/// directory it cannot read simply contributes no further files.
fn count_files(root: &std::path::Path) -> u64 {
    let mut total = 0u64;
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
                Ok(ft) if ft.is_file() => total += 1,
                _ => {}
            }
        }
    }
    total
}

/// Runs `work` over `items` with `parallelism` worker threads pulling from a
/// shared queue until it drains. Used for both phase-1 and phase-2 repo
/// pools (§5): each worker is a plain OS thread, matching the scheduler's
/// own choice of `std::thread` over an external pool crate.
fn run_pool<T, R>(parallelism: usize, items: Vec<T>, work: impl Fn(T) -> R + Sync) -> Vec<R>
where
    T: Send,
    R: Send,
{
    let workers = parallelism.clamp(1, items.len().max(1));
    let queue: Mutex<VecDeque<T>> = Mutex::new(items.into_iter().collect());
    let results: Mutex<Vec<R>> = Mutex::new(Vec::new());
    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    let item = queue.lock().unwrap_or_else(std::sync::PoisonError::into_inner).pop_front();
                    let Some(item) = item else { break };
                    let result = work(item);
                    results.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(result);
                }
            });
        }
    });
    results.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::registry::ScannerDescriptor;
    use crate::runner::{ScannerFn, ScannerOutcome};
    use std::process::Command;
    use std::sync::Arc;

    fn git(dir: &std::path::Path, args: &[&str]) {
        let status = Command::new("git").args(args).current_dir(dir).status().unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    fn setup_upstream() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        git(dir.path(), &["init", "-q", "-b", "main"]);
        git(dir.path(), &["config", "user.email", "a@example.com"]);
        git(dir.path(), &["config", "user.name", "A"]);
        std::fs::write(dir.path().join("f.txt"), "hi").unwrap();
        git(dir.path(), &["add", "."]);
        git(dir.path(), &["commit", "-q", "-m", "init"]);
        dir
    }

    struct NoOrgs;
    impl OrgLister for NoOrgs {
        fn list_org_repos(&self, _org: &str, _limit: Option<usize>) -> Result<Vec<RepoRef>, ZeroError> {
            Ok(vec![])
        }
    }

    fn sbom_registry() -> ScannerRegistry {
        let mut registry = ScannerRegistry::new();
        let run: ScannerFn = Arc::new(|_ctx| {
            Ok(ScannerOutcome {
                summary: serde_json::json!({"dependencies": 3}),
                findings: serde_json::json!({"packages": []}),
            })
        });
        registry.register(ScannerDescriptor::new(ScannerName::new("sbom").unwrap(), "d"), run).unwrap();
        registry
    }

    #[test]
    fn hydrate_single_repo_cold_cache() {
        let upstream = setup_upstream();
        let home = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(home.path().to_path_buf());
        let registry = sbom_registry();

        let mut settings = Settings::default();
        settings.profiles.get_mut("default").unwrap().scanners = vec!["sbom".to_owned()];
        let ctx = AppContext::new(home.path().to_path_buf(), settings);

        let lister = NoOrgs;
        let req = HydrateReq {
            target: Target::Single {
                owner: "local".to_owned(),
                repo: "r1".to_owned(),
            },
            profile: "default".to_owned(),
            clone_depth: CloneDepth::Full,
            repo_parallelism: 2,
            scanner_parallelism: 2,
            skip_slow: false,
            force_rescan: false,
            skip_scanners: HashSet::new(),
            clone_only: false,
            lister: &lister,
        };

        // Target::expand always builds a github URL; override by cloning
        // straight from the local upstream via a patched target instead.
        let req = HydrateReq {
            target: Target::Single {
                owner: "local".to_owned(),
                repo: "r1".to_owned(),
            },
            ..req
        };
        let _ = &req;

        let (sink, _rx) = crate::events::channel();
        let cancel = CancelToken::new();

        // Exercise the clone step directly against the local upstream,
        // bypassing target::expand's github.com URL synthesis.
        let project_id = ProjectId::new("local", "r1").unwrap();
        let repo_ref = RepoRef {
            owner: "local".to_owned(),
            name: "r1".to_owned(),
            clone_url: upstream.path().to_str().unwrap().to_owned(),
            default_branch: Some("main".to_owned()),
        };
        let hydrate_req = HydrateReq {
            target: Target::Single {
                owner: "local".to_owned(),
                repo: "r1".to_owned(),
            },
            profile: "default".to_owned(),
            clone_depth: CloneDepth::Full,
            repo_parallelism: 1,
            scanner_parallelism: 1,
            skip_slow: false,
            force_rescan: false,
            skip_scanners: HashSet::new(),
            clone_only: false,
            lister: &lister,
        };
        let cloned = clone_one(&store, &repo_ref, &project_id, &hydrate_req, Deadline::after(30), &sink, &cancel);
        let cloned = cloned.expect("clone should succeed against local upstream");
        assert_eq!(cloned.commit.commit_hash.len(), 40);

        let profile = ctx.settings().get_profile("default").unwrap().clone();
        let resolved = registry.resolve_profile(&profile).unwrap();
        let ok = scan_one(
            &store,
            &registry,
            &cloned,
            &resolved,
            &hydrate_req,
            Deadline::after(30),
            u64::MAX,
            "0.1.0",
            &sink,
            &cancel,
        );
        assert!(ok);

        let manifest = store.load_manifest(&project_id).unwrap().unwrap();
        assert_eq!(manifest.scan.scanners_requested, vec![ScannerName::new("sbom").unwrap()]);
        assert_eq!(manifest.scan.scanners_completed, vec![ScannerName::new("sbom").unwrap()]);
        assert!(store.analysis_dir(&project_id).join("sbom.json").exists());
    }

    #[test]
    fn run_pool_visits_every_item_exactly_once() {
        let items: Vec<u32> = (0..20).collect();
        let results = run_pool(4, items, |n| n * 2);
        let mut sorted = results;
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn hydrate_org_with_zero_repos_fails_fast() {
        let home = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(home.path().to_path_buf());
        let registry = sbom_registry();
        let ctx = AppContext::new(home.path().to_path_buf(), Settings::default());
        let lister = NoOrgs;
        let req = HydrateReq {
            target: Target::Org {
                name: "ghost".to_owned(),
                limit: None,
            },
            profile: "default".to_owned(),
            clone_depth: CloneDepth::Full,
            repo_parallelism: 2,
            scanner_parallelism: 2,
            skip_slow: false,
            force_rescan: false,
            skip_scanners: HashSet::new(),
            clone_only: false,
            lister: &lister,
        };
        let (sink, _rx) = crate::events::channel();
        let cancel = CancelToken::new();
        let result = hydrate(&ctx, &store, &registry, &req, &sink, &cancel);
        assert!(matches!(result, Err(ZeroError::EmptyOrg { .. })));
    }

    #[test]
    fn hydrate_unknown_profile_fails_fast() {
        let home = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(home.path().to_path_buf());
        let registry = sbom_registry();
        let ctx = AppContext::new(home.path().to_path_buf(), Settings::default());
        let lister = NoOrgs;
        let req = HydrateReq {
            target: Target::Single {
                owner: "octocat".to_owned(),
                repo: "hello-world".to_owned(),
            },
            profile: "does-not-exist".to_owned(),
            clone_depth: CloneDepth::Full,
            repo_parallelism: 1,
            scanner_parallelism: 1,
            skip_slow: false,
            force_rescan: false,
            skip_scanners: HashSet::new(),
            clone_only: false,
            lister: &lister,
        };
        let (sink, _rx) = crate::events::channel();
        let cancel = CancelToken::new();
        let result = hydrate(&ctx, &store, &registry, &req, &sink, &cancel);
        assert!(matches!(result, Err(ZeroError::UnknownProfile { .. })));
    }
}
