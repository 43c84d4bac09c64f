//! Collaborator interfaces the core exposes beyond [`crate::pipeline::hydrate`]
//! (§6): `scan_cached`, `status`, `clean`, `history`. Each is a thin
//! composition over [`ArtifactStore`] and the scanner scheduler — none of
//! them touch the network or the cloner.

use chrono::{DateTime, Utc};

use crate::cancel::{CancelToken, Deadline};
use crate::context::AppContext;
use crate::error::ZeroError;
use crate::events::EventSink;
use crate::ids::{ProjectId, ScannerName};
use crate::registry::ScannerRegistry;
use crate::scheduler::{self, ScanOutcome, ScanRequest};
use crate::store::history::ScanRecord;
use crate::store::manifest::GitInfo;
use crate::store::{ArtifactStore, ProjectStatus};

/// **scan_cached(project_id, profile)** (§6): re-runs the scan phase
/// against an already-cloned working copy, skipping Phase 1 entirely. Fails
/// with [`ZeroError::ProjectNotFound`] if the project has never been cloned.
pub fn scan_cached(
    ctx: &AppContext,
    store: &ArtifactStore,
    registry: &ScannerRegistry,
    project_id: &ProjectId,
    profile: &str,
    skip_scanners: &std::collections::HashSet<ScannerName>,
    sink: &EventSink,
    cancel: &CancelToken,
) -> Result<ScanOutcome, ZeroError> {
    let record = store
        .load_project(project_id)?
        .ok_or_else(|| ZeroError::ProjectNotFound { project_id: project_id.clone() })?;

    let profile_name = profile.to_owned();
    let profile = ctx
        .settings()
        .get_profile(profile)
        .cloned()
        .ok_or_else(|| ZeroError::UnknownProfile { name: profile_name.clone() })?;
    let resolved_scanners = registry.resolve_profile(&profile)?;

    let repo = zero_git::GixRepo::open_at(&record.path).map_err(|source| ZeroError::Vcs {
        project: project_id.clone(),
        source,
    })?;
    let commit = crate::cloner::capture_commit_context(&repo).map_err(|source| ZeroError::Vcs {
        project: project_id.clone(),
        source,
    })?;

    let output_dir = store.analysis_dir(project_id);
    let started_at = Utc::now();
    let file_count = count_files(&record.path);
    let version = env!("CARGO_PKG_VERSION").to_owned();

    let scan_req = ScanRequest {
        project_id: project_id.clone(),
        working_copy_path: &record.path,
        output_dir: &output_dir,
        scanners: resolved_scanners,
        skip: skip_scanners.clone(),
        file_count,
        version,
        deadline: Deadline::after(ctx.settings().scanner_timeout_secs),
        parallel_scanners: 4,
    };

    let outcome = scheduler::scan_repo(registry, &scan_req, u64::MAX, sink, cancel);
    let completed_at = Utc::now();

    let scanners_requested: Vec<ScannerName> = scan_req.scanners.iter().map(|(n, _)| n.clone()).collect();
    let git = GitInfo {
        commit_hash: commit.commit_hash,
        commit_short: commit.commit_short,
        branch: commit.branch,
        tag: commit.tag,
        commit_date: commit.commit_date,
        commit_author: commit.commit_author,
    };
    let manifest = crate::store::Manifest::from_outcome(
        project_id.clone(),
        crate::ids::ScanId::generate(),
        git,
        profile_name,
        scanners_requested,
        started_at,
        completed_at,
        &outcome,
    );

    store.save_manifest(&manifest)?;
    store.append_scan_history(
        project_id,
        ScanRecord {
            scan_id: manifest.scan_id.clone(),
            commit_hash: manifest.git.commit_hash.clone(),
            started_at,
            completed_at: Some(completed_at),
            scanners_completed: manifest.scan.scanners_completed.len(),
            scanners_failed: manifest.scan.scanners_failed.len(),
        },
    )?;
    store.update_org_rollup(&manifest)?;

    let status = if outcome.any_failed() { ProjectStatus::Failed } else { ProjectStatus::Ready };
    store.with_project_index(|index| {
        index.upsert(project_id.clone(), &record.source, status, completed_at);
    })?;

    Ok(outcome)
}

/// One row of **status()** (§6): the process-wide project index, flattened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectSummary {
    pub project_id: ProjectId,
    pub status: ProjectStatus,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub last_analyzed: Option<DateTime<Utc>>,
}

/// **status()** (§6): every indexed project, in `index.json`'s stable
/// (owner, name) order.
pub fn status(store: &ArtifactStore) -> Result<Vec<ProjectSummary>, ZeroError> {
    let index = store.load_project_index()?;
    Ok(index
        .projects
        .into_iter()
        .map(|(project_id, entry)| ProjectSummary {
            project_id,
            status: entry.status,
            source: entry.source,
            created_at: entry.created_at,
            last_analyzed: entry.last_analyzed,
        })
        .collect())
}

/// What **clean(scope)** (§6) removes. Scopes are resolved against the
/// local index, never the network — cleaning is a purely local operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CleanScope {
    /// One project.
    Project(ProjectId),
    /// Every indexed project under one owner.
    Org(String),
    /// Every indexed project.
    All,
}

/// **clean(scope) → count** (§6): removes every project matching `scope`
/// via [`ArtifactStore::clean_project`], returning how many were removed.
pub fn clean(store: &ArtifactStore, scope: &CleanScope) -> Result<usize, ZeroError> {
    let index = store.load_project_index()?;
    let targets: Vec<ProjectId> = match scope {
        CleanScope::Project(id) => {
            if index.projects.contains_key(id) {
                vec![id.clone()]
            } else {
                vec![]
            }
        }
        CleanScope::Org(name) => index.projects.keys().filter(|id| id.owner() == name).cloned().collect(),
        CleanScope::All => index.projects.keys().cloned().collect(),
    };

    let mut count = 0;
    for project_id in targets {
        store.clean_project(&project_id)?;
        count += 1;
    }
    Ok(count)
}

/// **history(project_id, limit)** (§6): the project's most recent scans,
/// newest first (matching [`crate::store::history::ScanHistory`]'s own
/// prepend order), capped at `limit`.
pub fn history(store: &ArtifactStore, project_id: &ProjectId, limit: usize) -> Result<Vec<ScanRecord>, ZeroError> {
    let history = store.load_history(project_id)?;
    Ok(history.scans.into_iter().take(limit).collect())
}

/// Counts regular files under `root`, skipping `.git` — mirrors
/// [`crate::pipeline`]'s own file-count walk, duplicated here since
/// `scan_cached` never goes through the pipeline's per-repo unit.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::registry::ScannerDescriptor;
    use crate::runner::{ScannerFn, ScannerOutcome};
    use crate::store::project::{DetectedType, ProjectRecord, SourceType};
    use std::process::Command;
    use std::sync::Arc;

    fn git(dir: &std::path::Path, args: &[&str]) {
        let status = Command::new("git").args(args).current_dir(dir).status().unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    fn setup_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        git(dir.path(), &["init", "-q", "-b", "main"]);
        git(dir.path(), &["config", "user.email", "a@example.com"]);
        git(dir.path(), &["config", "user.name", "A"]);
        std::fs::write(dir.path().join("f.txt"), "hi").unwrap();
        git(dir.path(), &["add", "."]);
        git(dir.path(), &["commit", "-q", "-m", "init"]);
        dir
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
    fn scan_cached_requires_an_already_cloned_project() {
        let home = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(home.path().to_path_buf());
        let registry = sbom_registry();
        let ctx = AppContext::new(home.path().to_path_buf(), Settings::default());
        let project_id = ProjectId::new("octocat", "hello-world").unwrap();
        let (sink, _rx) = crate::events::channel();
        let cancel = CancelToken::new();

        let result = scan_cached(&ctx, &store, &registry, &project_id, "default", &Default::default(), &sink, &cancel);
        assert!(matches!(result, Err(ZeroError::ProjectNotFound { .. })));
    }

    #[test]
    fn scan_cached_scans_a_cloned_working_copy_in_place() {
        let repo_dir = setup_repo();
        let home = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(home.path().to_path_buf());
        let registry = sbom_registry();

        let mut settings = Settings::default();
        settings.profiles.get_mut("default").unwrap().scanners = vec!["sbom".to_owned()];
        let ctx = AppContext::new(home.path().to_path_buf(), settings);

        let project_id = ProjectId::new("local", "r1").unwrap();
        store
            .save_project(&ProjectRecord {
                id: project_id.clone(),
                source: repo_dir.path().to_str().unwrap().to_owned(),
                source_type: SourceType::Local,
                cloned_at: Utc::now(),
                branch: Some("main".to_owned()),
                commit: "0".repeat(40),
                path: repo_dir.path().to_path_buf(),
                detected_type: DetectedType::default(),
            })
            .unwrap();

        let (sink, _rx) = crate::events::channel();
        let cancel = CancelToken::new();
        let outcome = scan_cached(&ctx, &store, &registry, &project_id, "default", &Default::default(), &sink, &cancel).unwrap();
        assert!(!outcome.any_failed());
        assert!(store.load_manifest(&project_id).unwrap().is_some());
    }

    #[test]
    fn status_lists_every_indexed_project() {
        let home = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(home.path().to_path_buf());
        let project_id = ProjectId::new("octocat", "hello-world").unwrap();
        store
            .with_project_index(|index| {
                index.upsert(project_id.clone(), "https://github.com/octocat/hello-world", ProjectStatus::Ready, Utc::now());
            })
            .unwrap();

        let summaries = status(&store).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].project_id, project_id);
        assert_eq!(summaries[0].status, ProjectStatus::Ready);
    }

    #[test]
    fn clean_all_removes_every_project_and_reports_count() {
        let home = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(home.path().to_path_buf());
        let a = ProjectId::new("octocat", "a").unwrap();
        let b = ProjectId::new("octocat", "b").unwrap();
        store
            .with_project_index(|index| {
                index.upsert(a.clone(), "u1", ProjectStatus::Ready, Utc::now());
                index.upsert(b.clone(), "u2", ProjectStatus::Ready, Utc::now());
            })
            .unwrap();

        let removed = clean(&store, &CleanScope::All).unwrap();
        assert_eq!(removed, 2);
        assert!(store.load_project_index().unwrap().projects.is_empty());
    }

    #[test]
    fn clean_unknown_project_removes_nothing() {
        let home = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(home.path().to_path_buf());
        let ghost = ProjectId::new("octocat", "ghost").unwrap();
        let removed = clean(&store, &CleanScope::Project(ghost)).unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn history_caps_at_limit_and_returns_newest_first() {
        let home = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(home.path().to_path_buf());
        let project_id = ProjectId::new("octocat", "hello-world").unwrap();
        for i in 0..3u32 {
            store
                .append_scan_history(
                    &project_id,
                    ScanRecord {
                        scan_id: crate::ids::ScanId::generate(),
                        commit_hash: format!("commit-{i}"),
                        started_at: Utc::now(),
                        completed_at: Some(Utc::now()),
                        scanners_completed: 1,
                        scanners_failed: 0,
                    },
                )
                .unwrap();
        }
        let records = history(&store, &project_id, 2).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].commit_hash, "commit-2");
    }
}
