//! `hydration_status` (§6) — a read-only health check for one project,
//! answering "is this project's artifact-store state actually consistent
//! with what it claims to be" without re-running any part of the pipeline.

use serde::{Deserialize, Serialize};
use zero_git::GitRepo as _;

use crate::error::ZeroError;
use crate::ids::ProjectId;
use crate::store::{ArtifactStore, ProjectStatus};

/// One named check performed by [`hydration_status`], in the order run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrationCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> HydrationCheck {
    HydrationCheck {
        name: name.to_owned(),
        passed,
        detail: detail.into(),
    }
}

/// `hydration_status(project_id) -> {hydrated, reason, checks}` (§6).
///
/// "Hydrated" per §9's glossary means "both phases have succeeded for its
/// current commit" — this function verifies that directly from durable
/// state (index entry, working copy, manifest) rather than trusting any
/// single field in isolation, so a manually-edited or partially-cleaned
/// home directory is reported accurately instead of optimistically.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrationStatus {
    pub hydrated: bool,
    pub reason: Option<String>,
    pub checks: Vec<HydrationCheck>,
}

/// Runs every check and folds them into one [`HydrationStatus`].
///
/// # Errors
/// Propagates [`ArtifactStore`] I/O errors (a corrupt index or manifest is
/// reported as a failed check, not an error here — only genuine I/O
/// failures bubble up).
pub fn hydration_status(store: &ArtifactStore, project_id: &ProjectId) -> Result<HydrationStatus, ZeroError> {
    let mut checks = Vec::new();

    let index = store.load_project_index()?;
    let Some(entry) = index.projects.get(project_id) else {
        checks.push(check("indexed", false, "project has no entry in the index; it has never been cloned"));
        return Ok(HydrationStatus {
            hydrated: false,
            reason: Some("not indexed".to_owned()),
            checks,
        });
    };
    checks.push(check("indexed", true, format!("status: {:?}", entry.status)));

    let working_copy = store.working_copy_dir(project_id);
    let working_copy_present = working_copy.join(".git").exists();
    checks.push(check(
        "working_copy_present",
        working_copy_present,
        working_copy.display().to_string(),
    ));

    let manifest = store.load_manifest(project_id)?;
    let manifest_present = manifest.is_some();
    checks.push(check(
        "manifest_present",
        manifest_present,
        manifest_present.then_some("analysis/manifest.json exists").unwrap_or("no manifest on disk"),
    ));

    let commit_matches = match (&manifest, working_copy_present) {
        (Some(m), true) => match zero_git::GixRepo::open_at(&working_copy) {
            Ok(repo) => match repo.rev_parse_opt("HEAD") {
                Ok(Some(head)) => {
                    let matches = head.to_string() == m.git.commit_hash;
                    checks.push(check(
                        "manifest_matches_head",
                        matches,
                        format!("manifest commit {} vs working copy HEAD {head}", m.git.commit_hash),
                    ));
                    matches
                }
                Ok(None) => {
                    checks.push(check("manifest_matches_head", false, "working copy has no HEAD"));
                    false
                }
                Err(err) => {
                    checks.push(check("manifest_matches_head", false, err.to_string()));
                    false
                }
            },
            Err(err) => {
                checks.push(check("manifest_matches_head", false, err.to_string()));
                false
            }
        },
        _ => {
            checks.push(check("manifest_matches_head", false, "skipped: no manifest or no working copy"));
            false
        }
    };

    let all_scanners_complete = manifest.as_ref().is_some_and(|m| m.scan.scanners_failed.is_empty());
    if manifest.is_some() {
        checks.push(check(
            "all_scanners_completed",
            all_scanners_complete,
            manifest
                .as_ref()
                .map(|m| format!("{} failed", m.scan.scanners_failed.len()))
                .unwrap_or_default(),
        ));
    }

    let status_ready = entry.status == ProjectStatus::Ready;
    let hydrated = status_ready && working_copy_present && manifest_present && commit_matches && all_scanners_complete;

    let reason = (!hydrated).then(|| {
        checks
            .iter()
            .find(|c| !c.passed)
            .map(|c| format!("{}: {}", c.name, c.detail))
            .unwrap_or_else(|| "index status is not ready".to_owned())
    });

    Ok(HydrationStatus { hydrated, reason, checks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ScanId;
    use crate::store::manifest::{GitInfo, ManifestSummary, Manifest, ScanInfo};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn pid() -> ProjectId {
        ProjectId::new("octocat", "hello-world").unwrap()
    }

    #[test]
    fn unindexed_project_is_not_hydrated() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().to_path_buf());
        let status = hydration_status(&store, &pid()).unwrap();
        assert!(!status.hydrated);
        assert_eq!(status.reason.as_deref(), Some("not indexed"));
    }

    #[test]
    fn indexed_without_working_copy_is_not_hydrated() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().to_path_buf());
        store
            .with_project_index(|index| {
                index.upsert(pid(), "src", ProjectStatus::Ready, Utc::now());
            })
            .unwrap();
        let status = hydration_status(&store, &pid()).unwrap();
        assert!(!status.hydrated);
        assert!(!status.checks.iter().find(|c| c.name == "working_copy_present").unwrap().passed);
    }

    #[test]
    fn fully_consistent_project_is_hydrated() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().to_path_buf());
        let id = pid();

        let working_copy = store.working_copy_dir(&id);
        std::fs::create_dir_all(&working_copy).unwrap();
        let status_out = std::process::Command::new("git")
            .args(["init", "-q", "-b", "main"])
            .current_dir(&working_copy)
            .status()
            .unwrap();
        assert!(status_out.success());
        std::process::Command::new("git")
            .args(["config", "user.email", "a@example.com"])
            .current_dir(&working_copy)
            .status()
            .unwrap();
        std::process::Command::new("git")
            .args(["config", "user.name", "A"])
            .current_dir(&working_copy)
            .status()
            .unwrap();
        std::fs::write(working_copy.join("f.txt"), "hi").unwrap();
        std::process::Command::new("git")
            .args(["add", "."])
            .current_dir(&working_copy)
            .status()
            .unwrap();
        std::process::Command::new("git")
            .args(["commit", "-q", "-m", "init"])
            .current_dir(&working_copy)
            .status()
            .unwrap();

        let repo = zero_git::GixRepo::open_at(&working_copy).unwrap();
        let head = repo.rev_parse("HEAD").unwrap().to_string();

        store
            .with_project_index(|index| {
                index.upsert(id.clone(), "local", ProjectStatus::Ready, Utc::now());
            })
            .unwrap();

        let manifest = Manifest {
            project_id: id.clone(),
            scan_id: ScanId::parse("20260727-120000-aaaa").unwrap(),
            schema_version: crate::store::manifest::SCHEMA_VERSION.to_owned(),
            git: GitInfo {
                commit_hash: head,
                commit_short: "short".to_owned(),
                branch: Some("main".to_owned()),
                tag: None,
                commit_date: Utc::now(),
                commit_author: "A <a@example.com>".to_owned(),
            },
            scan: ScanInfo {
                started_at: Utc::now(),
                completed_at: Some(Utc::now()),
                duration_seconds: Some(1),
                profile: "default".to_owned(),
                scanners_requested: vec![],
                scanners_completed: vec![],
                scanners_failed: vec![],
            },
            analyses: BTreeMap::new(),
            summary: ManifestSummary::default(),
        };
        store.save_manifest(&manifest).unwrap();

        let status = hydration_status(&store, &id).unwrap();
        assert!(status.hydrated, "{status:?}");
        assert!(status.reason.is_none());
    }
}
