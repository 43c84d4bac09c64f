//! The Artifact Store (C1, §4.1) — on-disk layout rooted at a configurable
//! home directory, with atomic-replace semantics for every mutation.

pub mod atomic;
pub mod history;
pub mod index;
pub mod manifest;
pub mod paths;
pub mod project;
pub mod rollup;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

pub use history::{ScanHistory, ScanRecord};
pub use index::{ProjectIndex, ProjectIndexEntry, ProjectStatus};
pub use manifest::Manifest;
pub use project::{DetectedType, ProjectRecord, SourceType};
pub use rollup::{OrgRollup, ProjectRollupEntry};

use crate::error::ZeroError;
use crate::ids::ProjectId;

/// Lazily-created per-path locks, so writers to different shared files (two
/// different orgs' rollups, say) never block each other (§5).
#[derive(Default)]
struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut map = self.locks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(map.entry(path.to_path_buf()).or_insert_with(|| Arc::new(Mutex::new(()))))
    }
}

/// The on-disk artifact store, rooted at a configurable home directory
/// (`ZERO_HOME`, default `./.zero`). All file layout decisions live in
/// [`paths`]; this type adds the atomic-write and shared-file-locking
/// discipline described in §3 and §5.
pub struct ArtifactStore {
    home: PathBuf,
    shared_locks: PathLocks,
}

impl ArtifactStore {
    #[must_use]
    pub fn new(home: PathBuf) -> Self {
        Self {
            home,
            shared_locks: PathLocks::default(),
        }
    }

    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    #[must_use]
    pub fn working_copy_dir(&self, project_id: &ProjectId) -> PathBuf {
        paths::working_copy_dir(&self.home, project_id)
    }

    #[must_use]
    pub fn analysis_dir(&self, project_id: &ProjectId) -> PathBuf {
        paths::analysis_dir(&self.home, project_id)
    }

    // -- project index ------------------------------------------------------

    /// Loads the process-wide project index, or an empty one if absent.
    pub fn load_project_index(&self) -> Result<ProjectIndex, ZeroError> {
        let path = paths::project_index_path(&self.home);
        Ok(atomic::read_json(&path)?.unwrap_or_default())
    }

    /// Read-modify-write the project index under its shared-file lock.
    pub fn with_project_index<R>(
        &self,
        f: impl FnOnce(&mut ProjectIndex) -> R,
    ) -> Result<R, ZeroError> {
        let path = paths::project_index_path(&self.home);
        let lock = self.shared_locks.lock_for(&path);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut index: ProjectIndex = atomic::read_json(&path)?.unwrap_or_default();
        let result = f(&mut index);
        atomic::atomic_write_json(&path, &index)?;
        Ok(result)
    }

    // -- project record ------------------------------------------------------

    /// `project.json` for `project_id`, or `None` if never cloned.
    pub fn load_project(&self, project_id: &ProjectId) -> Result<Option<ProjectRecord>, ZeroError> {
        atomic::read_json(&paths::project_file_path(&self.home, project_id))
    }

    pub fn save_project(&self, record: &ProjectRecord) -> Result<(), ZeroError> {
        atomic::atomic_write_json(&paths::project_file_path(&self.home, &record.id), record)
    }

    // -- manifest -------------------------------------------------------------

    /// **load_manifest(project_id) -> Manifest | null** (§4.1): malformed
    /// JSON is indistinguishable from "absent" — the caller re-scans.
    pub fn load_manifest(&self, project_id: &ProjectId) -> Result<Option<Manifest>, ZeroError> {
        atomic::read_json(&paths::manifest_path(&self.home, project_id))
    }

    pub fn save_manifest(&self, manifest: &Manifest) -> Result<(), ZeroError> {
        atomic::atomic_write_json(&paths::manifest_path(&self.home, &manifest.project_id), manifest)
    }

    // -- scan history -----------------------------------------------------

    pub fn load_history(&self, project_id: &ProjectId) -> Result<ScanHistory, ZeroError> {
        Ok(atomic::read_json(&paths::history_path(&self.home, project_id))?.unwrap_or_default())
    }

    /// **append_scan_history(project_id, scan_record)** (§4.1): prepends the
    /// record and recomputes the history's rollup fields, then writes it
    /// back atomically. History is owned exclusively by its project's
    /// repo-worker (§5), so no cross-path lock is needed here.
    pub fn append_scan_history(
        &self,
        project_id: &ProjectId,
        record: ScanRecord,
    ) -> Result<ScanHistory, ZeroError> {
        let path = paths::history_path(&self.home, project_id);
        let mut history: ScanHistory = atomic::read_json(&path)?.unwrap_or_default();
        history.append(record);
        atomic::atomic_write_json(&path, &history)?;
        Ok(history)
    }

    // -- org rollup -----------------------------------------------------------

    /// **update_org_rollup(project_id)** (§4.1): reads `manifest`, upserts
    /// its project's summary, recomputes aggregates, writes back atomically.
    pub fn update_org_rollup(&self, manifest: &Manifest) -> Result<OrgRollup, ZeroError> {
        let owner = manifest.project_id.owner().to_owned();
        let path = paths::org_rollup_path(&self.home, &owner);
        let lock = self.shared_locks.lock_for(&path);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut rollup: OrgRollup = atomic::read_json(&path)?.unwrap_or_else(|| OrgRollup::empty(owner));
        let entry = ProjectRollupEntry::from_manifest(manifest);
        rollup.upsert(manifest.project_id.name(), entry, Utc::now());
        atomic::atomic_write_json(&path, &rollup)?;
        Ok(rollup)
    }

    /// **clean_project(project_id)** (§4.1): removes the project subtree,
    /// its index entry, and recomputes (or removes) the org rollup.
    pub fn clean_project(&self, project_id: &ProjectId) -> Result<(), ZeroError> {
        let project_dir = paths::project_dir(&self.home, project_id);
        if project_dir.exists() {
            std::fs::remove_dir_all(&project_dir).map_err(|source| ZeroError::Io {
                context: format!("removing project directory '{}'", project_dir.display()),
                source,
            })?;
        }

        self.with_project_index(|index| index.remove(project_id))?;

        let owner = project_id.owner().to_owned();
        let rollup_path = paths::org_rollup_path(&self.home, &owner);
        let lock = self.shared_locks.lock_for(&rollup_path);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(mut rollup) = atomic::read_json::<OrgRollup>(&rollup_path)? {
            if rollup.remove(project_id.name(), Utc::now()) {
                let org_dir = paths::org_dir(&self.home, &owner);
                if org_dir.exists() {
                    std::fs::remove_dir_all(&org_dir).map_err(|source| ZeroError::Io {
                        context: format!("removing org directory '{}'", org_dir.display()),
                        source,
                    })?;
                }
            } else {
                atomic::atomic_write_json(&rollup_path, &rollup)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::manifest::{GitInfo, RiskLevel};

    fn pid() -> ProjectId {
        ProjectId::new("octocat", "hello-world").unwrap()
    }

    fn git() -> GitInfo {
        GitInfo {
            commit_hash: "a".repeat(40),
            commit_short: "a".repeat(7),
            branch: Some("main".to_owned()),
            tag: None,
            commit_date: Utc::now(),
            commit_author: "Alice <alice@example.com>".to_owned(),
        }
    }

    fn manifest_with_summary(id: ProjectId, critical: u64, vulns: u64, deps: u64) -> Manifest {
        let now = Utc::now();
        Manifest {
            project_id: id,
            scan_id: crate::ids::ScanId::parse("20260727-120000-aaaa").unwrap(),
            schema_version: manifest::SCHEMA_VERSION.to_owned(),
            git: git(),
            scan: manifest::ScanInfo {
                started_at: now,
                completed_at: Some(now),
                duration_seconds: Some(1),
                profile: "default".to_owned(),
                scanners_requested: vec![],
                scanners_completed: vec![],
                scanners_failed: vec![],
            },
            analyses: std::collections::BTreeMap::new(),
            summary: manifest::ManifestSummary {
                risk_level: RiskLevel::from_counts(critical, 0, 0),
                total_dependencies: deps,
                total_vulnerabilities: vulns,
                critical,
                high: 0,
                medium: 0,
                security_findings: 0,
                abandoned_packages: 0,
                license_status: "clean".to_owned(),
            },
        }
    }

    #[test]
    fn manifest_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().to_path_buf());
        assert!(store.load_manifest(&pid()).unwrap().is_none());
    }

    #[test]
    fn manifest_save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().to_path_buf());
        let manifest = manifest_with_summary(pid(), 0, 1, 2);
        store.save_manifest(&manifest).unwrap();
        let loaded = store.load_manifest(&pid()).unwrap().unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn append_scan_history_persists_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().to_path_buf());
        store
            .append_scan_history(
                &pid(),
                ScanRecord {
                    scan_id: crate::ids::ScanId::parse("20260727-120000-aaaa").unwrap(),
                    commit_hash: "c1".to_owned(),
                    started_at: Utc::now(),
                    completed_at: Some(Utc::now()),
                    scanners_completed: 1,
                    scanners_failed: 0,
                },
            )
            .unwrap();
        let history = store.load_history(&pid()).unwrap();
        assert_eq!(history.total_scans, 1);
    }

    #[test]
    fn update_org_rollup_aggregates_across_projects() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().to_path_buf());
        store
            .update_org_rollup(&manifest_with_summary(ProjectId::new("acme", "r1").unwrap(), 1, 5, 10))
            .unwrap();
        let rollup = store
            .update_org_rollup(&manifest_with_summary(ProjectId::new("acme", "r2").unwrap(), 0, 2, 3))
            .unwrap();
        assert_eq!(rollup.project_count, 2);
        assert_eq!(rollup.aggregate.total_vulnerabilities, 7);
        assert_eq!(rollup.aggregate.repos_at_risk, vec!["r1".to_owned()]);
    }

    #[test]
    fn clean_project_removes_directory_and_index_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().to_path_buf());
        let id = pid();
        store
            .with_project_index(|index| {
                index.upsert(id.clone(), "src", ProjectStatus::Ready, Utc::now());
            })
            .unwrap();
        std::fs::create_dir_all(paths::project_dir(&store.home, &id)).unwrap();
        store.clean_project(&id).unwrap();
        assert!(!paths::project_dir(&store.home, &id).exists());
        let index = store.load_project_index().unwrap();
        assert!(!index.projects.contains_key(&id));
    }

    #[test]
    fn clean_last_project_in_org_removes_org_subtree() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().to_path_buf());
        let id = ProjectId::new("acme", "only-repo").unwrap();
        store.update_org_rollup(&manifest_with_summary(id.clone(), 0, 0, 0)).unwrap();
        store.clean_project(&id).unwrap();
        assert!(!paths::org_dir(&store.home, "acme").exists());
    }
}
