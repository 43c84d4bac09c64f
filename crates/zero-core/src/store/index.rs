//! `<home>/index.json` schema v1 (§3, §6) — the process-wide project index.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ProjectId;

pub const SCHEMA_VERSION: &str = "1.0.0";

/// A project's lifecycle state (§3: "A project is created on first clone;
/// its status transitions `bootstrapping -> cloned -> scanning -> ready`
/// (or `failed`)").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Bootstrapping,
    Cloned,
    Scanning,
    Ready,
    Failed,
}

/// One project's entry in the process-wide index (§6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectIndexEntry {
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub last_analyzed: Option<DateTime<Utc>>,
    pub status: ProjectStatus,
}

/// `<home>/index.json` (§6): `{version, projects, active}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectIndex {
    pub version: String,
    pub active: Option<ProjectId>,
    pub projects: BTreeMap<ProjectId, ProjectIndexEntry>,
}

impl Default for ProjectIndex {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION.to_owned(),
            active: None,
            projects: BTreeMap::new(),
        }
    }
}

impl ProjectIndex {
    /// Inserts or updates `project_id`'s entry, tracking `source` only on
    /// first creation (a project is created on first clone; subsequent
    /// updates only move `status`/`last_analyzed` forward).
    pub fn upsert(&mut self, project_id: ProjectId, source: &str, status: ProjectStatus, now: DateTime<Utc>) {
        self.projects
            .entry(project_id)
            .and_modify(|entry| {
                entry.status = status;
                entry.last_analyzed = Some(now);
            })
            .or_insert_with(|| ProjectIndexEntry {
                source: source.to_owned(),
                created_at: now,
                last_analyzed: Some(now),
                status,
            });
    }

    /// Removes `project_id`'s entry, clearing `active` if it pointed here.
    pub fn remove(&mut self, project_id: &ProjectId) {
        self.projects.remove(project_id);
        if self.active.as_ref() == Some(project_id) {
            self.active = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid() -> ProjectId {
        ProjectId::new("octocat", "hello-world").unwrap()
    }

    #[test]
    fn upsert_creates_then_updates_in_place() {
        let mut index = ProjectIndex::default();
        let now = Utc::now();
        index.upsert(pid(), "https://github.com/octocat/hello-world.git", ProjectStatus::Bootstrapping, now);
        assert_eq!(index.projects.len(), 1);
        let later = now + chrono::Duration::seconds(10);
        index.upsert(pid(), "ignored-on-update", ProjectStatus::Ready, later);
        let entry = &index.projects[&pid()];
        assert_eq!(entry.status, ProjectStatus::Ready);
        assert_eq!(entry.source, "https://github.com/octocat/hello-world.git");
        assert_eq!(entry.created_at, now);
    }

    #[test]
    fn remove_clears_active_pointer() {
        let mut index = ProjectIndex::default();
        index.active = Some(pid());
        index.upsert(pid(), "src", ProjectStatus::Ready, Utc::now());
        index.remove(&pid());
        assert!(index.projects.is_empty());
        assert!(index.active.is_none());
    }

    #[test]
    fn index_roundtrips_through_json() {
        let mut index = ProjectIndex::default();
        index.upsert(pid(), "src", ProjectStatus::Cloned, Utc::now());
        let json = serde_json::to_string(&index).unwrap();
        let back: ProjectIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(index, back);
    }
}
