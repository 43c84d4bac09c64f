//! `project.json` — per-project source and detected-type metadata (§6).

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ProjectId;

/// Where a project's working copy came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Github,
    Local,
}

/// Languages, frameworks, and package managers detected in a working copy.
///
/// Detection itself is out of scope for this crate (§1); this is a plain
/// data carrier populated by whatever upstream step runs detection, or left
/// empty when none has run yet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectedType {
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub package_managers: Vec<String>,
}

/// `<home>/repos/<owner>/<repo>/project.json` (§6).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub source: String,
    pub source_type: SourceType,
    pub cloned_at: DateTime<Utc>,
    pub branch: Option<String>,
    pub commit: String,
    pub path: PathBuf,
    #[serde(default)]
    pub detected_type: DetectedType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_json() {
        let record = ProjectRecord {
            id: ProjectId::new("octocat", "hello-world").unwrap(),
            source: "https://github.com/octocat/hello-world.git".to_owned(),
            source_type: SourceType::Github,
            cloned_at: Utc::now(),
            branch: Some("main".to_owned()),
            commit: "a".repeat(40),
            path: PathBuf::from("/tmp/repo"),
            detected_type: DetectedType::default(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: ProjectRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
