//! `<org>/_index.json` — per-organization aggregate view (§3, §4.1).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::manifest::{Manifest, RiskLevel};

/// One project's entry within an [`OrgRollup`] (§3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectRollupEntry {
    pub last_scan_id: String,
    pub last_scan_at: DateTime<Utc>,
    pub commit: String,
    pub risk_level: RiskLevel,
    pub vulns: u64,
    pub deps: u64,
}

impl ProjectRollupEntry {
    #[must_use]
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            last_scan_id: manifest.scan_id.as_str().to_owned(),
            last_scan_at: manifest.scan.completed_at.unwrap_or(manifest.scan.started_at),
            commit: manifest.git.commit_hash.clone(),
            risk_level: manifest.summary.risk_level,
            vulns: manifest.summary.total_vulnerabilities,
            deps: manifest.summary.total_dependencies,
        }
    }
}

/// Totals recomputed across every project entry (§4.1).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RollupAggregate {
    pub total_vulnerabilities: u64,
    pub critical: u64,
    pub high: u64,
    pub total_dependencies: u64,
    pub repos_at_risk: Vec<String>,
}

/// Per-organization aggregate at `<org>/_index.json` (§3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrgRollup {
    pub org: String,
    pub updated_at: DateTime<Utc>,
    pub project_count: usize,
    pub aggregate: RollupAggregate,
    pub projects: BTreeMap<String, ProjectRollupEntry>,
}

impl OrgRollup {
    #[must_use]
    pub fn empty(org: String) -> Self {
        Self {
            org,
            updated_at: Utc::now(),
            project_count: 0,
            aggregate: RollupAggregate::default(),
            projects: BTreeMap::new(),
        }
    }

    /// Upserts `repo`'s entry, then recomputes `aggregate` and `project_count`
    /// from scratch by summing across every project entry (§4.1) — never
    /// incrementally, so the aggregate is always exactly the sum of what is
    /// currently recorded.
    pub fn upsert(&mut self, repo: &str, entry: ProjectRollupEntry, now: DateTime<Utc>) {
        self.projects.insert(repo.to_owned(), entry);
        self.recompute(now);
    }

    /// Removes `repo`'s entry and recomputes aggregates. Returns `true` if
    /// no projects remain (caller should then remove the whole org subtree).
    pub fn remove(&mut self, repo: &str, now: DateTime<Utc>) -> bool {
        self.projects.remove(repo);
        self.recompute(now);
        self.projects.is_empty()
    }

    fn recompute(&mut self, now: DateTime<Utc>) {
        let mut aggregate = RollupAggregate::default();
        for (repo, entry) in &self.projects {
            aggregate.total_vulnerabilities += entry.vulns;
            aggregate.total_dependencies += entry.deps;
            match entry.risk_level {
                RiskLevel::Critical => aggregate.critical += 1,
                RiskLevel::High => aggregate.high += 1,
                RiskLevel::Unknown | RiskLevel::Low | RiskLevel::Medium => {}
            }
            if matches!(entry.risk_level, RiskLevel::Critical | RiskLevel::High) {
                aggregate.repos_at_risk.push(repo.clone());
            }
        }
        self.project_count = self.projects.len();
        self.aggregate = aggregate;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(risk: RiskLevel, vulns: u64, deps: u64) -> ProjectRollupEntry {
        ProjectRollupEntry {
            last_scan_id: "20260727-120000-aaaa".to_owned(),
            last_scan_at: Utc::now(),
            commit: "a".repeat(40),
            risk_level: risk,
            vulns,
            deps,
        }
    }

    #[test]
    fn upsert_recomputes_aggregate() {
        let mut rollup = OrgRollup::empty("acme".to_owned());
        rollup.upsert("r1", entry(RiskLevel::Critical, 5, 10), Utc::now());
        rollup.upsert("r2", entry(RiskLevel::Low, 1, 20), Utc::now());
        assert_eq!(rollup.project_count, 2);
        assert_eq!(rollup.aggregate.total_vulnerabilities, 6);
        assert_eq!(rollup.aggregate.total_dependencies, 30);
        assert_eq!(rollup.aggregate.critical, 1);
        assert_eq!(rollup.aggregate.repos_at_risk, vec!["r1".to_owned()]);
    }

    #[test]
    fn remove_last_project_reports_empty() {
        let mut rollup = OrgRollup::empty("acme".to_owned());
        rollup.upsert("r1", entry(RiskLevel::Low, 0, 0), Utc::now());
        let now_empty = rollup.remove("r1", Utc::now());
        assert!(now_empty);
        assert_eq!(rollup.project_count, 0);
    }

    #[test]
    fn aggregate_equals_sum_across_projects() {
        let mut rollup = OrgRollup::empty("acme".to_owned());
        rollup.upsert("r1", entry(RiskLevel::High, 3, 4), Utc::now());
        rollup.upsert("r2", entry(RiskLevel::High, 7, 6), Utc::now());
        let recomputed_vulns: u64 = rollup.projects.values().map(|p| p.vulns).sum();
        assert_eq!(rollup.aggregate.total_vulnerabilities, recomputed_vulns);
    }
}
