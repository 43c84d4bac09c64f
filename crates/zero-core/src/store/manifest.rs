//! `analysis/manifest.json` schema v2 (§3, §4.1) — the latest-scan record
//! for one project.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ProjectId, ScanId, ScannerName};
use crate::runner::{ScannerResult, ScannerStatus};
use crate::scheduler::ScanOutcome;

pub const SCHEMA_VERSION: &str = "2.0.0";

/// Git state at the moment of the scan (§3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GitInfo {
    pub commit_hash: String,
    pub commit_short: String,
    pub branch: Option<String>,
    pub tag: Option<String>,
    pub commit_date: DateTime<Utc>,
    pub commit_author: String,
}

/// The scan's own timing and scanner-set bookkeeping (§3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanInfo {
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub profile: String,
    pub scanners_requested: Vec<ScannerName>,
    pub scanners_completed: Vec<ScannerName>,
    pub scanners_failed: Vec<ScannerName>,
}

/// One scanner's entry within `analyses` (§3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisEntry {
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: ScannerStatus,
    pub duration_ms: Option<i64>,
    pub output_file: Option<String>,
    pub summary: Option<serde_json::Value>,
}

impl From<&ScannerResult> for AnalysisEntry {
    fn from(result: &ScannerResult) -> Self {
        Self {
            started_at: result.started_at,
            completed_at: Some(result.completed_at),
            status: result.status,
            duration_ms: Some(result.duration_ms()),
            output_file: (result.status == ScannerStatus::Complete)
                .then(|| format!("{}.json", result.scanner)),
            summary: (!result.summary.is_null()).then(|| result.summary.clone()),
        }
    }
}

/// Coarse cross-scanner risk classification, per §4.1's threshold table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// `critical ≥ 1 → critical, high ≥ 1 → high, medium ≥ 5 → medium, else low` (§4.1).
    #[must_use]
    pub const fn from_counts(critical: u64, high: u64, medium: u64) -> Self {
        if critical >= 1 {
            Self::Critical
        } else if high >= 1 {
            Self::High
        } else if medium >= 5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Cross-scanner rollup stored at `manifest.summary` (§4.1).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestSummary {
    pub risk_level: RiskLevel,
    pub total_dependencies: u64,
    pub total_vulnerabilities: u64,
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub security_findings: u64,
    pub abandoned_packages: u64,
    pub license_status: String,
}

impl Default for ManifestSummary {
    fn default() -> Self {
        Self {
            risk_level: RiskLevel::Unknown,
            total_dependencies: 0,
            total_vulnerabilities: 0,
            critical: 0,
            high: 0,
            medium: 0,
            security_findings: 0,
            abandoned_packages: 0,
            license_status: "unknown".to_owned(),
        }
    }
}

/// Reads `{critical, high, medium, dependencies}` counts out of a scanner's
/// opaque JSON summary, tolerating absent fields (§9: feature configs and
/// scanner payloads are opaque JSON by design).
fn count(summary: &serde_json::Value, key: &str) -> u64 {
    summary.get(key).and_then(serde_json::Value::as_u64).unwrap_or(0)
}

impl ManifestSummary {
    /// Rolls up counts from every complete scanner's `summary` payload. Each
    /// scanner is free to report whichever of `critical`/`high`/`medium`/
    /// `dependencies`/`security_findings`/`abandoned_packages`/
    /// `license_status` fields apply to it; absent fields contribute zero.
    #[must_use]
    pub fn rollup(results: &[ScannerResult]) -> Self {
        let mut summary = Self::default();
        let mut license_status = None;
        for result in results {
            if result.status != ScannerStatus::Complete {
                continue;
            }
            summary.critical += count(&result.summary, "critical");
            summary.high += count(&result.summary, "high");
            summary.medium += count(&result.summary, "medium");
            summary.total_dependencies += count(&result.summary, "dependencies");
            summary.total_vulnerabilities += count(&result.summary, "vulnerabilities");
            summary.security_findings += count(&result.summary, "security_findings");
            summary.abandoned_packages += count(&result.summary, "abandoned_packages");
            if license_status.is_none() {
                license_status = result
                    .summary
                    .get("license_status")
                    .and_then(serde_json::Value::as_str)
                    .map(ToOwned::to_owned);
            }
        }
        summary.risk_level = RiskLevel::from_counts(summary.critical, summary.high, summary.medium);
        if let Some(status) = license_status {
            summary.license_status = status;
        }
        summary
    }
}

/// The latest-scan manifest for one project (§3, §6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub project_id: ProjectId,
    pub scan_id: ScanId,
    pub schema_version: String,
    pub git: GitInfo,
    pub scan: ScanInfo,
    pub analyses: BTreeMap<ScannerName, AnalysisEntry>,
    pub summary: ManifestSummary,
}

impl Manifest {
    /// Builds a manifest from one completed (or cancelled) repo scan.
    #[must_use]
    pub fn from_outcome(
        project_id: ProjectId,
        scan_id: ScanId,
        git: GitInfo,
        profile: String,
        scanners_requested: Vec<ScannerName>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        outcome: &ScanOutcome,
    ) -> Self {
        let scanners_completed: Vec<ScannerName> = outcome
            .results
            .iter()
            .filter(|r| r.status == ScannerStatus::Complete)
            .map(|r| r.scanner.clone())
            .collect();
        let scanners_failed: Vec<ScannerName> = outcome
            .results
            .iter()
            .filter(|r| r.status == ScannerStatus::Failed)
            .map(|r| r.scanner.clone())
            .collect();
        let analyses = outcome
            .results
            .iter()
            .map(|r| (r.scanner.clone(), AnalysisEntry::from(r)))
            .collect();
        Self {
            project_id,
            scan_id,
            schema_version: SCHEMA_VERSION.to_owned(),
            git,
            scan: ScanInfo {
                started_at,
                completed_at: Some(completed_at),
                duration_seconds: Some((completed_at - started_at).num_seconds().max(0)),
                profile,
                scanners_requested,
                scanners_completed,
                scanners_failed,
            },
            analyses,
            summary: ManifestSummary::rollup(&outcome.results),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::SkipReason;

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

    fn complete_result(name: &str, summary: serde_json::Value) -> ScannerResult {
        let now = Utc::now();
        ScannerResult {
            scanner: ScannerName::new(name).unwrap(),
            version: "0.1.0".to_owned(),
            started_at: now,
            completed_at: now,
            status: ScannerStatus::Complete,
            skip_reason: None,
            summary,
            findings: serde_json::Value::Null,
            error: None,
        }
    }

    #[test]
    fn risk_level_thresholds() {
        assert_eq!(RiskLevel::from_counts(1, 0, 0), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_counts(0, 1, 0), RiskLevel::High);
        assert_eq!(RiskLevel::from_counts(0, 0, 5), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_counts(0, 0, 4), RiskLevel::Low);
    }

    #[test]
    fn summary_rollup_sums_across_scanners() {
        let results = vec![
            complete_result("sbom", serde_json::json!({"dependencies": 10})),
            complete_result("secrets", serde_json::json!({"critical": 2, "security_findings": 2})),
        ];
        let summary = ManifestSummary::rollup(&results);
        assert_eq!(summary.total_dependencies, 10);
        assert_eq!(summary.critical, 2);
        assert_eq!(summary.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn summary_rollup_skips_non_complete_scanners() {
        let mut failed = complete_result("sbom", serde_json::json!({"dependencies": 10}));
        failed.status = ScannerStatus::Failed;
        let summary = ManifestSummary::rollup(&[failed]);
        assert_eq!(summary.total_dependencies, 0);
    }

    #[test]
    fn manifest_roundtrips_through_json() {
        let outcome = ScanOutcome {
            results: vec![
                complete_result("sbom", serde_json::Value::Null),
                ScannerResult::skipped(ScannerName::new("secrets").unwrap(), SkipReason::User),
            ],
        };
        let now = Utc::now();
        let manifest = Manifest::from_outcome(
            ProjectId::new("octocat", "hello-world").unwrap(),
            ScanId::parse("20260727-120000-ab12").unwrap(),
            git(),
            "default".to_owned(),
            vec![ScannerName::new("sbom").unwrap(), ScannerName::new("secrets").unwrap()],
            now,
            now,
            &outcome,
        );
        let json = serde_json::to_string(&manifest).unwrap();
        let back: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(manifest, back);
        assert_eq!(manifest.scan.scanners_completed.len(), 1);
    }
}
