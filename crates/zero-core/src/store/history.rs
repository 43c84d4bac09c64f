//! `analysis/history.json` schema v1 (§3, §9) — the append-only scan log
//! for one project.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ScanId;

/// One entry in `history.json.scans` (§3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub scan_id: ScanId,
    pub commit_hash: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub scanners_completed: usize,
    pub scanners_failed: usize,
}

/// The append-only scan history for one project (§3, §8).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanHistory {
    pub total_scans: usize,
    pub first_scan_at: Option<DateTime<Utc>>,
    pub last_scan_at: Option<DateTime<Utc>>,
    pub scans: Vec<ScanRecord>,
    pub by_commit: BTreeMap<String, Vec<ScanId>>,
}

impl ScanHistory {
    /// Prepends `record` (§4.1: "New records are prepended"), recomputes
    /// `total_scans`, extends `first_scan_at`/`last_scan_at`, and appends
    /// the scan id under its commit hash.
    pub fn append(&mut self, record: ScanRecord) {
        self.first_scan_at = Some(self.first_scan_at.map_or(record.started_at, |t| t.min(record.started_at)));
        self.last_scan_at = Some(self.last_scan_at.map_or(record.started_at, |t| t.max(record.started_at)));
        self.by_commit
            .entry(record.commit_hash.clone())
            .or_default()
            .push(record.scan_id.clone());
        self.scans.insert(0, record);
        self.total_scans = self.scans.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(scan_id: &str, commit: &str, at: DateTime<Utc>) -> ScanRecord {
        ScanRecord {
            scan_id: ScanId::parse(scan_id.to_owned()).unwrap(),
            commit_hash: commit.to_owned(),
            started_at: at,
            completed_at: Some(at),
            scanners_completed: 1,
            scanners_failed: 0,
        }
    }

    #[test]
    fn append_prepends_and_tracks_totals() {
        let mut history = ScanHistory::default();
        let t1 = Utc::now();
        let t2 = t1 + chrono::Duration::seconds(60);
        history.append(record("20260727-120000-aaaa", "c1", t1));
        history.append(record("20260727-120100-bbbb", "c1", t2));

        assert_eq!(history.total_scans, 2);
        assert_eq!(history.scans[0].scan_id.as_str(), "20260727-120100-bbbb");
        assert_eq!(history.first_scan_at, Some(t1));
        assert_eq!(history.last_scan_at, Some(t2));
        assert_eq!(history.by_commit["c1"].len(), 2);
    }

    #[test]
    fn history_roundtrips_through_json() {
        let mut history = ScanHistory::default();
        history.append(record("20260727-120000-aaaa", "c1", Utc::now()));
        let json = serde_json::to_string(&history).unwrap();
        let back: ScanHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(history, back);
    }
}
