//! Validated identifier newtypes used throughout the orchestrator.
//!
//! Mirrors the validated-vocabulary pattern used for git-level identifiers:
//! each type rejects malformed values at the boundary (deserialization,
//! CLI parsing) so downstream code can assume well-formedness.

use std::fmt;
use std::str::FromStr;

use rand::Rng as _;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ProjectId
// ---------------------------------------------------------------------------

/// A project identifier of the form `owner/name`, canonicalized to lowercase.
///
/// Local (non-code-hosted) targets use the reserved owner `local`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    /// Validates and lowercases `owner/name`.
    pub fn new(owner: &str, name: &str) -> Result<Self, IdError> {
        if owner.is_empty() || name.is_empty() {
            return Err(IdError {
                kind: "ProjectId",
                value: format!("{owner}/{name}"),
                reason: "owner and name must both be non-empty".to_owned(),
            });
        }
        if owner.contains('/') || name.contains('/') {
            return Err(IdError {
                kind: "ProjectId",
                value: format!("{owner}/{name}"),
                reason: "owner and name must not themselves contain '/'".to_owned(),
            });
        }
        Ok(Self(format!(
            "{}/{}",
            owner.to_lowercase(),
            name.to_lowercase()
        )))
    }

    /// The reserved owner for targets with no code-hosting origin.
    pub const LOCAL_OWNER: &'static str = "local";

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits back into `(owner, name)`.
    #[must_use]
    pub fn parts(&self) -> (&str, &str) {
        // Validated at construction: exactly one '/'.
        self.0.split_once('/').unwrap_or((&self.0, ""))
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        self.parts().0
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.parts().1
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((owner, name)) = s.split_once('/') else {
            return Err(IdError {
                kind: "ProjectId",
                value: s.to_owned(),
                reason: "must contain exactly one '/' separating owner and name".to_owned(),
            });
        };
        if name.contains('/') {
            return Err(IdError {
                kind: "ProjectId",
                value: s.to_owned(),
                reason: "must contain exactly one '/'".to_owned(),
            });
        }
        Self::new(owner, name)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = IdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// ScannerName
// ---------------------------------------------------------------------------

/// A scanner's registered name: lowercase ASCII alphanumeric plus `-`/`_`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScannerName(String);

impl ScannerName {
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        if value.is_empty()
            || !value
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(IdError {
                kind: "ScannerName",
                value,
                reason: "must be non-empty lowercase ascii alphanumeric, '-', or '_'".to_owned(),
            });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScannerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ScannerName {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ScannerName {
    type Error = IdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ScannerName> for String {
    fn from(name: ScannerName) -> Self {
        name.0
    }
}

// ---------------------------------------------------------------------------
// ScanId
// ---------------------------------------------------------------------------

/// A scan identifier: `YYYYMMDD-HHMMSS-XXXX` (UTC timestamp + 4 random hex
/// characters). Generation is collision-resistant within a process even in
/// tight loops, since the random suffix is independent of the clock.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScanId(String);

impl ScanId {
    /// Generates a new scan ID from the current UTC time.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(chrono::Utc::now())
    }

    fn generate_at(now: chrono::DateTime<chrono::Utc>) -> Self {
        let stamp = now.format("%Y%m%d-%H%M%S");
        let suffix: u16 = rand::rng().random_range(0..=0xFFFF);
        Self(format!("{stamp}-{suffix:04x}"))
    }

    pub fn parse(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        let parts: Vec<&str> = value.split('-').collect();
        let valid = parts.len() == 3
            && parts[0].len() == 8
            && parts[0].bytes().all(|b| b.is_ascii_digit())
            && parts[1].len() == 6
            && parts[1].bytes().all(|b| b.is_ascii_digit())
            && parts[2].len() == 4
            && parts[2].bytes().all(|b| b.is_ascii_hexdigit());
        if !valid {
            return Err(IdError {
                kind: "ScanId",
                value,
                reason: "must match YYYYMMDD-HHMMSS-XXXX".to_owned(),
            });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ScanId {
    type Error = IdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<ScanId> for String {
    fn from(id: ScanId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// IdError
// ---------------------------------------------------------------------------

/// Validation failure for any of the identifier newtypes in this module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdError {
    pub kind: &'static str,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}': {}", self.kind, self.value, self.reason)
    }
}

impl std::error::Error for IdError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_id_lowercases() {
        let id = ProjectId::new("OctoCat", "Hello-World").unwrap();
        assert_eq!(id.as_str(), "octocat/hello-world");
    }

    #[test]
    fn project_id_rejects_no_slash() {
        assert!("nowhereslash".parse::<ProjectId>().is_err());
    }

    #[test]
    fn project_id_rejects_extra_slash() {
        assert!("a/b/c".parse::<ProjectId>().is_err());
    }

    #[test]
    fn project_id_parts_roundtrip() {
        let id = ProjectId::new("acme", "widgets").unwrap();
        assert_eq!(id.parts(), ("acme", "widgets"));
        assert_eq!(id.owner(), "acme");
        assert_eq!(id.name(), "widgets");
    }

    #[test]
    fn scanner_name_accepts_valid() {
        assert!(ScannerName::new("sbom").is_ok());
        assert!(ScannerName::new("secrets-scan_v2").is_ok());
    }

    #[test]
    fn scanner_name_rejects_uppercase() {
        assert!(ScannerName::new("SBOM").is_err());
    }

    #[test]
    fn scanner_name_rejects_empty() {
        assert!(ScannerName::new("").is_err());
    }

    #[test]
    fn scan_id_generate_matches_shape() {
        let id = ScanId::generate();
        assert!(ScanId::parse(id.as_str().to_owned()).is_ok());
    }

    #[test]
    fn scan_id_generate_is_collision_resistant_in_a_tight_loop() {
        let ids: std::collections::HashSet<String> =
            (0..256).map(|_| ScanId::generate().as_str().to_owned()).collect();
        assert!(ids.len() > 1, "all generated ids collided, rng is broken");
    }

    #[test]
    fn scan_id_parse_rejects_malformed() {
        assert!(ScanId::parse("not-a-scan-id".to_owned()).is_err());
        assert!(ScanId::parse("20260727-120000".to_owned()).is_err());
        assert!(ScanId::parse("20260727-120000-zzzz".to_owned()).is_err());
    }

    #[test]
    fn scan_id_parse_accepts_well_formed() {
        assert!(ScanId::parse("20260727-134501-a1b2".to_owned()).is_ok());
    }
}

// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_segment() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9][a-zA-Z0-9_-]{0,19}"
    }

    fn arb_scanner_chars() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,19}"
    }

    proptest! {
        #[test]
        fn prop_project_id_roundtrips_through_parts(owner in arb_segment(), name in arb_segment()) {
            let id = ProjectId::new(&owner, &name).unwrap();
            prop_assert_eq!(id.owner(), owner.to_lowercase());
            prop_assert_eq!(id.name(), name.to_lowercase());
        }

        #[test]
        fn prop_project_id_display_reparses_to_the_same_value(owner in arb_segment(), name in arb_segment()) {
            let id = ProjectId::new(&owner, &name).unwrap();
            let reparsed: ProjectId = id.to_string().parse().unwrap();
            prop_assert_eq!(reparsed, id);
        }

        #[test]
        fn prop_project_id_is_always_lowercase(owner in arb_segment(), name in arb_segment()) {
            let id = ProjectId::new(&owner, &name).unwrap();
            prop_assert_eq!(id.as_str(), id.as_str().to_lowercase());
        }

        #[test]
        fn prop_project_id_rejects_any_string_without_exactly_one_slash(s in "[a-zA-Z0-9]{0,10}") {
            // No '/' at all: must be rejected.
            prop_assert!(s.parse::<ProjectId>().is_err());
        }

        #[test]
        fn prop_scanner_name_accepts_its_own_charset(value in arb_scanner_chars()) {
            let name = ScannerName::new(value.clone()).unwrap();
            prop_assert_eq!(name.as_str(), value.as_str());
        }

        #[test]
        fn prop_scanner_name_rejects_any_uppercase_ascii(value in "[A-Z][a-z0-9_-]{0,19}") {
            prop_assert!(ScannerName::new(value).is_err());
        }

        #[test]
        fn prop_scan_id_generate_always_parses(_unit in Just(())) {
            let id = ScanId::generate();
            prop_assert!(ScanId::parse(id.as_str().to_owned()).is_ok());
        }

        #[test]
        fn prop_scan_id_well_formed_strings_always_parse(
            date in "20[0-9]{6}",
            time in "[0-9]{6}",
            suffix in "[0-9a-f]{4}"
        ) {
            let value = format!("{date}-{time}-{suffix}");
            prop_assert!(ScanId::parse(value).is_ok());
        }

        #[test]
        fn prop_scan_id_rejects_wrong_segment_count(value in "[0-9a-f-]{0,30}") {
            let segments: Vec<&str> = value.split('-').collect();
            if segments.len() != 3 {
                prop_assert!(ScanId::parse(value).is_err());
            }
        }
    }
}
