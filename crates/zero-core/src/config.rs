//! Orchestrator configuration (`zero.toml`).
//!
//! Defines the typed configuration for `<ZERO_HOME>/../zero.toml` (searched
//! in the current directory, falling back to built-in defaults if absent):
//! scanner profiles, parallelism limits, and per-scanner feature overrides.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::ids::ScannerName;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Top-level orchestrator configuration.
///
/// Parsed from `zero.toml`. Missing fields use sensible defaults. A missing
/// file is not an error — [`Settings::load`] returns [`Settings::default`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Settings {
    /// The profile used when none is specified on the command line.
    pub default_profile: String,

    /// Per-scanner timeout, in seconds, before the grace window begins.
    pub scanner_timeout_secs: u64,

    /// Clone/fetch timeout, in seconds, before the grace window begins.
    pub clone_timeout_secs: u64,

    /// Repo-level worker pool size (clamped to `[1, 16]` at use).
    pub parallel_repos: usize,

    /// Per-repo scanner worker pool size (clamped to `[1, 8]` at use).
    pub parallel_scanners: usize,

    /// File-count threshold above which "slow on large repos" scanners
    /// trigger the slow-scanner policy.
    pub slow_scanner_file_threshold: u64,

    /// Named scanner profiles.
    pub profiles: BTreeMap<String, ProfileConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert("default".to_owned(), ProfileConfig::default());
        Self {
            default_profile: default_profile_name(),
            scanner_timeout_secs: default_scanner_timeout(),
            clone_timeout_secs: default_clone_timeout(),
            parallel_repos: default_parallel_repos(),
            parallel_scanners: default_parallel_scanners(),
            slow_scanner_file_threshold: default_slow_threshold(),
            profiles,
        }
    }
}

fn default_profile_name() -> String {
    "default".to_owned()
}

const fn default_scanner_timeout() -> u64 {
    300
}

const fn default_clone_timeout() -> u64 {
    300
}

const fn default_parallel_repos() -> usize {
    4
}

const fn default_parallel_scanners() -> usize {
    4
}

const fn default_slow_threshold() -> u64 {
    20_000
}

impl Settings {
    /// Loads `zero.toml` from `path` if it exists, else returns defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(ConfigError {
                    path: Some(path.to_path_buf()),
                    message: err.to_string(),
                });
            }
        };
        toml::from_str(&text).map_err(|err| ConfigError {
            path: Some(path.to_path_buf()),
            message: err.to_string(),
        })
    }

    /// Looks up a named profile, falling back to the registry's synthesized
    /// default if `name` is the reserved string `"default"` and none was
    /// declared explicitly.
    pub fn get_profile(&self, name: &str) -> Option<&ProfileConfig> {
        self.profiles.get(name)
    }

    /// Clamps the configured repo parallelism into the allowed range.
    #[must_use]
    pub fn effective_parallel_repos(&self) -> usize {
        self.parallel_repos.clamp(1, 16)
    }

    /// Clamps the configured scanner parallelism into the allowed range.
    #[must_use]
    pub fn effective_parallel_scanners(&self) -> usize {
        self.parallel_scanners.clamp(1, 8)
    }
}

// ---------------------------------------------------------------------------
// ProfileConfig
// ---------------------------------------------------------------------------

/// A named, ordered set of scanners plus per-scanner feature overrides.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ProfileConfig {
    /// Scanners to run, in display order (execution order follows the
    /// dependency DAG regardless of this ordering).
    pub scanners: Vec<String>,

    /// Per-scanner feature overrides, as opaque JSON blobs.
    pub feature_overrides: BTreeMap<String, serde_json::Value>,

    /// Whether this profile requires, allows, or forbids agent-assisted
    /// scanning modes.
    pub claude_mode: ClaudeMode,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            scanners: vec!["sbom".to_owned(), "secrets".to_owned(), "license".to_owned()],
            feature_overrides: BTreeMap::new(),
            claude_mode: ClaudeMode::None,
        }
    }
}

impl ProfileConfig {
    /// Parses and validates each declared scanner name.
    pub fn scanner_names(&self) -> Result<Vec<ScannerName>, crate::ids::IdError> {
        self.scanners.iter().map(|s| ScannerName::new(s.clone())).collect()
    }
}

/// Whether a profile uses agent-assisted scanning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClaudeMode {
    /// No agent assistance.
    #[default]
    None,
    /// Agent assistance used where available.
    Enabled,
    /// Agent assistance is mandatory; profile fails closed without it.
    Required,
}

impl fmt::Display for ClaudeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Enabled => write!(f, "enabled"),
            Self::Required => write!(f, "required"),
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Configuration load/parse failure, convertible into [`crate::error::ZeroError`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigError {
    pub path: Option<PathBuf>,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::error::ZeroError {
    fn from(err: ConfigError) -> Self {
        Self::Config {
            path: err.path.unwrap_or_default(),
            detail: err.message,
        }
    }
}
