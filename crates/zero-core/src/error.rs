//! Orchestrator error types.
//!
//! Defines [`ZeroError`], the unified error type returned by every pipeline
//! operation. Error messages are designed to be actionable on their own:
//! each variant carries enough detail and "to fix" guidance that a caller
//! doesn't need to go spelunking through logs to understand what happened.

use std::fmt;
use std::path::PathBuf;

use crate::ids::{IdError, ProjectId, ScannerName};

// ---------------------------------------------------------------------------
// ZeroError
// ---------------------------------------------------------------------------

/// Unified error type for orchestrator operations.
///
/// Variants follow the §7 error taxonomy: `config.*` are fatal before any
/// side effect, `io.*` are fatal for the affected project only, `vcs.*`
/// exclude a repo from the scan phase, and `scanner.*` only affect the one
/// scanner (and its dependents).
#[derive(Debug)]
pub enum ZeroError {
    /// A requested scanner is not registered.
    UnknownScanner {
        /// The name that was requested.
        name: String,
    },

    /// A requested profile is not defined in configuration.
    UnknownProfile {
        /// The profile name that was requested.
        name: String,
    },

    /// An organization target resolved to zero repositories.
    EmptyOrg {
        /// The organization name.
        org: String,
    },

    /// A target string could not be parsed as `owner/repo` or an org name.
    InvalidTarget {
        /// The raw target string supplied.
        target: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A registered scanner declares a dependency the registry has no entry for.
    UnsatisfiableDependency {
        /// The scanner with the bad dependency.
        scanner: ScannerName,
        /// The missing dependency name.
        missing: String,
    },

    /// A dependency cycle was detected among a requested scanner subset.
    DependencyCycle {
        /// The scanners involved in the cycle, in detection order.
        cycle: Vec<ScannerName>,
    },

    /// An I/O error occurred against the artifact store.
    Io {
        /// What was being done when the error occurred.
        context: String,
        source: std::io::Error,
    },

    /// A manifest, history, or rollup file contained malformed JSON.
    MalformedArtifact {
        /// Path to the offending file.
        path: PathBuf,
        /// Parser error detail.
        detail: String,
    },

    /// A git operation (clone, fetch, checkout, ...) failed.
    Vcs {
        /// The project being operated on.
        project: ProjectId,
        source: zero_git::GitError,
    },

    /// A scanner's external tool is not installed.
    ToolMissing {
        /// The scanner that needed it.
        scanner: ScannerName,
        /// The missing tool's name.
        tool: String,
    },

    /// A scanner exceeded its time budget (including the grace period).
    ScannerTimeout {
        /// The scanner that timed out.
        scanner: ScannerName,
        /// The configured deadline, in seconds.
        deadline_secs: u64,
    },

    /// A scanner ran but reported, or produced, invalid results.
    ScannerExecution {
        /// The scanner that failed.
        scanner: ScannerName,
        /// Human-readable description of the failure.
        detail: String,
    },

    /// The configuration file could not be loaded or parsed.
    Config {
        /// Path to the configuration file.
        path: PathBuf,
        /// Human-readable description of the problem.
        detail: String,
    },

    /// A validated identifier failed validation.
    InvalidId(IdError),

    /// An operation that requires an already-cloned project (e.g.
    /// `scan_cached`) was given one the index has no record of.
    ProjectNotFound {
        /// The project that was requested.
        project_id: ProjectId,
    },

    /// The operation was cancelled before completion.
    Cancelled,
}

// ---------------------------------------------------------------------------
// Display — actionable error messages
// ---------------------------------------------------------------------------

impl fmt::Display for ZeroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownScanner { name } => {
                write!(
                    f,
                    "unknown scanner '{name}'.\n  To fix: check registered scanners with `zero scanners list`."
                )
            }
            Self::UnknownProfile { name } => {
                write!(
                    f,
                    "unknown profile '{name}'.\n  To fix: check available profiles in zero.toml, or use the default profile."
                )
            }
            Self::EmptyOrg { org } => {
                write!(
                    f,
                    "organization '{org}' has no repositories (or none are visible).\n  To fix: verify the org name and your access, then retry."
                )
            }
            Self::InvalidTarget { target, reason } => {
                write!(
                    f,
                    "invalid target '{target}': {reason}\n  Targets must be 'owner/repo' or an organization name."
                )
            }
            Self::UnsatisfiableDependency { scanner, missing } => {
                write!(
                    f,
                    "scanner '{scanner}' depends on unregistered scanner '{missing}'.\n  To fix: register '{missing}' before '{scanner}', or remove the dependency."
                )
            }
            Self::DependencyCycle { cycle } => {
                write!(f, "dependency cycle among scanners: ")?;
                let names: Vec<&str> = cycle.iter().map(ScannerName::as_str).collect();
                write!(f, "{}", names.join(" -> "))?;
                write!(f, "\n  To fix: break the cycle in scanner dependency declarations.")
            }
            Self::Io { context, source } => {
                write!(
                    f,
                    "I/O error while {context}: {source}\n  To fix: check file permissions and disk space."
                )
            }
            Self::MalformedArtifact { path, detail } => {
                write!(
                    f,
                    "malformed artifact at '{}': {}\n  To fix: the file will be treated as absent and rebuilt on next scan; delete it manually if this persists.",
                    path.display(),
                    detail
                )
            }
            Self::Vcs { project, source } => {
                write!(
                    f,
                    "git operation failed for '{project}': {source}\n  To fix: verify the remote URL and credentials, then retry."
                )
            }
            Self::ToolMissing { scanner, tool } => {
                write!(
                    f,
                    "scanner '{scanner}' requires '{tool}', which is not installed.\n  To fix: install '{tool}' and retry, or remove '{scanner}' from the active profile."
                )
            }
            Self::ScannerTimeout { scanner, deadline_secs } => {
                write!(
                    f,
                    "scanner '{scanner}' exceeded its {deadline_secs}s deadline.\n  To fix: increase the scanner timeout in configuration, or skip it on large repos."
                )
            }
            Self::ScannerExecution { scanner, detail } => {
                write!(
                    f,
                    "scanner '{scanner}' failed: {detail}\n  To fix: check the scanner's own logs; other scanners are unaffected."
                )
            }
            Self::Config { path, detail } => {
                write!(
                    f,
                    "configuration error in '{}': {}\n  To fix: edit the config file and correct the issue.",
                    path.display(),
                    detail
                )
            }
            Self::InvalidId(err) => write!(f, "{err}"),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::ProjectNotFound { project_id } => {
                write!(
                    f,
                    "project '{project_id}' has not been cloned.\n  To fix: run `zero hydrate {project_id}` first."
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// std::error::Error
// ---------------------------------------------------------------------------

impl std::error::Error for ZeroError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Vcs { source, .. } => Some(source),
            Self::InvalidId(err) => Some(err),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// From impls
// ---------------------------------------------------------------------------

impl From<IdError> for ZeroError {
    fn from(err: IdError) -> Self {
        Self::InvalidId(err)
    }
}

impl ZeroError {
    /// True for errors whose cause will not resolve itself on retry
    /// (bad credentials, malformed input) as opposed to transient ones.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::UnknownScanner { .. }
                | Self::UnknownProfile { .. }
                | Self::InvalidTarget { .. }
                | Self::UnsatisfiableDependency { .. }
                | Self::DependencyCycle { .. }
                | Self::ToolMissing { .. }
                | Self::Config { .. }
                | Self::InvalidId(_)
        )
    }
}
