//! Error types for git operations.
//!
//! [`GitError`] is the single error type returned by all [`GitRepo`](crate::GitRepo) trait
//! methods. It uses rich enum variants so callers can match on specific failure
//! modes (e.g., missing ref, auth failure, timeout) without parsing error
//! messages.

use thiserror::Error;

/// Errors returned by [`GitRepo`](crate::GitRepo) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// A requested object, ref, or path was not found.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable description of what was missing.
        message: String,
    },

    /// An OID string could not be parsed or was otherwise invalid.
    #[error("invalid OID `{value}`: {reason}")]
    InvalidOid {
        /// The raw value that failed validation.
        value: String,
        /// Why validation failed.
        reason: String,
    },

    /// An I/O error occurred (file system, process spawn, etc.).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A clone or fetch failed to authenticate against the remote.
    #[error("authentication failed for `{remote}`: {message}")]
    AuthFailed {
        /// The remote URL or name.
        remote: String,
        /// Details from the transport.
        message: String,
    },

    /// A remote-reaching operation (clone, fetch, ls-remote) could not
    /// complete within its allotted deadline.
    #[error("operation on `{remote}` timed out after {elapsed_secs}s")]
    Timeout {
        /// The remote URL or name.
        remote: String,
        /// How long the operation ran before being aborted.
        elapsed_secs: u64,
    },

    /// A clone or fetch was aborted by cooperative cancellation, not a deadline.
    #[error("operation on `{remote}` was cancelled")]
    Cancelled {
        /// The remote URL or name.
        remote: String,
    },

    /// The underlying git backend (gix) returned an unclassified error.
    ///
    /// This is the catch-all for errors that don't fit other variants. The
    /// `message` should include enough context to diagnose the failure.
    #[error("git backend error: {message}")]
    BackendError {
        /// Freeform error description from the backend.
        message: String,
    },
}

impl GitError {
    /// `true` if retrying the same operation immediately is unlikely to help
    /// (auth failures, malformed refs) as opposed to transient failures
    /// (timeouts, generic backend errors from a flaky network).
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::AuthFailed { .. } | Self::InvalidOid { .. })
    }
}
