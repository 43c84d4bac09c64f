//! gix-backed dirty-worktree detection.

use crate::error::GitError;
use crate::gix_repo::GixRepo;

/// `true` if the index differs from `HEAD` or the worktree differs from the
/// index. Used by the freshness oracle to tell `local-only` apart from a
/// clean cache hit.
pub fn is_dirty(repo: &GixRepo) -> Result<bool, GitError> {
    repo.repo
        .is_dirty()
        .map_err(|e| GitError::BackendError {
            message: format!("failed to compute dirty state: {e}"),
        })
}
