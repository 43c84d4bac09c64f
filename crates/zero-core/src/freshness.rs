//! The Freshness Oracle (C8, §4.8) — classifies a cached working copy
//! against its remote, and performs fast-forward or forced updates.

use std::sync::atomic::AtomicBool;

use zero_git::{GitOid, GitRepo};

/// Classification of a cached working copy relative to its remote (§4.8).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Freshness {
    /// Local HEAD equals remote HEAD on its branch.
    UpToDate,
    /// Local HEAD is a strict ancestor of the remote tip.
    NeedsUpdate { remote_commit: GitOid },
    /// Neither commit is an ancestor of the other.
    Diverged { local_commit: GitOid, remote_commit: GitOid },
    /// No remote is configured for this branch.
    LocalOnly,
    /// Classification could not be determined.
    Error { reason: String },
}

/// Outcome of [`update_if_needed`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateResult {
    /// The working copy is current, or was brought current.
    Ok,
    /// The update did not happen; `reason` explains why.
    Failed { reason: String },
}

/// Classifies `repo`'s `branch` against `remote` (§4.8).
///
/// Uses one lightweight remote ref lookup (`remote_ref_oid`, an `ls-remote`
/// equivalent) plus local ancestry checks. Performs no fetch — classification
/// alone never touches the object store.
#[must_use]
pub fn classify(repo: &dyn GitRepo, remote: &str, branch: &str, should_interrupt: &AtomicBool) -> Freshness {
    let remote_url_key = format!("remote.{remote}.url");
    match repo.read_config(&remote_url_key) {
        Ok(None) => return Freshness::LocalOnly,
        Ok(Some(_)) => {}
        Err(err) => return Freshness::Error { reason: err.to_string() },
    }

    let local_oid = match repo.rev_parse_opt("HEAD") {
        Ok(Some(oid)) => oid,
        Ok(None) => return Freshness::Error { reason: "local HEAD is unresolvable".to_owned() },
        Err(err) => return Freshness::Error { reason: err.to_string() },
    };

    let ref_name = format!("refs/heads/{branch}");
    let remote_oid = match repo.remote_ref_oid(remote, &ref_name, should_interrupt) {
        Ok(Some(oid)) => oid,
        Ok(None) => {
            return Freshness::Error {
                reason: format!("remote '{remote}' has no ref '{ref_name}'"),
            }
        }
        Err(err) => return Freshness::Error { reason: err.to_string() },
    };

    if local_oid == remote_oid {
        return Freshness::UpToDate;
    }

    match repo.is_ancestor(local_oid, remote_oid) {
        Ok(true) => return Freshness::NeedsUpdate { remote_commit: remote_oid },
        Ok(false) => {}
        Err(err) => return Freshness::Error { reason: err.to_string() },
    }

    match repo.is_ancestor(remote_oid, local_oid) {
        // The remote tip is already contained in local history: nothing to
        // pull down, so there is nothing to update.
        Ok(true) => Freshness::UpToDate,
        Ok(false) => Freshness::Diverged {
            local_commit: local_oid,
            remote_commit: remote_oid,
        },
        Err(err) => Freshness::Error { reason: err.to_string() },
    }
}

/// Brings a cached working copy up to date, per the §4.8 update policy.
///
/// - `up-to-date` / `local-only`: no-op, reports [`UpdateResult::Ok`].
/// - `needs-update`: fast-forwards via `hard_reset` to the remote tip.
/// - `diverged`: refuses unless `force`, in which case it fetches fully and
///   resets hard to the remote tip, discarding local history.
/// - `error`: reported as [`UpdateResult::Failed`].
#[must_use]
pub fn update_if_needed(
    repo: &dyn GitRepo,
    remote: &str,
    branch: &str,
    force: bool,
    should_interrupt: &AtomicBool,
) -> UpdateResult {
    match classify(repo, remote, branch, should_interrupt) {
        Freshness::UpToDate | Freshness::LocalOnly => UpdateResult::Ok,
        Freshness::Error { reason } => UpdateResult::Failed { reason },
        Freshness::NeedsUpdate { remote_commit } => {
            let ref_name = format!("refs/heads/{branch}");
            if let Err(err) = repo.fetch(remote, &ref_name, should_interrupt) {
                return UpdateResult::Failed { reason: err.to_string() };
            }
            match repo.hard_reset(remote_commit, should_interrupt) {
                Ok(()) => UpdateResult::Ok,
                Err(err) => UpdateResult::Failed { reason: err.to_string() },
            }
        }
        Freshness::Diverged { remote_commit, .. } => {
            if !force {
                return UpdateResult::Failed {
                    reason: "local history has diverged from the remote; retry with force to reset hard".to_owned(),
                };
            }
            let ref_name = format!("refs/heads/{branch}");
            let fetch_outcome = match repo.fetch(remote, &ref_name, should_interrupt) {
                Ok(outcome) => outcome,
                Err(err) => return UpdateResult::Failed { reason: err.to_string() },
            };
            let target = fetch_outcome.remote_oid.unwrap_or(remote_commit);
            match repo.hard_reset(target, should_interrupt) {
                Ok(()) => UpdateResult::Ok,
                Err(err) => UpdateResult::Failed { reason: err.to_string() },
            }
        }
    }
}
