//! Remote operations: clone, fetch, and ref lookups that don't require a
//! full object transfer.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::{CloneOutcome, FetchOutcome, GitOid, RefName};

fn from_gix_oid(oid: gix::ObjectId) -> GitOid {
    let bytes: [u8; 20] = oid.as_bytes().try_into().expect("SHA1 is 20 bytes");
    GitOid::from_bytes(bytes)
}

/// Classifies a transport-layer error string into an auth failure or a
/// generic backend error, so callers can tell "bad credentials" (permanent,
/// don't retry) apart from "network hiccup" (transient, safe to retry).
fn classify_remote_err(remote: &str, message: String) -> GitError {
    let lower = message.to_lowercase();
    if lower.contains("auth") || lower.contains("credential") || lower.contains("permission denied") {
        GitError::AuthFailed {
            remote: remote.to_owned(),
            message,
        }
    } else {
        GitError::BackendError { message: format!("{remote}: {message}") }
    }
}

pub fn clone(
    url: &str,
    dest: &Path,
    checkout_ref: Option<&str>,
    shallow: bool,
    should_interrupt: &AtomicBool,
) -> Result<(GixRepo, CloneOutcome), GitError> {
    let mut prepare = gix::clone::PrepareFetch::new(
        url,
        dest,
        gix::create::Kind::WithWorktree,
        gix::create::Options::default(),
        gix::open::Options::isolated(),
    )
    .map_err(|e| classify_remote_err(url, e.to_string()))?;

    if let Some(r) = checkout_ref {
        prepare = prepare
            .with_ref_name(Some(r))
            .map_err(|e| GitError::BackendError {
                message: format!("invalid ref '{r}' requested for clone of '{url}': {e}"),
            })?;
    }

    if shallow {
        let depth = std::num::NonZeroU32::new(1).expect("1 is nonzero");
        prepare = prepare.with_shallow(gix::remote::fetch::Shallow::DepthAtRemote(depth));
    }

    let (mut checkout, _fetch_outcome) = prepare
        .fetch_then_checkout(gix::progress::Discard, should_interrupt)
        .map_err(|e| classify_remote_err(url, e.to_string()))?;

    if should_interrupt.load(Ordering::Relaxed) {
        return Err(GitError::Cancelled {
            remote: url.to_owned(),
        });
    }

    let (repo, _checkout_outcome) = checkout
        .main_worktree(gix::progress::Discard, should_interrupt)
        .map_err(|e| GitError::BackendError {
            message: format!("failed to materialize worktree for '{url}': {e}"),
        })?;

    let workdir = repo.workdir().map(|p| p.to_path_buf());
    let head_oid = repo
        .head_id()
        .map_err(|e| GitError::BackendError {
            message: format!("cloned repo '{url}' has no resolvable HEAD: {e}"),
        })?
        .detach();

    let default_branch = repo.head_name().ok().flatten().and_then(|n| {
        n.as_bstr()
            .to_string()
            .strip_prefix("refs/heads/")
            .map(str::to_owned)
    });

    let gix_repo = GixRepo { repo, workdir };
    let outcome = CloneOutcome {
        head_oid: from_gix_oid(head_oid),
        default_branch,
    };
    Ok((gix_repo, outcome))
}

/// Resolves `ref_name` on `remote` via the fetch handshake only, without
/// transferring any objects. Used by the freshness oracle as a cheap
/// up-to-date check before committing to a full fetch.
pub fn remote_ref_oid(
    repo: &GixRepo,
    remote: &str,
    ref_name: &str,
    should_interrupt: &AtomicBool,
) -> Result<Option<GitOid>, GitError> {
    let remote_handle = repo
        .repo
        .find_remote(remote)
        .map_err(|e| GitError::BackendError {
            message: format!("unknown remote '{remote}': {e}"),
        })?;

    let connection = remote_handle
        .connect(gix::remote::Direction::Fetch)
        .map_err(|e| classify_remote_err(remote, e.to_string()))?;

    let map = connection
        .ref_map(gix::progress::Discard, Default::default())
        .map_err(|e| classify_remote_err(remote, e.to_string()))?;

    if should_interrupt.load(Ordering::Relaxed) {
        return Err(GitError::Cancelled {
            remote: remote.to_owned(),
        });
    }

    let wanted = format!("refs/heads/{ref_name}");
    for mapping in &map.mappings {
        let gix::remote::fetch::Source::Ref(r) = &mapping.remote else {
            continue;
        };
        let (full_name, object) = match r {
            gix::protocol::handshake::Ref::Direct { full_ref_name, object } => {
                (full_ref_name, Some(object))
            }
            gix::protocol::handshake::Ref::Symbolic { full_ref_name, object, .. } => {
                (full_ref_name, Some(object))
            }
            gix::protocol::handshake::Ref::Unborn { full_ref_name, .. } => (full_ref_name, None),
        };
        if full_name.as_bstr() == wanted.as_bytes() {
            return Ok(object.map(|o| from_gix_oid(*o)));
        }
    }
    Ok(None)
}

/// Fetches `ref_name` from `remote`, updating `refs/remotes/<remote>/<ref_name>`.
pub fn fetch(
    repo: &GixRepo,
    remote: &str,
    ref_name: &str,
    should_interrupt: &AtomicBool,
) -> Result<FetchOutcome, GitError> {
    let tracking = RefName::new(&format!("refs/remotes/{remote}/{ref_name}")).map_err(|e| {
        GitError::BackendError {
            message: format!("bad tracking ref for remote '{remote}', ref '{ref_name}': {e}"),
        }
    })?;
    let before = crate::refs_impl::read_ref(repo, &tracking)?;

    let remote_handle = repo
        .repo
        .find_remote(remote)
        .map_err(|e| GitError::BackendError {
            message: format!("unknown remote '{remote}': {e}"),
        })?;

    let connection = remote_handle
        .connect(gix::remote::Direction::Fetch)
        .map_err(|e| classify_remote_err(remote, e.to_string()))?;

    connection
        .prepare_fetch(gix::progress::Discard, Default::default())
        .map_err(|e| classify_remote_err(remote, e.to_string()))?
        .receive(gix::progress::Discard, should_interrupt)
        .map_err(|e| classify_remote_err(remote, e.to_string()))?;

    if should_interrupt.load(Ordering::Relaxed) {
        return Err(GitError::Cancelled {
            remote: remote.to_owned(),
        });
    }

    let after = crate::refs_impl::read_ref(repo, &tracking)?;
    Ok(FetchOutcome {
        updated: before != after,
        remote_oid: after,
    })
}
