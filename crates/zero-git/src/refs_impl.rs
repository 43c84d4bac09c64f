//! gix-backed ref, rev-parse, and ancestry operations.

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::{GitOid, RefName};

fn to_gix_oid(oid: GitOid) -> gix::ObjectId {
    gix::ObjectId::from_bytes_or_panic(oid.as_bytes())
}

fn from_gix_oid(oid: gix::ObjectId) -> GitOid {
    let bytes: [u8; 20] = oid.as_bytes().try_into().expect("SHA1 is 20 bytes");
    GitOid::from_bytes(bytes)
}

pub fn read_ref(repo: &GixRepo, name: &RefName) -> Result<Option<GitOid>, GitError> {
    match repo.repo.try_find_reference(name.as_str()) {
        Ok(Some(mut r)) => {
            let id = r
                .peel_to_id_in_place()
                .map_err(|e| GitError::BackendError {
                    message: format!("failed to peel ref '{name}': {e}"),
                })?;
            Ok(Some(from_gix_oid(id.detach())))
        }
        Ok(None) => Ok(None),
        Err(e) => Err(GitError::BackendError {
            message: format!("failed to look up ref '{name}': {e}"),
        }),
    }
}

pub fn list_refs(repo: &GixRepo, prefix: &str) -> Result<Vec<(RefName, GitOid)>, GitError> {
    let platform = repo.repo.references().map_err(|e| GitError::BackendError {
        message: format!("failed to access references: {e}"),
    })?;
    let iter = platform
        .prefixed(prefix)
        .map_err(|e| GitError::BackendError {
            message: format!("failed to list refs under '{prefix}': {e}"),
        })?;

    let mut out = Vec::new();
    for r in iter {
        let mut r = r.map_err(|e| GitError::BackendError {
            message: format!("failed to read a ref under '{prefix}': {e}"),
        })?;
        let name = RefName::new(r.name().as_bstr().to_string().as_str()).map_err(|e| {
            GitError::BackendError {
                message: format!("ref under '{prefix}' has an unexpected name: {e}"),
            }
        })?;
        let id = r
            .peel_to_id_in_place()
            .map_err(|e| GitError::BackendError {
                message: format!("failed to peel ref '{name}': {e}"),
            })?;
        out.push((name, from_gix_oid(id.detach())));
    }
    out.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
    Ok(out)
}

pub fn rev_parse(repo: &GixRepo, spec: &str) -> Result<GitOid, GitError> {
    rev_parse_opt(repo, spec)?.ok_or_else(|| GitError::NotFound {
        message: format!("revision '{spec}' did not resolve to an object"),
    })
}

pub fn rev_parse_opt(repo: &GixRepo, spec: &str) -> Result<Option<GitOid>, GitError> {
    match repo.repo.rev_parse_single(spec) {
        Ok(id) => Ok(Some(from_gix_oid(id.detach()))),
        Err(_) => Ok(None),
    }
}

/// Reads `refs/remotes/<remote>/HEAD` to find the remote's default branch,
/// falling back to a plain `HEAD` resolution if that symref is absent (common
/// right after a shallow clone where the remote HEAD symref wasn't written).
pub fn default_branch(repo: &GixRepo) -> Result<Option<String>, GitError> {
    if let Ok(Some(r)) = repo.repo.try_find_reference("refs/remotes/origin/HEAD") {
        if let gix::refs::TargetRef::Symbolic(target) = r.inner.target.to_ref() {
            let full = target.as_bstr().to_string();
            if let Some(short) = full.strip_prefix("refs/remotes/origin/") {
                return Ok(Some(short.to_owned()));
            }
        }
    }
    if let Ok(head) = repo.repo.head_name() {
        if let Some(name) = head {
            let full = name.as_bstr().to_string();
            if let Some(short) = full.strip_prefix("refs/heads/") {
                return Ok(Some(short.to_owned()));
            }
        }
    }
    Ok(None)
}

pub fn is_ancestor(repo: &GixRepo, ancestor: GitOid, descendant: GitOid) -> Result<bool, GitError> {
    if ancestor == descendant {
        return Ok(true);
    }
    let base = merge_base(repo, ancestor, descendant)?;
    Ok(base == Some(ancestor))
}

pub fn merge_base(repo: &GixRepo, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError> {
    let a = to_gix_oid(a);
    let b = to_gix_oid(b);
    match repo.repo.merge_base(a, b) {
        Ok(id) => Ok(Some(from_gix_oid(id.detach()))),
        Err(gix::repository::merge_base::Error::NotFound { .. }) => Ok(None),
        Err(e) => Err(GitError::BackendError {
            message: format!("merge-base({a}, {b}) failed: {e}"),
        }),
    }
}
