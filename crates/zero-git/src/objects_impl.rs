//! gix-backed object read operations.

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::{CommitInfo, GitOid};

fn to_gix_oid(oid: GitOid) -> gix::ObjectId {
    gix::ObjectId::from_bytes_or_panic(oid.as_bytes())
}

fn from_gix_oid(oid: gix::ObjectId) -> GitOid {
    let bytes: [u8; 20] = oid.as_bytes().try_into().expect("SHA1 is 20 bytes");
    GitOid::from_bytes(bytes)
}

pub fn read_commit(repo: &GixRepo, oid: GitOid) -> Result<CommitInfo, GitError> {
    let gix_oid = to_gix_oid(oid);
    let commit = repo
        .repo
        .find_commit(gix_oid)
        .map_err(|e| GitError::NotFound {
            message: format!("commit {oid}: {e}"),
        })?;

    let tree_oid = from_gix_oid(commit.tree_id().map_err(|e| GitError::BackendError {
        message: format!("commit {oid} has no tree: {e}"),
    })?.detach());

    let parents: Vec<GitOid> = commit.parent_ids().map(|id| from_gix_oid(id.detach())).collect();

    let decoded = commit.decode().map_err(|e| GitError::BackendError {
        message: format!("failed to decode commit {oid}: {e}"),
    })?;

    Ok(CommitInfo {
        tree_oid,
        parents,
        message: decoded.message.to_string(),
        author: decoded.author.to_string(),
        committer: decoded.committer.to_string(),
        committer_time: decoded.committer.time().seconds,
    })
}
