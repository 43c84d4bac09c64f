//! The gix-backed implementation of [`GitRepo`].

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use crate::error::GitError;
use crate::repo::GitRepo;
use crate::types::{CloneOutcome, CommitInfo, FetchOutcome, GitOid, RefName};

/// A [`GitRepo`] implementation backed by [gix](https://github.com/GitoxideLabs/gitoxide).
///
/// Construct via [`GixRepo::open`] for an existing checkout, or
/// [`GixRepo::clone`] to create a fresh one.
pub struct GixRepo {
    pub(crate) repo: gix::Repository,
    pub(crate) workdir: Option<PathBuf>,
}

impl GixRepo {
    /// Open the git repository at or above `path`.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = gix::open(path).map_err(|e| GitError::BackendError { message: e.to_string() })?;
        let workdir = repo.workdir().map(|p| p.to_path_buf());
        Ok(Self { repo, workdir })
    }

    /// Open a git repository at exactly `path` (no parent discovery).
    pub fn open_at(path: &Path) -> Result<Self, GitError> {
        let repo = gix::open_opts(path, gix::open::Options::isolated())
            .map_err(|e| GitError::BackendError { message: e.to_string() })?;
        let workdir = repo.workdir().map(|p| p.to_path_buf());
        Ok(Self { repo, workdir })
    }

    /// Clone `url` into a fresh worktree at `dest`, checking out the default
    /// branch (or the ref named by `checkout_ref` if given).
    ///
    /// `dest` must not already exist. Interruptible via `should_interrupt` —
    /// on interruption the partial clone directory is left in place for the
    /// caller to clean up (callers generally clone into a temp dir and
    /// rename on success, per the atomic-publish convention used elsewhere
    /// in this crate).
    ///
    /// When `shallow` is `true`, requests a depth-1 fetch from the remote
    /// (`gix::remote::fetch::Shallow::DepthAtRemote`) instead of the full
    /// history.
    ///
    /// Replaces: `git clone [--depth 1] [--branch <ref>] <url> <dest>`.
    pub fn clone(
        url: &str,
        dest: &Path,
        checkout_ref: Option<&str>,
        shallow: bool,
        should_interrupt: &AtomicBool,
    ) -> Result<(Self, CloneOutcome), GitError> {
        crate::remote_impl::clone(url, dest, checkout_ref, shallow, should_interrupt)
    }
}

impl GitRepo for GixRepo {
    fn read_ref(&self, name: &RefName) -> Result<Option<GitOid>, GitError> {
        crate::refs_impl::read_ref(self, name)
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(RefName, GitOid)>, GitError> {
        crate::refs_impl::list_refs(self, prefix)
    }

    fn rev_parse(&self, spec: &str) -> Result<GitOid, GitError> {
        crate::refs_impl::rev_parse(self, spec)
    }

    fn rev_parse_opt(&self, spec: &str) -> Result<Option<GitOid>, GitError> {
        crate::refs_impl::rev_parse_opt(self, spec)
    }

    fn default_branch(&self) -> Result<Option<String>, GitError> {
        crate::refs_impl::default_branch(self)
    }

    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError> {
        crate::objects_impl::read_commit(self, oid)
    }

    fn checkout_tree(
        &self,
        oid: GitOid,
        workdir: &Path,
        should_interrupt: &AtomicBool,
    ) -> Result<(), GitError> {
        crate::checkout_impl::checkout_tree(self, oid, workdir, should_interrupt)
    }

    fn hard_reset(&self, oid: GitOid, should_interrupt: &AtomicBool) -> Result<(), GitError> {
        crate::checkout_impl::hard_reset(self, oid, should_interrupt)
    }

    fn is_dirty(&self) -> Result<bool, GitError> {
        crate::status_impl::is_dirty(self)
    }

    fn is_ancestor(&self, ancestor: GitOid, descendant: GitOid) -> Result<bool, GitError> {
        crate::refs_impl::is_ancestor(self, ancestor, descendant)
    }

    fn merge_base(&self, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError> {
        crate::refs_impl::merge_base(self, a, b)
    }

    fn read_config(&self, key: &str) -> Result<Option<String>, GitError> {
        crate::config_impl::read_config(self, key)
    }

    fn remote_ref_oid(
        &self,
        remote: &str,
        ref_name: &str,
        should_interrupt: &AtomicBool,
    ) -> Result<Option<GitOid>, GitError> {
        crate::remote_impl::remote_ref_oid(self, remote, ref_name, should_interrupt)
    }

    fn fetch(
        &self,
        remote: &str,
        ref_name: &str,
        should_interrupt: &AtomicBool,
    ) -> Result<FetchOutcome, GitError> {
        crate::remote_impl::fetch(self, remote, ref_name, should_interrupt)
    }
}
