//! The [`GitRepo`] trait — the single abstraction boundary between the
//! orchestrator and git.
//!
//! Every component that touches a repository (the cloner, the freshness
//! oracle, scanners that need commit metadata) interacts with git exclusively
//! through this trait. The trait is object-safe so callers can use
//! `&dyn GitRepo`.
//!
//! Cloning a fresh repository is not a trait method (there is no `Self` to
//! call it on yet) — see [`crate::gix_repo::GixRepo::clone`].

use std::path::Path;
use std::sync::atomic::AtomicBool;

use crate::error::GitError;
use crate::types::{CommitInfo, FetchOutcome, GitOid, RefName};

/// The git abstraction trait used by the orchestrator.
///
/// Implementations may be backed by gix (the only backend today) or a test
/// double.
///
/// # Object safety
///
/// This trait is object-safe: no generic methods, no `Self` in return
/// position outside of `Result`. Callers may use `&dyn GitRepo`.
pub trait GitRepo {
    // -----------------------------------------------------------------------
    // Refs and rev-parse
    //
    // Replaces: git rev-parse, git for-each-ref
    // -----------------------------------------------------------------------

    /// Resolve a ref to its OID, returning `None` if the ref does not exist.
    ///
    /// Replaces: `git rev-parse <ref>` (when used to resolve a known ref name).
    fn read_ref(&self, name: &RefName) -> Result<Option<GitOid>, GitError>;

    /// List refs matching a prefix (e.g., `"refs/remotes/origin/"`).
    ///
    /// Returns `(ref_name, oid)` pairs sorted by ref name.
    ///
    /// Replaces: `git for-each-ref --format=... <prefix>`.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(RefName, GitOid)>, GitError>;

    /// Resolve a revision specification to an OID.
    ///
    /// Returns [`GitError::NotFound`] if the spec cannot be resolved.
    ///
    /// Replaces: `git rev-parse <spec>`.
    fn rev_parse(&self, spec: &str) -> Result<GitOid, GitError>;

    /// Like [`rev_parse`](Self::rev_parse) but returns `None` instead of an
    /// error when the spec cannot be resolved.
    fn rev_parse_opt(&self, spec: &str) -> Result<Option<GitOid>, GitError>;

    /// The remote's default branch name (e.g., `"main"`), if known.
    ///
    /// Replaces: `git symbolic-ref refs/remotes/origin/HEAD`.
    fn default_branch(&self) -> Result<Option<String>, GitError>;

    // -----------------------------------------------------------------------
    // Object read
    // -----------------------------------------------------------------------

    /// Read a commit object's metadata.
    ///
    /// Replaces: `git cat-file commit <oid>` / `git log -1 --format=...`.
    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError>;

    // -----------------------------------------------------------------------
    // Checkout
    //
    // Replaces: git checkout <oid> -- ., git reset --hard <oid>
    // -----------------------------------------------------------------------

    /// Check out a tree (or the tree of a commit) into the working directory.
    ///
    /// Materializes the tree at `oid` into `workdir`. Existing working-tree
    /// files not in the tree are removed. Interruptible via `should_interrupt`.
    ///
    /// Replaces: `git checkout <oid> -- .`.
    fn checkout_tree(
        &self,
        oid: GitOid,
        workdir: &Path,
        should_interrupt: &AtomicBool,
    ) -> Result<(), GitError>;

    /// Discard any local changes and move the current branch to `oid`.
    ///
    /// Replaces: `git reset --hard <oid>`.
    fn hard_reset(&self, oid: GitOid, should_interrupt: &AtomicBool) -> Result<(), GitError>;

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Returns `true` if the working tree or index has uncommitted changes.
    ///
    /// Replaces: `git diff --quiet && git diff --cached --quiet` (exit code check).
    fn is_dirty(&self) -> Result<bool, GitError>;

    // -----------------------------------------------------------------------
    // Ancestry
    //
    // Replaces: git merge-base --is-ancestor, git merge-base
    // -----------------------------------------------------------------------

    /// Check if `ancestor` is an ancestor of `descendant` (or equal to it).
    ///
    /// Replaces: `git merge-base --is-ancestor <ancestor> <descendant>`.
    fn is_ancestor(&self, ancestor: GitOid, descendant: GitOid) -> Result<bool, GitError>;

    /// Find the best common ancestor (merge base) of two commits.
    ///
    /// Returns `None` if the commits have no common ancestor.
    ///
    /// Replaces: `git merge-base <a> <b>`.
    fn merge_base(&self, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError>;

    // -----------------------------------------------------------------------
    // Config
    // -----------------------------------------------------------------------

    /// Read a git config value. Returns `None` if the key is not set.
    ///
    /// Replaces: `git config --get <key>`.
    fn read_config(&self, key: &str) -> Result<Option<String>, GitError>;

    // -----------------------------------------------------------------------
    // Remote
    //
    // Replaces: git ls-remote, git fetch
    // -----------------------------------------------------------------------

    /// Resolve a ref on the remote without fetching any objects.
    ///
    /// Used by the freshness oracle to decide whether a fetch is even worth
    /// attempting.
    ///
    /// Replaces: `git ls-remote <remote> <ref>`.
    fn remote_ref_oid(
        &self,
        remote: &str,
        ref_name: &str,
        should_interrupt: &AtomicBool,
    ) -> Result<Option<GitOid>, GitError>;

    /// Fetch updates for `ref_name` from `remote`, updating the
    /// corresponding remote-tracking ref.
    ///
    /// Replaces: `git fetch <remote> <ref_name>`.
    fn fetch(
        &self,
        remote: &str,
        ref_name: &str,
        should_interrupt: &AtomicBool,
    ) -> Result<FetchOutcome, GitError>;
}
