//! The Cloner (C5, §4.5) — materializes one working copy, handling the
//! cache-hit / cache-hit-but-invalid / cache-miss decision and capturing
//! commit context.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use chrono::{DateTime, TimeZone, Utc};

use zero_git::{GitRepo, GixRepo};

use crate::error::ZeroError;
use crate::ids::ProjectId;

/// How much history to fetch on a cache miss.
///
/// `Shallow` requests a depth-1 fetch from the remote
/// (`gix::remote::fetch::Shallow::DepthAtRemote`, wired through
/// `zero_git::GixRepo::clone`'s `shallow` flag); `Full` fetches complete
/// history. Has no effect on a cache hit, since no fetch happens there.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloneDepth {
    Shallow,
    Full,
}

/// Input to [`clone_repo`].
pub struct CloneReq<'a> {
    pub project_id: ProjectId,
    pub clone_url: &'a str,
    pub target_path: &'a Path,
    pub depth: CloneDepth,
    pub branch: Option<&'a str>,
}

/// Commit context captured on every successful clone (§4.5).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitContext {
    pub commit_hash: String,
    pub commit_short: String,
    pub branch: Option<String>,
    pub tag: Option<String>,
    pub commit_date: DateTime<Utc>,
    pub commit_author: String,
}

/// Result of one clone attempt.
pub enum CloneOutcome {
    /// Served from the on-disk cache with no network call.
    CacheHit(CommitContext),
    /// Freshly cloned from the remote.
    Fresh(CommitContext),
    /// The attempt failed; `target_path` was left absent or as it was
    /// before (§4.5).
    Failed(ZeroError),
}

/// Materializes `req.target_path` per the §4.5 contract.
#[must_use]
pub fn clone_repo(req: &CloneReq<'_>, should_interrupt: &AtomicBool) -> CloneOutcome {
    if req.target_path.exists() {
        match GixRepo::open_at(req.target_path) {
            Ok(repo) => {
                return match capture_commit_context(&repo) {
                    Ok(ctx) => CloneOutcome::CacheHit(ctx),
                    Err(source) => CloneOutcome::Failed(ZeroError::Vcs {
                        project: req.project_id.clone(),
                        source,
                    }),
                };
            }
            Err(_) => {
                if let Err(source) = std::fs::remove_dir_all(req.target_path) {
                    return CloneOutcome::Failed(ZeroError::Io {
                        context: format!("removing invalid cache at '{}'", req.target_path.display()),
                        source,
                    });
                }
            }
        }
    }

    if let Some(parent) = req.target_path.parent() {
        if let Err(source) = std::fs::create_dir_all(parent) {
            return CloneOutcome::Failed(ZeroError::Io {
                context: format!("creating parent directory for '{}'", req.target_path.display()),
                source,
            });
        }
    }

    let checkout_ref = req.branch;
    let shallow = req.depth == CloneDepth::Shallow;
    match GixRepo::clone(req.clone_url, req.target_path, checkout_ref, shallow, should_interrupt) {
        Ok((repo, _outcome)) => match capture_commit_context(&repo) {
            Ok(ctx) => CloneOutcome::Fresh(ctx),
            Err(source) => CloneOutcome::Failed(ZeroError::Vcs {
                project: req.project_id.clone(),
                source,
            }),
        },
        Err(source) => CloneOutcome::Failed(ZeroError::Vcs {
            project: req.project_id.clone(),
            source,
        }),
    }
}

/// Re-reads `repo`'s current HEAD into a fresh [`CommitContext`]. Exposed to
/// [`crate::pipeline`] so a cache-hit repo whose freshness check moved HEAD
/// (§4.8) can refresh its recorded commit without re-deriving the logic.
pub(crate) fn capture_commit_context(repo: &GixRepo) -> Result<CommitContext, zero_git::GitError> {
    let oid = repo.rev_parse("HEAD")?;
    let commit = repo.read_commit(oid)?;
    let branch = repo.default_branch()?;
    let tag = repo
        .list_refs("refs/tags/")?
        .into_iter()
        .find(|(_, tag_oid)| *tag_oid == oid)
        .map(|(name, _)| name.as_str().trim_start_matches("refs/tags/").to_owned());
    let commit_date = Utc
        .timestamp_opt(commit.committer_time, 0)
        .single()
        .unwrap_or_else(Utc::now);
    let hash = oid.to_string();
    let short = hash.get(..7).unwrap_or(&hash).to_owned();
    Ok(CommitContext {
        commit_hash: hash,
        commit_short: short,
        branch,
        tag,
        commit_date,
        commit_author: commit.author,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use std::sync::atomic::AtomicBool;

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git").args(args).current_dir(dir).status().unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    fn setup_upstream() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        git(dir.path(), &["init", "-q", "-b", "main"]);
        git(dir.path(), &["config", "user.email", "a@example.com"]);
        git(dir.path(), &["config", "user.name", "A"]);
        std::fs::write(dir.path().join("f.txt"), "hi").unwrap();
        git(dir.path(), &["add", "."]);
        git(dir.path(), &["commit", "-q", "-m", "init"]);
        dir
    }

    #[test]
    fn clone_miss_then_hit() {
        let upstream = setup_upstream();
        let dest = tempfile::tempdir().unwrap();
        let target = dest.path().join("repo");
        let interrupt = AtomicBool::new(false);
        let req = CloneReq {
            project_id: ProjectId::new("local", "repo").unwrap(),
            clone_url: upstream.path().to_str().unwrap(),
            target_path: &target,
            depth: CloneDepth::Full,
            branch: None,
        };
        match clone_repo(&req, &interrupt) {
            CloneOutcome::Fresh(ctx) => assert_eq!(ctx.commit_hash.len(), 40),
            CloneOutcome::CacheHit(_) => panic!("expected a fresh clone on first attempt"),
            CloneOutcome::Failed(err) => panic!("clone failed: {err}"),
        }

        match clone_repo(&req, &interrupt) {
            CloneOutcome::CacheHit(_) => {}
            other => panic!("expected a cache hit on second attempt, got {}", matches!(other, CloneOutcome::Fresh(_))),
        }
    }

    #[test]
    fn invalid_cache_directory_is_replaced() {
        let upstream = setup_upstream();
        let dest = tempfile::tempdir().unwrap();
        let target = dest.path().join("repo");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("not-a-repo.txt"), "junk").unwrap();
        let interrupt = AtomicBool::new(false);
        let req = CloneReq {
            project_id: ProjectId::new("local", "repo").unwrap(),
            clone_url: upstream.path().to_str().unwrap(),
            target_path: &target,
            depth: CloneDepth::Full,
            branch: None,
        };
        match clone_repo(&req, &interrupt) {
            CloneOutcome::Fresh(_) => {}
            CloneOutcome::CacheHit(_) => panic!("a junk directory must not be treated as a cache hit"),
            CloneOutcome::Failed(err) => panic!("clone failed: {err}"),
        }
    }

    #[test]
    fn shallow_depth_clone_truncates_history() {
        let upstream = setup_upstream();
        git(upstream.path(), &["commit", "--allow-empty", "-q", "-m", "second"]);
        let dest = tempfile::tempdir().unwrap();
        let target = dest.path().join("repo");
        let interrupt = AtomicBool::new(false);
        let req = CloneReq {
            project_id: ProjectId::new("local", "repo").unwrap(),
            clone_url: upstream.path().to_str().unwrap(),
            target_path: &target,
            depth: CloneDepth::Shallow,
            branch: None,
        };
        match clone_repo(&req, &interrupt) {
            CloneOutcome::Fresh(ctx) => assert_eq!(ctx.commit_hash.len(), 40),
            CloneOutcome::CacheHit(_) => panic!("expected a fresh clone on first attempt"),
            CloneOutcome::Failed(err) => panic!("shallow clone failed: {err}"),
        }
        assert!(
            target.join(".git").join("shallow").exists(),
            "a depth-1 clone of a two-commit history must write a shallow boundary marker"
        );
    }
}
