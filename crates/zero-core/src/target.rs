//! Hydration targets and the code-hosting collaborator interface (§3, §6).
//!
//! A [`Target`] is what the caller asked for; [`OrgLister`] is the one
//! external RPC the core makes to turn an org target into a concrete repo
//! list. Listing organization repositories is out of scope for this crate
//! (§1) — only the interface is specified here.

use crate::error::ZeroError;
use crate::ids::ProjectId;

/// What the caller asked to hydrate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// One repository, identified by owner and name.
    Single {
        /// The repository owner (user or organization login).
        owner: String,
        /// The repository name.
        repo: String,
    },
    /// Every repository in an organization, optionally capped.
    Org {
        /// The organization login.
        name: String,
        /// Caps the number of repositories fetched from the lister.
        limit: Option<usize>,
    },
}

impl Target {
    /// Parses a target string: `owner/repo` for [`Target::Single`], or a bare
    /// name for [`Target::Org`].
    ///
    /// # Errors
    /// Returns [`ZeroError::InvalidTarget`] if `raw` is empty or contains
    /// more than one `/`.
    pub fn parse(raw: &str) -> Result<Self, ZeroError> {
        if raw.is_empty() {
            return Err(ZeroError::InvalidTarget {
                target: raw.to_owned(),
                reason: "target must not be empty".to_owned(),
            });
        }
        match raw.split('/').collect::<Vec<_>>().as_slice() {
            [org] => Ok(Self::Org {
                name: (*org).to_owned(),
                limit: None,
            }),
            [owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok(Self::Single {
                owner: (*owner).to_owned(),
                repo: (*repo).to_owned(),
            }),
            _ => Err(ZeroError::InvalidTarget {
                target: raw.to_owned(),
                reason: "must be 'owner/repo' or a bare organization name".to_owned(),
            }),
        }
    }
}

/// A single repository reference resolved from a [`Target`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoRef {
    /// The repository owner (user or organization login).
    pub owner: String,
    /// The repository name.
    pub name: String,
    /// The URL `zero-git` should clone from.
    pub clone_url: String,
    /// The remote's default branch, if known ahead of clone.
    pub default_branch: Option<String>,
}

impl RepoRef {
    /// The canonical, lowercased `owner/name` project id.
    ///
    /// # Errors
    /// Propagates [`crate::ids::IdError`] if `owner` or `name` is malformed
    /// (empty, or itself containing a `/`).
    pub fn project_id(&self) -> Result<ProjectId, ZeroError> {
        Ok(ProjectId::new(&self.owner, &self.name)?)
    }

    /// Builds a `RepoRef` for a target with no code-hosting origin, bucketed
    /// under the reserved owner [`ProjectId::LOCAL_OWNER`].
    #[must_use]
    pub fn local(name: &str, path: &std::path::Path) -> Self {
        Self {
            owner: ProjectId::LOCAL_OWNER.to_owned(),
            name: name.to_owned(),
            clone_url: path.display().to_string(),
            default_branch: None,
        }
    }
}

/// The code-hosting lister collaborator interface (§6). Listing organization
/// repositories is a single RPC, deliberately out of scope (§1) — this trait
/// captures only its shape so the pipeline can be tested against a fake.
pub trait OrgLister {
    /// Lists up to `limit` repositories belonging to `org`.
    ///
    /// # Errors
    /// Returns an error for transport or authentication failures. An empty
    /// (but successful) result is the caller's signal to fail with
    /// `config.empty_org`; this trait itself never synthesizes that error.
    fn list_org_repos(&self, org: &str, limit: Option<usize>) -> Result<Vec<RepoRef>, ZeroError>;
}

/// Expands a [`Target`] into an ordered list of [`RepoRef`]s (Phase 0, §4.6).
///
/// # Errors
/// - [`ZeroError::EmptyOrg`] if an org target resolves to zero repos.
/// - Whatever the `lister` returns for a transport failure.
pub fn expand(target: &Target, lister: &dyn OrgLister) -> Result<Vec<RepoRef>, ZeroError> {
    match target {
        Target::Single { owner, repo } => Ok(vec![RepoRef {
            owner: owner.clone(),
            name: repo.clone(),
            clone_url: format!("https://github.com/{owner}/{repo}.git"),
            default_branch: None,
        }]),
        Target::Org { name, limit } => {
            let repos = lister.list_org_repos(name, *limit)?;
            if repos.is_empty() {
                return Err(ZeroError::EmptyOrg { org: name.clone() });
            }
            Ok(repos)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeLister(Vec<RepoRef>);

    impl OrgLister for FakeLister {
        fn list_org_repos(&self, _org: &str, limit: Option<usize>) -> Result<Vec<RepoRef>, ZeroError> {
            match limit {
                Some(n) => Ok(self.0.iter().take(n).cloned().collect()),
                None => Ok(self.0.clone()),
            }
        }
    }

    fn repo(owner: &str, name: &str) -> RepoRef {
        RepoRef {
            owner: owner.to_owned(),
            name: name.to_owned(),
            clone_url: format!("https://example.invalid/{owner}/{name}.git"),
            default_branch: Some("main".to_owned()),
        }
    }

    #[test]
    fn parse_single_target() {
        let target = Target::parse("octocat/hello-world").unwrap();
        assert_eq!(
            target,
            Target::Single {
                owner: "octocat".to_owned(),
                repo: "hello-world".to_owned()
            }
        );
    }

    #[test]
    fn parse_org_target() {
        let target = Target::parse("acme").unwrap();
        assert_eq!(
            target,
            Target::Org {
                name: "acme".to_owned(),
                limit: None
            }
        );
    }

    #[test]
    fn parse_rejects_empty() {
        assert!(Target::parse("").is_err());
    }

    #[test]
    fn parse_rejects_triple_slash() {
        assert!(Target::parse("a/b/c").is_err());
    }

    #[test]
    fn expand_single_is_one_element() {
        let lister = FakeLister(vec![]);
        let target = Target::Single {
            owner: "octocat".to_owned(),
            repo: "hello-world".to_owned(),
        };
        let repos = expand(&target, &lister).unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].owner, "octocat");
    }

    #[test]
    fn expand_org_empty_fails() {
        let lister = FakeLister(vec![]);
        let target = Target::Org {
            name: "ghost-org".to_owned(),
            limit: None,
        };
        assert!(matches!(expand(&target, &lister), Err(ZeroError::EmptyOrg { .. })));
    }

    #[test]
    fn expand_org_respects_limit() {
        let lister = FakeLister(vec![repo("a", "r1"), repo("a", "r2"), repo("a", "r3")]);
        let target = Target::Org {
            name: "a".to_owned(),
            limit: Some(2),
        };
        let repos = expand(&target, &lister).unwrap();
        assert_eq!(repos.len(), 2);
    }

    #[test]
    fn project_id_derivation_lowercases() {
        let r = repo("OctoCat", "Hello-World");
        assert_eq!(r.project_id().unwrap().as_str(), "octocat/hello-world");
    }
}
