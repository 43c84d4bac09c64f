//! The code-hosting lister collaborator (§6): `list_org_repos(org, limit?)`.
//!
//! Deliberately thin — the core treats this as an external RPC and only
//! specifies its shape (`zero_core::target::OrgLister`). This is the one
//! place in the workspace that talks to the network outside of `zero-git`'s
//! own clone/fetch machinery.

use serde::Deserialize;
use zero_core::error::ZeroError;
use zero_core::target::{OrgLister, RepoRef};

const PER_PAGE: usize = 100;
const USER_AGENT: &str = concat!("zero/", env!("CARGO_PKG_VERSION"));

/// Lists repositories for a GitHub org (or user) via the public REST API.
pub struct GithubLister {
    client: reqwest::blocking::Client,
    token: Option<String>,
}

impl GithubLister {
    /// Builds a lister using `GITHUB_TOKEN` for auth if set (raises the
    /// unauthenticated rate limit; listing works without it for public repos).
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
        }
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, ZeroError> {
        let mut req = self.client.get(url).header("User-Agent", USER_AGENT).header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req.send().map_err(|source| ZeroError::Io {
            context: format!("listing repositories from {url}"),
            source: std::io::Error::other(source.to_string()),
        })
    }
}

#[derive(Deserialize)]
struct GithubRepo {
    name: String,
    owner: GithubOwner,
    clone_url: String,
    default_branch: Option<String>,
}

#[derive(Deserialize)]
struct GithubOwner {
    login: String,
}

impl OrgLister for GithubLister {
    fn list_org_repos(&self, org: &str, limit: Option<usize>) -> Result<Vec<RepoRef>, ZeroError> {
        let mut repos = Vec::new();
        let mut page = 1u32;

        loop {
            let url = format!("https://api.github.com/orgs/{org}/repos?per_page={PER_PAGE}&page={page}");
            let response = self.get(&url)?;
            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                // Not an org (or not visible) — GitHub buckets users and
                // orgs under distinct endpoints; fall back to /users.
                return self.list_user_repos(org, limit);
            }
            if !status.is_success() {
                return Err(ZeroError::Io {
                    context: format!("listing repositories for org '{org}'"),
                    source: std::io::Error::other(format!("GitHub API returned {status}")),
                });
            }
            let batch: Vec<GithubRepo> = response.json().map_err(|source| ZeroError::Io {
                context: format!("parsing GitHub API response for org '{org}'"),
                source: std::io::Error::other(source.to_string()),
            })?;
            if batch.is_empty() {
                break;
            }
            repos.extend(batch.into_iter().map(|r| RepoRef {
                owner: r.owner.login,
                name: r.name,
                clone_url: r.clone_url,
                default_branch: r.default_branch,
            }));
            if let Some(limit) = limit
                && repos.len() >= limit
            {
                repos.truncate(limit);
                break;
            }
            page += 1;
        }

        Ok(repos)
    }
}

impl GithubLister {
    fn list_user_repos(&self, user: &str, limit: Option<usize>) -> Result<Vec<RepoRef>, ZeroError> {
        let mut repos = Vec::new();
        let mut page = 1u32;

        loop {
            let url = format!("https://api.github.com/users/{user}/repos?per_page={PER_PAGE}&page={page}");
            let response = self.get(&url)?;
            let status = response.status();
            if !status.is_success() {
                return Err(ZeroError::Io {
                    context: format!("listing repositories for user '{user}'"),
                    source: std::io::Error::other(format!("GitHub API returned {status}")),
                });
            }
            let batch: Vec<GithubRepo> = response.json().map_err(|source| ZeroError::Io {
                context: format!("parsing GitHub API response for user '{user}'"),
                source: std::io::Error::other(source.to_string()),
            })?;
            if batch.is_empty() {
                break;
            }
            repos.extend(batch.into_iter().map(|r| RepoRef {
                owner: r.owner.login,
                name: r.name,
                clone_url: r.clone_url,
                default_branch: r.default_branch,
            }));
            if let Some(limit) = limit
                && repos.len() >= limit
            {
                repos.truncate(limit);
                break;
            }
            page += 1;
        }

        Ok(repos)
    }
}
