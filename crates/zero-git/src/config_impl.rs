//! gix-backed config read.

use crate::error::GitError;
use crate::gix_repo::GixRepo;

/// Reads a dotted config key (`"remote.origin.url"`, `"core.bare"`) out of
/// the repository's config snapshot.
///
/// Only reading is exposed: the orchestrator never needs to mutate a
/// cloned repository's config.
pub fn read_config(repo: &GixRepo, key: &str) -> Result<Option<String>, GitError> {
    let (section, subsection, name) = split_key(key)?;
    let snapshot = repo.repo.config_snapshot();
    let value = match subsection {
        Some(sub) => snapshot.string(format!("{section}.{sub}.{name}").as_str()),
        None => snapshot.string(format!("{section}.{name}").as_str()),
    };
    Ok(value.map(|v| v.to_string()))
}

fn split_key(key: &str) -> Result<(&str, Option<&str>, &str), GitError> {
    let mut parts = key.splitn(3, '.');
    let first = parts.next().filter(|s| !s.is_empty());
    let second = parts.next().filter(|s| !s.is_empty());
    let third = parts.next().filter(|s| !s.is_empty());

    match (first, second, third) {
        (Some(section), Some(name), None) => Ok((section, None, name)),
        (Some(section), Some(sub), Some(name)) => Ok((section, Some(sub), name)),
        _ => Err(GitError::BackendError {
            message: format!("config key '{key}' must have the form 'section.name' or 'section.subsection.name'"),
        }),
    }
}
