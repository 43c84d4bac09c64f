//! Home-directory layout helpers.
//!
//! ```text
//! <home>/
//!   index.json
//!   repos/
//!     <owner>/
//!       _index.json
//!       <repo>/
//!         project.json
//!         repo/
//!         analysis/
//!           manifest.json
//!           history.json
//!           <scanner>.json
//! ```

use std::path::{Path, PathBuf};

use crate::ids::ProjectId;

/// The default artifact-store root, relative to the current directory.
pub const DEFAULT_HOME: &str = ".zero";

/// Resolves the artifact-store root: `ZERO_HOME` if set, else [`DEFAULT_HOME`].
#[must_use]
pub fn home_dir() -> PathBuf {
    std::env::var_os("ZERO_HOME").map_or_else(|| PathBuf::from(DEFAULT_HOME), PathBuf::from)
}

/// `<home>/index.json`
#[must_use]
pub fn project_index_path(home: &Path) -> PathBuf {
    home.join("index.json")
}

/// `<home>/repos/<owner>`
#[must_use]
pub fn org_dir(home: &Path, owner: &str) -> PathBuf {
    home.join("repos").join(owner)
}

/// `<home>/repos/<owner>/_index.json`
#[must_use]
pub fn org_rollup_path(home: &Path, owner: &str) -> PathBuf {
    org_dir(home, owner).join("_index.json")
}

/// `<home>/repos/<owner>/<repo>`
#[must_use]
pub fn project_dir(home: &Path, project_id: &ProjectId) -> PathBuf {
    let (owner, name) = project_id.parts();
    org_dir(home, owner).join(name)
}

/// `<home>/repos/<owner>/<repo>/project.json`
#[must_use]
pub fn project_file_path(home: &Path, project_id: &ProjectId) -> PathBuf {
    project_dir(home, project_id).join("project.json")
}

/// `<home>/repos/<owner>/<repo>/repo` — the working copy root.
#[must_use]
pub fn working_copy_dir(home: &Path, project_id: &ProjectId) -> PathBuf {
    project_dir(home, project_id).join("repo")
}

/// `<home>/repos/<owner>/<repo>/analysis`
#[must_use]
pub fn analysis_dir(home: &Path, project_id: &ProjectId) -> PathBuf {
    project_dir(home, project_id).join("analysis")
}

/// `<home>/repos/<owner>/<repo>/analysis/manifest.json`
#[must_use]
pub fn manifest_path(home: &Path, project_id: &ProjectId) -> PathBuf {
    analysis_dir(home, project_id).join("manifest.json")
}

/// `<home>/repos/<owner>/<repo>/analysis/history.json`
#[must_use]
pub fn history_path(home: &Path, project_id: &ProjectId) -> PathBuf {
    analysis_dir(home, project_id).join("history.json")
}

/// `<home>/repos/<owner>/<repo>/analysis/<scanner>.json`
#[must_use]
pub fn scanner_output_path(home: &Path, project_id: &ProjectId, scanner: &str) -> PathBuf {
    analysis_dir(home, project_id).join(format!("{scanner}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid() -> ProjectId {
        ProjectId::new("octocat", "hello-world").unwrap()
    }

    #[test]
    fn layout_nests_under_owner_then_repo() {
        let home = Path::new("/tmp/zero-home");
        let id = pid();
        assert_eq!(
            project_dir(home, &id),
            PathBuf::from("/tmp/zero-home/repos/octocat/hello-world")
        );
        assert_eq!(
            manifest_path(home, &id),
            PathBuf::from("/tmp/zero-home/repos/octocat/hello-world/analysis/manifest.json")
        );
        assert_eq!(
            working_copy_dir(home, &id),
            PathBuf::from("/tmp/zero-home/repos/octocat/hello-world/repo")
        );
    }

    #[test]
    fn org_rollup_is_a_sibling_of_repo_dirs() {
        let home = Path::new("/tmp/zero-home");
        assert_eq!(
            org_rollup_path(home, "octocat"),
            PathBuf::from("/tmp/zero-home/repos/octocat/_index.json")
        );
    }

    #[test]
    fn home_dir_defaults_when_env_unset() {
        // SAFETY: test-local, single-threaded env mutation.
        unsafe {
            std::env::remove_var("ZERO_HOME");
        }
        assert_eq!(home_dir(), PathBuf::from(DEFAULT_HOME));
    }
}
