//! The explicit, passed-everywhere application context.
//!
//! Per the "no hidden globals" design note: every component boundary in this
//! crate takes `&AppContext` rather than reaching for a process-wide
//! singleton. The CLI constructs exactly one of these at startup from
//! `ZERO_HOME` and the loaded `zero.toml`.

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::store::paths;

/// Everything a component needs to know about *where* it is running and
/// *how* it is configured, bundled so it can be threaded through function
/// signatures instead of read from the environment ad hoc.
#[derive(Clone, Debug)]
pub struct AppContext {
    home: PathBuf,
    settings: Settings,
}

impl AppContext {
    /// Builds a context from an explicit home directory and settings.
    #[must_use]
    pub const fn new(home: PathBuf, settings: Settings) -> Self {
        Self { home, settings }
    }

    /// Resolves `ZERO_HOME` (or the default `./.zero`) and loads
    /// `<cwd>/zero.toml` if present, falling back to built-in defaults.
    ///
    /// # Errors
    /// Returns an error if `zero.toml` exists but fails to parse.
    pub fn from_env() -> Result<Self, crate::config::ConfigError> {
        let home = paths::home_dir();
        let settings = Settings::load(Path::new("zero.toml"))?;
        Ok(Self::new(home, settings))
    }

    /// The artifact-store root directory.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// The loaded (or default) configuration.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_holds_home_and_settings() {
        let ctx = AppContext::new(PathBuf::from("/tmp/zero-home"), Settings::default());
        assert_eq!(ctx.home(), Path::new("/tmp/zero-home"));
        assert_eq!(ctx.settings().default_profile, "default");
    }
}
