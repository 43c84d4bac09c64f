//! Output format selection, matching the teacher's `FORMAT`-env-var
//! convention: an explicit `--format` flag wins, then the `FORMAT`
//! environment variable, then a plain-text default.

use std::str::FromStr;

use anyhow::{Result, bail};
use serde::Serialize;

/// Output format for structured commands (`status`, `history`, `scanners`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-friendly table, the default for a terminal.
    #[default]
    Text,
    /// Machine-parseable JSON.
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => bail!("invalid format '{s}'. Use: text or json"),
        }
    }
}

impl OutputFormat {
    /// Priority: explicit flag > `FORMAT` env var > [`Self::default`].
    #[must_use]
    pub fn resolve(explicit: Option<Self>) -> Self {
        if let Some(fmt) = explicit {
            return fmt;
        }
        if let Ok(env_format) = std::env::var("FORMAT")
            && let Ok(fmt) = env_format.parse::<Self>()
        {
            return fmt;
        }
        Self::default()
    }

    /// Serializes `data` as pretty-printed JSON.
    ///
    /// # Errors
    /// Propagates `serde_json`'s serialization failure (never expected for
    /// the plain data types this crate serializes).
    pub fn serialize<T: Serialize>(self, data: &T) -> Result<String> {
        match self {
            Self::Json => serde_json::to_string_pretty(data).map_err(Into::into),
            Self::Text => bail!("text format does not use serialize(); use a dedicated print function"),
        }
    }
}
