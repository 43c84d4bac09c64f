//! Write-temp-then-rename atomic file writes.
//!
//! Every mutation the artifact store makes to a JSON file goes through
//! [`atomic_write`] so a reader never observes a torn write, and a crash
//! mid-write leaves the previous version intact.

use std::io::Write as _;
use std::path::Path;

use crate::error::ZeroError;

/// Writes `bytes` to `path` via a sibling temp file, fsync, then rename.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), ZeroError> {
    let Some(parent) = path.parent() else {
        return Err(ZeroError::Io {
            context: format!("resolving parent directory of '{}'", path.display()),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent"),
        });
    };
    std::fs::create_dir_all(parent).map_err(|source| ZeroError::Io {
        context: format!("creating directory '{}'", parent.display()),
        source,
    })?;

    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let tmp_path = parent.join(format!(".{file_name}.tmp"));

    let write_result = (|| -> std::io::Result<()> {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(())
    })();

    if let Err(source) = write_result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(ZeroError::Io {
            context: format!("writing temp file '{}'", tmp_path.display()),
            source,
        });
    }

    std::fs::rename(&tmp_path, path).map_err(|source| ZeroError::Io {
        context: format!("renaming '{}' to '{}'", tmp_path.display(), path.display()),
        source,
    })
}

/// Serializes `value` as pretty JSON with a trailing newline and writes it
/// atomically to `path`.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), ZeroError> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|err| ZeroError::MalformedArtifact {
        path: path.to_path_buf(),
        detail: err.to_string(),
    })?;
    bytes.push(b'\n');
    atomic_write(path, &bytes)
}

/// Reads and parses `path` as JSON. Missing file and malformed JSON are
/// distinguished: the former is `Ok(None)`, the latter a [`ZeroError`].
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, ZeroError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ZeroError::Io {
                context: format!("reading '{}'", path.display()),
                source,
            });
        }
    };
    match serde_json::from_str(&text) {
        Ok(value) => Ok(Some(value)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Sample {
        n: u32,
    }

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/sample.json");
        atomic_write_json(&path, &Sample { n: 7 }).unwrap();
        let read: Option<Sample> = read_json(&path).unwrap();
        assert_eq!(read, Some(Sample { n: 7 }));
    }

    #[test]
    fn read_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let read: Option<Sample> = read_json(&path).unwrap();
        assert_eq!(read, None);
    }

    #[test]
    fn read_malformed_json_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, b"not json").unwrap();
        let read: Option<Sample> = read_json(&path).unwrap();
        assert_eq!(read, None);
    }

    #[test]
    fn no_temp_file_left_behind_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        atomic_write_json(&path, &Sample { n: 1 }).unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
