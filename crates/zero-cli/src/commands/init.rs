//! `zero init` — writes a starter `zero.toml` in the current directory and
//! makes sure the artifact store's home directory is gitignored.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

const DEFAULT_CONFIG: &str = r#"# zero.toml — generated by `zero init`.
default_profile = "default"

scanner_timeout_secs = 300
clone_timeout_secs = 300
parallel_repos = 4
parallel_scanners = 4
slow_scanner_file_threshold = 20000

[profiles.default]
scanners = ["sbom", "secrets", "license"]

[profiles.default.feature_overrides]
"#;

pub fn run() -> Result<()> {
    println!("Initializing zero...");
    println!();

    ensure_config()?;
    ensure_home_gitignored()?;

    println!();
    println!("zero is ready!");
    println!("  Next: zero hydrate <owner>/<repo>");

    Ok(())
}

fn ensure_config() -> Result<()> {
    let path = Path::new("zero.toml");
    if path.exists() {
        println!("[OK] zero.toml already exists");
        return Ok(());
    }
    fs::write(path, DEFAULT_CONFIG).context("writing zero.toml")?;
    println!("[OK] wrote zero.toml");
    Ok(())
}

fn ensure_home_gitignored() -> Result<()> {
    let gitignore = Path::new(".gitignore");
    let entry = ".zero/";

    let existing = fs::read_to_string(gitignore).unwrap_or_default();
    if existing.lines().any(|line| line.trim() == entry) {
        println!("[OK] .gitignore already excludes {entry}");
        return Ok(());
    }

    let mut contents = existing;
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(entry);
    contents.push('\n');
    fs::write(gitignore, contents).context("updating .gitignore")?;
    println!("[OK] added {entry} to .gitignore");
    Ok(())
}
