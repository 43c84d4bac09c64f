//! Wires together the explicit `AppContext` + populated `ScannerRegistry`
//! every subcommand needs. Per the "no hidden globals" design note (§9),
//! this is the CLI's one construction site — nothing else in this crate
//! reaches for `ZERO_HOME` or `zero.toml` directly.

use anyhow::{Context as _, Result};
use zero_core::context::AppContext;
use zero_core::registry::ScannerRegistry;
use zero_core::store::ArtifactStore;

/// Builds the context, a validated registry of built-in scanners, and the
/// artifact store rooted at the context's home directory.
pub fn bootstrap() -> Result<(AppContext, ScannerRegistry, ArtifactStore)> {
    let ctx = AppContext::from_env().context("loading zero.toml")?;
    let mut registry = ScannerRegistry::new();
    zero_core::scanners::register_builtin_scanners(&mut registry).context("registering built-in scanners")?;
    registry.validate().context("validating scanner registry")?;
    let store = ArtifactStore::new(ctx.home().to_path_buf());
    Ok((ctx, registry, store))
}
