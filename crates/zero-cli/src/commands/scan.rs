//! `zero scan <project>` — re-runs the scan phase against an already-cloned
//! working copy, skipping Phase 1 entirely (§6's `scan_cached`).

use std::collections::HashSet;

use anyhow::Result;
use clap::Args;
use zero_core::cancel::CancelToken;
use zero_core::events;
use zero_core::ids::{ProjectId, ScannerName};
use zero_core::scheduler::ScanOutcome;

use crate::app;

/// Re-scans a previously hydrated project without re-cloning.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// The project to scan, as `owner/name`.
    pub project: ProjectId,

    /// Scanner profile to run (defaults to `zero.toml`'s `default_profile`).
    #[arg(long)]
    pub profile: Option<String>,

    /// Scanner names to skip, comma-separated.
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,
}

pub fn run(args: &ScanArgs) -> Result<ScanOutcome> {
    let (ctx, registry, store) = app::bootstrap()?;
    let profile = args.profile.clone().unwrap_or_else(|| ctx.settings().default_profile.clone());
    let skip_scanners: HashSet<ScannerName> =
        args.skip.iter().map(|s| ScannerName::new(s.clone())).collect::<Result<_, _>>()?;

    let (sink, rx) = events::channel();
    let consumer = std::thread::spawn(move || while rx.recv().is_ok() {});
    let cancel = CancelToken::new();

    let outcome = zero_core::ops::scan_cached(&ctx, &store, &registry, &args.project, &profile, &skip_scanners, &sink, &cancel);
    drop(sink);
    let _ = consumer.join();
    Ok(outcome?)
}
