//! `zero hydrate <target>` — drives the full two-phase pipeline (§4.6),
//! rendering the live dashboard (C7) while it runs.

use std::collections::HashSet;

use anyhow::Result;
use clap::Args;
use zero_core::cancel::CancelToken;
use zero_core::cloner::CloneDepth;
use zero_core::events::{self, PipelineResult};
use zero_core::ids::ScannerName;
use zero_core::pipeline::{self, HydrateReq};
use zero_core::target::Target;

use crate::app;
use crate::github::GithubLister;

/// Clones and scans a single repository or an entire organization.
#[derive(Args, Debug)]
pub struct HydrateArgs {
    /// `owner/repo` for a single repository, or a bare org/user name.
    pub target: String,

    /// Scanner profile to run (defaults to `zero.toml`'s `default_profile`).
    #[arg(long)]
    pub profile: Option<String>,

    /// Clone full history instead of the shallow default.
    #[arg(long)]
    pub full_history: bool,

    /// Repo-level worker pool size, clamped to `[1, 16]`.
    #[arg(long)]
    pub repo_parallelism: Option<usize>,

    /// Per-repo scanner worker pool size, clamped to `[1, 8]`.
    #[arg(long)]
    pub scanner_parallelism: Option<usize>,

    /// Caps the number of repos fetched for an organization target.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Skip scanners declared "slow on large repos" above the configured
    /// file-count threshold (§4.4).
    #[arg(long)]
    pub skip_slow: bool,

    /// Force a hard reset on a diverged cached working copy (§4.8).
    #[arg(long)]
    pub force_rescan: bool,

    /// Scanner names to skip, comma-separated.
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Stop after cloning; never run the scan phase.
    #[arg(long)]
    pub clone_only: bool,
}

/// `hydrate`'s result plus whether it was interrupted by `SIGINT`, for the
/// exit-code mapping in `main` (§6).
pub struct HydrateOutcome {
    pub result: PipelineResult,
    pub interrupted: bool,
}

pub fn run(args: &HydrateArgs) -> Result<HydrateOutcome> {
    let (ctx, registry, store) = app::bootstrap()?;

    let mut target = Target::parse(&args.target)?;
    if let (Target::Org { limit, .. }, Some(requested)) = (&mut target, args.limit) {
        *limit = Some(requested);
    }
    let profile = args.profile.clone().unwrap_or_else(|| ctx.settings().default_profile.clone());
    let skip_scanners: HashSet<ScannerName> =
        args.skip.iter().map(|s| ScannerName::new(s.clone())).collect::<Result<_, _>>()?;

    let repo_parallelism = args.repo_parallelism.unwrap_or_else(|| ctx.settings().effective_parallel_repos());
    let scanner_parallelism = args.scanner_parallelism.unwrap_or_else(|| ctx.settings().effective_parallel_scanners());

    let (sink, rx) = events::channel();
    let cancel = CancelToken::new();
    let ctrlc_cancel = cancel.clone();
    if ctrlc::set_handler(move || ctrlc_cancel.cancel()).is_err() {
        tracing::warn!("failed to install SIGINT handler; Ctrl-C will not cancel gracefully");
    }

    let home = ctx.home().to_path_buf();
    let dashboard = std::thread::spawn(move || zero_dashboard::run(&rx, &home));

    let lister = GithubLister::from_env();
    let req = HydrateReq {
        target,
        profile,
        clone_depth: if args.full_history { CloneDepth::Full } else { CloneDepth::Shallow },
        repo_parallelism,
        scanner_parallelism,
        skip_slow: args.skip_slow,
        force_rescan: args.force_rescan,
        skip_scanners,
        clone_only: args.clone_only,
        lister: &lister,
    };

    let result = pipeline::hydrate(&ctx, &store, &registry, &req, &sink, &cancel);
    drop(sink);
    let _ = dashboard.join();
    let interrupted = cancel.is_cancelled();

    Ok(HydrateOutcome { result: result?, interrupted })
}
