//! `zero clean` — removes local artifact-store state (§6's `clean`).

use anyhow::{Result, bail};
use clap::Args;
use zero_core::ids::ProjectId;
use zero_core::ops::CleanScope;

use crate::app;

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// A single project (`owner/name`) to remove.
    #[arg(long, conflicts_with_all = ["org", "all"])]
    pub project: Option<ProjectId>,

    /// Remove every indexed project under this owner.
    #[arg(long, conflicts_with_all = ["project", "all"])]
    pub org: Option<String>,

    /// Remove every indexed project.
    #[arg(long, conflicts_with_all = ["project", "org"])]
    pub all: bool,
}

pub fn run(args: &CleanArgs) -> Result<usize> {
    let scope = match (&args.project, &args.org, args.all) {
        (Some(project), None, false) => CleanScope::Project(project.clone()),
        (None, Some(org), false) => CleanScope::Org(org.clone()),
        (None, None, true) => CleanScope::All,
        _ => bail!("exactly one of --project, --org, or --all is required"),
    };

    let (_ctx, _registry, store) = app::bootstrap()?;
    Ok(zero_core::ops::clean(&store, &scope)?)
}
