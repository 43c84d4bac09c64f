//! `zero doctor <project>` — a read-only consistency check for one
//! project's artifact-store state (§6's `hydration_status`).

use anyhow::Result;
use clap::Args;
use zero_core::ids::ProjectId;

use crate::app;
use crate::format::OutputFormat;

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// The project to check, as `owner/name`.
    pub project: ProjectId,

    /// Output format: `text` or `json`.
    #[arg(long)]
    pub format: Option<OutputFormat>,
}

/// Returns `true` if every check passed, so `main` can map it to exit code 0/1.
pub fn run(args: &DoctorArgs) -> Result<bool> {
    let (_ctx, _registry, store) = app::bootstrap()?;
    let status = zero_core::doctor::hydration_status(&store, &args.project)?;
    let format = OutputFormat::resolve(args.format);

    if format == OutputFormat::Json {
        println!("{}", format.serialize(&status)?);
        return Ok(status.hydrated);
    }

    println!("zero doctor {}", args.project);
    println!("{}", "=".repeat(11 + args.project.as_str().len()));
    println!();
    for check in &status.checks {
        let mark = if check.passed { "[OK]" } else { "[FAIL]" };
        println!("{mark} {}: {}", check.name, check.detail);
    }
    println!();
    if status.hydrated {
        println!("hydrated");
    } else {
        println!("not hydrated: {}", status.reason.as_deref().unwrap_or("unknown"));
    }

    Ok(status.hydrated)
}
