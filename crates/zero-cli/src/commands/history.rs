//! `zero history <project>` — the project's recent scans, newest first
//! (§6's `history`).

use anyhow::Result;
use clap::Args;
use zero_core::ids::ProjectId;

use crate::app;
use crate::format::OutputFormat;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// The project to show history for, as `owner/name`.
    pub project: ProjectId,

    /// Caps the number of scans returned, newest first.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Output format: `text` or `json`.
    #[arg(long)]
    pub format: Option<OutputFormat>,
}

pub fn run(args: &HistoryArgs) -> Result<()> {
    let (_ctx, _registry, store) = app::bootstrap()?;
    let records = zero_core::ops::history(&store, &args.project, args.limit)?;
    let format = OutputFormat::resolve(args.format);

    if format == OutputFormat::Json {
        println!("{}", format.serialize(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No scan history for {}.", args.project);
        return Ok(());
    }

    println!("{:<22} {:<10} {:<24} {:<10} {:<7}", "SCAN ID", "COMMIT", "STARTED", "COMPLETE", "FAILED");
    for r in &records {
        let completed = if r.completed_at.is_some() { "yes" } else { "no" };
        println!(
            "{:<22} {:<10} {:<24} {:<10} {:<7}",
            r.scan_id.to_string(),
            &r.commit_hash[..r.commit_hash.len().min(10)],
            r.started_at.to_rfc3339(),
            completed,
            r.scanners_failed,
        );
    }

    Ok(())
}
