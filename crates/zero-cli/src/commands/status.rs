//! `zero status` — lists every indexed project (§6's `status`).

use anyhow::Result;
use clap::Args;

use crate::app;
use crate::format::OutputFormat;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format: `text` or `json`.
    #[arg(long)]
    pub format: Option<OutputFormat>,
}

pub fn run(args: &StatusArgs) -> Result<()> {
    let (_ctx, _registry, store) = app::bootstrap()?;
    let summaries = zero_core::ops::status(&store)?;
    let format = OutputFormat::resolve(args.format);

    if format == OutputFormat::Json {
        #[derive(serde::Serialize)]
        struct Row<'a> {
            project_id: &'a str,
            status: String,
            source: &'a str,
            created_at: chrono::DateTime<chrono::Utc>,
            last_analyzed: Option<chrono::DateTime<chrono::Utc>>,
        }
        let rows: Vec<Row<'_>> = summaries
            .iter()
            .map(|s| Row {
                project_id: s.project_id.as_str(),
                status: format!("{:?}", s.status).to_lowercase(),
                source: &s.source,
                created_at: s.created_at,
                last_analyzed: s.last_analyzed,
            })
            .collect();
        println!("{}", format.serialize(&rows)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No projects indexed yet. Run `zero hydrate <target>` to get started.");
        return Ok(());
    }

    println!("{:<40} {:<14} {:<8} {:<20}", "PROJECT", "STATUS", "SOURCE", "LAST ANALYZED");
    for s in &summaries {
        let last_analyzed = s.last_analyzed.map_or_else(|| "never".to_owned(), |t| t.to_rfc3339());
        println!(
            "{:<40} {:<14} {:<8} {:<20}",
            s.project_id.as_str(),
            format!("{:?}", s.status).to_lowercase(),
            s.source,
            last_analyzed
        );
    }

    Ok(())
}
