//! `zero scanners list` — every registered scanner's static metadata (C2, §4.2).

use anyhow::Result;
use clap::Args;

use crate::app;
use crate::format::OutputFormat;

#[derive(Args, Debug)]
pub struct ScannersArgs {
    /// Output format: `text` or `json`.
    #[arg(long)]
    pub format: Option<OutputFormat>,
}

pub fn run(args: &ScannersArgs) -> Result<()> {
    let (_ctx, registry, _store) = app::bootstrap()?;
    let descriptors = registry.descriptors();
    let format = OutputFormat::resolve(args.format);

    if format == OutputFormat::Json {
        #[derive(serde::Serialize)]
        struct Row<'a> {
            name: &'a str,
            description: &'a str,
            dependencies: Vec<&'a str>,
            slow_on_large_repos: bool,
        }
        let rows: Vec<Row<'_>> = descriptors
            .iter()
            .map(|d| Row {
                name: d.name.as_str(),
                description: &d.description,
                dependencies: d.dependencies.iter().map(zero_core::ids::ScannerName::as_str).collect(),
                slow_on_large_repos: d.slow_on_large_repos,
            })
            .collect();
        println!("{}", format.serialize(&rows)?);
        return Ok(());
    }

    println!("{:<14} {:<10} {:<30}", "NAME", "SLOW", "DEPENDENCIES");
    for d in &descriptors {
        let deps = if d.dependencies.is_empty() {
            "-".to_owned()
        } else {
            d.dependencies.iter().map(zero_core::ids::ScannerName::as_str).collect::<Vec<_>>().join(", ")
        };
        println!("{:<14} {:<10} {:<30}", d.name.as_str(), d.slow_on_large_repos, deps);
        println!("               {}", d.description);
    }

    Ok(())
}
