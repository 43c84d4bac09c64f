//! `zero` — the hydration orchestrator's CLI entry point.
//!
//! Every subcommand constructs its own `AppContext`/`ScannerRegistry` via
//! [`app::bootstrap`] and returns through [`run`], which maps the outcome to
//! the process exit code the pipeline's error model promises (§6, §7).

mod app;
mod commands;
mod format;
mod github;

use clap::{Parser, Subcommand};

/// The `zero` hydration orchestrator.
#[derive(Parser, Debug)]
#[command(name = "zero", version, about = "Clone, scan, and track a GitHub org's repositories")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clone and scan a repository or an entire organization.
    Hydrate(commands::hydrate::HydrateArgs),
    /// Re-scan an already-cloned project without re-cloning.
    Scan(commands::scan::ScanArgs),
    /// List every indexed project.
    Status(commands::status::StatusArgs),
    /// Remove local artifact-store state for one project, an org, or everything.
    Clean(commands::clean::CleanArgs),
    /// Show a project's recent scan history.
    History(commands::history::HistoryArgs),
    /// Check a project's artifact-store state for consistency.
    Doctor(commands::doctor::DoctorArgs),
    /// Scanner registry introspection.
    Scanners {
        #[command(subcommand)]
        command: ScannersCommand,
    },
    /// Write a starter `zero.toml` in the current directory.
    Init,
}

#[derive(Subcommand, Debug)]
enum ScannersCommand {
    /// List every registered scanner.
    List(commands::scanners::ScannersArgs),
}

/// Exit codes promised by §6. `Interrupted` takes priority over `Partial`
/// when a `SIGINT` arrives mid-run: some repos may have already reached
/// `ready`, but the run as a whole did not complete on its own terms.
#[repr(i32)]
enum ExitCode {
    Success = 0,
    Partial = 1,
    Invalid = 2,
    Interrupted = 130,
}

fn main() {
    let _telemetry = zero_core::telemetry::init();
    let cli = Cli::parse();

    let code = match run(&cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::Invalid
        }
    };
    std::process::exit(code as i32);
}

fn run(command: &Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Hydrate(args) => run_hydrate(args),
        Command::Scan(args) => {
            let outcome = commands::scan::run(args)?;
            print_scan_outcome(&outcome);
            Ok(if outcome.any_failed() { ExitCode::Partial } else { ExitCode::Success })
        }
        Command::Status(args) => {
            commands::status::run(args)?;
            Ok(ExitCode::Success)
        }
        Command::Clean(args) => {
            let count = commands::clean::run(args)?;
            println!("removed {count} project(s)");
            Ok(ExitCode::Success)
        }
        Command::History(args) => {
            commands::history::run(args)?;
            Ok(ExitCode::Success)
        }
        Command::Doctor(args) => {
            let hydrated = commands::doctor::run(args)?;
            Ok(if hydrated { ExitCode::Success } else { ExitCode::Partial })
        }
        Command::Scanners { command: ScannersCommand::List(args) } => {
            commands::scanners::run(args)?;
            Ok(ExitCode::Success)
        }
        Command::Init => {
            commands::init::run()?;
            Ok(ExitCode::Success)
        }
    }
}

fn run_hydrate(args: &commands::hydrate::HydrateArgs) -> anyhow::Result<ExitCode> {
    let outcome = commands::hydrate::run(args)?;
    let result = &outcome.result;

    println!(
        "hydrate finished: {} succeeded, {} failed, {} total",
        result.success_count,
        result.failed_count,
        result.project_ids.len()
    );

    if outcome.interrupted {
        return Ok(ExitCode::Interrupted);
    }
    if result.project_ids.is_empty() || result.success_count == 0 {
        return Ok(ExitCode::Invalid);
    }
    if result.failed_count > 0 {
        return Ok(ExitCode::Partial);
    }
    Ok(ExitCode::Success)
}

fn print_scan_outcome(outcome: &zero_core::scheduler::ScanOutcome) {
    for result in &outcome.results {
        println!("{:<14} {:?}", result.scanner.as_str(), result.status);
    }
}
