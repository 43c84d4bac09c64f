//! One module per subcommand; each owns its `clap::Args` struct and a
//! `run` entry point that `main` dispatches to.

pub mod clean;
pub mod doctor;
pub mod history;
pub mod hydrate;
pub mod init;
pub mod scan;
pub mod scanners;
pub mod status;
