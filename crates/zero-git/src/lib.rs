//! Git abstraction layer for the hydration orchestrator.
//!
//! This crate defines the [`GitRepo`] trait — the single interface through
//! which the rest of the orchestrator interacts with git. No other crate
//! should import gix directly; instead, depend on `zero-git` and program
//! against the trait.
//!
//! # Crate layout
//!
//! - [`repo`] — the [`GitRepo`] trait definition.
//! - [`gix_repo`] — the gix-backed implementation, including [`gix_repo::GixRepo::clone`].
//! - [`types`] — value types used in trait signatures ([`GitOid`], [`RefName`], ...).
//! - [`error`] — the [`GitError`] enum returned by all trait methods.

mod checkout_impl;
mod config_impl;
pub mod error;
pub mod gix_repo;
mod objects_impl;
mod refs_impl;
mod remote_impl;
pub mod repo;
mod status_impl;
pub mod types;

pub use error::GitError;
pub use gix_repo::GixRepo;
pub use repo::GitRepo;
pub use types::{CloneOutcome, CommitInfo, FetchOutcome, GitOid, OidParseError, RefName, RefNameError};
