//! zero-core — the hydration orchestrator: artifact store, scanner registry,
//! scanner runner, per-repo scheduler, cloner, freshness oracle, and the
//! top-level hydrate pipeline.
//!
//! The CLI (`zero-cli`) and the dashboard (`zero-dashboard`) are the only
//! consumers of this crate; everything here is headless and side-effect-free
//! beyond the artifact store's own home directory.

pub mod cancel;
pub mod cloner;
pub mod config;
pub mod context;
pub mod doctor;
pub mod error;
pub mod events;
pub mod freshness;
pub mod ids;
pub mod ops;
pub mod pipeline;
pub mod registry;
pub mod runner;
pub mod scanners;
pub mod scheduler;
pub mod store;
pub mod target;
pub mod telemetry;

pub use context::AppContext;
pub use error::ZeroError;
