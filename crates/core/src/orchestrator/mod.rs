//! Cascade orchestrator.
//!
//! Resolves the target version once per run, then walks the managed
//! repositories one at a time:
//! - **Check out** the image repository (always cleaned up afterwards)
//! - **Detect** stale version pins and plugins, rewriting files in place
//! - **Commit and push** only when something changed
//! - **Cascade**: wait for the image build, then trigger the database-update
//!   release, then the rollout release

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::CascadeOrchestrator;
pub use types::{
    error_chain, CascadeError, ManagedRepository, OrchestratorError, RepositoryOutcome,
    RepositoryReport, RunSummary,
};
