//! CI pipeline access and build waiting.
//!
//! Build and release registries share the [`Pipelines`] capability
//! (validate a named definition, trigger a run). Only builds are polled,
//! through [`BuildWaiter`].

mod azure;
mod config;
mod types;
mod waiter;

pub use azure::{AzureBuildPipelines, AzureReleasePipelines};
pub use config::{DevOpsConfig, WaitConfig};
pub use types::*;
pub use waiter::{BuildWaiter, WaitError, WaitState};
