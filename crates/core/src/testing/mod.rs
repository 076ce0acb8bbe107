//! Testing utilities and mock implementations of every collaborator trait.
//!
//! All mocks record into a shared [`CallLog`], so a test can assert the
//! relative order of registry, build, release and version-control calls.
//!
//! # Example
//!
//! ```rust,ignore
//! use cascade_core::testing::{CallLog, MockBuildPipelines, MockReleasePipelines};
//!
//! let log = CallLog::new();
//! let builds = Arc::new(MockBuildPipelines::new(log.clone()));
//! let releases = Arc::new(MockReleasePipelines::new(log.clone()));
//!
//! builds.add_definition("blog-build", 3).await;
//! releases.add_definition("blog-db", 8).await;
//!
//! // ... run the orchestrator ...
//!
//! assert_eq!(log.calls_with_prefix("release.").await, vec![/* .. */]);
//! ```

mod call_log;
pub mod fixtures;
mod mock_pipelines;
mod mock_plugins;
mod mock_registry;
mod mock_vcs;

pub use call_log::CallLog;
pub use mock_pipelines::{MockBuildPipelines, MockReleasePipelines};
pub use mock_plugins::MockPluginUpdateCheck;
pub use mock_registry::MockTagRegistry;
pub use mock_vcs::MockVersionControl;
