//! Types for the cascade orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detector::{ChangeSet, DetectorError};
use crate::pipeline::{BuildResult, PipelineError, WaitError};
use crate::resolver::ResolveError;
use crate::vcs::VcsError;

/// Errors that stop a whole run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Without a target version nothing can be compared.
    #[error("no target version: {0}")]
    Resolve(#[from] ResolveError),
}

/// Errors that fail a single repository.
#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("version control error: {0}")]
    Vcs(#[from] VcsError),

    #[error("change detection error: {0}")]
    Detector(#[from] DetectorError),

    #[error("build wait error: {0}")]
    Wait(#[from] WaitError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// The image build finished, but not successfully.
    #[error("build pipeline \"{pipeline}\" failed with result: {result}")]
    BuildFailed {
        pipeline: String,
        result: BuildResult,
    },
}

/// One tracked product image and the pipelines that roll it out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedRepository {
    /// Short identifier, also used to name the working copy.
    pub key: String,
    /// Git URL of the image repository.
    pub image_repo_url: String,
    /// DevOps project owning the pipelines.
    pub project: String,
    /// Build pipeline producing the image.
    pub build_img_pipeline: String,
    /// Release pipeline running database updates.
    pub update_pipeline: String,
    /// Release pipeline rolling the image out.
    pub rollout_pipeline: String,
    /// Container registry the image is pushed to, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acr: Option<String>,
}

impl ManagedRepository {
    /// Name of the working copy directory.
    pub fn working_copy_name(&self) -> String {
        format!("{}_img", self.key)
    }
}

/// How a single repository ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RepositoryOutcome {
    /// Already current; nothing committed, no pipeline touched.
    Unchanged,
    /// Changes pushed, image built, both releases triggered.
    RolledOut { changes: ChangeSet },
    /// Processing stopped with an error.
    Failed { error: String },
}

impl RepositoryOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RepositoryOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryReport {
    pub key: String,
    #[serde(flatten)]
    pub outcome: RepositoryOutcome,
}

/// Result of one orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub target_version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub repositories: Vec<RepositoryReport>,
}

impl RunSummary {
    pub fn failure_count(&self) -> usize {
        self.repositories
            .iter()
            .filter(|r| r.outcome.is_failure())
            .count()
    }

    pub fn rolled_out_count(&self) -> usize {
        self.repositories
            .iter()
            .filter(|r| matches!(r.outcome, RepositoryOutcome::RolledOut { .. }))
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    /// Message for a non-zero exit, `None` when every repository succeeded.
    pub fn failure_message(&self) -> Option<String> {
        match self.failure_count() {
            0 => None,
            n => Some(format!(
                "Unable to process repositories! Encountered {} errors! CHECK LOG!",
                n
            )),
        }
    }
}

/// Renders an error with every cause not already part of its message.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}
