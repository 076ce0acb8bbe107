//! Types for CI build and release pipeline operations.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to a pipeline registry.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The named pipeline is not registered in the project.
    #[error("{kind} pipeline \"{name}\" not found in project \"{project}\"")]
    NotFound {
        kind: PipelineKind,
        project: String,
        name: String,
    },

    /// The remote side refused to create a new run.
    #[error("Triggering {kind} pipeline \"{name}\" failed: HTTP {status}")]
    Trigger {
        kind: PipelineKind,
        name: String,
        status: u16,
    },

    /// The request never produced a usable HTTP response.
    #[error("Request failed: {0}")]
    Request(String),

    /// The response body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Which pipeline family a definition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Build,
    Release,
}

impl PipelineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Build => "build",
            PipelineKind::Release => "release",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named pipeline resolved to its numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub project: String,
    pub name: String,
    pub id: u64,
}

/// Lifecycle status of a build run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildStatus {
    NotStarted,
    InProgress,
    Cancelling,
    Postponed,
    Completed,
    #[serde(other)]
    Unknown,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::NotStarted => "notStarted",
            BuildStatus::InProgress => "inProgress",
            BuildStatus::Cancelling => "cancelling",
            BuildStatus::Postponed => "postponed",
            BuildStatus::Completed => "completed",
            BuildStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a completed build run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildResult {
    Succeeded,
    PartiallySucceeded,
    Failed,
    Canceled,
    #[serde(rename = "none")]
    NoResult,
    #[serde(other)]
    Unknown,
}

impl BuildResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildResult::Succeeded => "succeeded",
            BuildResult::PartiallySucceeded => "partiallySucceeded",
            BuildResult::Failed => "failed",
            BuildResult::Canceled => "canceled",
            BuildResult::NoResult => "none",
            BuildResult::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution of a build pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRun {
    pub id: u64,
    #[serde(default)]
    pub build_number: String,
    pub status: BuildStatus,
    /// Only meaningful once `status` is `completed`.
    #[serde(default)]
    pub result: Option<BuildResult>,
}

impl BuildRun {
    pub fn is_completed(&self) -> bool {
        self.status == BuildStatus::Completed
    }
}

/// One execution of a release pipeline. Never polled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRun {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
}

/// Validate-and-trigger capability shared by build and release registries.
#[async_trait]
pub trait Pipelines: Send + Sync {
    /// What a successful trigger returns.
    type Run: Send;

    fn kind(&self) -> PipelineKind;

    /// Looks up a pipeline definition by name.
    ///
    /// Returns `Ok(None)` when the registry answers but knows no such pipeline.
    async fn validate(
        &self,
        project: &str,
        name: &str,
    ) -> Result<Option<PipelineDefinition>, PipelineError>;

    /// Queues a new run of the given definition.
    async fn trigger(&self, definition: &PipelineDefinition) -> Result<Self::Run, PipelineError>;

    /// Like [`Pipelines::validate`], but a missing definition is an error.
    async fn require(&self, project: &str, name: &str) -> Result<PipelineDefinition, PipelineError> {
        self.validate(project, name)
            .await?
            .ok_or_else(|| PipelineError::NotFound {
                kind: self.kind(),
                project: project.to_string(),
                name: name.to_string(),
            })
    }
}

/// Read access to build run state.
///
/// Both methods swallow transport and status failures into `None`; the
/// caller decides how many of those it tolerates.
#[async_trait]
pub trait BuildStatusSource: Send + Sync {
    async fn fetch_build_status(&self, project: &str, build_id: u64) -> Option<BuildRun>;

    /// The most recently queued build of a pipeline, if any.
    async fn fetch_most_recent_build(&self, project: &str, pipeline_id: u64) -> Option<BuildRun>;
}

/// A build registry: triggers builds and reports their status.
pub trait BuildPipelines: Pipelines<Run = BuildRun> + BuildStatusSource {}

impl<T> BuildPipelines for T where T: Pipelines<Run = BuildRun> + BuildStatusSource {}

/// A release registry: triggers releases, fire-and-forget.
pub trait ReleasePipelines: Pipelines<Run = ReleaseRun> {}

impl<T> ReleasePipelines for T where T: Pipelines<Run = ReleaseRun> {}
