//! Build-wait state machine.
//!
//! Polls one build run at a fixed interval until it reaches `completed`:
//!
//! ```text
//! Starting ──(known status completed)──────────────▶ Completed(result)
//!    │
//!    ▼
//! Polling ──(fetch ok, completed)──────────────────▶ Completed(result)
//!    │  ▲
//!    │  └─(fetch ok, not completed | fetch failed, below bound)
//!    │
//!    └────(consecutive failed fetches reach bound)──▶ Aborted
//! ```
//!
//! The most-recent-build lookup that precedes a pipeline wait shares the
//! same consecutive-failure bound.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::config::WaitConfig;
use super::types::{BuildPipelines, BuildResult, BuildRun, PipelineError};

/// Errors that end a build wait without a build result.
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("Pipeline lookup failed")]
    Pipeline(#[from] PipelineError),

    #[error("No build found for pipeline \"{pipeline}\" in project \"{project}\"")]
    NoRecentBuild { project: String, pipeline: String },

    /// Status polling failed too often in a row. Not a build failure.
    #[error("Unable to fetch status of build {build_id} after {attempts} consecutive attempts")]
    FetchExhausted { build_id: u64, attempts: u32 },
}

/// State of a single wait call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Starting,
    Polling { consecutive_failures: u32 },
    Completed(BuildResult),
    Aborted { attempts: u32 },
}

impl WaitState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WaitState::Completed(_) | WaitState::Aborted { .. })
    }
}

/// Blocks until a build finishes.
pub struct BuildWaiter {
    builds: Arc<dyn BuildPipelines>,
    config: WaitConfig,
}

impl BuildWaiter {
    pub fn new(builds: Arc<dyn BuildPipelines>, config: WaitConfig) -> Self {
        Self { builds, config }
    }

    /// Waits for the most recently queued build of a named pipeline.
    pub async fn wait_for_pipeline(
        &self,
        project: &str,
        pipeline_name: &str,
    ) -> Result<BuildResult, WaitError> {
        info!(project, pipeline = pipeline_name, "Waiting for build to complete");
        let definition = self.builds.require(project, pipeline_name).await?;

        let latest = self
            .most_recent_build(project, definition.id)
            .await
            .ok_or_else(|| WaitError::NoRecentBuild {
                project: project.to_string(),
                pipeline: pipeline_name.to_string(),
            })?;

        self.wait_for_build(project, latest.id, Some(latest)).await
    }

    /// Looks up the newest run, tolerating up to `max_fetch_attempts`
    /// failed lookups in a row.
    async fn most_recent_build(&self, project: &str, pipeline_id: u64) -> Option<BuildRun> {
        let max = self.config.max_fetch_attempts.max(1);
        for attempt in 1..=max {
            if let Some(run) = self.builds.fetch_most_recent_build(project, pipeline_id).await {
                return Some(run);
            }
            warn!(pipeline_id, attempt, max, "Most recent build unavailable");
            if attempt < max {
                tokio::time::sleep(self.config.poll_interval()).await;
            }
        }
        None
    }

    /// Triggers a new build and waits for it.
    ///
    /// The trigger response is not trusted for status; the first poll
    /// always re-fetches.
    pub async fn trigger_and_wait(
        &self,
        project: &str,
        pipeline_name: &str,
    ) -> Result<BuildResult, WaitError> {
        let definition = self.builds.require(project, pipeline_name).await?;
        let run = self.builds.trigger(&definition).await?;
        info!(
            project,
            pipeline = pipeline_name,
            build_id = run.id,
            build_number = %run.build_number,
            "Build queued"
        );

        self.wait_for_build(project, run.id, None).await
    }

    /// Polls `build_id` until it completes and returns its result verbatim.
    ///
    /// `known` is the last status seen by the caller, if any. A completed
    /// `known` status returns immediately without polling.
    pub async fn wait_for_build(
        &self,
        project: &str,
        build_id: u64,
        known: Option<BuildRun>,
    ) -> Result<BuildResult, WaitError> {
        let mut state = WaitState::Starting;

        loop {
            state = match state {
                WaitState::Starting => match known.as_ref() {
                    Some(run) if run.is_completed() => WaitState::Completed(result_of(run)),
                    _ => WaitState::Polling {
                        consecutive_failures: 0,
                    },
                },
                WaitState::Polling {
                    consecutive_failures,
                } => self.poll_once(project, build_id, consecutive_failures).await,
                WaitState::Completed(result) => {
                    info!(build_id, result = %result, "Build finished");
                    return Ok(result);
                }
                WaitState::Aborted { attempts } => {
                    warn!(build_id, attempts, "Giving up on build status");
                    return Err(WaitError::FetchExhausted { build_id, attempts });
                }
            };
        }
    }

    async fn poll_once(&self, project: &str, build_id: u64, consecutive_failures: u32) -> WaitState {
        tokio::time::sleep(self.config.poll_interval()).await;

        match self.builds.fetch_build_status(project, build_id).await {
            Some(run) if run.is_completed() => WaitState::Completed(result_of(&run)),
            Some(run) => {
                debug!(build_id, status = %run.status, "Build still running");
                WaitState::Polling {
                    consecutive_failures: 0,
                }
            }
            None => {
                let failures = consecutive_failures + 1;
                warn!(
                    build_id,
                    failures,
                    max = self.config.max_fetch_attempts,
                    "Build status unavailable"
                );
                if failures >= self.config.max_fetch_attempts {
                    WaitState::Aborted { attempts: failures }
                } else {
                    WaitState::Polling {
                        consecutive_failures: failures,
                    }
                }
            }
        }
    }
}

/// A completed run without a result is reported as `none`.
fn result_of(run: &BuildRun) -> BuildResult {
    run.result.unwrap_or(BuildResult::NoResult)
}
