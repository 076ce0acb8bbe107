//! Mock build and release pipelines for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::pipeline::{
    BuildRun, BuildStatus, BuildStatusSource, PipelineDefinition, PipelineError, PipelineKind,
    Pipelines, ReleaseRun,
};

use super::CallLog;

/// Named definitions known to a mock registry, plus an optional trigger failure.
#[derive(Debug, Default)]
struct Definitions {
    ids: RwLock<HashMap<String, u64>>,
    trigger_failure: RwLock<Option<u16>>,
}

impl Definitions {
    async fn lookup(&self, project: &str, name: &str) -> Option<PipelineDefinition> {
        self.ids
            .read()
            .await
            .get(name)
            .map(|&id| PipelineDefinition {
                project: project.to_string(),
                name: name.to_string(),
                id,
            })
    }

    async fn check_trigger(
        &self,
        kind: PipelineKind,
        definition: &PipelineDefinition,
    ) -> Result<(), PipelineError> {
        match *self.trigger_failure.read().await {
            Some(status) => Err(PipelineError::Trigger {
                kind,
                name: definition.name.clone(),
                status,
            }),
            None => Ok(()),
        }
    }
}

/// Mock implementation of the build pipeline traits.
///
/// - `validate` finds definitions registered with [`MockBuildPipelines::add_definition`]
/// - `trigger` hands out build ids 1, 2, 3, ...
/// - `fetch_build_status` pops the next scripted status; an exhausted
///   script behaves like a failed fetch
/// - `fetch_most_recent_build` returns the run set with
///   [`MockBuildPipelines::set_most_recent`], after failing as many times
///   as [`MockBuildPipelines::miss_most_recent`] asked for
#[derive(Debug)]
pub struct MockBuildPipelines {
    log: CallLog,
    definitions: Definitions,
    statuses: Arc<RwLock<VecDeque<Option<BuildRun>>>>,
    most_recent: Arc<RwLock<Option<BuildRun>>>,
    most_recent_misses: Arc<RwLock<u32>>,
    status_fetches: Arc<RwLock<usize>>,
    next_build_id: AtomicU64,
}

impl MockBuildPipelines {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            definitions: Definitions::default(),
            statuses: Arc::new(RwLock::new(VecDeque::new())),
            most_recent: Arc::new(RwLock::new(None)),
            most_recent_misses: Arc::new(RwLock::new(0)),
            status_fetches: Arc::new(RwLock::new(0)),
            next_build_id: AtomicU64::new(1),
        }
    }

    pub async fn add_definition(&self, name: &str, id: u64) {
        self.definitions
            .ids
            .write()
            .await
            .insert(name.to_string(), id);
    }

    /// Answers for the following status fetches, in order. `None` is a failed fetch.
    pub async fn script_statuses(&self, statuses: Vec<Option<BuildRun>>) {
        *self.statuses.write().await = statuses.into();
    }

    pub async fn set_most_recent(&self, run: BuildRun) {
        *self.most_recent.write().await = Some(run);
    }

    /// Makes the next `count` most-recent lookups fail.
    pub async fn miss_most_recent(&self, count: u32) {
        *self.most_recent_misses.write().await = count;
    }

    /// Makes every following trigger fail with `status`.
    pub async fn fail_trigger(&self, status: u16) {
        *self.definitions.trigger_failure.write().await = Some(status);
    }

    pub async fn status_fetches(&self) -> usize {
        *self.status_fetches.read().await
    }

    pub async fn calls(&self) -> Vec<String> {
        self.log.calls_with_prefix("build.").await
    }
}

#[async_trait]
impl Pipelines for MockBuildPipelines {
    type Run = BuildRun;

    fn kind(&self) -> PipelineKind {
        PipelineKind::Build
    }

    async fn validate(
        &self,
        project: &str,
        name: &str,
    ) -> Result<Option<PipelineDefinition>, PipelineError> {
        self.log.record(format!("build.validate:{}", name)).await;
        Ok(self.definitions.lookup(project, name).await)
    }

    async fn trigger(&self, definition: &PipelineDefinition) -> Result<BuildRun, PipelineError> {
        self.definitions
            .check_trigger(PipelineKind::Build, definition)
            .await?;
        self.log
            .record(format!("build.trigger:{}", definition.name))
            .await;

        let id = self.next_build_id.fetch_add(1, Ordering::SeqCst);
        Ok(BuildRun {
            id,
            build_number: format!("mock.{}", id),
            status: BuildStatus::NotStarted,
            result: None,
        })
    }
}

#[async_trait]
impl BuildStatusSource for MockBuildPipelines {
    async fn fetch_build_status(&self, _project: &str, build_id: u64) -> Option<BuildRun> {
        self.log.record(format!("build.status:{}", build_id)).await;
        *self.status_fetches.write().await += 1;
        self.statuses.write().await.pop_front().flatten()
    }

    async fn fetch_most_recent_build(&self, _project: &str, pipeline_id: u64) -> Option<BuildRun> {
        self.log
            .record(format!("build.most_recent:{}", pipeline_id))
            .await;
        let mut misses = self.most_recent_misses.write().await;
        if *misses > 0 {
            *misses -= 1;
            return None;
        }
        drop(misses);
        self.most_recent.read().await.clone()
    }
}

/// Mock implementation of the release pipeline traits.
#[derive(Debug)]
pub struct MockReleasePipelines {
    log: CallLog,
    definitions: Definitions,
    next_release_id: AtomicU64,
}

impl MockReleasePipelines {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            definitions: Definitions::default(),
            next_release_id: AtomicU64::new(1),
        }
    }

    pub async fn add_definition(&self, name: &str, id: u64) {
        self.definitions
            .ids
            .write()
            .await
            .insert(name.to_string(), id);
    }

    /// Makes every following trigger fail with `status`.
    pub async fn fail_trigger(&self, status: u16) {
        *self.definitions.trigger_failure.write().await = Some(status);
    }

    pub async fn calls(&self) -> Vec<String> {
        self.log.calls_with_prefix("release.").await
    }

    /// Names of the pipelines triggered successfully, in order.
    pub async fn triggered(&self) -> Vec<String> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| c.strip_prefix("release.trigger:").map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Pipelines for MockReleasePipelines {
    type Run = ReleaseRun;

    fn kind(&self) -> PipelineKind {
        PipelineKind::Release
    }

    async fn validate(
        &self,
        project: &str,
        name: &str,
    ) -> Result<Option<PipelineDefinition>, PipelineError> {
        self.log.record(format!("release.validate:{}", name)).await;
        Ok(self.definitions.lookup(project, name).await)
    }

    async fn trigger(&self, definition: &PipelineDefinition) -> Result<ReleaseRun, PipelineError> {
        self.definitions
            .check_trigger(PipelineKind::Release, definition)
            .await?;
        self.log
            .record(format!("release.trigger:{}", definition.name))
            .await;

        let id = self.next_release_id.fetch_add(1, Ordering::SeqCst);
        Ok(ReleaseRun {
            id,
            name: format!("Release-{}", id),
            status: "active".to_string(),
        })
    }
}
