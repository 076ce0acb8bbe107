//! Cascade orchestrator implementation.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, info_span, warn, Instrument};

use crate::detector::{determine_parent_image, ChangeDetector, ChangeSet};
use crate::pipeline::{BuildPipelines, BuildResult, BuildWaiter, ReleasePipelines};
use crate::resolver::VersionResolver;
use crate::vcs::VersionControl;

use super::config::OrchestratorConfig;
use super::types::{
    error_chain, CascadeError, ManagedRepository, OrchestratorError, RepositoryOutcome,
    RepositoryReport, RunSummary,
};

/// Drives every managed repository through check, update, build and rollout.
pub struct CascadeOrchestrator {
    config: OrchestratorConfig,
    repositories: Vec<ManagedRepository>,
    resolver: VersionResolver,
    detector: ChangeDetector,
    vcs: Arc<dyn VersionControl>,
    waiter: BuildWaiter,
    releases: Arc<dyn ReleasePipelines>,
}

impl CascadeOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        repositories: Vec<ManagedRepository>,
        resolver: VersionResolver,
        detector: ChangeDetector,
        vcs: Arc<dyn VersionControl>,
        builds: Arc<dyn BuildPipelines>,
        releases: Arc<dyn ReleasePipelines>,
    ) -> Self {
        let waiter = BuildWaiter::new(builds, config.wait.clone());
        Self {
            config,
            repositories,
            resolver,
            detector,
            vcs,
            waiter,
            releases,
        }
    }

    /// Runs one orchestration pass over all repositories.
    ///
    /// Only a failure to resolve the target version is returned as an error;
    /// repository failures are counted in the summary.
    pub async fn run(&self) -> Result<RunSummary, OrchestratorError> {
        let started_at = Utc::now();

        let target = self.resolver.resolve_target().await?;
        info!(
            image = self.resolver.image(),
            target = %target,
            repositories = self.repositories.len(),
            "Resolved target version"
        );

        let mut reports = Vec::with_capacity(self.repositories.len());
        for repo in &self.repositories {
            let outcome = self.process_repository(repo, &target).await;
            reports.push(RepositoryReport {
                key: repo.key.clone(),
                outcome,
            });
        }

        let summary = RunSummary {
            target_version: target,
            started_at,
            finished_at: Utc::now(),
            repositories: reports,
        };

        info!(
            processed = summary.repositories.len(),
            rolled_out = summary.rolled_out_count(),
            failed = summary.failure_count(),
            "Run finished"
        );
        Ok(summary)
    }

    /// Processes one repository. Never fails; errors become the outcome.
    ///
    /// The working copy is removed afterwards on every path.
    pub async fn process_repository(
        &self,
        repo: &ManagedRepository,
        target: &str,
    ) -> RepositoryOutcome {
        let span = info_span!("repository", repository = %repo.key, project = %repo.project);

        async {
            let result = self.process_checked_out(repo, target).await;

            let working_copy = self.vcs.working_copy_path(&repo.working_copy_name());
            if let Err(e) = self.vcs.cleanup(&working_copy).await {
                warn!(
                    path = %working_copy.display(),
                    "Failed to clean up working copy: {}",
                    error_chain(&e)
                );
            }

            match result {
                Ok(changes) if changes.is_empty() => {
                    info!("Repository is up to date");
                    RepositoryOutcome::Unchanged
                }
                Ok(changes) => {
                    info!(
                        version_updated = changes.version_updated,
                        plugins_updated = changes.plugins_updated,
                        "Repository rolled out"
                    );
                    RepositoryOutcome::RolledOut { changes }
                }
                Err(e) => {
                    let rendered = error_chain(&e);
                    error!(error = %rendered, "Failed to process repository");
                    RepositoryOutcome::Failed { error: rendered }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn process_checked_out(
        &self,
        repo: &ManagedRepository,
        target: &str,
    ) -> Result<ChangeSet, CascadeError> {
        let path = self
            .vcs
            .clone_or_update(&repo.image_repo_url, &repo.working_copy_name())
            .await?;

        match determine_parent_image(&path).await {
            Some(parent) => info!(parent = %parent, "Checked out repository"),
            None => info!("Checked out repository without a Dockerfile"),
        }

        let changes = self.detector.compare_and_update(&path, target).await?;
        if changes.is_empty() {
            return Ok(changes);
        }

        self.vcs
            .commit_and_push(&path, &changes.commit_message())
            .await?;
        info!(message = %changes.commit_message(), "Pushed changes");

        self.process_updated_repository(repo).await?;
        Ok(changes)
    }

    /// Build, then database update, then rollout. Each stage only starts
    /// when the previous one succeeded.
    async fn process_updated_repository(
        &self,
        repo: &ManagedRepository,
    ) -> Result<(), CascadeError> {
        tokio::time::sleep(self.config.startup_delay()).await;

        let result = self
            .waiter
            .wait_for_pipeline(&repo.project, &repo.build_img_pipeline)
            .await?;
        if result != BuildResult::Succeeded {
            return Err(CascadeError::BuildFailed {
                pipeline: repo.build_img_pipeline.clone(),
                result,
            });
        }

        self.trigger_release(&repo.project, &repo.update_pipeline)
            .await?;
        self.trigger_release(&repo.project, &repo.rollout_pipeline)
            .await?;
        Ok(())
    }

    async fn trigger_release(&self, project: &str, name: &str) -> Result<(), CascadeError> {
        let definition = self.releases.require(project, name).await?;
        let run = self.releases.trigger(&definition).await?;
        info!(
            pipeline = name,
            release_id = run.id,
            release = %run.name,
            "Release triggered"
        );
        Ok(())
    }
}
