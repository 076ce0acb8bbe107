//! Cascade lifecycle integration tests.
//!
//! These tests drive the whole orchestrator over the recording mocks:
//! resolve -> check out -> detect -> commit -> build -> database release -> rollout

use std::sync::Arc;

use cascade_core::{
    detector::{PluginsConfig, RepoFilesConfig},
    pipeline::WaitConfig,
    testing::{
        fixtures, CallLog, MockBuildPipelines, MockPluginUpdateCheck, MockReleasePipelines,
        MockTagRegistry, MockVersionControl,
    },
    BuildResult, CascadeOrchestrator, ChangeDetector, ManagedRepository, OrchestratorConfig,
    RepositoryOutcome, TemplateRepoWriter, VersionResolver,
};

const TAG_FILTER: &str = r"[0-9]+\.[0-9]+\.[0-9]-apache";
const PLUGIN: &str = "akismet/akismet.php";

/// Test helper holding every mock the orchestrator talks to.
struct TestHarness {
    log: CallLog,
    registry: Arc<MockTagRegistry>,
    builds: Arc<MockBuildPipelines>,
    releases: Arc<MockReleasePipelines>,
    vcs: Arc<MockVersionControl>,
    update_check: Arc<MockPluginUpdateCheck>,
}

impl TestHarness {
    async fn new() -> Self {
        let log = CallLog::new();
        let registry = Arc::new(MockTagRegistry::new(log.clone()));
        registry
            .set_tags(&["latest", "5.4.2-apache", "5.5.0-apache", "5.5.0-fpm"])
            .await;

        Self {
            registry,
            builds: Arc::new(MockBuildPipelines::new(log.clone())),
            releases: Arc::new(MockReleasePipelines::new(log.clone())),
            vcs: Arc::new(MockVersionControl::new(log.clone())),
            update_check: Arc::new(MockPluginUpdateCheck::new(log.clone())),
            log,
        }
    }

    fn create_orchestrator(&self, repositories: Vec<ManagedRepository>) -> CascadeOrchestrator {
        let config = OrchestratorConfig {
            startup_delay_ms: 0,
            wait: WaitConfig {
                poll_interval_ms: 1,
                max_fetch_attempts: 3,
            },
        };

        let files = RepoFilesConfig::default();
        let writer = Arc::new(TemplateRepoWriter::new(files.clone()).expect("valid template"));
        let detector = ChangeDetector::new(
            files,
            PluginsConfig::default(),
            writer,
            self.update_check.clone(),
        );

        CascadeOrchestrator::new(
            config,
            repositories,
            VersionResolver::new(self.registry.clone(), "wordpress", TAG_FILTER),
            detector,
            self.vcs.clone(),
            self.builds.clone(),
            self.releases.clone(),
        )
    }

    /// Seeds a working copy pinned to `version` with one plugin at 4.1.5.
    async fn seed_repository(&self, key: &str, version: &str) {
        let name = format!("{}_img", key);
        self.vcs
            .seed_file(&name, "azure-pipelines.yml.template", fixtures::PIPELINE_TEMPLATE)
            .await;
        self.vcs
            .seed_file(&name, "azure-pipelines.yml", &fixtures::pipeline_file(version))
            .await;
        self.vcs
            .seed_file(
                &name,
                "init/plugin-list.json",
                &fixtures::plugin_manifest(PLUGIN, "4.1.5"),
            )
            .await;
    }

    /// Registers the three pipelines of `key`; the build's latest run ends with `result`.
    async fn register_pipelines(&self, key: &str, build_id: u64, result: BuildResult) {
        self.builds
            .add_definition(&format!("{}-build", key), build_id)
            .await;
        self.builds
            .set_most_recent(fixtures::completed_build(build_id * 10, result))
            .await;
        self.releases
            .add_definition(&format!("{}-db", key), build_id + 100)
            .await;
        self.releases
            .add_definition(&format!("{}-rollout", key), build_id + 200)
            .await;
    }

    /// Build and release calls only, in order.
    async fn pipeline_calls(&self) -> Vec<String> {
        self.log
            .calls()
            .await
            .into_iter()
            .filter(|c| c.starts_with("build.") || c.starts_with("release."))
            .collect()
    }
}

fn failure_of(outcome: &RepositoryOutcome) -> &str {
    match outcome {
        RepositoryOutcome::Failed { error } => error,
        other => panic!("expected a failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stale_version_runs_cascade_in_order() {
    let harness = TestHarness::new().await;
    harness.seed_repository("blog", "5.4").await;
    harness
        .register_pipelines("blog", 3, BuildResult::Succeeded)
        .await;
    let orchestrator = harness.create_orchestrator(vec![fixtures::managed_repository("blog")]);

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.target_version, "5.5");
    assert!(summary.is_success());
    assert_eq!(summary.failure_message(), None);
    assert_eq!(
        summary.repositories[0].outcome,
        RepositoryOutcome::RolledOut {
            changes: cascade_core::ChangeSet {
                version_updated: true,
                plugins_updated: false,
            }
        }
    );

    // Commit happens before any pipeline call, cleanup after all of them.
    let calls = harness.log.calls().await;
    assert_eq!(calls.first().map(String::as_str), Some("registry.tags:wordpress"));
    assert_eq!(calls.last().map(String::as_str), Some("vcs.cleanup:blog_img"));
    let commit = calls
        .iter()
        .position(|c| c == "vcs.commit:auto-update image: version=true | plugins=false")
        .expect("commit recorded");
    let first_pipeline_call = calls
        .iter()
        .position(|c| c.starts_with("build."))
        .expect("build call recorded");
    assert!(commit < first_pipeline_call);

    assert_eq!(
        harness.pipeline_calls().await,
        vec![
            "build.validate:blog-build",
            "build.most_recent:3",
            "release.validate:blog-db",
            "release.trigger:blog-db",
            "release.validate:blog-rollout",
            "release.trigger:blog-rollout",
        ]
    );
}

#[tokio::test]
async fn test_running_build_is_polled_until_completed() {
    let harness = TestHarness::new().await;
    harness.seed_repository("blog", "5.4").await;
    harness
        .register_pipelines("blog", 3, BuildResult::Succeeded)
        .await;
    harness.builds.set_most_recent(fixtures::running_build(31)).await;
    harness
        .builds
        .script_statuses(vec![
            Some(fixtures::running_build(31)),
            None,
            Some(fixtures::completed_build(31, BuildResult::Succeeded)),
        ])
        .await;
    let orchestrator = harness.create_orchestrator(vec![fixtures::managed_repository("blog")]);

    let summary = orchestrator.run().await.unwrap();

    assert!(summary.is_success());
    assert_eq!(harness.builds.status_fetches().await, 3);
    assert_eq!(
        harness.releases.triggered().await,
        vec!["blog-db", "blog-rollout"]
    );
}

#[tokio::test]
async fn test_up_to_date_repository_is_skipped() {
    let harness = TestHarness::new().await;
    harness.seed_repository("blog", "5.5").await;
    harness
        .register_pipelines("blog", 3, BuildResult::Succeeded)
        .await;
    let orchestrator = harness.create_orchestrator(vec![fixtures::managed_repository("blog")]);

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.repositories[0].outcome, RepositoryOutcome::Unchanged);
    assert!(harness.vcs.commits().await.is_empty());
    assert!(harness.pipeline_calls().await.is_empty());
    assert_eq!(harness.update_check.checks().await, 1);
    assert_eq!(
        harness.vcs.calls().await,
        vec!["vcs.clone:blog_img", "vcs.cleanup:blog_img"]
    );
}

#[tokio::test]
async fn test_newer_pin_is_not_downgraded() {
    let harness = TestHarness::new().await;
    harness.seed_repository("blog", "6.0").await;
    let orchestrator = harness.create_orchestrator(vec![fixtures::managed_repository("blog")]);

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.repositories[0].outcome, RepositoryOutcome::Unchanged);
    assert!(harness.pipeline_calls().await.is_empty());
}

#[tokio::test]
async fn test_plugin_update_alone_triggers_cascade() {
    let harness = TestHarness::new().await;
    harness.seed_repository("blog", "5.5").await;
    harness
        .register_pipelines("blog", 3, BuildResult::Succeeded)
        .await;
    harness
        .update_check
        .set_update(PLUGIN, "4.1.6", "https://downloads.example.org/akismet.4.1.6.zip")
        .await;
    let orchestrator = harness.create_orchestrator(vec![fixtures::managed_repository("blog")]);

    let summary = orchestrator.run().await.unwrap();

    assert!(summary.is_success());
    assert_eq!(
        harness.vcs.commits().await,
        vec!["auto-update image: version=false | plugins=true"]
    );
    assert_eq!(
        harness.releases.triggered().await,
        vec!["blog-db", "blog-rollout"]
    );
}

#[tokio::test]
async fn test_failures_are_isolated_and_counted() {
    let harness = TestHarness::new().await;

    // "alpha": database release pipeline is missing
    harness.seed_repository("alpha", "5.4").await;
    harness.builds.add_definition("alpha-build", 1).await;
    harness
        .builds
        .set_most_recent(fixtures::completed_build(10, BuildResult::Succeeded))
        .await;
    harness.releases.add_definition("alpha-rollout", 201).await;

    // "beta": everything in place
    harness.seed_repository("beta", "5.4").await;
    harness
        .register_pipelines("beta", 2, BuildResult::Succeeded)
        .await;

    // "gamma": already current
    harness.seed_repository("gamma", "5.5").await;

    let orchestrator = harness.create_orchestrator(vec![
        fixtures::managed_repository("alpha"),
        fixtures::managed_repository("beta"),
        fixtures::managed_repository("gamma"),
    ]);

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.repositories.len(), 3);
    assert_eq!(summary.failure_count(), 1);
    assert_eq!(summary.rolled_out_count(), 1);
    assert!(failure_of(&summary.repositories[0].outcome)
        .contains("release pipeline \"alpha-db\" not found in project \"web\""));
    assert!(matches!(
        summary.repositories[1].outcome,
        RepositoryOutcome::RolledOut { .. }
    ));
    assert_eq!(summary.repositories[2].outcome, RepositoryOutcome::Unchanged);
    assert_eq!(
        summary.failure_message().as_deref(),
        Some("Unable to process repositories! Encountered 1 errors! CHECK LOG!")
    );

    // The rollout of "alpha" is never triggered; "beta" still completes.
    assert_eq!(
        harness.releases.triggered().await,
        vec!["beta-db", "beta-rollout"]
    );

    let cleanups: Vec<String> = harness
        .vcs
        .calls()
        .await
        .into_iter()
        .filter(|c| c.starts_with("vcs.cleanup:"))
        .collect();
    assert_eq!(
        cleanups,
        vec![
            "vcs.cleanup:alpha_img",
            "vcs.cleanup:beta_img",
            "vcs.cleanup:gamma_img",
        ]
    );
}

#[tokio::test]
async fn test_exhausted_status_fetches_fail_only_that_repository() {
    let harness = TestHarness::new().await;
    harness.seed_repository("blog", "5.4").await;
    harness
        .register_pipelines("blog", 3, BuildResult::Succeeded)
        .await;
    harness.builds.set_most_recent(fixtures::running_build(31)).await;
    harness.builds.script_statuses(vec![None, None, None]).await;
    let orchestrator = harness.create_orchestrator(vec![fixtures::managed_repository("blog")]);

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.failure_count(), 1);
    let error = failure_of(&summary.repositories[0].outcome);
    assert!(
        error.contains("Unable to fetch status of build 31 after 3 consecutive attempts"),
        "{}",
        error
    );
    assert_eq!(harness.builds.status_fetches().await, 3);
    assert!(harness.releases.calls().await.is_empty());
}

#[tokio::test]
async fn test_canceled_build_halts_releases() {
    let harness = TestHarness::new().await;
    harness.seed_repository("blog", "5.4").await;
    harness
        .register_pipelines("blog", 3, BuildResult::Canceled)
        .await;
    let orchestrator = harness.create_orchestrator(vec![fixtures::managed_repository("blog")]);

    let summary = orchestrator.run().await.unwrap();

    let error = failure_of(&summary.repositories[0].outcome);
    assert!(error.contains("\"blog-build\" failed with result: canceled"), "{}", error);
    assert!(harness.releases.calls().await.is_empty());
}

#[tokio::test]
async fn test_missing_build_pipeline_fails_repository() {
    let harness = TestHarness::new().await;
    harness.seed_repository("blog", "5.4").await;
    let orchestrator = harness.create_orchestrator(vec![fixtures::managed_repository("blog")]);

    let summary = orchestrator.run().await.unwrap();

    let error = failure_of(&summary.repositories[0].outcome);
    assert!(error.contains("build pipeline \"blog-build\" not found"), "{}", error);
    assert_eq!(
        harness.pipeline_calls().await,
        vec!["build.validate:blog-build"]
    );
}

#[tokio::test]
async fn test_release_trigger_failure_stops_before_rollout() {
    let harness = TestHarness::new().await;
    harness.seed_repository("blog", "5.4").await;
    harness
        .register_pipelines("blog", 3, BuildResult::Succeeded)
        .await;
    harness.releases.fail_trigger(500).await;
    let orchestrator = harness.create_orchestrator(vec![fixtures::managed_repository("blog")]);

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.failure_count(), 1);
    assert_eq!(
        harness.releases.calls().await,
        vec!["release.validate:blog-db"]
    );
}

#[tokio::test]
async fn test_push_failure_skips_pipelines_and_cleans_up() {
    let harness = TestHarness::new().await;
    harness.seed_repository("blog", "5.4").await;
    harness
        .register_pipelines("blog", 3, BuildResult::Succeeded)
        .await;
    harness.vcs.fail_push(true).await;
    let orchestrator = harness.create_orchestrator(vec![fixtures::managed_repository("blog")]);

    let summary = orchestrator.run().await.unwrap();

    let error = failure_of(&summary.repositories[0].outcome);
    assert!(error.starts_with("version control error"), "{}", error);
    assert!(harness.pipeline_calls().await.is_empty());
    assert_eq!(
        harness.vcs.calls().await.last().map(String::as_str),
        Some("vcs.cleanup:blog_img")
    );
}

#[tokio::test]
async fn test_missing_pipeline_file_uses_default_and_updates() {
    let harness = TestHarness::new().await;
    harness
        .vcs
        .seed_file("blog_img", "azure-pipelines.yml.template", fixtures::PIPELINE_TEMPLATE)
        .await;
    harness
        .vcs
        .seed_file(
            "blog_img",
            "init/plugin-list.json",
            &fixtures::plugin_manifest(PLUGIN, "4.1.5"),
        )
        .await;
    harness
        .register_pipelines("blog", 3, BuildResult::Succeeded)
        .await;
    let orchestrator = harness.create_orchestrator(vec![fixtures::managed_repository("blog")]);

    let summary = orchestrator.run().await.unwrap();

    // The default pin "latest" sorts below every release.
    assert!(summary.is_success());
    assert_eq!(summary.rolled_out_count(), 1);
    assert_eq!(harness.builds.status_fetches().await, 0);
}
