pub mod config;
pub mod detector;
pub mod orchestrator;
pub mod pipeline;
pub mod resolver;
pub mod testing;
pub mod vcs;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use detector::{ChangeDetector, ChangeSet, TemplateRepoWriter, WordPressUpdateCheck};
pub use orchestrator::{
    CascadeOrchestrator, ManagedRepository, OrchestratorConfig, OrchestratorError,
    RepositoryOutcome, RunSummary,
};
pub use pipeline::{
    AzureBuildPipelines, AzureReleasePipelines, BuildResult, BuildWaiter, PipelineError,
    WaitError,
};
pub use resolver::{DockerHubRegistry, VersionResolver};
pub use vcs::{GitCli, VersionControl};
