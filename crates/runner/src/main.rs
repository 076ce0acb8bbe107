use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{error, info, info_span, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use cascade_core::pipeline::{BuildPipelines, ReleasePipelines};
use cascade_core::{
    load_config, validate_config, AzureBuildPipelines, AzureReleasePipelines, CascadeOrchestrator,
    ChangeDetector, Config, DockerHubRegistry, GitCli, SanitizedConfig, TemplateRepoWriter,
    VersionControl, VersionResolver, WordPressUpdateCheck,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    init_logging();

    let run_id = Uuid::new_v4();
    let span = info_span!("run", run_id = %run_id);

    match run().instrument(span).await {
        Ok(None) => {}
        Ok(Some(message)) => {
            error!("{}", message);
            std::process::exit(1);
        }
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// `CASCADE_LOG_FORMAT=json` switches to JSON lines.
fn init_logging() {
    let json = std::env::var("CASCADE_LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

/// Returns the failure message when any repository failed.
async fn run() -> Result<Option<String>> {
    // Determine config path
    let config_path = std::env::var("CASCADE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!(version = VERSION, "Starting image cascade");
    let config = load_and_validate(&config_path)?;

    let sanitized = SanitizedConfig::from(&config);
    info!(
        config_hash = %config_hash(&sanitized),
        image = %config.registry.image,
        repositories = config.repositories.len(),
        "Configuration loaded from {:?}",
        config_path
    );

    let orchestrator = build_orchestrator(config)?;
    let summary = orchestrator
        .run()
        .await
        .context("Unable to resolve target version")?;

    info!(
        summary = %serde_json::to_string(&summary).unwrap_or_default(),
        "Run summary"
    );
    Ok(summary.failure_message())
}

fn load_and_validate(path: &Path) -> Result<Config> {
    let config =
        load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?;
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

/// Short hash of the redacted configuration, for correlating runs.
fn config_hash(config: &SanitizedConfig) -> String {
    let config_json = serde_json::to_string(config).unwrap_or_default();
    let hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    hash[..16].to_string()
}

fn build_orchestrator(config: Config) -> Result<CascadeOrchestrator> {
    let registry = Arc::new(
        DockerHubRegistry::new(config.registry.clone())
            .context("Failed to create registry client")?,
    );
    let resolver = VersionResolver::new(
        registry,
        config.registry.image.clone(),
        config.registry.tag_filter.clone(),
    );

    let writer = Arc::new(
        TemplateRepoWriter::new(config.repo_files.clone())
            .context("Failed to create template writer")?,
    );
    let update_check = Arc::new(
        WordPressUpdateCheck::new(&config.plugins)
            .context("Failed to create plugin update client")?,
    );
    let detector = ChangeDetector::new(
        config.repo_files.clone(),
        config.plugins.clone(),
        writer,
        update_check,
    );

    let vcs: Arc<dyn VersionControl> = Arc::new(GitCli::new(config.git.clone()));
    let builds: Arc<dyn BuildPipelines> = Arc::new(
        AzureBuildPipelines::new(config.devops.clone())
            .context("Failed to create build pipeline client")?,
    );
    let releases: Arc<dyn ReleasePipelines> = Arc::new(
        AzureReleasePipelines::new(config.devops.clone())
            .context("Failed to create release pipeline client")?,
    );

    Ok(CascadeOrchestrator::new(
        config.orchestrator,
        config.repositories,
        resolver,
        detector,
        vcs,
        builds,
        releases,
    ))
}
