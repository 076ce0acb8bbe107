use serde::{Deserialize, Serialize};

use crate::detector::{PluginsConfig, RepoFilesConfig};
use crate::orchestrator::{ManagedRepository, OrchestratorConfig};
use crate::pipeline::DevOpsConfig;
use crate::resolver::RegistryConfig;
use crate::vcs::GitConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub registry: RegistryConfig,
    pub devops: DevOpsConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub repo_files: RepoFilesConfig,
    #[serde(default)]
    pub plugins: PluginsConfig,
    #[serde(default)]
    pub git: GitConfig,
    /// Processed in order.
    #[serde(default)]
    pub repositories: Vec<ManagedRepository>,
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub registry: RegistryConfig,
    pub devops: SanitizedDevOpsConfig,
    pub orchestrator: OrchestratorConfig,
    pub repo_files: RepoFilesConfig,
    pub plugins: PluginsConfig,
    pub git: GitConfig,
    pub repositories: Vec<ManagedRepository>,
}

/// Sanitized DevOps config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDevOpsConfig {
    pub organization_url: String,
    pub release_url: String,
    pub user: String,
    pub token_configured: bool,
    pub api_version: String,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            registry: config.registry.clone(),
            devops: SanitizedDevOpsConfig {
                organization_url: config.devops.organization_url.clone(),
                release_url: config.devops.release_url.clone(),
                user: config.devops.user.clone(),
                token_configured: !config.devops.token.is_empty(),
                api_version: config.devops.api_version.clone(),
                timeout_secs: config.devops.timeout_secs,
            },
            orchestrator: config.orchestrator.clone(),
            repo_files: config.repo_files.clone(),
            plugins: config.plugins.clone(),
            git: config.git.clone(),
            repositories: config.repositories.clone(),
        }
    }
}
