use std::collections::HashSet;

use regex_lite::Regex;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - At least one repository, with unique keys and no empty fields
/// - Repository keys are plain directory names
/// - Tag filter is a valid regular expression
/// - Remote URLs are http(s)
/// - Access token is present
/// - Polling policy is usable (non-zero interval and attempts)
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Repositories
    if config.repositories.is_empty() {
        return invalid("at least one [[repositories]] entry is required");
    }

    let mut keys = HashSet::new();
    for repo in &config.repositories {
        let fields = [
            ("key", &repo.key),
            ("image_repo_url", &repo.image_repo_url),
            ("project", &repo.project),
            ("build_img_pipeline", &repo.build_img_pipeline),
            ("update_pipeline", &repo.update_pipeline),
            ("rollout_pipeline", &repo.rollout_pipeline),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return invalid(format!(
                "repository \"{}\": {} cannot be empty",
                repo.key, field
            ));
        }
        if !is_plain_name(&repo.key) {
            return invalid(format!(
                "repository key \"{}\" must be a plain name: no path separators or \"..\", no leading '-' or '.'",
                repo.key
            ));
        }
        if !keys.insert(repo.key.as_str()) {
            return invalid(format!("duplicate repository key \"{}\"", repo.key));
        }
    }

    // Registry
    if Regex::new(&config.registry.tag_filter).is_err() {
        return invalid(format!(
            "registry.tag_filter is not a valid regular expression: {}",
            config.registry.tag_filter
        ));
    }
    if config.registry.page_size == 0 {
        return invalid("registry.page_size cannot be 0");
    }

    // Remote endpoints
    let mut urls = vec![
        ("registry.url", &config.registry.url),
        ("devops.organization_url", &config.devops.organization_url),
        ("devops.release_url", &config.devops.release_url),
    ];
    if config.plugins.enabled {
        urls.push(("plugins.update_check_url", &config.plugins.update_check_url));
    }
    for (name, url) in urls {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return invalid(format!("{} must be an http(s) URL, got \"{}\"", name, url));
        }
    }

    if config.devops.token.is_empty() {
        return invalid("devops.token is empty (set DEVOPS_PAT)");
    }

    // Polling
    if config.orchestrator.wait.poll_interval_ms == 0 {
        return invalid("orchestrator.wait.poll_interval_ms cannot be 0");
    }
    if config.orchestrator.wait.max_fetch_attempts == 0 {
        return invalid("orchestrator.wait.max_fetch_attempts cannot be 0");
    }

    Ok(())
}

/// The key names the working copy directory and is passed to git.
fn is_plain_name(key: &str) -> bool {
    !key.contains(['/', '\\'])
        && !key.contains("..")
        && !key.starts_with('-')
        && !key.starts_with('.')
}

fn invalid(message: impl Into<String>) -> Result<(), ConfigError> {
    Err(ConfigError::ValidationError(message.into()))
}
