use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment variable holding the DevOps personal access token.
pub const TOKEN_ENV: &str = "DEVOPS_PAT";

/// Load configuration from file with environment variable overrides.
///
/// `CASCADE_`-prefixed variables override file values, with `__` separating
/// nested keys (`CASCADE_ORCHESTRATOR__STARTUP_DELAY_MS=0`). The access token
/// is read from `DEVOPS_PAT`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("CASCADE_").split("__"))
        .merge(Env::raw().only(&[TOKEN_ENV]).map(|_| "devops.token".into()))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[registry]
image = "wordpress"
tag_filter = "[0-9]+\\.[0-9]+\\.[0-9]-apache"

[devops]
organization_url = "https://dev.azure.com/acme/"
release_url = "https://vsrm.dev.azure.com/acme/"

[[repositories]]
key = "blog"
image_repo_url = "https://git.example.com/blog-img.git"
project = "web"
build_img_pipeline = "blog-build"
update_pipeline = "blog-db"
rollout_pipeline = "blog-rollout"
"#;

    #[test]
    fn test_load_config_from_str_valid() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.registry.image, "wordpress");
        assert_eq!(config.repositories.len(), 1);
        assert_eq!(config.repositories[0].working_copy_name(), "blog_img");
        assert_eq!(config.orchestrator.wait.max_fetch_attempts, 3);
        assert_eq!(config.repo_files.template_variable, "image_version");
        assert!(config.plugins.enabled);
    }

    #[test]
    fn test_load_config_from_str_missing_devops() {
        let toml = r#"
[registry]
image = "wordpress"
tag_filter = "apache"
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            "{}\n[orchestrator]\nstartup_delay_ms = 250\n\n[orchestrator.wait]\npoll_interval_ms = 500\n",
            MINIMAL
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.orchestrator.startup_delay_ms, 250);
        assert_eq!(config.orchestrator.wait.poll_interval_ms, 500);
        assert_eq!(config.devops.api_version, "5.1");
    }

    #[test]
    fn test_example_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config.example.toml");
        let config = load_config(&path).unwrap();
        assert_eq!(config.repositories.len(), 1);
        assert_eq!(config.orchestrator.wait.poll_interval_ms, 10_000);
    }
}
