//! Change detection configuration.

use serde::{Deserialize, Serialize};

/// Files inside a managed repository that carry the pinned version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoFilesConfig {
    /// Pipeline file holding the `version: "X.Y"` pin.
    #[serde(default = "default_pipeline_file")]
    pub pipeline_file: String,
    /// Template the pipeline file is rendered from.
    #[serde(default = "default_template_file")]
    pub template_file: String,
    /// Placeholder name substituted in the template (`{{ image_version }}`).
    #[serde(default = "default_template_variable")]
    pub template_variable: String,
    /// Pin assumed when the pipeline file or its version line is missing.
    #[serde(default = "default_version")]
    pub default_version: String,
}

fn default_pipeline_file() -> String {
    "azure-pipelines.yml".to_string()
}

fn default_template_file() -> String {
    "azure-pipelines.yml.template".to_string()
}

fn default_template_variable() -> String {
    "image_version".to_string()
}

fn default_version() -> String {
    "latest".to_string()
}

impl Default for RepoFilesConfig {
    fn default() -> Self {
        Self {
            pipeline_file: default_pipeline_file(),
            template_file: default_template_file(),
            template_variable: default_template_variable(),
            default_version: default_version(),
        }
    }
}

/// Plugin manifest handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// When disabled, plugin checks always report "no update".
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Manifest location relative to the repository root.
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,
    /// Update-check endpoint.
    #[serde(default = "default_update_check_url")]
    pub update_check_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_enabled() -> bool {
    true
}

fn default_manifest_path() -> String {
    "init/plugin-list.json".to_string()
}

fn default_update_check_url() -> String {
    "https://api.wordpress.org/plugins/update-check/1.1/".to_string()
}

fn default_timeout() -> u32 {
    30
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            manifest_path: default_manifest_path(),
            update_check_url: default_update_check_url(),
            timeout_secs: default_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let files = RepoFilesConfig::default();
        assert_eq!(files.pipeline_file, "azure-pipelines.yml");
        assert_eq!(files.template_file, "azure-pipelines.yml.template");
        assert_eq!(files.default_version, "latest");

        let plugins = PluginsConfig::default();
        assert!(plugins.enabled);
        assert_eq!(plugins.manifest_path, "init/plugin-list.json");
    }

    #[test]
    fn test_deserialize_partial_plugins() {
        let toml = r#"
            enabled = false
        "#;
        let config: PluginsConfig = toml::from_str(toml).unwrap();
        assert!(!config.enabled);
        assert_eq!(
            config.update_check_url,
            "https://api.wordpress.org/plugins/update-check/1.1/"
        );
    }
}
