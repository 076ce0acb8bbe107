//! Git configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How working copies are fetched and pushed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Directory that holds the working copies.
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
    /// Git executable (default: "git")
    #[serde(default = "default_git_path")]
    pub git_path: String,
    /// Credential helper exported as `GIT_ASKPASS`.
    #[serde(default)]
    pub askpass_helper: Option<PathBuf>,
}

fn default_workdir() -> PathBuf {
    std::env::temp_dir().join("image-cascade")
}

fn default_git_path() -> String {
    "git".to_string()
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            git_path: default_git_path(),
            askpass_helper: None,
        }
    }
}
