//! Types for change detection.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::plugins::{UpdateCheckRequest, UpdateCheckResponse};

/// Errors that can occur while inspecting or rewriting a repository.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template error in {path}: {reason}")]
    Template { path: PathBuf, reason: String },

    #[error("Invalid plugin manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("Plugin update check failed: {0}")]
    UpdateCheck(String),
}

/// What a change check rewrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub version_updated: bool,
    pub plugins_updated: bool,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        !self.version_updated && !self.plugins_updated
    }

    pub fn commit_message(&self) -> String {
        format!(
            "auto-update image: version={} | plugins={}",
            self.version_updated, self.plugins_updated
        )
    }
}

/// Rewrites the version pin of a repository.
#[async_trait]
pub trait RepoWriter: Send + Sync {
    async fn render_version(&self, repo_path: &Path, version: &str) -> Result<(), DetectorError>;
}

/// Asks an external service which plugins have newer versions.
#[async_trait]
pub trait PluginUpdateCheck: Send + Sync {
    async fn check(
        &self,
        request: &UpdateCheckRequest,
    ) -> Result<UpdateCheckResponse, DetectorError>;
}
