//! Types for version control operations.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while running version control commands.
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Working copy management for managed repositories.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Where the working copy called `name` lives, whether or not it exists yet.
    fn working_copy_path(&self, name: &str) -> PathBuf;

    /// Clones `url` as `name`, or pulls if a working copy is already there.
    async fn clone_or_update(&self, url: &str, name: &str) -> Result<PathBuf, VcsError>;

    /// Stages everything, commits with `message`, and pushes.
    async fn commit_and_push(&self, repo_path: &Path, message: &str) -> Result<(), VcsError>;

    /// Removes the working copy. A missing directory is not an error.
    async fn cleanup(&self, repo_path: &Path) -> Result<(), VcsError>;
}
