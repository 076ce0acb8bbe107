//! Git command line backend.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::config::GitConfig;
use super::types::{VcsError, VersionControl};

/// Runs the `git` executable inside the configured workdir.
pub struct GitCli {
    config: GitConfig,
}

impl GitCli {
    pub fn new(config: GitConfig) -> Self {
        Self { config }
    }

    async fn run(&self, dir: &Path, args: &[&str]) -> Result<String, VcsError> {
        let command = format!("git {}", args.join(" "));
        debug!(dir = %dir.display(), command = %command, "Running git");

        let mut cmd = Command::new(&self.config.git_path);
        cmd.args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(helper) = &self.config.askpass_helper {
            cmd.env("GIT_ASKPASS", helper);
        }

        let output = cmd.output().await.map_err(|source| VcsError::Spawn {
            command: command.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !stdout.trim().is_empty() {
            debug!(output = %stdout.trim(), "git output");
        }

        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(stdout)
    }

    async fn ensure_workdir(&self) -> Result<(), VcsError> {
        tokio::fs::create_dir_all(&self.config.workdir)
            .await
            .map_err(|source| VcsError::Io {
                path: self.config.workdir.clone(),
                source,
            })
    }
}

#[async_trait]
impl VersionControl for GitCli {
    fn working_copy_path(&self, name: &str) -> PathBuf {
        self.config.workdir.join(name)
    }

    async fn clone_or_update(&self, url: &str, name: &str) -> Result<PathBuf, VcsError> {
        let target = self.working_copy_path(name);

        if tokio::fs::metadata(target.join(".git"))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            info!(path = %target.display(), "Updating repository");
            self.run(&target, &["pull", "--rebase"]).await?;
        } else {
            info!(url, path = %target.display(), "Cloning repository");
            self.ensure_workdir().await?;
            self.run(&self.config.workdir, &["clone", url, name]).await?;
        }

        Ok(target)
    }

    async fn commit_and_push(&self, repo_path: &Path, message: &str) -> Result<(), VcsError> {
        info!(path = %repo_path.display(), "Committing changes");
        self.run(repo_path, &["add", "--all"]).await?;
        self.run(repo_path, &["commit", "-m", message]).await?;

        info!(path = %repo_path.display(), "Pushing changes");
        self.run(repo_path, &["push"]).await?;
        Ok(())
    }

    async fn cleanup(&self, repo_path: &Path) -> Result<(), VcsError> {
        match tokio::fs::remove_dir_all(repo_path).await {
            Ok(()) => {
                debug!(path = %repo_path.display(), "Removed working copy");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(VcsError::Io {
                path: repo_path.to_path_buf(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git(workdir: &Path, git_path: &str) -> GitCli {
        GitCli::new(GitConfig {
            workdir: workdir.to_path_buf(),
            git_path: git_path.to_string(),
            askpass_helper: None,
        })
    }

    #[test]
    fn test_working_copy_path() {
        let cli = git(Path::new("/work"), "git");
        assert_eq!(cli.working_copy_path("site_img"), PathBuf::from("/work/site_img"));
    }

    #[tokio::test]
    async fn test_cleanup_removes_directory() {
        let dir = TempDir::new().unwrap();
        let copy = dir.path().join("site_img");
        std::fs::create_dir_all(copy.join("init")).unwrap();
        std::fs::write(copy.join("init/plugin-list.json"), "{}").unwrap();

        git(dir.path(), "git").cleanup(&copy).await.unwrap();
        assert!(!copy.exists());
    }

    #[tokio::test]
    async fn test_cleanup_of_missing_directory_is_ok() {
        let dir = TempDir::new().unwrap();
        let result = git(dir.path(), "git").cleanup(&dir.path().join("never-cloned")).await;
        tokio_test::assert_ok!(result);
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let cli = git(dir.path(), "/nonexistent/git-binary");

        let err = cli
            .clone_or_update("https://example.invalid/repo.git", "site_img")
            .await
            .unwrap_err();
        assert!(matches!(err, VcsError::Spawn { .. }));
    }
}
