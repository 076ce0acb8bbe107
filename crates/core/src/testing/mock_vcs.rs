//! Mock version control for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::vcs::{VcsError, VersionControl};

use super::CallLog;

static NEXT_BASE: AtomicU64 = AtomicU64::new(0);

/// Mock implementation of the VersionControl trait.
///
/// "Cloning" creates a real directory under a private temporary base and
/// writes the files seeded for that working copy, so the change detector
/// can work on it unchanged. The base directory is removed on drop.
#[derive(Debug)]
pub struct MockVersionControl {
    log: CallLog,
    base: PathBuf,
    seeded: Arc<RwLock<HashMap<String, Vec<(String, String)>>>>,
    fail_clone: Arc<RwLock<bool>>,
    fail_push: Arc<RwLock<bool>>,
    commits: Arc<RwLock<Vec<String>>>,
}

impl MockVersionControl {
    pub fn new(log: CallLog) -> Self {
        let base = std::env::temp_dir().join(format!(
            "cascade-mock-vcs-{}-{}",
            std::process::id(),
            NEXT_BASE.fetch_add(1, Ordering::SeqCst)
        ));
        Self {
            log,
            base,
            seeded: Arc::new(RwLock::new(HashMap::new())),
            fail_clone: Arc::new(RwLock::new(false)),
            fail_push: Arc::new(RwLock::new(false)),
            commits: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Adds a file that every clone of working copy `name` will contain.
    pub async fn seed_file(&self, name: &str, relative_path: &str, content: &str) {
        self.seeded
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .push((relative_path.to_string(), content.to_string()));
    }

    pub async fn fail_clone(&self, fail: bool) {
        *self.fail_clone.write().await = fail;
    }

    pub async fn fail_push(&self, fail: bool) {
        *self.fail_push.write().await = fail;
    }

    /// Commit messages pushed so far.
    pub async fn commits(&self) -> Vec<String> {
        self.commits.read().await.clone()
    }

    pub async fn calls(&self) -> Vec<String> {
        self.log.calls_with_prefix("vcs.").await
    }

    fn name_of(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl Drop for MockVersionControl {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.base);
    }
}

fn io_error(path: &Path, source: std::io::Error) -> VcsError {
    VcsError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl VersionControl for MockVersionControl {
    fn working_copy_path(&self, name: &str) -> PathBuf {
        self.base.join(name)
    }

    async fn clone_or_update(&self, url: &str, name: &str) -> Result<PathBuf, VcsError> {
        self.log.record(format!("vcs.clone:{}", name)).await;

        if *self.fail_clone.read().await {
            return Err(VcsError::CommandFailed {
                command: format!("git clone {} {}", url, name),
                stderr: "fatal: repository not found".to_string(),
            });
        }

        let path = self.working_copy_path(name);
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| io_error(&path, e))?;

        let seeded = self.seeded.read().await;
        for (relative, content) in seeded.get(name).into_iter().flatten() {
            let file = path.join(relative);
            if let Some(parent) = file.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| io_error(parent, e))?;
            }
            tokio::fs::write(&file, content)
                .await
                .map_err(|e| io_error(&file, e))?;
        }

        Ok(path)
    }

    async fn commit_and_push(&self, _repo_path: &Path, message: &str) -> Result<(), VcsError> {
        self.log.record(format!("vcs.commit:{}", message)).await;

        if *self.fail_push.read().await {
            return Err(VcsError::CommandFailed {
                command: "git push".to_string(),
                stderr: "rejected: non-fast-forward".to_string(),
            });
        }

        self.commits.write().await.push(message.to_string());
        Ok(())
    }

    async fn cleanup(&self, repo_path: &Path) -> Result<(), VcsError> {
        self.log
            .record(format!("vcs.cleanup:{}", Self::name_of(repo_path)))
            .await;

        match tokio::fs::remove_dir_all(repo_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(repo_path, e)),
        }
    }
}
