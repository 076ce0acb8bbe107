//! Reads facts out of a checked-out repository.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::{debug, warn};

use super::config::RepoFilesConfig;
use super::types::DetectorError;

static VERSION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[vV]ersion.*:\s*(["'])?([^"']*)(["'])?"#).expect("version pattern is valid")
});

static FROM_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[fF][rR][oO][mM]\s+(.*)$").expect("FROM pattern is valid"));

/// Returns the pinned version of the first `version: ...` line, or `default`.
pub fn grep_version(content: &str, default: &str) -> String {
    for line in content.lines() {
        if let Some(caps) = VERSION_LINE.captures(line) {
            let value = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            return value.trim_end().to_string();
        }
    }
    default.to_string()
}

/// Reads the version pinned in the repository's pipeline file.
///
/// A missing file or version line yields the configured default.
pub async fn pinned_version(
    repo_path: &Path,
    files: &RepoFilesConfig,
) -> Result<String, DetectorError> {
    let path = repo_path.join(&files.pipeline_file);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => {
            let version = grep_version(&content, &files.default_version);
            debug!(path = %path.display(), version = %version, "Read pinned version");
            Ok(version)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "Pipeline file missing, assuming default version");
            Ok(files.default_version.clone())
        }
        Err(source) => Err(DetectorError::Io { path, source }),
    }
}

/// Returns the image named by the first `FROM` line.
pub fn grep_parent(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        FROM_LINE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    })
}

fn find_dockerfile(root: &Path) -> Option<PathBuf> {
    let mut entries: Vec<_> = std::fs::read_dir(root)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();

    if let Some(file) = entries
        .iter()
        .find(|p| p.is_file() && p.file_name().is_some_and(|n| n == "Dockerfile"))
    {
        return Some(file.clone());
    }

    entries
        .iter()
        .filter(|p| p.is_dir() && p.file_name().is_some_and(|n| n != ".git"))
        .find_map(|dir| find_dockerfile(dir))
}

/// Parent image of the first Dockerfile found below `repo_path`.
pub async fn determine_parent_image(repo_path: &Path) -> Option<String> {
    let root = repo_path.to_path_buf();
    let dockerfile = tokio::task::spawn_blocking(move || find_dockerfile(&root))
        .await
        .ok()
        .flatten()?;

    let content = tokio::fs::read_to_string(&dockerfile).await.ok()?;
    grep_parent(&content)
}
