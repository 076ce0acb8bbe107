//! Decides whether a repository is stale, and rewrites it when it is.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::resolver::Version;

use super::config::{PluginsConfig, RepoFilesConfig};
use super::plugins::{apply_updates, build_request, read_manifest, write_manifest};
use super::repo_details::pinned_version;
use super::types::{ChangeSet, DetectorError, PluginUpdateCheck, RepoWriter};

/// Detection and mutation are coupled: a positive check has already
/// rewritten the affected files when it returns.
pub struct ChangeDetector {
    files: RepoFilesConfig,
    plugins: PluginsConfig,
    writer: Arc<dyn RepoWriter>,
    update_check: Arc<dyn PluginUpdateCheck>,
}

impl ChangeDetector {
    pub fn new(
        files: RepoFilesConfig,
        plugins: PluginsConfig,
        writer: Arc<dyn RepoWriter>,
        update_check: Arc<dyn PluginUpdateCheck>,
    ) -> Self {
        Self {
            files,
            plugins,
            writer,
            update_check,
        }
    }

    /// True when the pinned version is strictly older than `target`.
    /// Renders the new pin before returning true.
    pub async fn needs_version_update(
        &self,
        repo_path: &Path,
        target: &str,
    ) -> Result<bool, DetectorError> {
        let pinned = pinned_version(repo_path, &self.files).await?;
        let outdated = Version::parse(&pinned) < Version::parse(target);
        info!(pinned = %pinned, target, outdated, "Compared image version");

        if outdated {
            self.writer.render_version(repo_path, target).await?;
        }
        Ok(outdated)
    }

    /// True when the update-check service lists any plugin of the manifest.
    /// Patches and writes the manifest before returning true.
    pub async fn needs_plugin_update(&self, repo_path: &Path) -> Result<bool, DetectorError> {
        if !self.plugins.enabled {
            return Ok(false);
        }

        let mut manifest = read_manifest(repo_path, &self.plugins.manifest_path).await?;
        let request = build_request(&manifest);
        let response = self.update_check.check(&request).await?;

        let changed = apply_updates(&mut manifest, &response);
        if changed == 0 {
            info!(
                plugins = manifest.len(),
                listed = response.plugins.len(),
                "Plugins are up to date"
            );
            return Ok(false);
        }

        write_manifest(repo_path, &self.plugins.manifest_path, &manifest).await?;
        info!(
            outdated = response.plugins.len(),
            changed, "Updated plugin manifest"
        );
        Ok(true)
    }

    /// Runs both checks, plugins first.
    pub async fn compare_and_update(
        &self,
        repo_path: &Path,
        target: &str,
    ) -> Result<ChangeSet, DetectorError> {
        let plugins_updated = self.needs_plugin_update(repo_path).await?;
        let version_updated = self.needs_version_update(repo_path, target).await?;

        Ok(ChangeSet {
            version_updated,
            plugins_updated,
        })
    }
}
