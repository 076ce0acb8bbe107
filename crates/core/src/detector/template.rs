//! Renders the pipeline file from its template.

use std::path::Path;

use async_trait::async_trait;
use regex_lite::{NoExpand, Regex};
use tracing::info;

use super::config::RepoFilesConfig;
use super::types::{DetectorError, RepoWriter};

/// Substitutes `{{ <variable> }}` placeholders in the template file and
/// writes the result over the pipeline file.
pub struct TemplateRepoWriter {
    files: RepoFilesConfig,
    placeholder: Regex,
}

impl TemplateRepoWriter {
    pub fn new(files: RepoFilesConfig) -> Result<Self, DetectorError> {
        let pattern = format!(
            r"\{{\{{\s*{}\s*\}}\}}",
            regex_lite::escape(&files.template_variable)
        );
        let placeholder = Regex::new(&pattern).map_err(|e| DetectorError::Template {
            path: files.template_file.clone().into(),
            reason: e.to_string(),
        })?;

        Ok(Self { files, placeholder })
    }

    /// Renders `template` with `version`. Everything else, including the
    /// trailing newline, is kept as is.
    pub fn render(&self, template: &str, version: &str) -> String {
        self.placeholder
            .replace_all(template, NoExpand(version))
            .into_owned()
    }
}

#[async_trait]
impl RepoWriter for TemplateRepoWriter {
    async fn render_version(&self, repo_path: &Path, version: &str) -> Result<(), DetectorError> {
        let template_path = repo_path.join(&self.files.template_file);
        let template = tokio::fs::read_to_string(&template_path)
            .await
            .map_err(|source| DetectorError::Io {
                path: template_path.clone(),
                source,
            })?;

        if !self.placeholder.is_match(&template) {
            return Err(DetectorError::Template {
                path: template_path,
                reason: format!(
                    "placeholder '{}' not found",
                    self.files.template_variable
                ),
            });
        }

        let output_path = repo_path.join(&self.files.pipeline_file);
        tokio::fs::write(&output_path, self.render(&template, version))
            .await
            .map_err(|source| DetectorError::Io {
                path: output_path.clone(),
                source,
            })?;

        info!(path = %output_path.display(), version, "Rendered pipeline file");
        Ok(())
    }
}
