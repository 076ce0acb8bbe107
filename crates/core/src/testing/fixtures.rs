//! Canned values for tests.

use crate::orchestrator::ManagedRepository;
use crate::pipeline::{BuildResult, BuildRun, BuildStatus};

/// Pipeline file template with the default placeholder.
pub const PIPELINE_TEMPLATE: &str =
    "trigger:\n  - master\n\nvariables:\n  version: \"{{ image_version }}\"\n";

/// The rendered pipeline file pinning `version`.
pub fn pipeline_file(version: &str) -> String {
    PIPELINE_TEMPLATE.replace("{{ image_version }}", version)
}

/// A plugin manifest with a single pinned plugin.
pub fn plugin_manifest(key: &str, version: &str) -> String {
    format!(
        "{{\n  \"plugins\": [\n    {{\"key\": \"{}\", \"version\": \"{}\"}}\n  ]\n}}\n",
        key, version
    )
}

/// A repository whose pipelines are named `<key>-build`, `<key>-db` and `<key>-rollout`.
pub fn managed_repository(key: &str) -> ManagedRepository {
    ManagedRepository {
        key: key.to_string(),
        image_repo_url: format!("https://git.example.com/images/{}.git", key),
        project: "web".to_string(),
        build_img_pipeline: format!("{}-build", key),
        update_pipeline: format!("{}-db", key),
        rollout_pipeline: format!("{}-rollout", key),
        acr: None,
    }
}

pub fn completed_build(id: u64, result: BuildResult) -> BuildRun {
    BuildRun {
        id,
        build_number: format!("20240105.{}", id),
        status: BuildStatus::Completed,
        result: Some(result),
    }
}

pub fn running_build(id: u64) -> BuildRun {
    BuildRun {
        id,
        build_number: format!("20240105.{}", id),
        status: BuildStatus::InProgress,
        result: None,
    }
}
