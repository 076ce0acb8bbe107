//! Change detection for managed repositories.
//!
//! Two checks run against a checked-out repository: the pinned base image
//! version and the plugin manifest. Each positive check rewrites its files
//! in place so the caller only has to commit.

mod change;
mod config;
pub mod plugins;
mod repo_details;
mod template;
mod types;
mod update_check;

pub use change::ChangeDetector;
pub use config::{PluginsConfig, RepoFilesConfig};
pub use repo_details::{determine_parent_image, grep_parent, grep_version, pinned_version};
pub use template::TemplateRepoWriter;
pub use types::*;
pub use update_check::WordPressUpdateCheck;
