//! Base image version resolution.
//!
//! Only the newest page of tags is inspected (100 tags on Docker Hub);
//! a matching release older than that is invisible.

mod config;
mod docker_hub;
mod tags;
mod types;
mod version;

pub use config::RegistryConfig;
pub use docker_hub::DockerHubRegistry;
pub use tags::{filter_tags, highest_version, VersionResolver};
pub use types::*;
pub use version::{normalize_tag, Version};
