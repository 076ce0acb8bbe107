//! Types for tag registry access and version resolution.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while resolving the target version.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Request to '{url}' failed with status {status}")]
    Registry { url: String, status: u16 },

    #[error("Request to '{url}' failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Invalid tag filter '{0}'")]
    InvalidFilter(String),

    #[error("No tag of '{image}' matches filter '{filter}'")]
    NoMatch { image: String, filter: String },
}

/// A single image tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub id: Option<u64>,
}

/// One page of a tag listing, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagPage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub results: Vec<Tag>,
}

/// A registry that lists the tags of an image.
#[async_trait]
pub trait TagRegistry: Send + Sync {
    /// Fetches the most recent page of tags. Older tags are not visible.
    async fn fetch_tags(&self, image: &str) -> Result<TagPage, ResolveError>;
}
