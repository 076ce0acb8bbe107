//! Latest-version resolution over a tag registry.

use std::sync::Arc;

use regex_lite::Regex;
use tracing::{debug, info};

use super::types::{ResolveError, Tag, TagRegistry};
use super::version::{normalize_tag, Version};

/// Keeps the tags whose name matches `filter` anywhere.
pub fn filter_tags<'a>(tags: &'a [Tag], filter: &Regex) -> Vec<&'a Tag> {
    tags.iter().filter(|t| filter.is_match(&t.name)).collect()
}

/// Picks the highest version among `tags`. Ties keep the first seen.
pub fn highest_version<'a>(tags: &[&'a Tag]) -> Option<&'a Tag> {
    let mut best: Option<(&'a Tag, Version)> = None;
    for &tag in tags {
        let version = Version::parse(&tag.name);
        let replace = match &best {
            Some((_, current)) => *current < version,
            None => true,
        };
        if replace {
            best = Some((tag, version));
        }
    }
    best.map(|(tag, _)| tag)
}

/// Resolves the newest version of the base image.
pub struct VersionResolver {
    registry: Arc<dyn TagRegistry>,
    image: String,
    tag_filter: String,
}

impl VersionResolver {
    pub fn new(
        registry: Arc<dyn TagRegistry>,
        image: impl Into<String>,
        tag_filter: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            image: image.into(),
            tag_filter: tag_filter.into(),
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Resolves the configured image and filter.
    pub async fn resolve_target(&self) -> Result<String, ResolveError> {
        self.resolve_latest(&self.image, &self.tag_filter).await
    }

    /// Returns the normalized name of the highest tag of `image` matching
    /// `tag_filter`.
    pub async fn resolve_latest(
        &self,
        image: &str,
        tag_filter: &str,
    ) -> Result<String, ResolveError> {
        let filter =
            Regex::new(tag_filter).map_err(|_| ResolveError::InvalidFilter(tag_filter.to_string()))?;

        let page = self.registry.fetch_tags(image).await?;
        let matching = filter_tags(&page.results, &filter);
        debug!(
            image,
            total = page.results.len(),
            matching = matching.len(),
            "Filtered image tags"
        );

        let winner = highest_version(&matching).ok_or_else(|| ResolveError::NoMatch {
            image: image.to_string(),
            filter: tag_filter.to_string(),
        })?;

        let version = normalize_tag(&winner.name);
        info!(image, tag = %winner.name, version = %version, "Resolved latest version");
        Ok(version)
    }
}
