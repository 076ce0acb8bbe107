//! Docker Hub tag registry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::config::RegistryConfig;
use super::types::{ResolveError, TagPage, TagRegistry};

/// Docker Hub v2 tag listing.
pub struct DockerHubRegistry {
    client: Client,
    config: RegistryConfig,
}

impl DockerHubRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self, ResolveError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| ResolveError::Request {
                url: config.url.clone(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    /// Official images live under the `library/` namespace.
    fn tags_url(&self, image: &str) -> String {
        let path = if image.contains('/') {
            image.to_string()
        } else {
            format!("library/{}", image)
        };

        format!(
            "{}/v2/repositories/{}/tags?page_size={}",
            self.config.url.trim_end_matches('/'),
            path,
            self.config.page_size
        )
    }
}

#[async_trait]
impl TagRegistry for DockerHubRegistry {
    async fn fetch_tags(&self, image: &str) -> Result<TagPage, ResolveError> {
        let url = self.tags_url(image);
        debug!(url = %url, "Fetching image tags");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ResolveError::Request {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ResolveError::Registry {
                url,
                status: response.status().as_u16(),
            });
        }

        response.json().await.map_err(|e| ResolveError::Request {
            url,
            reason: format!("Failed to parse response: {}", e),
        })
    }
}
