//! WordPress.org plugin update-check client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use tracing::{debug, warn};

use super::config::PluginsConfig;
use super::plugins::{UpdateCheckRequest, UpdateCheckResponse};
use super::types::{DetectorError, PluginUpdateCheck};

// The endpoint rejects requests without a familiar user agent.
const AGENT: &str = "curl/7.71.1";

/// Posts the installed plugin versions and returns the outdated ones.
pub struct WordPressUpdateCheck {
    client: Client,
    url: String,
}

impl WordPressUpdateCheck {
    pub fn new(config: &PluginsConfig) -> Result<Self, DetectorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| {
                DetectorError::UpdateCheck(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            url: config.update_check_url.clone(),
        })
    }

    /// JSON sent as the `plugins` form field.
    pub fn payload(request: &UpdateCheckRequest) -> Result<String, DetectorError> {
        serde_json::to_string(request).map_err(|e| DetectorError::UpdateCheck(e.to_string()))
    }
}

#[async_trait]
impl PluginUpdateCheck for WordPressUpdateCheck {
    async fn check(
        &self,
        request: &UpdateCheckRequest,
    ) -> Result<UpdateCheckResponse, DetectorError> {
        let payload = Self::payload(request)?;
        debug!(url = %self.url, plugins = request.plugins.len(), "Checking plugin updates");

        let response = self
            .client
            .post(&self.url)
            .header(USER_AGENT, AGENT)
            .form(&[("plugins", payload)])
            .send()
            .await
            .map_err(|e| {
                DetectorError::UpdateCheck(format!("Request to '{}' failed: {}", self.url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "Plugin update check rejected");
            return Err(DetectorError::UpdateCheck(format!(
                "Request to '{}' failed! Got status code: {}",
                self.url, status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DetectorError::UpdateCheck(format!("Failed to parse response: {}", e)))
    }
}
