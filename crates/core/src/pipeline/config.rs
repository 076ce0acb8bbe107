//! Pipeline client and build-wait configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for the Azure DevOps build and release APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevOpsConfig {
    /// Organization URL for the build API (e.g., "https://dev.azure.com/acme/").
    pub organization_url: String,
    /// Organization URL for the release API (e.g., "https://vsrm.dev.azure.com/acme/").
    pub release_url: String,
    /// User name paired with the personal access token.
    #[serde(default)]
    pub user: String,
    /// Personal access token. Usually injected from `DEVOPS_PAT`.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_api_version() -> String {
    "5.1".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Polling policy for build waits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Delay between two status fetches (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Consecutive failed status fetches tolerated before giving up.
    /// There is no wall-clock limit: a build that keeps running is polled forever.
    #[serde(default = "default_max_fetch_attempts")]
    pub max_fetch_attempts: u32,
}

fn default_poll_interval() -> u64 {
    10_000 // 10 seconds
}

fn default_max_fetch_attempts() -> u32 {
    3
}

impl WaitConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_fetch_attempts: default_max_fetch_attempts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_wait_config() {
        let config = WaitConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.max_fetch_attempts, 3);
    }

    #[test]
    fn test_deserialize_devops_minimal() {
        let toml = r#"
            organization_url = "https://dev.azure.com/acme/"
            release_url = "https://vsrm.dev.azure.com/acme/"
        "#;
        let config: DevOpsConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.api_version, "5.1");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.token.is_empty());
    }
}
