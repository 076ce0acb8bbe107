//! Registry and target image configuration.

use serde::{Deserialize, Serialize};

/// Where the base image lives and which of its tags count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry API root (default: "https://hub.docker.com")
    #[serde(default = "default_url")]
    pub url: String,
    /// Base image name (e.g., "wordpress" or "bitnami/wordpress")
    pub image: String,
    /// Regular expression a tag name must match (unanchored)
    pub tag_filter: String,
    /// Tags fetched per request (default: 100, the registry maximum)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_url() -> String {
    "https://hub.docker.com".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_timeout() -> u32 {
    30
}
