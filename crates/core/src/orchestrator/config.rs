//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::WaitConfig;

/// Configuration for the cascade orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Pause after pushing, before looking for the image build (milliseconds).
    /// Gives the push time to queue the build pipeline.
    #[serde(default = "default_startup_delay")]
    pub startup_delay_ms: u64,

    /// Build polling policy.
    #[serde(default)]
    pub wait: WaitConfig,
}

fn default_startup_delay() -> u64 {
    5000 // 5 seconds
}

impl OrchestratorConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: default_startup_delay(),
            wait: WaitConfig::default(),
        }
    }
}
