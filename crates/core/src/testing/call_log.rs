//! Shared, ordered record of mock calls.

use std::sync::Arc;
use tokio::sync::RwLock;

/// Calls are recorded as `"<collaborator>.<operation>:<argument>"`.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<RwLock<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, call: impl Into<String>) {
        self.calls.write().await.push(call.into());
    }

    /// Every call so far, in order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    /// Calls starting with `prefix`, in order.
    pub async fn calls_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        self.calls.write().await.clear();
    }
}
