//! Mock plugin update check for testing.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::detector::plugins::{PluginUpdate, UpdateCheckRequest, UpdateCheckResponse};
use crate::detector::{DetectorError, PluginUpdateCheck};

use super::CallLog;

/// Mock implementation of the PluginUpdateCheck trait.
///
/// Answers with the configured updates, limited to the plugins that were
/// actually asked about unless [`MockPluginUpdateCheck::answer_unrequested`]
/// was called.
#[derive(Debug)]
pub struct MockPluginUpdateCheck {
    log: CallLog,
    updates: Arc<RwLock<BTreeMap<String, PluginUpdate>>>,
    failure: Arc<RwLock<Option<String>>>,
    checks: Arc<RwLock<usize>>,
    unrequested: Arc<RwLock<bool>>,
}

impl MockPluginUpdateCheck {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            updates: Arc::new(RwLock::new(BTreeMap::new())),
            failure: Arc::new(RwLock::new(None)),
            checks: Arc::new(RwLock::new(0)),
            unrequested: Arc::new(RwLock::new(false)),
        }
    }

    /// Announces a newer version of plugin `key`.
    pub async fn set_update(&self, key: &str, new_version: &str, package: &str) {
        self.updates.write().await.insert(
            key.to_string(),
            PluginUpdate {
                new_version: new_version.to_string(),
                package: package.to_string(),
            },
        );
    }

    /// Also lists configured updates for plugins the request did not name.
    pub async fn answer_unrequested(&self) {
        *self.unrequested.write().await = true;
    }

    /// Makes every following check fail.
    pub async fn fail_with(&self, reason: &str) {
        *self.failure.write().await = Some(reason.to_string());
    }

    /// Number of checks made.
    pub async fn checks(&self) -> usize {
        *self.checks.read().await
    }
}

#[async_trait]
impl PluginUpdateCheck for MockPluginUpdateCheck {
    async fn check(
        &self,
        request: &UpdateCheckRequest,
    ) -> Result<UpdateCheckResponse, DetectorError> {
        *self.checks.write().await += 1;
        self.log
            .record(format!("plugins.check:{}", request.plugins.len()))
            .await;

        if let Some(reason) = self.failure.read().await.clone() {
            return Err(DetectorError::UpdateCheck(reason));
        }

        let updates = self.updates.read().await;
        if *self.unrequested.read().await {
            return Ok(UpdateCheckResponse {
                plugins: updates.clone(),
            });
        }
        let plugins = request
            .plugins
            .keys()
            .filter_map(|key| updates.get(key).map(|u| (key.clone(), u.clone())))
            .collect();

        Ok(UpdateCheckResponse { plugins })
    }
}
