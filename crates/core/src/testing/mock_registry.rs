//! Mock tag registry for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::resolver::{ResolveError, Tag, TagPage, TagRegistry};

use super::CallLog;

/// Mock implementation of the TagRegistry trait.
///
/// Returns the configured tags for any image, or a registry error after
/// [`MockTagRegistry::fail_with_status`].
#[derive(Debug)]
pub struct MockTagRegistry {
    log: CallLog,
    tags: Arc<RwLock<Vec<Tag>>>,
    failure: Arc<RwLock<Option<u16>>>,
}

impl MockTagRegistry {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            tags: Arc::new(RwLock::new(Vec::new())),
            failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Replaces the listed tags. Ids follow list order.
    pub async fn set_tags(&self, names: &[&str]) {
        *self.tags.write().await = names
            .iter()
            .enumerate()
            .map(|(i, name)| Tag {
                name: name.to_string(),
                id: Some(i as u64 + 1),
            })
            .collect();
    }

    /// Makes every following fetch fail with `status`.
    pub async fn fail_with_status(&self, status: u16) {
        *self.failure.write().await = Some(status);
    }

    pub async fn calls(&self) -> Vec<String> {
        self.log.calls_with_prefix("registry.").await
    }
}

#[async_trait]
impl TagRegistry for MockTagRegistry {
    async fn fetch_tags(&self, image: &str) -> Result<TagPage, ResolveError> {
        self.log.record(format!("registry.tags:{}", image)).await;

        if let Some(status) = *self.failure.read().await {
            return Err(ResolveError::Registry {
                url: format!("mock://registry/{}", image),
                status,
            });
        }

        let results = self.tags.read().await.clone();
        Ok(TagPage {
            count: results.len() as u64,
            results,
        })
    }
}
