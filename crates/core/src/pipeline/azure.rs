//! Azure DevOps build and release pipeline clients.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::config::DevOpsConfig;
use super::types::{
    BuildRun, BuildStatusSource, PipelineDefinition, PipelineError, PipelineKind, Pipelines,
    ReleaseRun,
};

const JSON: &str = "application/json";
const RELEASE_DESCRIPTION: &str = "auto-update trigger";

/// `{count, value}` envelope used by every Azure DevOps list endpoint.
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default)]
    count: u64,
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct DefinitionRef {
    id: u64,
    name: String,
}

/// Authenticated HTTP access shared by both clients.
struct DevOpsHttp {
    client: Client,
    config: DevOpsConfig,
}

impl DevOpsHttp {
    fn new(config: DevOpsConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| PipelineError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// `{base}{project}/_apis/{path}?api-version=..`, with `base` ending in a slash.
    fn url(&self, base: &str, project: &str, path: &str) -> String {
        format!(
            "{}/{}/_apis/{}?api-version={}",
            base.trim_end_matches('/'),
            urlencoding::encode(project),
            path,
            self.config.api_version
        )
    }

    async fn get(&self, url: &str) -> Result<Response, PipelineError> {
        self.client
            .get(url)
            .header(ACCEPT, JSON)
            .basic_auth(&self.config.user, Some(&self.config.token))
            .send()
            .await
            .map_err(|e| PipelineError::Request(e.to_string()))
    }

    async fn post(&self, url: &str, body: &serde_json::Value) -> Result<Response, PipelineError> {
        self.client
            .post(url)
            .header(ACCEPT, JSON)
            .header(CONTENT_TYPE, JSON)
            .basic_auth(&self.config.user, Some(&self.config.token))
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| PipelineError::Request(e.to_string()))
    }

    /// Shared definition lookup; first match wins.
    async fn find_definition(
        &self,
        url: &str,
        project: &str,
        name: &str,
    ) -> Result<Option<PipelineDefinition>, PipelineError> {
        let response = self.get(url).await?;
        if !response.status().is_success() {
            warn!(
                project,
                pipeline = name,
                status = response.status().as_u16(),
                "Pipeline definition lookup failed"
            );
            return Ok(None);
        }

        let list: ListResponse<DefinitionRef> = response
            .json()
            .await
            .map_err(|e| PipelineError::InvalidResponse(e.to_string()))?;

        if list.count == 0 {
            return Ok(None);
        }

        Ok(list.value.into_iter().next().map(|d| {
            debug!(project, pipeline = %d.name, id = d.id, "Pipeline definition found");
            PipelineDefinition {
                project: project.to_string(),
                name: d.name,
                id: d.id,
            }
        }))
    }
}

/// Reads a response body for logging, truncated.
async fn body_excerpt(response: Response) -> String {
    response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(200)
        .collect()
}

/// Build pipeline client.
pub struct AzureBuildPipelines {
    http: DevOpsHttp,
}

impl AzureBuildPipelines {
    pub fn new(config: DevOpsConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            http: DevOpsHttp::new(config)?,
        })
    }

    fn build_url(&self, project: &str, path: &str) -> String {
        self.http.url(&self.http.config.organization_url, project, path)
    }

    fn definitions_url(&self, project: &str, name: &str) -> String {
        format!(
            "{}&name={}",
            self.build_url(project, "build/definitions"),
            urlencoding::encode(name)
        )
    }

    fn most_recent_url(&self, project: &str, pipeline_id: u64) -> String {
        format!(
            "{}&definitions={}&$top=1&queryOrder=queueTimeDescending",
            self.build_url(project, "build/builds"),
            pipeline_id
        )
    }
}

#[async_trait]
impl Pipelines for AzureBuildPipelines {
    type Run = BuildRun;

    fn kind(&self) -> PipelineKind {
        PipelineKind::Build
    }

    async fn validate(
        &self,
        project: &str,
        name: &str,
    ) -> Result<Option<PipelineDefinition>, PipelineError> {
        info!(project, pipeline = name, "Validating build pipeline");
        let url = self.definitions_url(project, name);
        self.http.find_definition(&url, project, name).await
    }

    async fn trigger(&self, definition: &PipelineDefinition) -> Result<BuildRun, PipelineError> {
        info!(
            project = %definition.project,
            pipeline = %definition.name,
            "Triggering build pipeline"
        );
        let url = self.build_url(&definition.project, "build/builds");
        let body = json!({ "definition": { "id": definition.id } });

        let response = self.http.post(&url, &body).await?;
        if !response.status().is_success() {
            return Err(PipelineError::Trigger {
                kind: PipelineKind::Build,
                name: definition.name.clone(),
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| PipelineError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl BuildStatusSource for AzureBuildPipelines {
    async fn fetch_build_status(&self, project: &str, build_id: u64) -> Option<BuildRun> {
        debug!(project, build_id, "Fetching build status");
        let url = self.build_url(project, &format!("build/builds/{}", build_id));

        let response = match self.http.get(&url).await {
            Ok(r) => r,
            Err(e) => {
                warn!(build_id, "Unable to fetch build status: {}", e);
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = body_excerpt(response).await;
            warn!(
                build_id,
                status = status.as_u16(),
                body = %body,
                "Unable to fetch build status"
            );
            return None;
        }

        match response.json::<BuildRun>().await {
            Ok(run) => Some(run),
            Err(e) => {
                warn!(build_id, "Unable to decode build status: {}", e);
                None
            }
        }
    }

    async fn fetch_most_recent_build(&self, project: &str, pipeline_id: u64) -> Option<BuildRun> {
        debug!(project, pipeline_id, "Fetching most recent build");
        let url = self.most_recent_url(project, pipeline_id);

        let response = match self.http.get(&url).await {
            Ok(r) => r,
            Err(e) => {
                warn!(pipeline_id, "Unable to fetch most recent build: {}", e);
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = body_excerpt(response).await;
            warn!(
                pipeline_id,
                status = status.as_u16(),
                body = %body,
                "Unable to fetch most recent build"
            );
            return None;
        }

        let list: ListResponse<BuildRun> = match response.json().await {
            Ok(list) => list,
            Err(e) => {
                warn!(pipeline_id, "Unable to decode build list: {}", e);
                return None;
            }
        };

        if list.count == 0 {
            warn!(pipeline_id, "No builds found for pipeline");
            return None;
        }

        list.value.into_iter().next()
    }
}

/// Release pipeline client.
pub struct AzureReleasePipelines {
    http: DevOpsHttp,
}

impl AzureReleasePipelines {
    pub fn new(config: DevOpsConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            http: DevOpsHttp::new(config)?,
        })
    }

    fn release_url(&self, project: &str, path: &str) -> String {
        self.http.url(&self.http.config.release_url, project, path)
    }

    fn definitions_url(&self, project: &str, name: &str) -> String {
        format!(
            "{}&searchText={}",
            self.release_url(project, "release/definitions"),
            urlencoding::encode(name)
        )
    }
}

#[async_trait]
impl Pipelines for AzureReleasePipelines {
    type Run = ReleaseRun;

    fn kind(&self) -> PipelineKind {
        PipelineKind::Release
    }

    async fn validate(
        &self,
        project: &str,
        name: &str,
    ) -> Result<Option<PipelineDefinition>, PipelineError> {
        info!(project, pipeline = name, "Validating release pipeline");
        let url = self.definitions_url(project, name);
        self.http.find_definition(&url, project, name).await
    }

    async fn trigger(&self, definition: &PipelineDefinition) -> Result<ReleaseRun, PipelineError> {
        info!(
            project = %definition.project,
            pipeline = %definition.name,
            "Triggering release pipeline"
        );
        let url = self.release_url(&definition.project, "release/releases");
        let body = json!({
            "definitionId": definition.id,
            "description": RELEASE_DESCRIPTION,
        });

        let response = self.http.post(&url, &body).await?;
        if !response.status().is_success() {
            return Err(PipelineError::Trigger {
                kind: PipelineKind::Release,
                name: definition.name.clone(),
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| PipelineError::InvalidResponse(e.to_string()))
    }
}
