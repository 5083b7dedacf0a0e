//! Cloud Build REST client.
//!
//! Submits builds with `POST /v1/projects/{project}/builds` (which answers
//! with a long-running operation carrying the build) and fetches them with
//! `GET /v1/projects/{project}/builds/{id}`.

use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::OnceCell;

use super::build::Build;

/// Errors talking to the build service
#[derive(Debug, Error)]
pub enum GcbError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cloud Build API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("operation failed: {0}")]
    Operation(String),

    #[error("response did not contain a build")]
    MissingBuild,

    #[error("failed to obtain access token: {0}")]
    Token(String),
}

/// Remote build orchestration service.
pub trait BuildService: Send + Sync {
    /// Submit a build; returns the job handle in its initial state.
    fn submit<'a>(&'a self, project: &'a str, build: &'a Build)
        -> BoxFuture<'a, Result<Build, GcbError>>;

    /// Fetch the current state of a build.
    fn get<'a>(&'a self, project: &'a str, id: &'a str) -> BoxFuture<'a, Result<Build, GcbError>>;
}

/// Where the OAuth bearer token comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessToken {
    /// A token supplied up front (config or environment)
    Static(String),
    /// Ask the gcloud CLI (`gcloud auth print-access-token`)
    Gcloud,
}

#[derive(Debug, Deserialize)]
struct Operation {
    #[serde(default)]
    metadata: Option<OperationMetadata>,
    #[serde(default)]
    error: Option<OperationStatus>,
}

#[derive(Debug, Deserialize)]
struct OperationMetadata {
    #[serde(default)]
    build: Option<Build>,
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// `BuildService` backed by the Cloud Build v1 REST API.
pub struct CloudBuildClient {
    client: reqwest::Client,
    api_url: String,
    token_source: AccessToken,
    token: OnceCell<String>,
}

impl CloudBuildClient {
    /// Build a client for the given API root (e.g. `https://cloudbuild.googleapis.com`).
    ///
    /// The token is resolved lazily on the first request.
    pub fn new(api_url: impl Into<String>, token_source: AccessToken) -> Self {
        CloudBuildClient {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token_source,
            token: OnceCell::new(),
        }
    }

    fn builds_url(&self, project: &str) -> String {
        format!("{}/v1/projects/{}/builds", self.api_url, project)
    }

    async fn bearer_token(&self) -> Result<&str, GcbError> {
        let token = self
            .token
            .get_or_try_init(|| async {
                match &self.token_source {
                    AccessToken::Static(token) => Ok(token.clone()),
                    AccessToken::Gcloud => gcloud_access_token().await,
                }
            })
            .await?;
        Ok(token.as_str())
    }

    async fn submit_build(&self, project: &str, build: &Build) -> Result<Build, GcbError> {
        let url = self.builds_url(project);
        log::debug!("[GCB] POST {}", url);

        let token = self.bearer_token().await?;
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(build)
            .send()
            .await?;
        let response = check_status(response).await?;

        let operation: Operation = response.json().await?;
        if let Some(err) = operation.error {
            return Err(GcbError::Operation(format!("code {}: {}", err.code, err.message)));
        }

        operation
            .metadata
            .and_then(|m| m.build)
            .ok_or(GcbError::MissingBuild)
    }

    async fn get_build(&self, project: &str, id: &str) -> Result<Build, GcbError> {
        let url = format!("{}/{}", self.builds_url(project), id);
        log::debug!("[GCB] GET {}", url);

        let token = self.bearer_token().await?;
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let response = check_status(response).await?;

        Ok(response.json().await?)
    }
}

impl BuildService for CloudBuildClient {
    fn submit<'a>(
        &'a self,
        project: &'a str,
        build: &'a Build,
    ) -> BoxFuture<'a, Result<Build, GcbError>> {
        self.submit_build(project, build).boxed()
    }

    fn get<'a>(&'a self, project: &'a str, id: &'a str) -> BoxFuture<'a, Result<Build, GcbError>> {
        self.get_build(project, id).boxed()
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GcbError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GcbError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Run `gcloud auth print-access-token` and return its trimmed output.
pub async fn gcloud_access_token() -> Result<String, GcbError> {
    log::debug!("[GCB] Requesting access token from gcloud");
    let output = tokio::process::Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|e| GcbError::Token(format!("failed to run gcloud: {}", e)))?;

    if !output.status.success() {
        return Err(GcbError::Token(format!(
            "gcloud exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(GcbError::Token("gcloud returned an empty token".to_string()));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_url() {
        let client = CloudBuildClient::new(
            "https://cloudbuild.googleapis.com/",
            AccessToken::Static("t".to_string()),
        );
        assert_eq!(
            client.builds_url("cert-manager-release"),
            "https://cloudbuild.googleapis.com/v1/projects/cert-manager-release/builds"
        );
    }

    #[tokio::test]
    async fn test_static_token_is_used_verbatim() {
        let client = CloudBuildClient::new("http://localhost", AccessToken::Static("abc".to_string()));
        assert_eq!(client.bearer_token().await.unwrap(), "abc");
    }
}
