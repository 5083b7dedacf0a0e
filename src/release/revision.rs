//! Branch to commit resolution.
//!
//! Two lookups are provided: the GitHub REST API (default) and a native
//! `git2` listing of the remote's references, which needs no API token.

use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while resolving a branch to a commit
#[derive(Debug, Error)]
pub enum RevisionError {
    #[error("branch {branch:?} not found in {org}/{repo}")]
    BranchNotFound {
        org: String,
        repo: String,
        branch: String,
    },

    #[error("GitHub API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Git2 error: {0}")]
    Git2(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Looks up the commit a branch currently points at.
pub trait RevisionResolver: Send + Sync {
    fn lookup_revision<'a>(
        &'a self,
        org: &'a str,
        repo: &'a str,
        branch: &'a str,
    ) -> BoxFuture<'a, Result<String, RevisionError>>;
}

#[derive(Debug, Deserialize)]
struct BranchResponse {
    commit: BranchCommit,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    sha: String,
}

/// Resolves branches through `GET /repos/{org}/{repo}/branches/{branch}`.
pub struct GitHubRevisionResolver {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubRevisionResolver {
    /// Create a resolver against the given API root (e.g. `https://api.github.com`)
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Self {
        GitHubRevisionResolver {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn fetch_branch_sha(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
    ) -> Result<String, RevisionError> {
        let url = format!("{}/repos/{}/{}/branches/{}", self.api_url, org, repo, branch);
        log::debug!("[Revision] GET {}", url);

        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, concat!("cmrel/", env!("CARGO_PKG_VERSION")))
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RevisionError::BranchNotFound {
                org: org.to_string(),
                repo: repo.to_string(),
                branch: branch.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RevisionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: BranchResponse = response.json().await?;
        log::debug!("[Revision] {}/{}@{} -> {}", org, repo, branch, parsed.commit.sha);
        Ok(parsed.commit.sha)
    }
}

impl RevisionResolver for GitHubRevisionResolver {
    fn lookup_revision<'a>(
        &'a self,
        org: &'a str,
        repo: &'a str,
        branch: &'a str,
    ) -> BoxFuture<'a, Result<String, RevisionError>> {
        self.fetch_branch_sha(org, repo, branch).boxed()
    }
}

/// Resolves branches by listing the remote's references with libgit2.
///
/// The remote URL is `<base_url>/<org>/<repo>.git`.
pub struct GitRemoteResolver {
    base_url: String,
}

impl GitRemoteResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        GitRemoteResolver {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Remote URL for an org/repo pair
    pub fn remote_url(&self, org: &str, repo: &str) -> String {
        format!("{}/{}/{}.git", self.base_url, org, repo)
    }
}

impl RevisionResolver for GitRemoteResolver {
    fn lookup_revision<'a>(
        &'a self,
        org: &'a str,
        repo: &'a str,
        branch: &'a str,
    ) -> BoxFuture<'a, Result<String, RevisionError>> {
        let url = self.remote_url(org, repo);
        let (org, repo, branch) = (org.to_string(), repo.to_string(), branch.to_string());
        async move {
            let joined = tokio::task::spawn_blocking(move || {
                match list_remote_branch(&url, &branch) {
                    Ok(Some(sha)) => Ok(sha),
                    Ok(None) => Err(RevisionError::BranchNotFound { org, repo, branch }),
                    Err(e) => Err(e),
                }
            })
            .await;

            match joined {
                Ok(result) => result,
                Err(e) => Err(RevisionError::Repository(format!("lookup task failed: {}", e))),
            }
        }
        .boxed()
    }
}

/// List a remote's refs and return the commit `refs/heads/<branch>` points at.
///
/// Runs against a throwaway bare repository so nothing is cloned.
pub fn list_remote_branch(url: &str, branch: &str) -> Result<Option<String>, RevisionError> {
    log::debug!("[Revision] Listing remote references for: {}", url);

    let temp_dir = tempfile::tempdir()?;
    let repo = git2::Repository::init_bare(temp_dir.path()).map_err(|e| {
        RevisionError::Repository(format!("Failed to create temporary repository: {}", e))
    })?;

    let mut remote = repo
        .remote_anonymous(url)
        .map_err(|e| RevisionError::Repository(format!("Failed to add remote {}: {}", url, e)))?;

    remote.connect(git2::Direction::Fetch).map_err(|e| {
        RevisionError::Repository(format!("Failed to connect to {}: {}", url, e))
    })?;

    let wanted = format!("refs/heads/{}", branch);
    let sha = remote
        .list()
        .map_err(|e| {
            RevisionError::Repository(format!("Failed to list remote references for {}: {}", url, e))
        })?
        .iter()
        .find(|head| head.name() == wanted)
        .map(|head| head.oid().to_string());

    remote.disconnect()?;
    Ok(sha)
}
