//! Configuration for release staging.
//!
//! Every default the `stage` command falls back to lives in `ReleaseConfig`
//! rather than in module-level globals, so tests can hand the orchestrator a
//! configuration of their own.
//!
//! # Module Structure
//!
//! - `loader`: reads a `ReleaseConfig` from a JSON or TOML file
//!
//! # Resolution Order
//!
//! 1. `--config <path>` when given
//! 2. `~/.config/cmrel/config.toml` when it exists
//! 3. Built-in defaults

pub mod loader;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a branch name is turned into a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevisionLookup {
    /// GitHub REST API (`/repos/{org}/{repo}/branches/{branch}`)
    GithubApi,
    /// List the remote's references with libgit2
    GitRemote,
}

/// Named defaults and service endpoints for the release tooling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// GCS bucket releases are staged to
    pub bucket: String,
    /// GCP project the Cloud Build jobs run in
    pub project: String,
    /// GitHub org sources are fetched from
    pub org: String,
    /// GitHub repo sources are fetched from
    pub repo: String,
    /// Docker repository built images are published under
    pub published_image_repo: String,
    /// Full Cloud KMS key version name used for signing
    pub signing_kms_key: String,
    /// Build template used for the cross-build
    pub cloudbuild_file: String,
    /// Prefix inside the bucket that staged builds are written below
    pub bucket_path_prefix: String,
    /// Machine type used when the template carries no options
    pub machine_type: String,
    /// Seconds between build status polls
    pub poll_interval_secs: u64,
    pub revision_lookup: RevisionLookup,
    pub github_api_url: String,
    /// Base URL for `git-remote` lookups (`<base>/<org>/<repo>.git`)
    pub git_remote_url: String,
    pub cloud_build_api_url: String,
    /// Static OAuth token for Cloud Build; gcloud is asked when unset
    pub access_token: Option<String>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            bucket: "cert-manager-release".to_string(),
            project: "cert-manager-release".to_string(),
            org: "jetstack".to_string(),
            repo: "cert-manager".to_string(),
            published_image_repo: "quay.io/jetstack".to_string(),
            signing_kms_key: "projects/cert-manager-release/locations/europe-west1/keyRings/cert-manager-release/cryptoKeys/cert-manager-release-signing-key/cryptoKeyVersions/1".to_string(),
            cloudbuild_file: "./gcb/stage/cloudbuild.json".to_string(),
            bucket_path_prefix: "stage/gcb".to_string(),
            machine_type: "N1_HIGHCPU_32".to_string(),
            poll_interval_secs: 10,
            revision_lookup: RevisionLookup::GithubApi,
            github_api_url: "https://api.github.com".to_string(),
            git_remote_url: "https://github.com".to_string(),
            cloud_build_api_url: "https://cloudbuild.googleapis.com".to_string(),
            access_token: None,
        }
    }
}

impl ReleaseConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Reject configurations the stage command cannot run with.
    ///
    /// An empty `signing_kms_key` is allowed: it means signing is skipped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("bucket", &self.bucket),
            ("project", &self.project),
            ("org", &self.org),
            ("repo", &self.repo),
            ("cloudbuild_file", &self.cloudbuild_file),
            ("machine_type", &self.machine_type),
            ("github_api_url", &self.github_api_url),
            ("git_remote_url", &self.git_remote_url),
            ("cloud_build_api_url", &self.cloud_build_api_url),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!("{} must not be empty", name)));
            }
        }

        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
