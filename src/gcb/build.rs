//! Cloud Build job description and template loading.
//!
//! The same `Build` type is used for the template read from disk, the request
//! body sent to the service and the job handle returned by it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a build template
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("build template not found: {0}")]
    NotFound(String),

    #[error("build template must be a .json file, got {0}")]
    UnsupportedFormat(String),

    #[error("invalid JSON in build template: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("IO error reading build template: {0}")]
    Io(#[from] std::io::Error),
}

/// Status values reported by the Cloud Build API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    Pending,
    Queued,
    Working,
    Success,
    Failure,
    InternalError,
    Timeout,
    Cancelled,
    Expired,
    /// Also used for any value this client does not know
    #[serde(other)]
    StatusUnknown,
}

impl BuildStatus {
    /// True once the build can no longer change state.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            BuildStatus::StatusUnknown
                | BuildStatus::Pending
                | BuildStatus::Queued
                | BuildStatus::Working
        )
    }

    pub fn is_success(&self) -> bool {
        *self == BuildStatus::Success
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::StatusUnknown => "STATUS_UNKNOWN",
            BuildStatus::Pending => "PENDING",
            BuildStatus::Queued => "QUEUED",
            BuildStatus::Working => "WORKING",
            BuildStatus::Success => "SUCCESS",
            BuildStatus::Failure => "FAILURE",
            BuildStatus::InternalError => "INTERNAL_ERROR",
            BuildStatus::Timeout => "TIMEOUT",
            BuildStatus::Cancelled => "CANCELLED",
            BuildStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStep {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_env: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wait_for: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    /// Step fields not modelled above (volumes, script, allowFailure, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Execution options (machine sizing and friends).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitution_option: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    /// Option fields not modelled above (pool, requestedVerifyOption, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A Cloud Build job.
///
/// Template fields this type does not model are kept in `extra` and sent
/// back unchanged on submit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<BuildStep>,
    #[serde(default)]
    pub substitutions: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<BuildOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BuildStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_bucket: Option<String>,
    /// Job fields not modelled above (availableSecrets, serviceAccount, queueTtl, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Build {
    /// Status as reported, `STATUS_UNKNOWN` when absent
    pub fn status(&self) -> BuildStatus {
        self.status.unwrap_or(BuildStatus::StatusUnknown)
    }

    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    pub fn log_url(&self) -> &str {
        self.log_url.as_deref().unwrap_or_default()
    }

    pub fn logs_bucket(&self) -> &str {
        self.logs_bucket.as_deref().unwrap_or_default()
    }

    /// Set `options.machineType` only when the template carries no options block.
    pub fn default_options(&mut self, machine_type: &str) {
        if self.options.is_none() {
            self.options = Some(BuildOptions {
                machine_type: Some(machine_type.to_string()),
                ..Default::default()
            });
        }
    }
}

/// Loads the build template a staging run starts from.
pub trait TemplateLoader: Send + Sync {
    fn load_template(&self, path: &Path) -> Result<Build, TemplateError>;
}

/// Reads JSON templates from the local filesystem.
pub struct FileTemplateLoader;

impl TemplateLoader for FileTemplateLoader {
    fn load_template(&self, path: &Path) -> Result<Build, TemplateError> {
        load_build(path)
    }
}

/// Load a build description from a `.json` file.
pub fn load_build(path: &Path) -> Result<Build, TemplateError> {
    match path.extension() {
        Some(ext) if ext == "json" => {}
        _ => return Err(TemplateError::UnsupportedFormat(path.display().to_string())),
    }

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TemplateError::NotFound(path.display().to_string())
        } else {
            TemplateError::Io(e)
        }
    })?;

    Ok(serde_json::from_str(&content)?)
}
