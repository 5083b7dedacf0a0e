//! Bucket layout for staged artifacts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a staged build is a development snapshot or a versioned release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    Devel,
    Release,
}

impl BuildType {
    /// Classify a build from the optional release version override.
    pub fn from_release_version(release_version: Option<&str>) -> Self {
        match release_version {
            Some(v) if !v.is_empty() => BuildType::Release,
            _ => BuildType::Devel,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Devel => "devel",
            BuildType::Release => "release",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object path (inside the staging bucket) that a build's artifacts land in.
///
/// * devel: `<prefix>/devel/<git_ref>`
/// * release: `<prefix>/release/<version>-<git_ref>`
pub fn bucket_path_for_release(
    prefix: &str,
    build_type: BuildType,
    release_version: &str,
    git_ref: &str,
) -> String {
    let leaf = match build_type {
        BuildType::Devel => git_ref.to_string(),
        BuildType::Release => format!("{}-{}", release_version, git_ref),
    };

    [prefix.trim_matches('/'), build_type.as_str(), leaf.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("/")
}

/// `gs://` URL for an object path in a bucket
pub fn gcs_url(bucket: &str, path: &str) -> String {
    format!("gs://{}/{}", bucket, path)
}
