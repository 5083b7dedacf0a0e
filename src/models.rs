//! Core data types for cmrel.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::StageError;
use crate::release::BuildType;

/// Validated inputs for one staging run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRequest {
    /// GitHub org to fetch sources from
    pub org: String,
    /// GitHub repo to fetch sources from
    pub repo: String,
    /// Branch to build from; its HEAD is looked up when `git_ref` is unset
    pub branch: String,
    /// Explicit commit to stage
    pub git_ref: Option<String>,
    /// Build template path
    pub cloudbuild_file: PathBuf,
    /// GCS bucket to stage to
    pub bucket: String,
    /// GCP project the build runs in
    pub project: String,
    /// Overrides the version baked into the build and selects the release path
    pub release_version: Option<String>,
    /// Docker repository set when building the release
    pub published_image_repo: String,
    /// Full KMS key version name, empty when signing is skipped
    pub signing_kms_key: String,
    pub skip_signing: bool,
    /// `*` or comma-separated OS list
    pub target_oses: String,
    /// `*` or comma-separated architecture list
    pub target_arches: String,
}

impl StageRequest {
    /// Signing is skipped when asked for explicitly or when no key is configured.
    pub fn signing_skipped(&self) -> bool {
        self.skip_signing || self.signing_kms_key.trim().is_empty()
    }

    pub fn build_type(&self) -> BuildType {
        BuildType::from_release_version(self.release_version.as_deref())
    }

    /// Clone URL of the source repository
    pub fn source_repo_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.org, self.repo)
    }

    /// Check the required fields are present.
    pub fn validate(&self) -> Result<(), StageError> {
        let required = [
            ("--org", &self.org),
            ("--repo", &self.repo),
            ("--branch", &self.branch),
            ("--bucket", &self.bucket),
            ("--project", &self.project),
        ];
        for (flag, value) in required {
            if value.trim().is_empty() {
                return Err(StageError::InvalidRequest(format!("{} must not be empty", flag)));
            }
        }

        if matches!(&self.git_ref, Some(r) if r.trim().is_empty()) {
            return Err(StageError::InvalidRequest(
                "--git-ref must not be empty when given".to_string(),
            ));
        }

        Ok(())
    }

    /// Write every effective option to the log.
    pub fn log_summary(&self) {
        log::info!("Stage options:");
        log::info!("  Bucket: {:?}", self.bucket);
        log::info!("  Org: {:?}", self.org);
        log::info!("  Repo: {:?}", self.repo);
        log::info!("  Branch: {:?}", self.branch);
        log::info!("  GitRef: {:?}", self.git_ref.as_deref().unwrap_or_default());
        log::info!("  CloudBuildFile: {:?}", self.cloudbuild_file.display().to_string());
        log::info!("  SkipSigning: {}", self.signing_skipped());
        log::info!("  Project: {:?}", self.project);
        log::info!("  SigningKMSKey: {:?}", self.signing_kms_key);
        log::info!("  ReleaseVersion: {:?}", self.release_version.as_deref().unwrap_or_default());
        log::info!("  PublishedImageRepo: {:?}", self.published_image_repo);
        log::info!("  TargetOSes: {:?}", self.target_oses);
        log::info!("  TargetArches: {:?}", self.target_arches);
    }
}

/// What a successful staging run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    /// Commit that was built
    pub git_ref: String,
    pub build_type: BuildType,
    /// Remote build id
    pub build_id: String,
    pub log_url: String,
    pub logs_bucket: String,
    /// Object path inside the bucket
    pub output_path: String,
    /// `gs://` location of the staged artifacts
    pub artifact_location: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> StageRequest {
        StageRequest {
            org: "jetstack".to_string(),
            repo: "cert-manager".to_string(),
            branch: "master".to_string(),
            git_ref: None,
            cloudbuild_file: PathBuf::from("gcb/stage/cloudbuild.json"),
            bucket: "cert-manager-release".to_string(),
            project: "cert-manager-release".to_string(),
            release_version: None,
            published_image_repo: "quay.io/jetstack".to_string(),
            signing_kms_key: String::new(),
            skip_signing: false,
            target_oses: "*".to_string(),
            target_arches: "*".to_string(),
        }
    }

    #[test]
    fn test_signing_skipped() {
        let mut req = request();
        assert!(req.signing_skipped());

        req.signing_kms_key = "projects/p/locations/l/keyRings/r/cryptoKeys/k/cryptoKeyVersions/1".to_string();
        assert!(!req.signing_skipped());

        req.skip_signing = true;
        assert!(req.signing_skipped());
    }

    #[test]
    fn test_build_type_follows_release_version() {
        let mut req = request();
        assert_eq!(req.build_type(), BuildType::Devel);
        req.release_version = Some("v0.14.0".to_string());
        assert_eq!(req.build_type(), BuildType::Release);
    }

    #[test]
    fn test_validate_requires_branch() {
        let mut req = request();
        assert!(req.validate().is_ok());
        req.branch = String::new();
        assert!(matches!(req.validate(), Err(StageError::InvalidRequest(_))));
    }

    #[test]
    fn test_validate_rejects_blank_git_ref() {
        let mut req = request();
        req.git_ref = Some("  ".to_string());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_source_repo_url() {
        assert_eq!(request().source_repo_url(), "https://github.com/jetstack/cert-manager.git");
    }
}
