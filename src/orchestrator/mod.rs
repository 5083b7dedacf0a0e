//! Stage orchestration: Preparation -> Configuration -> Submission -> Waiting -> Completed.
//!
//! `StageOrchestrator` drives one staging run from a validated request to a
//! finished remote build. Every external effect goes through a collaborator
//! trait so runs can be exercised with in-memory fakes.

pub mod state;

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

pub use state::{StagePhase, StageState};

use crate::config::ReleaseConfig;
use crate::error::{Result, StageError};
use crate::gcb::{wait_for_build, Build, BuildService, TemplateLoader};
use crate::models::{StageOutcome, StageRequest};
use crate::release::{
    arch_list_from_string, bucket_path_for_release, gcs_url, join_list, os_list_from_string,
    BuildType, PlatformRegistry, RevisionResolver,
};
use crate::sign::SigningKeyValidator;

/// External services a staging run depends on.
#[derive(Clone)]
pub struct StageCollaborators {
    pub revisions: Arc<dyn RevisionResolver>,
    pub signer: Arc<dyn SigningKeyValidator>,
    pub templates: Arc<dyn TemplateLoader>,
    pub platforms: Arc<dyn PlatformRegistry>,
    pub builds: Arc<dyn BuildService>,
}

/// Resolved build target matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMatrix {
    pub oses: BTreeSet<String>,
    pub arches: BTreeSet<String>,
}

/// Runs the `stage` pipeline and tracks its phase.
#[derive(Clone)]
pub struct StageOrchestrator {
    config: ReleaseConfig,
    collaborators: StageCollaborators,

    /// Shared mutable state protected by RwLock so the phase can be read mid-run
    state: Arc<RwLock<StageState>>,
}

impl StageOrchestrator {
    pub fn new(config: ReleaseConfig, collaborators: StageCollaborators) -> Self {
        StageOrchestrator {
            config,
            collaborators,
            state: Arc::new(RwLock::new(StageState::new())),
        }
    }

    pub fn config(&self) -> &ReleaseConfig {
        &self.config
    }

    /// Get the current run phase.
    pub async fn current_phase(&self) -> StagePhase {
        self.state.read().await.phase
    }

    /// Snapshot of everything resolved so far.
    pub async fn state(&self) -> StageState {
        self.state.read().await.clone()
    }

    /// Transition to the next phase.
    ///
    /// # Errors
    /// Returns `StageError::Phase` if the transition is not valid from the current phase
    pub async fn transition_phase(&self, next_phase: StagePhase) -> Result<()> {
        let mut state = self.state.write().await;
        state.transition_to(next_phase).map_err(StageError::Phase)?;
        log::debug!("[Stage] Phase -> {}", next_phase.as_str());
        Ok(())
    }

    /// Record an error and transition to the Failed phase.
    pub async fn record_error(&self, error: String) {
        self.state.write().await.record_error(error);
    }

    /// Stage a release build.
    ///
    /// Request validation and target matrix resolution happen before any
    /// collaborator is called, so a bad flag never triggers remote work.
    ///
    /// # Errors
    /// * Validation errors for bad input or target filters
    /// * Dependency errors wrapping the collaborator step that failed
    /// * `StageError::BuildFailed` when the remote build ends without success
    ///
    /// Each call starts from a fresh `StageState`; runs on one orchestrator
    /// (and its clones) are expected to be sequential.
    pub async fn run(&self, request: StageRequest) -> Result<StageOutcome> {
        *self.state.write().await = StageState::new();

        match self.execute(&request).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.record_error(e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn execute(&self, request: &StageRequest) -> Result<StageOutcome> {
        // Preparation
        request.validate()?;
        let matrix = self.resolve_target_matrix(request)?;
        {
            let mut state = self.state.write().await;
            state.target_oses = matrix.oses.clone();
            state.target_arches = matrix.arches.clone();
        }

        let git_ref = self.resolve_git_ref(request).await?;
        self.state.write().await.git_ref = Some(git_ref.clone());
        log::info!(
            "[Stage] Staging build for {}/{}@{}",
            request.org,
            request.repo,
            git_ref
        );

        if request.signing_skipped() {
            log::info!("[Stage] Signing is disabled, skipping signing key validation");
        } else {
            let key = self
                .collaborators
                .signer
                .validate_key(&request.signing_kms_key)
                .map_err(StageError::SigningKey)?;
            log::debug!("[Stage] Signing key validated: {}", key);
        }

        // Configuration
        self.transition_phase(StagePhase::Configuration).await?;
        log::debug!(
            "[Stage] Loading build template from {}",
            request.cloudbuild_file.display()
        );
        let mut build = self
            .collaborators
            .templates
            .load_template(&request.cloudbuild_file)
            .map_err(StageError::TemplateLoad)?;
        build.default_options(&self.config.machine_type);

        let build_type = request.build_type();
        let output_path = bucket_path_for_release(
            &self.config.bucket_path_prefix,
            build_type,
            request.release_version.as_deref().unwrap_or_default(),
            &git_ref,
        );
        apply_substitutions(&mut build, request, &git_ref, build_type, &output_path, &matrix);
        {
            let mut state = self.state.write().await;
            state.build_type = Some(build_type);
            state.output_path = Some(output_path.clone());
        }

        // Submission
        self.transition_phase(StagePhase::Submission).await?;
        log::info!("[GCB] Submitting build job to project {}...", request.project);
        let submitted = self
            .collaborators
            .builds
            .submit(&request.project, &build)
            .await
            .map_err(StageError::Submit)?;

        let build_id = submitted.id().to_string();
        let artifact_location = gcs_url(&request.bucket, &output_path);
        log::info!("[GCB] Submitted build with name: {:?}", build_id);
        log::info!("[GCB]   View logs at: {}", submitted.log_url());
        log::info!("[GCB]   Log bucket: {}", submitted.logs_bucket());
        log::info!(
            "[GCB]   Once complete, view artifacts at: {}",
            artifact_location
        );
        {
            let mut state = self.state.write().await;
            state.build_id = Some(build_id.clone());
            state.log_url = Some(submitted.log_url().to_string());
        }

        // Waiting
        self.transition_phase(StagePhase::Waiting).await?;
        log::info!("[GCB] Waiting for build to complete, this may take a while...");
        let finished = wait_for_build(
            self.collaborators.builds.as_ref(),
            &request.project,
            &build_id,
            self.config.poll_interval(),
        )
        .await
        .map_err(StageError::Wait)?;

        // The final record carries the authoritative log location
        let log_url = if finished.log_url().is_empty() {
            submitted.log_url().to_string()
        } else {
            finished.log_url().to_string()
        };

        if let Ok(elapsed) = self.state.read().await.elapsed_since_start() {
            log::info!(
                "[Stage] Build {} finished with {} after {}s",
                build_id,
                finished.status(),
                elapsed.as_secs()
            );
        }

        let status = finished.status();
        if !status.is_success() {
            log::error!(
                "[Stage] An error occurred building the release. Check the log files for more information: {}",
                log_url
            );
            return Err(StageError::BuildFailed { status, log_url });
        }

        self.transition_phase(StagePhase::Completed).await?;
        log::info!(
            "[Stage] Release build complete - artifacts available at: {}",
            artifact_location
        );

        let logs_bucket = if finished.logs_bucket().is_empty() {
            submitted.logs_bucket()
        } else {
            finished.logs_bucket()
        };

        Ok(StageOutcome {
            git_ref,
            build_type,
            build_id,
            log_url,
            logs_bucket: logs_bucket.to_string(),
            output_path,
            artifact_location,
        })
    }

    /// Resolve `--target-os` then `--target-arch` against the registry.
    pub fn resolve_target_matrix(&self, request: &StageRequest) -> Result<TargetMatrix> {
        let registry = self.collaborators.platforms.as_ref();
        let oses = os_list_from_string(&request.target_oses, registry)
            .map_err(StageError::InvalidTargetOs)?;
        let arches = arch_list_from_string(&request.target_arches, &oses, registry)
            .map_err(StageError::InvalidTargetArch)?;

        log::debug!(
            "[Stage] Target matrix: oses [{}], arches [{}]",
            join_list(&oses),
            join_list(&arches)
        );
        Ok(TargetMatrix { oses, arches })
    }

    async fn resolve_git_ref(&self, request: &StageRequest) -> Result<String> {
        if let Some(git_ref) = &request.git_ref {
            log::debug!("[Revision] Using explicit git ref {}", git_ref);
            return Ok(git_ref.trim().to_string());
        }

        log::info!(
            "[Revision] git-ref flag not specified, looking up git commit ref for {}/{}@{}",
            request.org,
            request.repo,
            request.branch
        );
        self.collaborators
            .revisions
            .lookup_revision(&request.org, &request.repo, &request.branch)
            .await
            .map_err(StageError::RevisionLookup)
    }
}

/// Insert the staging substitutions, keeping unrelated template entries.
pub fn apply_substitutions(
    build: &mut Build,
    request: &StageRequest,
    git_ref: &str,
    build_type: BuildType,
    output_path: &str,
    matrix: &TargetMatrix,
) {
    let entries = [
        ("_CM_REPO", request.source_repo_url()),
        ("_CM_REF", git_ref.to_string()),
        (
            "_RELEASE_VERSION",
            request.release_version.clone().unwrap_or_default(),
        ),
        ("_RELEASE_BUCKET", request.bucket.clone()),
        ("_TAG_RELEASE_BRANCH", request.branch.clone()),
        ("_PUBLISHED_IMAGE_REPO", request.published_image_repo.clone()),
        ("_KMS_KEY", request.signing_kms_key.clone()),
        ("_SKIP_SIGNING", request.signing_skipped().to_string()),
        ("_TARGET_OSES", join_list(&matrix.oses)),
        ("_TARGET_ARCHES", join_list(&matrix.arches)),
        ("_BUILD_TYPE", build_type.as_str().to_string()),
        ("_RELEASE_OUTPUT_PATH", output_path.to_string()),
    ];

    for (key, value) in entries {
        build.substitutions.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::SupportedPlatforms;
    use std::path::PathBuf;

    fn request() -> StageRequest {
        StageRequest {
            org: "jetstack".to_string(),
            repo: "cert-manager".to_string(),
            branch: "release-0.14".to_string(),
            git_ref: Some("abc123".to_string()),
            cloudbuild_file: PathBuf::from("cloudbuild.json"),
            bucket: "cert-manager-release".to_string(),
            project: "cert-manager-release".to_string(),
            release_version: Some("v0.14.0".to_string()),
            published_image_repo: "quay.io/jetstack".to_string(),
            signing_kms_key: String::new(),
            skip_signing: false,
            target_oses: "linux".to_string(),
            target_arches: "amd64, arm64".to_string(),
        }
    }

    #[test]
    fn test_apply_substitutions_keeps_template_entries() {
        let mut build = Build::default();
        build
            .substitutions
            .insert("_EXTRA".to_string(), "kept".to_string());
        build
            .substitutions
            .insert("_CM_REF".to_string(), "stale".to_string());

        let matrix = TargetMatrix {
            oses: ["linux".to_string()].into_iter().collect(),
            arches: ["arm64".to_string(), "amd64".to_string()].into_iter().collect(),
        };
        apply_substitutions(
            &mut build,
            &request(),
            "abc123",
            BuildType::Release,
            "stage/gcb/release/v0.14.0-abc123",
            &matrix,
        );

        let subs = &build.substitutions;
        assert_eq!(subs["_EXTRA"], "kept");
        assert_eq!(subs["_CM_REF"], "abc123");
        assert_eq!(subs["_CM_REPO"], "https://github.com/jetstack/cert-manager.git");
        assert_eq!(subs["_RELEASE_VERSION"], "v0.14.0");
        assert_eq!(subs["_TAG_RELEASE_BRANCH"], "release-0.14");
        assert_eq!(subs["_SKIP_SIGNING"], "true");
        assert_eq!(subs["_TARGET_OSES"], "linux");
        assert_eq!(subs["_TARGET_ARCHES"], "amd64,arm64");
        assert_eq!(subs["_BUILD_TYPE"], "release");
        assert_eq!(subs["_RELEASE_OUTPUT_PATH"], "stage/gcb/release/v0.14.0-abc123");
    }

    #[test]
    fn test_target_matrix_sorted() {
        let platforms = SupportedPlatforms::new();
        let oses = os_list_from_string("windows,linux", &platforms).unwrap();
        assert_eq!(join_list(&oses), "linux,windows");
    }
}
