//! Command line surface for cmrel.
//!
//! Optional `stage` flags that are left unset fall back to `ReleaseConfig`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ReleaseConfig;
use crate::models::StageRequest;
use crate::release::WILDCARD;

#[derive(Parser, Debug)]
#[command(name = "cmrel")]
#[command(version)]
#[command(about = "cert-manager release tooling")]
pub struct Cli {
    /// Configuration file (.toml or .json); defaults to ~/.config/cmrel/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write the run log to a timestamped file in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stage release tarballs to a GCS release bucket.
    ///
    /// Builds the release artifacts for a commit on Google Cloud Build and
    /// uploads them to the staging bucket.
    Stage(StageArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct StageArgs {
    /// The name of the GCS bucket to stage the release to
    #[arg(long)]
    pub bucket: Option<String>,

    /// Name of the GitHub org to fetch cert-manager sources from
    #[arg(long)]
    pub org: Option<String>,

    /// Name of the GitHub repo to fetch cert-manager sources from
    #[arg(long)]
    pub repo: Option<String>,

    /// The git branch to build the release from
    #[arg(long)]
    pub branch: String,

    /// Optional specific git commit ref; looked up from --branch when unset
    #[arg(long)]
    pub git_ref: Option<String>,

    /// Path to the Cloud Build template (JSON) used for the build
    #[arg(long)]
    pub cloudbuild: Option<PathBuf>,

    /// The Google Cloud project to run the build in
    #[arg(long)]
    pub project: Option<String>,

    /// Overrides the version baked into the build and stages it as a release
    #[arg(long)]
    pub release_version: Option<String>,

    /// Docker image repository set when building the release
    #[arg(long)]
    pub published_image_repo: Option<String>,

    /// Full name of the GCP KMS key used to sign artifacts
    #[arg(long)]
    pub signing_kms_key: Option<String>,

    /// Skip signing release artifacts
    #[arg(long)]
    pub skip_signing: bool,

    /// Comma-separated list of OSes to build for, or '*' for all
    #[arg(long = "target-os", default_value = WILDCARD)]
    pub target_os: String,

    /// Comma-separated list of architectures to build for, or '*' for all
    #[arg(long = "target-arch", default_value = WILDCARD)]
    pub target_arch: String,
}

impl StageArgs {
    /// Merge the flags with configured defaults.
    pub fn into_request(self, config: &ReleaseConfig) -> StageRequest {
        StageRequest {
            org: self.org.unwrap_or_else(|| config.org.clone()),
            repo: self.repo.unwrap_or_else(|| config.repo.clone()),
            branch: self.branch,
            git_ref: self.git_ref.filter(|r| !r.is_empty()),
            cloudbuild_file: self
                .cloudbuild
                .unwrap_or_else(|| PathBuf::from(&config.cloudbuild_file)),
            bucket: self.bucket.unwrap_or_else(|| config.bucket.clone()),
            project: self.project.unwrap_or_else(|| config.project.clone()),
            release_version: self.release_version.filter(|v| !v.is_empty()),
            published_image_repo: self
                .published_image_repo
                .unwrap_or_else(|| config.published_image_repo.clone()),
            signing_kms_key: self
                .signing_kms_key
                .unwrap_or_else(|| config.signing_kms_key.clone()),
            skip_signing: self.skip_signing,
            target_oses: self.target_os,
            target_arches: self.target_arch,
        }
    }
}
