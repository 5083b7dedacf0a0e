//! Unified error type hierarchy for cmrel
//!
//! Collaborator errors (`PlatformError`, `RevisionError`, `SignError`,
//! `TemplateError`, `GcbError`) live next to the code that produces them.
//! `StageError` wraps each of them with the step that failed, and
//! `ConfigError` covers loading the tool configuration.

use std::io;
use thiserror::Error;

use crate::gcb::{BuildStatus, GcbError, TemplateError};
use crate::release::{PlatformError, RevisionError};
use crate::sign::SignError;

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid TOML in config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Broad classes of stage failures.
///
/// Validation failures happen before any external call, dependency failures
/// are errors returned by a collaborator, and `BuildFailed` means the remote
/// build ran to completion but did not succeed. `Internal` marks a broken
/// invariant inside the orchestrator itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Dependency,
    BuildFailed,
    Internal,
}

/// Errors that abort a staging run.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("invalid stage request: {0}")]
    InvalidRequest(String),

    #[error("invalid --target-os list: {0}")]
    InvalidTargetOs(#[source] PlatformError),

    #[error("invalid --target-arch list: {0}")]
    InvalidTargetArch(#[source] PlatformError),

    #[error("error looking up git commit ref: {0}")]
    RevisionLookup(#[source] RevisionError),

    #[error("error validating signing key: {0}")]
    SigningKey(#[source] SignError),

    #[error("error loading build template: {0}")]
    TemplateLoad(#[source] TemplateError),

    #[error("error submitting build to cloud build: {0}")]
    Submit(#[source] GcbError),

    #[error("error waiting for cloud build to complete: {0}")]
    Wait(#[source] GcbError),

    #[error("building release artifacts failed (status {status}), check the log files for more information: {log_url}")]
    BuildFailed { status: BuildStatus, log_url: String },

    #[error("invalid stage phase transition: {0}")]
    Phase(String),
}

impl StageError {
    /// Which class of failure this is.
    pub fn category(&self) -> ErrorCategory {
        match self {
            StageError::InvalidRequest(_)
            | StageError::InvalidTargetOs(_)
            | StageError::InvalidTargetArch(_) => ErrorCategory::Validation,
            StageError::BuildFailed { .. } => ErrorCategory::BuildFailed,
            StageError::RevisionLookup(_)
            | StageError::SigningKey(_)
            | StageError::TemplateLoad(_)
            | StageError::Submit(_)
            | StageError::Wait(_) => ErrorCategory::Dependency,
            StageError::Phase(_) => ErrorCategory::Internal,
        }
    }

    /// Process exit code reported by the binary for this error.
    pub fn exit_code(&self) -> u8 {
        match self.category() {
            ErrorCategory::Dependency => 1,
            ErrorCategory::Validation => 2,
            ErrorCategory::BuildFailed => 3,
            ErrorCategory::Internal => 70,
        }
    }
}

/// Result type for staging operations.
pub type Result<T> = std::result::Result<T, StageError>;
