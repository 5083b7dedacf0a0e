//! cmrel: cert-manager release tooling
//!
//! This crate stages release builds: it turns a branch (or an explicit
//! commit) into a Google Cloud Build job that cross-builds, optionally signs
//! and uploads the release artifacts to a staging bucket.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Stage request and outcome types
//! - **config**: Named defaults and service endpoints
//! - **release**: Supported platforms, bucket layout, revision lookup
//! - **sign**: KMS signing key validation
//! - **gcb**: Cloud Build job model, template loading, REST client, polling
//! - **orchestrator**: The `stage` pipeline and its phase tracking
//! - **cli**: Command line definitions
//! - **log_collector**: `log` backend for operator output and run log files

// Core foundational modules
pub mod error;
pub mod models;

// Configuration management
pub mod config;

// Collaborators
pub mod gcb;
pub mod release;
pub mod sign;

// Robust, decoupled logging system
pub mod log_collector;

// Stage pipeline and async state management
pub mod orchestrator;

pub mod cli;

// Re-export the log crate for macro usage
pub use log;

pub use log_collector::{LogCollector, LogLine};

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use config::{ReleaseConfig, RevisionLookup};
pub use error::{ConfigError, ErrorCategory, Result, StageError};
pub use models::{StageOutcome, StageRequest};
pub use orchestrator::{StageCollaborators, StageOrchestrator, StagePhase, StageState};

/// Version of the cmrel crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
