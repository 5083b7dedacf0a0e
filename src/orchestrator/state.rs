//! Stage run state and phase tracking.
//!
//! - `StagePhase`: discrete steps of a staging run
//! - `StageState`: current phase plus everything resolved so far
//!
//! Transitions are strictly forward; any phase may fall to `Failed`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::SystemTime;

use crate::release::BuildType;

/// Phase of a staging run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StagePhase {
    /// Request validation, target matrix, revision lookup, signing key check
    Preparation,

    /// Template loading and substitution
    Configuration,

    /// Build submitted, handle not yet returned
    Submission,

    /// Polling the remote build
    Waiting,

    /// Remote build succeeded
    Completed,

    /// Validation, a collaborator, or the remote build failed
    Failed,
}

impl StagePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            StagePhase::Preparation => "preparation",
            StagePhase::Configuration => "configuration",
            StagePhase::Submission => "submission",
            StagePhase::Waiting => "waiting",
            StagePhase::Completed => "completed",
            StagePhase::Failed => "failed",
        }
    }

    /// Get all valid phase transitions FROM this phase.
    pub fn valid_next_phases(&self) -> Vec<StagePhase> {
        match self {
            StagePhase::Preparation => vec![StagePhase::Configuration, StagePhase::Failed],
            StagePhase::Configuration => vec![StagePhase::Submission, StagePhase::Failed],
            StagePhase::Submission => vec![StagePhase::Waiting, StagePhase::Failed],
            StagePhase::Waiting => vec![StagePhase::Completed, StagePhase::Failed],
            StagePhase::Completed => vec![],
            StagePhase::Failed => vec![],
        }
    }

    pub fn can_transition_to(&self, next: StagePhase) -> bool {
        self.valid_next_phases().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.valid_next_phases().is_empty()
    }
}

/// Snapshot of a staging run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageState {
    pub phase: StagePhase,

    /// Commit being built, once known
    pub git_ref: Option<String>,

    pub build_type: Option<BuildType>,

    pub target_oses: BTreeSet<String>,
    pub target_arches: BTreeSet<String>,

    /// Object path inside the bucket
    pub output_path: Option<String>,

    /// Remote build id, once submitted
    pub build_id: Option<String>,
    pub log_url: Option<String>,

    pub start_time: SystemTime,
    pub last_update_time: SystemTime,

    /// Error message if the run failed
    pub error: Option<String>,
}

impl StageState {
    pub fn new() -> Self {
        let now = SystemTime::now();
        StageState {
            phase: StagePhase::Preparation,
            git_ref: None,
            build_type: None,
            target_oses: BTreeSet::new(),
            target_arches: BTreeSet::new(),
            output_path: None,
            build_id: None,
            log_url: None,
            start_time: now,
            last_update_time: now,
            error: None,
        }
    }

    /// Attempt to transition to the next phase.
    pub fn transition_to(&mut self, next_phase: StagePhase) -> Result<(), String> {
        if !self.phase.can_transition_to(next_phase) {
            return Err(format!(
                "Invalid phase transition: {} -> {}",
                self.phase.as_str(),
                next_phase.as_str()
            ));
        }
        self.phase = next_phase;
        self.last_update_time = SystemTime::now();
        Ok(())
    }

    /// Record an error and mark the run as failed.
    pub fn record_error(&mut self, error: String) {
        self.error = Some(error);
        self.phase = StagePhase::Failed;
        self.last_update_time = SystemTime::now();
    }

    /// Get time elapsed since the run started.
    pub fn elapsed_since_start(&self) -> Result<std::time::Duration, std::time::SystemTimeError> {
        self.start_time.elapsed()
    }
}

impl Default for StageState {
    fn default() -> Self {
        Self::new()
    }
}
