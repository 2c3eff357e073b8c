//! Typed per-stage results.

use super::state::StageKind;
use crate::catalog::AlgorithmId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of one stage execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// Created but not yet started.
    Pending,
    /// Currently executing.
    Running,
    /// Completed successfully.
    Passed,
    /// Failed; halts this algorithm's pipeline.
    Failed,
    /// Skipped (e.g. publish on a non-release run).
    Skipped,
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// The result of one stage for one algorithm.
///
/// Created at stage start; finalized (consumed) exactly once at stage
/// end and immutable from then on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// The algorithm this stage ran for.
    pub algorithm: AlgorithmId,
    /// The stage.
    pub stage: StageKind,
    /// Current status.
    pub status: StageStatus,
    /// Error detail when failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable error kind when failed (see
    /// [`crate::errors::PipelineError::kind`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Reference to the collaborator's log output or produced artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_ref: Option<String>,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage ended, once finalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl StageResult {
    /// Creates a running stage result at the current instant.
    #[must_use]
    pub fn running(algorithm: AlgorithmId, stage: StageKind) -> Self {
        Self {
            algorithm,
            stage,
            status: StageStatus::Running,
            error: None,
            error_kind: None,
            log_ref: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Finalizes as passed.
    #[must_use]
    pub fn passed(mut self, log_ref: Option<String>) -> Self {
        self.status = StageStatus::Passed;
        self.log_ref = log_ref;
        self.ended_at = Some(Utc::now());
        self
    }

    /// Finalizes as failed with a cause.
    #[must_use]
    pub fn failed(mut self, error: impl Into<String>, log_ref: Option<String>) -> Self {
        self.status = StageStatus::Failed;
        self.error = Some(error.into());
        self.log_ref = log_ref;
        self.ended_at = Some(Utc::now());
        self
    }

    /// Records the machine-readable error kind.
    #[must_use]
    pub fn with_error_kind(mut self, kind: impl Into<String>) -> Self {
        self.error_kind = Some(kind.into());
        self
    }

    /// Finalizes as skipped with a reason recorded in the log reference.
    #[must_use]
    pub fn skipped(mut self, reason: impl Into<String>) -> Self {
        self.status = StageStatus::Skipped;
        self.log_ref = Some(reason.into());
        self.ended_at = Some(Utc::now());
        self
    }

    /// Returns true if the stage passed.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self.status, StageStatus::Passed)
    }

    /// Returns true if the stage failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.status, StageStatus::Failed)
    }

    /// Returns the stage duration in milliseconds, once finalized.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        self.ended_at
            .map(|ended| (ended - self.started_at).num_milliseconds())
    }
}
