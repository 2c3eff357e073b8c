//! Per-algorithm staged state machine.
//!
//! Stages run in a fixed order; no stage begins before its predecessor's
//! `Done` substate. Publish is only reachable on release-branch runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed stage sequence of one algorithm's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Test-vector and metadata validation.
    Validation,
    /// Native code generation.
    Codegen,
    /// Native build.
    Build,
    /// Native test execution.
    Test,
    /// Reference-vs-candidate equivalence verification.
    Equivalence,
    /// Commit-driven version derivation (globally serialized).
    Version,
    /// Report and release-notes generation.
    Report,
    /// Package publication (release branches only).
    Publish,
    /// Team notification.
    Notify,
}

impl StageKind {
    /// All stages in execution order.
    pub const ORDER: [Self; 9] = [
        Self::Validation,
        Self::Codegen,
        Self::Build,
        Self::Test,
        Self::Equivalence,
        Self::Version,
        Self::Report,
        Self::Publish,
        Self::Notify,
    ];

    /// Returns the stage name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Codegen => "codegen",
            Self::Build => "build",
            Self::Test => "test",
            Self::Equivalence => "equivalence",
            Self::Version => "version",
            Self::Report => "report",
            Self::Publish => "publish",
            Self::Notify => "notify",
        }
    }

    /// Returns the stage that follows this one, honoring the release
    /// predicate: on non-release runs, Report skips straight to Notify.
    #[must_use]
    pub fn successor(self, release: bool) -> Option<Self> {
        let mut order = Self::ORDER.iter().skip_while(|s| **s != self);
        order.next(); // self
        let mut next = order.next().copied();
        if next == Some(Self::Publish) && !release {
            next = Some(Self::Notify);
        }
        next
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// State of one algorithm's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum PipelineState {
    /// Selected by change detection; no stage started yet.
    Detected,
    /// A stage is executing.
    Pending(StageKind),
    /// A stage finished successfully.
    Done(StageKind),
    /// A stage failed; terminal for this algorithm.
    Failed(StageKind),
    /// The run was cancelled; terminal, publish and notify skipped.
    Cancelled,
}

impl PipelineState {
    /// Returns the next stage to start from this state, or `None` when
    /// the pipeline is terminal or mid-stage.
    #[must_use]
    pub fn next_stage(self, release: bool) -> Option<StageKind> {
        match self {
            Self::Detected => Some(StageKind::Validation),
            Self::Done(stage) => stage.successor(release),
            Self::Pending(_) | Self::Failed(_) | Self::Cancelled => None,
        }
    }

    /// Returns true for terminal states.
    #[must_use]
    pub fn is_terminal(self, release: bool) -> bool {
        match self {
            Self::Failed(_) | Self::Cancelled => true,
            Self::Done(stage) => stage.successor(release).is_none(),
            Self::Detected | Self::Pending(_) => false,
        }
    }

    /// Returns true if the pipeline completed all its stages.
    #[must_use]
    pub fn succeeded(self) -> bool {
        matches!(self, Self::Done(StageKind::Notify))
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detected => write!(f, "detected"),
            Self::Pending(stage) => write!(f, "{stage}_pending"),
            Self::Done(stage) => write!(f, "{stage}_done"),
            Self::Failed(stage) => write!(f, "failed({stage})"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_walk_visits_every_stage() {
        let mut state = PipelineState::Detected;
        let mut visited = Vec::new();
        while let Some(stage) = state.next_stage(true) {
            visited.push(stage);
            state = PipelineState::Done(stage);
        }
        assert_eq!(visited, StageKind::ORDER.to_vec());
        assert!(state.succeeded());
    }

    #[test]
    fn test_validation_only_walk_skips_publish() {
        let mut state = PipelineState::Detected;
        let mut visited = Vec::new();
        while let Some(stage) = state.next_stage(false) {
            visited.push(stage);
            state = PipelineState::Done(stage);
        }
        assert!(!visited.contains(&StageKind::Publish));
        assert_eq!(visited.last(), Some(&StageKind::Notify));
        assert!(state.succeeded());
    }

    #[test]
    fn test_failed_is_terminal() {
        let state = PipelineState::Failed(StageKind::Build);
        assert!(state.is_terminal(true));
        assert_eq!(state.next_stage(true), None);
        assert!(!state.succeeded());
    }

    #[test]
    fn test_cancelled_is_terminal() {
        assert!(PipelineState::Cancelled.is_terminal(false));
        assert_eq!(PipelineState::Cancelled.next_stage(false), None);
    }

    #[test]
    fn test_pending_cannot_advance_directly() {
        assert_eq!(
            PipelineState::Pending(StageKind::Build).next_stage(true),
            None
        );
    }

    #[test]
    fn test_display_names() {
        assert_eq!(
            PipelineState::Pending(StageKind::Validation).to_string(),
            "validation_pending"
        );
        assert_eq!(
            PipelineState::Done(StageKind::Equivalence).to_string(),
            "equivalence_done"
        );
        assert_eq!(
            PipelineState::Failed(StageKind::Test).to_string(),
            "failed(test)"
        );
    }
}
