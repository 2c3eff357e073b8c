//! Per-algorithm pipeline execution.
//!
//! [`AlgorithmPipeline`] drives one algorithm through the staged state
//! machine: stages advance strictly in order, the first failure is
//! terminal for that algorithm only, and cancellation between stages
//! lands in the `Cancelled` terminal state without publishing or
//! notifying.

use super::result::StageResult;
use super::runner::{RunData, RunShared, StageRunner, VersionOutcome};
use super::state::{PipelineState, StageKind};
use crate::catalog::{Algorithm, AlgorithmId};
use crate::equivalence::EquivalenceReport;
use crate::notify::{FailureNotice, Notice};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// The complete record of one algorithm's run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmRun {
    /// The algorithm.
    pub algorithm: AlgorithmId,
    /// Terminal (or last reached) pipeline state.
    pub final_state: PipelineState,
    /// Finalized per-stage results in execution order.
    pub stages: Vec<StageResult>,
    /// Equivalence report, when the equivalence stage ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equivalence: Option<EquivalenceReport>,
    /// Version outcome, when the version stage ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionOutcome>,
    /// Run-level error outside any stage (e.g. a crashed task).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_error: Option<String>,
}

impl AlgorithmRun {
    /// Creates a record for a run that failed outside any stage.
    #[must_use]
    pub fn infrastructure_failure(algorithm: AlgorithmId, cause: impl Into<String>) -> Self {
        Self {
            algorithm,
            final_state: PipelineState::Detected,
            stages: Vec::new(),
            equivalence: None,
            version: None,
            run_error: Some(cause.into()),
        }
    }

    /// Returns true if every stage completed.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.run_error.is_none() && self.final_state.succeeded()
    }

    /// Returns true if the run was cancelled.
    #[must_use]
    pub fn cancelled(&self) -> bool {
        matches!(self.final_state, PipelineState::Cancelled)
    }
}

/// Drives one algorithm through its stages.
#[derive(Debug)]
pub struct AlgorithmPipeline {
    algorithm: Algorithm,
    shared: Arc<RunShared>,
}

impl AlgorithmPipeline {
    /// Creates a pipeline for one algorithm over the shared run context.
    #[must_use]
    pub fn new(algorithm: Algorithm, shared: Arc<RunShared>) -> Self {
        Self { algorithm, shared }
    }

    /// Runs the pipeline to a terminal state.
    pub async fn run(self) -> AlgorithmRun {
        let release = self.shared.config.release_branch;
        let runner = StageRunner::new(self.shared.clone());
        let mut state = PipelineState::Detected;
        let mut stages = Vec::new();
        let mut data = RunData::default();

        while let Some(stage) = state.next_stage(release) {
            if self.shared.cancel.is_cancelled() {
                let reason = self
                    .shared
                    .cancel
                    .reason()
                    .unwrap_or_else(|| "cancelled".to_string());
                info!(algorithm = %self.algorithm.id, %reason, "pipeline cancelled");
                state = PipelineState::Cancelled;
                break;
            }

            state = PipelineState::Pending(stage);
            let result = runner.run(&self.algorithm, stage, &mut data).await;

            if result.is_failed() {
                let cause = result.error.clone().unwrap_or_else(|| "unknown".to_string());
                let kind = result
                    .error_kind
                    .clone()
                    .unwrap_or_else(|| "infrastructure".to_string());
                stages.push(result);
                state = PipelineState::Failed(stage);
                self.notify_failure(stage, cause, kind).await;
                break;
            }

            stages.push(result);
            state = PipelineState::Done(stage);
        }

        info!(algorithm = %self.algorithm.id, state = %state, "pipeline finished");
        AlgorithmRun {
            algorithm: self.algorithm.id,
            final_state: state,
            stages,
            equivalence: data.equivalence,
            version: data.version,
            run_error: None,
        }
    }

    /// Best-effort failure notification to the owner. A broken notifier
    /// never masks the original stage failure.
    async fn notify_failure(&self, stage: StageKind, cause: String, kind: String) {
        let notice = Notice::Failure(FailureNotice::new(&self.algorithm, stage, cause, kind));
        if let Err(err) = self.shared.ports.notifier.deliver(&notice).await {
            warn!(algorithm = %self.algorithm.id, %stage, %err, "failure notice delivery failed");
        }
    }
}
