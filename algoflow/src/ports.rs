//! Injected external collaborators.
//!
//! The engine never shells out or talks to the network itself: source
//! control, the authoring/compilation toolchains, the result store and
//! the notifier are all injected behind these traits.

use crate::catalog::{Algorithm, AlgorithmId};
use crate::equivalence::ResultSource;
use crate::errors::PipelineError;
use crate::notify::Notice;
use crate::pipeline::StageKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Gate decision derived from a collaborator's exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Exit code 0.
    Passed,
    /// Exit code 1: the quality gate stops this algorithm.
    Failed,
    /// Any other exit code: gates like a failure, logged distinctly.
    Infrastructure,
}

/// Result of invoking one external check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Process exit code (0 = passed, 1 = failed, other = infrastructure).
    pub exit_code: i32,
    /// Reference to the collaborator's structured log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_ref: Option<String>,
}

impl CheckOutcome {
    /// Creates an outcome from an exit code.
    #[must_use]
    pub fn new(exit_code: i32) -> Self {
        Self {
            exit_code,
            log_ref: None,
        }
    }

    /// Creates a passing outcome.
    #[must_use]
    pub fn passed() -> Self {
        Self::new(0)
    }

    /// Creates a failing outcome.
    #[must_use]
    pub fn failed() -> Self {
        Self::new(1)
    }

    /// Sets the log reference.
    #[must_use]
    pub fn with_log_ref(mut self, log_ref: impl Into<String>) -> Self {
        self.log_ref = Some(log_ref.into());
        self
    }

    /// Interprets the exit code under the gating convention.
    #[must_use]
    pub fn gate(&self) -> Gate {
        match self.exit_code {
            0 => Gate::Passed,
            1 => Gate::Failed,
            _ => Gate::Infrastructure,
        }
    }
}

/// Diff of an algorithm's API signature snapshot across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiDiff {
    /// True when the signature changed since the last release.
    pub changed: bool,
    /// Human-readable diff text, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

/// Source-control collaborator: changed files, commit history, tags.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Lists files changed between two references, in diff order.
    async fn changed_files(
        &self,
        baseline: &str,
        head: &str,
    ) -> Result<Vec<String>, PipelineError>;

    /// Returns the last release tag for an algorithm, or `None` before
    /// the first release.
    async fn last_release_tag(
        &self,
        algorithm: &AlgorithmId,
    ) -> Result<Option<String>, PipelineError>;

    /// Returns commit subjects touching the algorithm's path since the
    /// given tag; with `None`, scans the full history (first release).
    async fn commit_subjects_since(
        &self,
        algorithm: &AlgorithmId,
        tag: Option<&str>,
    ) -> Result<Vec<String>, PipelineError>;

    /// Creates a release tag. Called only under the serialized version
    /// write path.
    async fn create_tag(&self, tag: &str) -> Result<(), PipelineError>;
}

/// One external toolchain check (validation, codegen, build, native
/// tests or publish).
#[async_trait]
pub trait ToolchainCheck: Send + Sync {
    /// Runs the check for one algorithm.
    async fn run(&self, algorithm: &Algorithm) -> Result<CheckOutcome, PipelineError>;
}

/// Loads the two JSON result sets of an equivalence run.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Loads one producer's raw result JSON for an algorithm.
    async fn load(
        &self,
        algorithm: &AlgorithmId,
        source: ResultSource,
    ) -> Result<serde_json::Value, PipelineError>;
}

/// Optional API-signature snapshot collaborator.
#[async_trait]
pub trait ApiSurface: Send + Sync {
    /// Diffs the algorithm's current signature against the last
    /// released snapshot. `None` when no snapshot exists yet.
    async fn diff(&self, algorithm: &AlgorithmId) -> Result<Option<ApiDiff>, PipelineError>;
}

/// Delivers notification payloads; transport is out of scope.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one notice to its recipients.
    async fn deliver(&self, notice: &Notice) -> Result<(), PipelineError>;
}

/// The toolchain checks, one per gated external stage.
#[derive(Clone)]
pub struct ToolchainPorts {
    /// Test-vector/metadata validation.
    pub validation: Arc<dyn ToolchainCheck>,
    /// Native code generation.
    pub codegen: Arc<dyn ToolchainCheck>,
    /// Native build.
    pub build: Arc<dyn ToolchainCheck>,
    /// Native test execution.
    pub native_tests: Arc<dyn ToolchainCheck>,
    /// Package publication.
    pub publish: Arc<dyn ToolchainCheck>,
}

impl ToolchainPorts {
    /// Returns the check backing a stage, if that stage is an external
    /// toolchain invocation.
    #[must_use]
    pub fn for_stage(&self, stage: StageKind) -> Option<&Arc<dyn ToolchainCheck>> {
        match stage {
            StageKind::Validation => Some(&self.validation),
            StageKind::Codegen => Some(&self.codegen),
            StageKind::Build => Some(&self.build),
            StageKind::Test => Some(&self.native_tests),
            StageKind::Publish => Some(&self.publish),
            StageKind::Equivalence | StageKind::Version | StageKind::Report | StageKind::Notify => {
                None
            }
        }
    }
}

impl std::fmt::Debug for ToolchainPorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolchainPorts").finish_non_exhaustive()
    }
}

/// All collaborators a run needs.
#[derive(Clone)]
pub struct PipelinePorts {
    /// Source-control collaborator.
    pub source_control: Arc<dyn SourceControl>,
    /// Gated toolchain checks.
    pub toolchain: ToolchainPorts,
    /// Equivalence result store.
    pub results: Arc<dyn ResultStore>,
    /// Optional API-signature collaborator.
    pub api_surface: Option<Arc<dyn ApiSurface>>,
    /// Notification delivery.
    pub notifier: Arc<dyn Notifier>,
}

impl PipelinePorts {
    /// Sets the API-surface collaborator.
    #[must_use]
    pub fn with_api_surface(mut self, api: Arc<dyn ApiSurface>) -> Self {
        self.api_surface = Some(api);
        self
    }
}

impl std::fmt::Debug for PipelinePorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelinePorts")
            .field("has_api_surface", &self.api_surface.is_some())
            .finish_non_exhaustive()
    }
}
