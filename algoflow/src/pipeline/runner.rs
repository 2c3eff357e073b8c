//! Stage execution.
//!
//! [`StageRunner`] dispatches one stage at a time for one algorithm:
//! external toolchain stages go through the injected checks and their
//! exit-code gate, the internal stages (equivalence, version, report,
//! notify) run in-process. Every stage runs under the configured
//! timeout; the version stage additionally runs under a run-wide lock
//! so concurrent algorithms never interleave tag creation.

use super::result::StageResult;
use super::state::StageKind;
use crate::artifacts::ArtifactWriter;
use crate::cancellation::CancelToken;
use crate::catalog::{Algorithm, AlgorithmCatalog};
use crate::config::PipelineConfig;
use crate::equivalence::{EquivalenceEngine, EquivalenceReport, ResultSet, ResultSource};
use crate::errors::{EquivalenceMismatch, PipelineError};
use crate::notify::{Notice, ReleaseNotice};
use crate::ports::{ApiDiff, Gate, PipelinePorts};
use crate::version::{release_tag, VersionDecision, VersionResolver};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Context shared by every algorithm pipeline of one run.
pub struct RunShared {
    /// Run configuration.
    pub config: PipelineConfig,
    /// Injected collaborators.
    pub ports: PipelinePorts,
    /// The catalog, shared with the orchestrator and updated in place
    /// when versions are released.
    pub catalog: Arc<RwLock<AlgorithmCatalog>>,
    /// Artifact output.
    pub artifacts: ArtifactWriter,
    /// Cooperative cancellation for the whole run.
    pub cancel: Arc<CancelToken>,
    /// Serializes the version stage across algorithms.
    version_gate: Mutex<()>,
}

impl RunShared {
    /// Creates the shared context for one run.
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        ports: PipelinePorts,
        catalog: Arc<RwLock<AlgorithmCatalog>>,
        cancel: Arc<CancelToken>,
    ) -> Self {
        let artifacts = ArtifactWriter::new(config.output_dir.clone());
        Self {
            config,
            ports,
            catalog,
            artifacts,
            cancel,
            version_gate: Mutex::new(()),
        }
    }
}

impl std::fmt::Debug for RunShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunShared")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The version outcome recorded for one algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionOutcome {
    /// The resolved decision.
    pub decision: VersionDecision,
    /// The release tag, when one was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Data accumulated while one algorithm's stages run, feeding the later
/// stages (report, publish, notify) and the final run record.
#[derive(Debug, Default)]
pub struct RunData {
    /// Equivalence report, once the equivalence stage ran.
    pub equivalence: Option<EquivalenceReport>,
    /// Version outcome, once the version stage ran.
    pub version: Option<VersionOutcome>,
    /// API signature diff, when the collaborator reported one.
    pub api_diff: Option<ApiDiff>,
    /// Commit subjects feeding the changelog and release notes.
    pub commit_subjects: Vec<String>,
}

enum ExecOutcome {
    Passed(Option<String>),
    Skipped(String),
}

/// Runs individual stages for one algorithm.
#[derive(Debug)]
pub struct StageRunner {
    shared: Arc<RunShared>,
}

impl StageRunner {
    /// Creates a runner over the shared run context.
    #[must_use]
    pub fn new(shared: Arc<RunShared>) -> Self {
        Self { shared }
    }

    /// Runs one stage to a finalized result. Exceeding the configured
    /// timeout is a stage failure, never a hang.
    pub async fn run(
        &self,
        algorithm: &Algorithm,
        stage: StageKind,
        data: &mut RunData,
    ) -> StageResult {
        let result = StageResult::running(algorithm.id.clone(), stage);
        debug!(algorithm = %algorithm.id, %stage, "stage started");

        let timeout = self.shared.config.stage_timeout();
        match tokio::time::timeout(timeout, self.execute(algorithm, stage, data)).await {
            Err(_) => {
                warn!(
                    algorithm = %algorithm.id,
                    %stage,
                    timeout_secs = self.shared.config.stage_timeout_secs,
                    "stage timed out"
                );
                result
                    .failed(
                        format!(
                            "stage timed out after {}s",
                            self.shared.config.stage_timeout_secs
                        ),
                        None,
                    )
                    .with_error_kind("infrastructure")
            }
            Ok(Ok(ExecOutcome::Passed(log_ref))) => {
                debug!(algorithm = %algorithm.id, %stage, "stage passed");
                result.passed(log_ref)
            }
            Ok(Ok(ExecOutcome::Skipped(reason))) => {
                debug!(algorithm = %algorithm.id, %stage, %reason, "stage skipped");
                result.skipped(reason)
            }
            Ok(Err(err)) => {
                if matches!(err, PipelineError::Infrastructure(_)) {
                    error!(algorithm = %algorithm.id, %stage, %err, "infrastructure error");
                } else {
                    warn!(algorithm = %algorithm.id, %stage, %err, "stage failed");
                }
                result.failed(err.to_string(), None).with_error_kind(err.kind())
            }
        }
    }

    async fn execute(
        &self,
        algorithm: &Algorithm,
        stage: StageKind,
        data: &mut RunData,
    ) -> Result<ExecOutcome, PipelineError> {
        match stage {
            StageKind::Validation
            | StageKind::Codegen
            | StageKind::Build
            | StageKind::Test => self.run_toolchain(algorithm, stage).await,
            StageKind::Equivalence => self.run_equivalence(algorithm, data).await,
            StageKind::Version => self.run_version(algorithm, data).await,
            StageKind::Report => self.run_report(algorithm, data),
            StageKind::Publish => self.run_publish(algorithm, stage, data).await,
            StageKind::Notify => self.run_notify(algorithm, data).await,
        }
    }

    /// Invokes the external check behind a gated stage and interprets
    /// its exit code: 0 passes, 1 fails the gate, anything else is an
    /// infrastructure error.
    async fn run_toolchain(
        &self,
        algorithm: &Algorithm,
        stage: StageKind,
    ) -> Result<ExecOutcome, PipelineError> {
        let check = self.shared.ports.toolchain.for_stage(stage).ok_or_else(|| {
            PipelineError::Infrastructure(format!("no toolchain check wired for stage '{stage}'"))
        })?;
        let outcome = check.run(algorithm).await?;

        match outcome.gate() {
            Gate::Passed => Ok(ExecOutcome::Passed(outcome.log_ref)),
            Gate::Failed => {
                let mut detail = format!("check exited with code {}", outcome.exit_code);
                if let Some(log_ref) = &outcome.log_ref {
                    detail.push_str(&format!(" (log: {log_ref})"));
                }
                Err(PipelineError::Toolchain {
                    stage: stage.name().to_string(),
                    detail,
                })
            }
            Gate::Infrastructure => Err(PipelineError::Infrastructure(format!(
                "{stage} check exited with unexpected code {}{}",
                outcome.exit_code,
                outcome
                    .log_ref
                    .as_deref()
                    .map(|l| format!(" (log: {l})"))
                    .unwrap_or_default()
            ))),
        }
    }

    /// Loads both result sets, compares them and writes the report.
    /// Any failing case gates the stage with the first failure's detail.
    async fn run_equivalence(
        &self,
        algorithm: &Algorithm,
        data: &mut RunData,
    ) -> Result<ExecOutcome, PipelineError> {
        let results = &self.shared.ports.results;
        let reference_raw = results.load(&algorithm.id, ResultSource::Reference).await?;
        let candidate_raw = results.load(&algorithm.id, ResultSource::Candidate).await?;

        let reference = ResultSet::from_json(&reference_raw, ResultSource::Reference)?;
        let candidate = ResultSet::from_json(&candidate_raw, ResultSource::Candidate)?;

        let engine = EquivalenceEngine::new(self.shared.config.default_tolerance);
        let report = engine.compare(algorithm.id.as_str(), &reference, &candidate);
        info!(algorithm = %algorithm.id, summary = %report.summary(), "equivalence compared");

        let path = self
            .shared
            .artifacts
            .write_equivalence_report(&algorithm.id, &report)?;

        let verdict = if report.all_passed {
            Ok(ExecOutcome::Passed(Some(path.display().to_string())))
        } else {
            let failure = report.first_failure().ok_or_else(|| {
                PipelineError::Infrastructure(
                    "report not all-passed but no failing case recorded".to_string(),
                )
            })?;
            let detail = failure
                .error
                .clone()
                .unwrap_or_else(|| "diverged beyond tolerance".to_string());
            Err(EquivalenceMismatch::new(
                algorithm.id.as_str(),
                failure.test_name.clone(),
                detail,
            )
            .into())
        };
        data.equivalence = Some(report);
        verdict
    }

    /// Derives the next version from commit history and, on release
    /// runs, persists it and creates the release tag. The whole stage
    /// holds the run-wide version gate so tag creation never
    /// interleaves across algorithms.
    async fn run_version(
        &self,
        algorithm: &Algorithm,
        data: &mut RunData,
    ) -> Result<ExecOutcome, PipelineError> {
        let _guard = self.shared.version_gate.lock().await;
        let source_control = &self.shared.ports.source_control;

        let last_tag = match source_control.last_release_tag(&algorithm.id).await {
            Ok(tag) => tag,
            Err(PipelineError::Versioning(detail)) => {
                warn!(algorithm = %algorithm.id, %detail, "no usable release tag, treating as first release");
                None
            }
            Err(err) => return Err(err),
        };

        let subjects = source_control
            .commit_subjects_since(&algorithm.id, last_tag.as_deref())
            .await?;

        let api_diff = match &self.shared.ports.api_surface {
            Some(api) => api.diff(&algorithm.id).await?,
            None => None,
        };
        let api_changed = api_diff.as_ref().is_some_and(|d| d.changed);

        let decision = VersionResolver::new().resolve(algorithm.version, &subjects, api_changed);
        info!(
            algorithm = %algorithm.id,
            previous = %decision.previous,
            next = %decision.next,
            bump = ?decision.bump,
            "version resolved"
        );

        let mut tag = None;
        if self.shared.config.release_branch && decision.released() {
            self.shared
                .catalog
                .write()
                .set_version(&algorithm.id, decision.next)?;
            self.shared
                .artifacts
                .persist_version(algorithm, &decision, &subjects)?;
            let tag_name = release_tag(algorithm.id.as_str(), decision.next);
            self.create_tag_with_retries(&tag_name).await?;
            tag = Some(tag_name);
        }

        let log_ref = tag.clone();
        data.commit_subjects = subjects;
        data.api_diff = api_diff;
        data.version = Some(VersionOutcome { decision, tag });
        Ok(ExecOutcome::Passed(log_ref))
    }

    /// Creates a release tag, retrying a bounded number of times when
    /// the source-control collaborator reports an infrastructure error.
    async fn create_tag_with_retries(&self, tag: &str) -> Result<(), PipelineError> {
        let mut attempt = 0u32;
        loop {
            match self.shared.ports.source_control.create_tag(tag).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_retryable() && attempt < self.shared.config.infra_retries => {
                    attempt += 1;
                    warn!(tag, attempt, %err, "tag creation failed, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn run_report(
        &self,
        algorithm: &Algorithm,
        data: &RunData,
    ) -> Result<ExecOutcome, PipelineError> {
        let outcome = data.version.as_ref().ok_or_else(|| {
            PipelineError::Infrastructure("report stage reached without a version decision".to_string())
        })?;
        let api_diff = data.api_diff.as_ref().and_then(|d| d.diff.as_deref());
        let path = self.shared.artifacts.write_release_notes(
            &algorithm.id,
            &outcome.decision,
            data.equivalence.as_ref(),
            api_diff,
        )?;
        Ok(ExecOutcome::Passed(Some(path.display().to_string())))
    }

    /// Publishes the package. Skipped when the version stage decided
    /// nothing new is being released, so a package version is never
    /// re-published.
    async fn run_publish(
        &self,
        algorithm: &Algorithm,
        stage: StageKind,
        data: &RunData,
    ) -> Result<ExecOutcome, PipelineError> {
        let released = data
            .version
            .as_ref()
            .is_some_and(|v| v.decision.released());
        if !released {
            return Ok(ExecOutcome::Skipped(
                "no new version to publish".to_string(),
            ));
        }
        self.run_toolchain(algorithm, stage).await
    }

    /// Delivers the success notice. On validation-only runs the version
    /// stage resolves a bump without applying it, so the notice reports
    /// the persisted current version, never the hypothetical next one.
    async fn run_notify(
        &self,
        algorithm: &Algorithm,
        data: &RunData,
    ) -> Result<ExecOutcome, PipelineError> {
        let (version, published) = match &data.version {
            Some(outcome) if self.shared.config.release_branch => {
                (outcome.decision.next, outcome.decision.released())
            }
            _ => (algorithm.version, false),
        };

        let mut notice = ReleaseNotice::new(algorithm, version, published);
        if let Some(report) = &data.equivalence {
            notice = notice.with_equivalence(report);
        }
        if let Some(diff) = data.api_diff.as_ref().and_then(|d| d.diff.clone()) {
            notice = notice.with_api_diff(diff);
        }

        self.shared
            .ports
            .notifier
            .deliver(&Notice::Release(notice))
            .await?;
        info!(algorithm = %algorithm.id, published, "release notice delivered");
        Ok(ExecOutcome::Passed(None))
    }
}
