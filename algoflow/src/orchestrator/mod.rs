//! Run-level orchestration.
//!
//! The [`Orchestrator`] owns one run end to end: detect affected
//! algorithms for a commit range, fan their pipelines out under a
//! bounded concurrency limit, collect every terminal record, and write
//! the machine-readable run report. One algorithm's failure never
//! stops its siblings.


use crate::artifacts::ArtifactWriter;
use crate::cancellation::CancelToken;
use crate::catalog::{AlgorithmCatalog, AlgorithmId};
use crate::changes::ChangeDetector;
use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::pipeline::{AlgorithmPipeline, AlgorithmRun, RunShared};
use crate::ports::PipelinePorts;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};
use uuid::Uuid;

/// The machine-readable record of one orchestrated run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// Baseline reference of the compared range.
    pub baseline: String,
    /// Head reference of the compared range.
    pub head: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Affected algorithms in detection order.
    pub affected: Vec<AlgorithmId>,
    /// True when a shared-infrastructure path selected every algorithm.
    pub shared_infrastructure_hit: bool,
    /// True when the run was cancelled before completing.
    pub cancelled: bool,
    /// One terminal record per affected algorithm.
    pub runs: Vec<AlgorithmRun>,
    /// True when every affected algorithm completed all its stages.
    pub all_passed: bool,
}

impl RunReport {
    /// Returns the record for one algorithm, if it was affected.
    #[must_use]
    pub fn run_for(&self, algorithm: &AlgorithmId) -> Option<&AlgorithmRun> {
        self.runs.iter().find(|r| &r.algorithm == algorithm)
    }
}

/// Coordinates full pipeline runs over commit ranges.
///
/// The catalog is shared with every run, so versions released by one
/// run are visible to subsequent runs on the same instance.
#[derive(Debug)]
pub struct Orchestrator {
    config: PipelineConfig,
    catalog: Arc<RwLock<AlgorithmCatalog>>,
    ports: PipelinePorts,
}

impl Orchestrator {
    /// Creates an orchestrator over a discovered catalog and injected
    /// collaborators.
    #[must_use]
    pub fn new(config: PipelineConfig, catalog: AlgorithmCatalog, ports: PipelinePorts) -> Self {
        Self {
            config,
            catalog: Arc::new(RwLock::new(catalog)),
            ports,
        }
    }

    /// Runs the full pipeline for the commit range with a fresh
    /// cancellation token.
    pub async fn run(&self, baseline: &str, head: &str) -> Result<RunReport, PipelineError> {
        self.run_with_cancel(baseline, head, CancelToken::new())
            .await
    }

    /// Runs the full pipeline for the commit range under an external
    /// cancellation token.
    ///
    /// Returns `Err` only for run-level setup failures (change listing,
    /// artifact IO). Per-algorithm failures land in the report instead.
    pub async fn run_with_cancel(
        &self,
        baseline: &str,
        head: &str,
        cancel: Arc<CancelToken>,
    ) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, baseline, head, "run started");

        let files = self.ports.source_control.changed_files(baseline, head).await?;
        let change_set = {
            let catalog = self.catalog.read();
            ChangeDetector::new(&catalog, &self.config).detect(baseline, head, &files)
        };

        let artifacts = ArtifactWriter::new(self.config.output_dir.clone());
        artifacts.write_affected_list(change_set.affected.as_slice())?;

        let affected: Vec<AlgorithmId> = change_set.affected.iter().cloned().collect();
        if affected.is_empty() {
            info!(%run_id, "no algorithms affected, nothing to do");
            let report = RunReport {
                run_id,
                baseline: baseline.to_string(),
                head: head.to_string(),
                started_at,
                finished_at: Utc::now(),
                affected,
                shared_infrastructure_hit: change_set.shared_infrastructure_hit,
                cancelled: cancel.is_cancelled(),
                runs: Vec::new(),
                all_passed: true,
            };
            artifacts.write_run_report(&report)?;
            return Ok(report);
        }

        let shared = Arc::new(RunShared::new(
            self.config.clone(),
            self.ports.clone(),
            self.catalog.clone(),
            cancel.clone(),
        ));
        // max_parallel is clamped to >= 1 at configuration time and
        // the affected set is non-empty here.
        let limit = self.config.max_parallel.min(affected.len());
        let semaphore = Arc::new(Semaphore::new(limit));

        let mut runs = Vec::with_capacity(affected.len());
        let mut handles = Vec::with_capacity(affected.len());
        for id in &affected {
            let Some(algorithm) = self.catalog.read().get(id).cloned() else {
                // Detection only emits catalog identities; a miss here
                // means the catalog changed under us.
                runs.push(AlgorithmRun::infrastructure_failure(
                    id.clone(),
                    "algorithm vanished from catalog between detection and dispatch",
                ));
                continue;
            };
            let shared = shared.clone();
            let semaphore = semaphore.clone();
            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| PipelineError::Infrastructure(e.to_string()))?;
                Ok::<AlgorithmRun, PipelineError>(
                    AlgorithmPipeline::new(algorithm, shared).run().await,
                )
            });
            handles.push((id.clone(), handle));
        }

        let joined =
            join_all(handles.into_iter().map(|(id, handle)| async move { (id, handle.await) }))
                .await;
        for (id, outcome) in joined {
            match outcome {
                Ok(Ok(run)) => runs.push(run),
                Ok(Err(err)) => {
                    error!(algorithm = %id, %err, "pipeline setup failed");
                    runs.push(AlgorithmRun::infrastructure_failure(id, err.to_string()));
                }
                Err(join_err) => {
                    error!(algorithm = %id, %join_err, "pipeline task crashed");
                    runs.push(AlgorithmRun::infrastructure_failure(
                        id,
                        format!("pipeline task crashed: {join_err}"),
                    ));
                }
            }
        }

        let all_passed = runs.iter().all(AlgorithmRun::succeeded);
        let report = RunReport {
            run_id,
            baseline: baseline.to_string(),
            head: head.to_string(),
            started_at,
            finished_at: Utc::now(),
            affected,
            shared_infrastructure_hit: change_set.shared_infrastructure_hit,
            cancelled: cancel.is_cancelled(),
            runs,
            all_passed,
        };
        artifacts.write_run_report(&report)?;
        info!(
            %run_id,
            algorithms = report.runs.len(),
            all_passed = report.all_passed,
            "run finished"
        );
        Ok(report)
    }
}
