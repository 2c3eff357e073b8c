//! Run configuration for the pipeline engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default absolute tolerance when neither the test case nor the run
/// supplies one.
pub const DEFAULT_ABS_TOLERANCE: f64 = 1e-10;

/// Configuration for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Repository-relative root under which algorithm directories live.
    pub algorithms_root: String,
    /// Path prefixes that count as shared infrastructure; a change under
    /// any of these affects every known algorithm.
    pub shared_prefixes: Vec<String>,
    /// Run-level default absolute tolerance for equivalence checks.
    pub default_tolerance: f64,
    /// Per-stage timeout in seconds; an overrun fails the stage.
    pub stage_timeout_secs: u64,
    /// Maximum number of algorithm pipelines executing concurrently.
    pub max_parallel: usize,
    /// Bounded retry budget for infrastructure errors on the serialized
    /// version-control write path.
    pub infra_retries: u32,
    /// Whether this run is on a release branch; gates publish and the
    /// version/tag write path.
    pub release_branch: bool,
    /// Directory receiving run artifacts (reports, lists, release notes).
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            algorithms_root: "algorithms".to_string(),
            shared_prefixes: vec![
                "pipeline/".to_string(),
                "scripts/".to_string(),
                "cmake/".to_string(),
            ],
            default_tolerance: DEFAULT_ABS_TOLERANCE,
            stage_timeout_secs: 600,
            max_parallel: 4,
            infra_retries: 3,
            release_branch: false,
            output_dir: PathBuf::from("pipeline-output"),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the algorithms root.
    #[must_use]
    pub fn with_algorithms_root(mut self, root: impl Into<String>) -> Self {
        self.algorithms_root = root.into();
        self
    }

    /// Sets the shared-infrastructure prefixes.
    #[must_use]
    pub fn with_shared_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.shared_prefixes = prefixes;
        self
    }

    /// Sets the run-level default absolute tolerance.
    #[must_use]
    pub fn with_default_tolerance(mut self, tolerance: f64) -> Self {
        self.default_tolerance = tolerance;
        self
    }

    /// Sets the per-stage timeout in seconds.
    #[must_use]
    pub fn with_stage_timeout_secs(mut self, secs: u64) -> Self {
        self.stage_timeout_secs = secs;
        self
    }

    /// Sets the maximum number of concurrent pipelines.
    #[must_use]
    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.max_parallel = max.max(1);
        self
    }

    /// Sets the infrastructure retry budget.
    #[must_use]
    pub fn with_infra_retries(mut self, retries: u32) -> Self {
        self.infra_retries = retries;
        self
    }

    /// Marks the run as a release-branch run.
    #[must_use]
    pub fn with_release_branch(mut self, release: bool) -> Self {
        self.release_branch = release;
        self
    }

    /// Sets the artifact output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Returns the per-stage timeout as a duration.
    #[must_use]
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.algorithms_root, "algorithms");
        assert!((config.default_tolerance - 1e-10).abs() < f64::EPSILON);
        assert!(!config.release_branch);
        assert_eq!(config.infra_retries, 3);
    }

    #[test]
    fn test_builder_methods() {
        let config = PipelineConfig::new()
            .with_algorithms_root("algos")
            .with_release_branch(true)
            .with_max_parallel(0)
            .with_stage_timeout_secs(30);

        assert_eq!(config.algorithms_root, "algos");
        assert!(config.release_branch);
        // Parallelism is clamped to at least one worker.
        assert_eq!(config.max_parallel, 1);
        assert_eq!(config.stage_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.algorithms_root, config.algorithms_root);
        assert_eq!(back.max_parallel, config.max_parallel);
    }
}
