//! Error types for the algoflow pipeline engine.
//!
//! The taxonomy separates problems the algorithm owner must fix (input,
//! toolchain, equivalence) from problems the pipeline operators must fix
//! (infrastructure). Versioning problems are never fatal: a missing tag
//! history is treated as a first release by the resolver.

use thiserror::Error;

/// The main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or missing test-vector or metadata input.
    ///
    /// Fails fast and is reported to the algorithm owner; data with an
    /// input error never reaches the equivalence engine.
    #[error("input error: {0}")]
    Input(String),

    /// An external toolchain invocation failed (validation, codegen,
    /// build, native tests or publish).
    #[error("toolchain failure in {stage}: {detail}")]
    Toolchain {
        /// The stage whose collaborator failed.
        stage: String,
        /// Human-readable cause.
        detail: String,
    },

    /// Reference and candidate result sets disagree beyond tolerance.
    #[error("{0}")]
    EquivalenceMismatch(#[from] EquivalenceMismatch),

    /// Ambiguous or missing tag history.
    ///
    /// Callers treat this as "first release" rather than a failure.
    #[error("versioning error: {0}")]
    Versioning(String),

    /// A shared resource was unavailable.
    ///
    /// Retried a bounded number of times on the serialized write path
    /// before being surfaced as a run-level failure.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// The run was cancelled.
    #[error("run cancelled: {0}")]
    Cancelled(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or parse error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Returns true if this error should be retried on the serialized
    /// version-control write path.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }

    /// Returns a short machine-readable kind label for reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::Toolchain { .. } => "toolchain",
            Self::EquivalenceMismatch(_) => "equivalence_mismatch",
            Self::Versioning(_) => "versioning",
            Self::Infrastructure(_) => "infrastructure",
            Self::Cancelled(_) => "cancelled",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

/// Error raised when the candidate diverges from the reference beyond
/// tolerance, carrying the offending test case and both values.
#[derive(Debug, Clone, Error)]
#[error("equivalence mismatch for '{algorithm}': case '{case}': {detail}")]
pub struct EquivalenceMismatch {
    /// The algorithm under comparison.
    pub algorithm: String,
    /// The first offending test case.
    pub case: String,
    /// Detail including both values and the exceeded tolerance.
    pub detail: String,
}

impl EquivalenceMismatch {
    /// Creates a new equivalence mismatch error.
    #[must_use]
    pub fn new(
        algorithm: impl Into<String>,
        case: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            algorithm: algorithm.into(),
            case: case.into(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(PipelineError::Input("bad".into()).kind(), "input");
        assert_eq!(
            PipelineError::Infrastructure("down".into()).kind(),
            "infrastructure"
        );
        assert_eq!(
            PipelineError::Toolchain {
                stage: "build".into(),
                detail: "exit code 1".into()
            }
            .kind(),
            "toolchain"
        );
    }

    #[test]
    fn test_only_infrastructure_is_retryable() {
        assert!(PipelineError::Infrastructure("down".into()).is_retryable());
        assert!(!PipelineError::Input("bad".into()).is_retryable());
        assert!(!PipelineError::Versioning("no tag".into()).is_retryable());
    }

    #[test]
    fn test_equivalence_mismatch_display() {
        let err = EquivalenceMismatch::new(
            "kalman_filter",
            "high_uncertainty",
            "reference 2.0 vs candidate 2.01",
        );
        let msg = err.to_string();
        assert!(msg.contains("kalman_filter"));
        assert!(msg.contains("high_uncertainty"));
        assert!(msg.contains("2.01"));
    }
}
