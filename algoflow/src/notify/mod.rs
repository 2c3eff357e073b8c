//! Notification payloads.
//!
//! The engine decides who hears what; an injected [`crate::ports::Notifier`]
//! owns the transport. Releases go to the owner and every consumer;
//! failures go to the owner only.

use crate::catalog::{Algorithm, AlgorithmId};
use crate::equivalence::EquivalenceReport;
use crate::pipeline::StageKind;
use crate::version::SemVer;
use serde::{Deserialize, Serialize};

/// Compact equivalence summary embedded in release notices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquivalenceSummary {
    /// Total test cases compared.
    pub total_tests: usize,
    /// Cases that passed.
    pub passed_tests: usize,
    /// Run-level maximum absolute error.
    pub max_absolute_error: f64,
    /// Run-level maximum relative error.
    pub max_relative_error: f64,
}

impl From<&EquivalenceReport> for EquivalenceSummary {
    fn from(report: &EquivalenceReport) -> Self {
        Self {
            total_tests: report.total_tests,
            passed_tests: report.passed_tests,
            max_absolute_error: report.max_absolute_error,
            max_relative_error: report.max_relative_error,
        }
    }
}

/// Payload announcing a successful run.
///
/// On release runs this includes the published version and install
/// instructions; on validation-only runs it is a reduced confirmation
/// sent to the owner alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseNotice {
    /// The algorithm.
    pub algorithm: AlgorithmId,
    /// The released (or current, when unchanged) version.
    pub version: SemVer,
    /// True when a package was actually published.
    pub published: bool,
    /// Equivalence summary, when an equivalence run happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equivalence: Option<EquivalenceSummary>,
    /// API signature diff text, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_diff: Option<String>,
    /// Install instructions for consumers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<String>,
    /// Recipient addresses.
    pub recipients: Vec<String>,
}

impl ReleaseNotice {
    /// Builds the notice for one algorithm.
    #[must_use]
    pub fn new(algorithm: &Algorithm, version: SemVer, published: bool) -> Self {
        let recipients = if published {
            let mut recipients = vec![algorithm.owner_email.clone()];
            recipients.extend(algorithm.consumers.iter().cloned());
            recipients
        } else {
            vec![algorithm.owner_email.clone()]
        };

        let install = published.then(|| {
            format!(
                "conan install --requires={}/{version} --remote=nexus",
                algorithm.id
            )
        });

        Self {
            algorithm: algorithm.id.clone(),
            version,
            published,
            equivalence: None,
            api_diff: None,
            install,
            recipients,
        }
    }

    /// Attaches the equivalence summary.
    #[must_use]
    pub fn with_equivalence(mut self, report: &EquivalenceReport) -> Self {
        self.equivalence = Some(EquivalenceSummary::from(report));
        self
    }

    /// Attaches the API diff text.
    #[must_use]
    pub fn with_api_diff(mut self, diff: impl Into<String>) -> Self {
        self.api_diff = Some(diff.into());
        self
    }
}

/// Payload reporting a failed stage, routed to the owner only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureNotice {
    /// The algorithm.
    pub algorithm: AlgorithmId,
    /// The stage that failed.
    pub stage: StageKind,
    /// Human-readable cause.
    pub cause: String,
    /// Machine-readable error kind.
    pub kind: String,
    /// Recipient addresses (owner only).
    pub recipients: Vec<String>,
}

impl FailureNotice {
    /// Builds the failure notice for one algorithm.
    #[must_use]
    pub fn new(
        algorithm: &Algorithm,
        stage: StageKind,
        cause: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            algorithm: algorithm.id.clone(),
            stage,
            cause: cause.into(),
            kind: kind.into(),
            recipients: vec![algorithm.owner_email.clone()],
        }
    }
}

/// A notification routed through the notifier port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// Successful completion (release or validation-only).
    Release(ReleaseNotice),
    /// A stage failure.
    Failure(FailureNotice),
}

impl Notice {
    /// Returns the recipients of this notice.
    #[must_use]
    pub fn recipients(&self) -> &[String] {
        match self {
            Self::Release(n) => &n.recipients,
            Self::Failure(n) => &n.recipients,
        }
    }

    /// Returns the algorithm this notice concerns.
    #[must_use]
    pub fn algorithm(&self) -> &AlgorithmId {
        match self {
            Self::Release(n) => &n.algorithm,
            Self::Failure(n) => &n.algorithm,
        }
    }
}
