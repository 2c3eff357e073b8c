//! Commit-driven semantic-version derivation.

use super::commits::{classify, CommitKind};
use super::semver::{BumpKind, SemVer};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The outcome of resolving a version for one algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDecision {
    /// The version before the run.
    pub previous: SemVer,
    /// The bump applied, or `None` when there were no commits since the
    /// last release tag (a valid outcome, not an error).
    pub bump: Option<BumpKind>,
    /// The resulting version. Equals `previous` when no bump applied.
    pub next: SemVer,
}

impl VersionDecision {
    /// Returns true if a new version was produced.
    #[must_use]
    pub fn released(&self) -> bool {
        self.bump.is_some()
    }
}

/// Derives exactly one version bump from commit subjects and an optional
/// API-signature-changed flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionResolver;

impl VersionResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolves the bump for one algorithm.
    ///
    /// Scans subjects in order; the first breaking marker is terminal
    /// (major can never be downgraded). A signature change elevates a
    /// patch to a minor but never downgrades a higher bump.
    #[must_use]
    pub fn resolve(
        &self,
        current: SemVer,
        subjects: &[String],
        api_signature_changed: bool,
    ) -> VersionDecision {
        if subjects.is_empty() {
            debug!(version = %current, "no commits since last release tag, version unchanged");
            return VersionDecision {
                previous: current,
                bump: None,
                next: current,
            };
        }

        let mut bump = BumpKind::Patch;
        for subject in subjects {
            match classify(subject) {
                CommitKind::Breaking => {
                    bump = BumpKind::Major;
                    break;
                }
                CommitKind::Feature => bump = bump.max(BumpKind::Minor),
                CommitKind::Fix | CommitKind::Other => {}
            }
        }

        // Signature changes are never silently released as patches.
        if api_signature_changed && bump == BumpKind::Patch {
            bump = BumpKind::Minor;
        }

        let next = current.bumped(bump);
        debug!(previous = %current, %bump, next = %next, "resolved version bump");
        VersionDecision {
            previous: current,
            bump: Some(bump),
            next,
        }
    }
}

/// Formats the release tag identifier for an algorithm version.
#[must_use]
pub fn release_tag(algorithm: &str, version: SemVer) -> String {
    format!("{algorithm}/v{version}")
}
