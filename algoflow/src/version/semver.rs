//! Semantic version value type and bump rules.

use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of version bump derived from a change set.
///
/// Ordered so that a larger bump dominates a smaller one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
    /// Backwards-compatible fix.
    Patch,
    /// Backwards-compatible feature or API-surface change.
    Minor,
    /// Breaking change.
    Major,
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patch => write!(f, "patch"),
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
        }
    }
}

/// A semantic version. Ordering is lexicographic over
/// (major, minor, patch), which the derive provides given field order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct SemVer {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
}

impl SemVer {
    /// Creates a version from components.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Returns the version resulting from applying exactly one bump.
    #[must_use]
    pub const fn bumped(self, kind: BumpKind) -> Self {
        match kind {
            BumpKind::Major => Self::new(self.major + 1, 0, 0),
            BumpKind::Minor => Self::new(self.major, self.minor + 1, 0),
            BumpKind::Patch => Self::new(self.major, self.minor, self.patch + 1),
        }
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemVer {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, '.');
        let mut next = |label: &str| -> Result<u64, PipelineError> {
            parts
                .next()
                .ok_or_else(|| {
                    PipelineError::Versioning(format!("'{s}' is missing the {label} component"))
                })?
                .parse::<u64>()
                .map_err(|_| {
                    PipelineError::Versioning(format!("'{s}' has a non-numeric {label} component"))
                })
        };

        Ok(Self {
            major: next("major")?,
            minor: next("minor")?,
            patch: next("patch")?,
        })
    }
}
