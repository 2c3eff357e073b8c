//! Semantic versioning: version values, commit classification and the
//! commit-driven bump resolver.

mod commits;
mod resolver;
mod semver;

pub use commits::{classify, CommitKind};
pub use resolver::{release_tag, VersionDecision, VersionResolver};
pub use semver::{BumpKind, SemVer};
