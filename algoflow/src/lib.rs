//! # Algoflow
//!
//! A staged delivery pipeline engine for repositories of independently
//! versioned numerical algorithms.
//!
//! Algoflow turns "these files changed between two commits" into a full
//! delivery run per affected algorithm:
//!
//! - **Change detection**: map changed paths to affected algorithms,
//!   with shared-infrastructure paths fanning out to every algorithm
//! - **Staged execution**: validation, code generation, build, native
//!   tests, equivalence, versioning, reporting, publication and
//!   notification, strictly in order per algorithm
//! - **Numerical equivalence**: tolerance-gated comparison of reference
//!   and candidate result sets
//! - **Commit-driven versioning**: conventional-commit subjects decide
//!   the semantic bump; tag creation is globally serialized
//! - **Failure isolation**: one algorithm's failure never stops its
//!   siblings; cancellation is cooperative and checked between stages
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use algoflow::prelude::*;
//!
//! let catalog = AlgorithmCatalog::discover("algorithms")?;
//! let config = PipelineConfig::new()
//!     .with_release_branch(true)
//!     .with_output_dir("pipeline-output");
//!
//! let orchestrator = Orchestrator::new(config, catalog, ports);
//! let report = orchestrator.run("origin/main", "HEAD").await?;
//! assert!(report.all_passed);
//! ```
//!
//! All external effects (git, the authoring and compilation toolchains,
//! result storage, notification transport) are injected behind the
//! traits in [`ports`].

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod artifacts;
pub mod cancellation;
pub mod catalog;
pub mod changes;
pub mod config;
pub mod equivalence;
pub mod errors;
pub mod notify;
pub mod orchestrator;
pub mod pipeline;
pub mod ports;
pub mod telemetry;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::artifacts::ArtifactWriter;
    pub use crate::cancellation::CancelToken;
    pub use crate::catalog::{Algorithm, AlgorithmCatalog, AlgorithmId, AlgorithmMeta};
    pub use crate::changes::{ChangeDetector, ChangeSet};
    pub use crate::config::{PipelineConfig, DEFAULT_ABS_TOLERANCE};
    pub use crate::equivalence::{
        CaseOutcome, EquivalenceEngine, EquivalenceReport, ResultSet, ResultSource,
        ToleranceComparator,
    };
    pub use crate::errors::{EquivalenceMismatch, PipelineError};
    pub use crate::notify::{FailureNotice, Notice, ReleaseNotice};
    pub use crate::orchestrator::{Orchestrator, RunReport};
    pub use crate::pipeline::{
        AlgorithmPipeline, AlgorithmRun, PipelineState, StageKind, StageResult, StageStatus,
    };
    pub use crate::ports::{
        ApiDiff, ApiSurface, CheckOutcome, Gate, Notifier, PipelinePorts, ResultStore,
        SourceControl, ToolchainCheck, ToolchainPorts,
    };
    pub use crate::version::{
        classify, release_tag, BumpKind, CommitKind, SemVer, VersionDecision, VersionResolver,
    };
}
