//! The per-algorithm staged pipeline: state machine, stage execution
//! and the typed results they produce.

mod exec;
mod result;
mod runner;
mod state;

pub use exec::{AlgorithmPipeline, AlgorithmRun};
pub use result::{StageResult, StageStatus};
pub use runner::{RunData, RunShared, StageRunner, VersionOutcome};
pub use state::{PipelineState, StageKind};
