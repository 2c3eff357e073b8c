//! Numeric equivalence verification between two independently produced
//! result sets.

mod comparator;
mod engine;
mod report;
mod value;

pub use comparator::{ToleranceComparator, RELATIVE_EPSILON};
pub use engine::EquivalenceEngine;
pub use report::{CaseOutcome, EquivalenceReport};
pub use value::{CaseRecord, Numeric, ResultSet, ResultSource, Tolerance, ACTUAL_PREFIX};
