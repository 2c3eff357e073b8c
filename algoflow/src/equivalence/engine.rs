//! Orchestrates tolerance comparison over all test cases of one algorithm.

use super::comparator::ToleranceComparator;
use super::report::{CaseOutcome, EquivalenceReport};
use super::value::ResultSet;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Produces an [`EquivalenceReport`] from a reference and a candidate
/// result set.
#[derive(Debug, Clone, Copy)]
pub struct EquivalenceEngine {
    comparator: ToleranceComparator,
    default_tolerance: f64,
}

impl EquivalenceEngine {
    /// Creates an engine with the run-level default absolute tolerance.
    #[must_use]
    pub fn new(default_tolerance: f64) -> Self {
        Self {
            comparator: ToleranceComparator::new(default_tolerance),
            default_tolerance,
        }
    }

    /// Compares all test cases of one algorithm.
    ///
    /// Iterates the sorted union of case names from both sides, so the
    /// report is order-independent of the input files and byte-stable
    /// for identical inputs. A case present on only one side is a
    /// structural failure.
    #[must_use]
    pub fn compare(
        &self,
        algorithm: &str,
        reference: &ResultSet,
        candidate: &ResultSet,
    ) -> EquivalenceReport {
        let names: BTreeSet<&String> = reference.cases.keys().chain(candidate.cases.keys()).collect();

        let mut details = Vec::with_capacity(names.len());
        for name in names {
            let outcome = match (reference.cases.get(name), candidate.cases.get(name)) {
                (Some(ref_case), Some(cand_case)) => {
                    self.comparator.compare(ref_case, cand_case)
                }
                (Some(ref_case), None) => {
                    warn!(algorithm, case = %name, "case missing from candidate");
                    CaseOutcome::structural(
                        name,
                        self.comparator.effective_tolerance(ref_case),
                        "missing from candidate",
                    )
                }
                (None, Some(_)) => {
                    warn!(algorithm, case = %name, "case missing from reference");
                    CaseOutcome::structural(name, self.default_tolerance, "missing from reference")
                }
                (None, None) => unreachable!("name came from the union of both sets"),
            };
            details.push(outcome);
        }

        let report = EquivalenceReport::from_details(algorithm, details);
        debug!(algorithm, summary = %report.summary(), "equivalence run complete");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equivalence::value::ResultSource;
    use serde_json::json;

    fn parse(value: serde_json::Value, source: ResultSource) -> ResultSet {
        ResultSet::from_json(&value, source).unwrap()
    }

    fn sample_set() -> ResultSet {
        parse(
            json!([
                {"test_name": "nominal", "actual_state": [1.0, 2.0], "tolerance": 1e-10},
                {"test_name": "zero_input", "actual_state": [0.0, 0.0], "tolerance": 1e-10}
            ]),
            ResultSource::Reference,
        )
    }

    #[test]
    fn test_comparing_set_against_itself_passes() {
        let set = sample_set();
        let report = EquivalenceEngine::new(1e-10).compare("kalman_filter", &set, &set);

        assert!(report.all_passed);
        assert_eq!(report.total_tests, 2);
        assert_eq!(report.max_absolute_error, 0.0);
        assert_eq!(report.max_relative_error, 0.0);
    }

    #[test]
    fn test_case_missing_from_candidate_fails_structurally() {
        let reference = sample_set();
        let candidate = parse(
            json!([{"test_name": "nominal", "actual_state": [1.0, 2.0]}]),
            ResultSource::Candidate,
        );

        let report = EquivalenceEngine::new(1e-10).compare("kalman_filter", &reference, &candidate);
        assert!(!report.all_passed);
        assert_eq!(report.failed_tests, 1);

        let failure = report.first_failure().unwrap();
        assert_eq!(failure.test_name, "zero_input");
        assert!(failure.structural);
        assert_eq!(failure.error.as_deref(), Some("missing from candidate"));
    }

    #[test]
    fn test_case_missing_from_reference_fails_structurally() {
        let reference = parse(
            json!([{"test_name": "nominal", "actual_state": [1.0, 2.0]}]),
            ResultSource::Reference,
        );
        let candidate = sample_set();

        let report = EquivalenceEngine::new(1e-10).compare("kalman_filter", &reference, &candidate);
        let failure = report.first_failure().unwrap();
        assert_eq!(failure.error.as_deref(), Some("missing from reference"));
    }

    #[test]
    fn test_details_sorted_by_case_name() {
        let reference = parse(
            json!([
                {"test_name": "zebra", "actual_x": 1.0},
                {"test_name": "alpha", "actual_x": 1.0}
            ]),
            ResultSource::Reference,
        );

        let report = EquivalenceEngine::new(1e-10).compare("a", &reference, &reference);
        let names: Vec<_> = report.details.iter().map(|d| d.test_name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zebra"]);
    }

    #[test]
    fn test_numeric_divergence_reported_exactly() {
        let reference = parse(
            json!([{"test_name": "t1", "actual_x": [1.0, 2.0], "tolerance": 1e-10}]),
            ResultSource::Reference,
        );
        let candidate = parse(
            json!([{"test_name": "t1", "actual_x": [1.0, 2.000_000_000_3]}]),
            ResultSource::Candidate,
        );

        let report = EquivalenceEngine::new(1e-10).compare("kalman_filter", &reference, &candidate);
        assert!(!report.all_passed);
        assert!((report.max_absolute_error - 3e-10).abs() < 1e-12);
    }

    #[test]
    fn test_report_is_deterministic_across_runs() {
        let reference = sample_set();
        let candidate = parse(
            json!([{"test_name": "nominal", "actual_state": [1.0, 2.1]}]),
            ResultSource::Candidate,
        );

        let engine = EquivalenceEngine::new(1e-10);
        let first = engine
            .compare("kalman_filter", &reference, &candidate)
            .to_json()
            .unwrap();
        let second = engine
            .compare("kalman_filter", &reference, &candidate)
            .to_json()
            .unwrap();
        assert_eq!(first, second);
    }
}
