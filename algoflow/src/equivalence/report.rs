//! Equivalence report types.
//!
//! Reports are immutable after construction and serialize byte-stably for
//! identical inputs: details are sorted by case name and field order is
//! fixed by the struct definitions.

use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};

/// Outcome of comparing one test case across producers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseOutcome {
    /// Case name.
    pub test_name: String,
    /// True if every paired element stayed within tolerance and the case
    /// was present on both sides.
    pub passed: bool,
    /// Largest absolute error over all compared elements.
    pub max_absolute_error: f64,
    /// Largest relative error over all compared elements.
    pub max_relative_error: f64,
    /// The effective absolute tolerance that gated the case.
    pub tolerance: f64,
    /// Cause of failure, when the case did not pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True when the failure was structural (missing case, missing field
    /// or length mismatch) rather than numeric.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub structural: bool,
}

impl CaseOutcome {
    /// Creates a passing outcome.
    #[must_use]
    pub fn passed(
        name: impl Into<String>,
        max_absolute_error: f64,
        max_relative_error: f64,
        tolerance: f64,
    ) -> Self {
        Self {
            test_name: name.into(),
            passed: true,
            max_absolute_error,
            max_relative_error,
            tolerance,
            error: None,
            structural: false,
        }
    }

    /// Creates a numeric (tolerance) failure outcome.
    #[must_use]
    pub fn exceeded(
        name: impl Into<String>,
        max_absolute_error: f64,
        max_relative_error: f64,
        tolerance: f64,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            test_name: name.into(),
            passed: false,
            max_absolute_error,
            max_relative_error,
            tolerance,
            error: Some(detail.into()),
            structural: false,
        }
    }

    /// Creates a structural failure outcome.
    #[must_use]
    pub fn structural(name: impl Into<String>, tolerance: f64, detail: impl Into<String>) -> Self {
        Self {
            test_name: name.into(),
            passed: false,
            max_absolute_error: 0.0,
            max_relative_error: 0.0,
            tolerance,
            error: Some(detail.into()),
            structural: true,
        }
    }
}

/// The report for one algorithm's equivalence run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquivalenceReport {
    /// The algorithm under comparison.
    pub algorithm: String,
    /// True when every case passed.
    pub all_passed: bool,
    /// Total cases considered (union of both sides).
    pub total_tests: usize,
    /// Cases that passed.
    pub passed_tests: usize,
    /// Cases that failed, structurally or numerically.
    pub failed_tests: usize,
    /// Run-level maximum absolute error.
    pub max_absolute_error: f64,
    /// Run-level maximum relative error.
    pub max_relative_error: f64,
    /// Per-case outcomes, sorted by case name.
    pub details: Vec<CaseOutcome>,
}

impl EquivalenceReport {
    /// Builds a report from per-case outcomes.
    ///
    /// `details` must already be sorted by case name; the engine
    /// guarantees this by iterating the sorted case-name union.
    #[must_use]
    pub fn from_details(algorithm: impl Into<String>, details: Vec<CaseOutcome>) -> Self {
        let passed_tests = details.iter().filter(|d| d.passed).count();
        let failed_tests = details.len() - passed_tests;
        let max_absolute_error = details
            .iter()
            .map(|d| d.max_absolute_error)
            .fold(0.0_f64, f64::max);
        let max_relative_error = details
            .iter()
            .map(|d| d.max_relative_error)
            .fold(0.0_f64, f64::max);

        Self {
            algorithm: algorithm.into(),
            all_passed: failed_tests == 0,
            total_tests: details.len(),
            passed_tests,
            failed_tests,
            max_absolute_error,
            max_relative_error,
            details,
        }
    }

    /// Returns the first failing case, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&CaseOutcome> {
        self.details.iter().find(|d| !d.passed)
    }

    /// Serializes the report to pretty JSON.
    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns a one-line human summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} passed, max abs err {:.2e}, max rel err {:.2e}",
            self.algorithm,
            self.passed_tests,
            self.total_tests,
            self.max_absolute_error,
            self.max_relative_error
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_aggregates() {
        let details = vec![
            CaseOutcome::passed("a", 1e-12, 1e-11, 1e-10),
            CaseOutcome::exceeded("b", 3e-9, 2e-8, 1e-10, "too far"),
            CaseOutcome::structural("c", 1e-10, "missing from candidate"),
        ];
        let report = EquivalenceReport::from_details("kalman_filter", details);

        assert!(!report.all_passed);
        assert_eq!(report.total_tests, 3);
        assert_eq!(report.passed_tests, 1);
        assert_eq!(report.failed_tests, 2);
        assert!((report.max_absolute_error - 3e-9).abs() < 1e-20);
        assert_eq!(report.first_failure().unwrap().test_name, "b");
    }

    #[test]
    fn test_all_passed_when_no_failures() {
        let report = EquivalenceReport::from_details(
            "pid",
            vec![CaseOutcome::passed("only", 0.0, 0.0, 1e-10)],
        );
        assert!(report.all_passed);
        assert_eq!(report.failed_tests, 0);
    }

    #[test]
    fn test_serialization_is_byte_stable() {
        let make = || {
            EquivalenceReport::from_details(
                "kalman_filter",
                vec![
                    CaseOutcome::passed("a", 1e-12, 1e-11, 1e-10),
                    CaseOutcome::structural("b", 1e-10, "missing from reference"),
                ],
            )
        };
        let first = make().to_json().unwrap();
        let second = make().to_json().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_json_field_names_match_contract() {
        let report =
            EquivalenceReport::from_details("a", vec![CaseOutcome::passed("t", 0.0, 0.0, 1e-10)]);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        for key in [
            "algorithm",
            "all_passed",
            "total_tests",
            "passed_tests",
            "failed_tests",
            "max_absolute_error",
            "max_relative_error",
            "details",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
        // Passing outcomes carry no error field.
        assert!(json["details"][0].get("error").is_none());
    }
}
