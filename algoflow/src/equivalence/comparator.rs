//! Field-by-field numeric comparison within tolerance.

use super::report::CaseOutcome;
use super::value::CaseRecord;

/// Guard for relative-error division; small enough not to mask true
/// differences near zero.
pub const RELATIVE_EPSILON: f64 = 1e-15;

/// Compares one test case's reference and candidate outputs.
#[derive(Debug, Clone, Copy)]
pub struct ToleranceComparator {
    default_tolerance: f64,
}

impl ToleranceComparator {
    /// Creates a comparator with the run-level default absolute tolerance.
    #[must_use]
    pub fn new(default_tolerance: f64) -> Self {
        Self { default_tolerance }
    }

    /// Returns the effective absolute tolerance for a case: the case
    /// override when present, else the run-level default.
    #[must_use]
    pub fn effective_tolerance(&self, case: &CaseRecord) -> f64 {
        case.tolerance.absolute.unwrap_or(self.default_tolerance)
    }

    /// Compares a reference case against its candidate counterpart.
    ///
    /// Only the reference side's output fields are compared. The error
    /// direction is `reference - candidate`, but only the magnitude is
    /// reported. A sequence-length mismatch or missing candidate field
    /// fails the case structurally without numeric comparison of that
    /// field; remaining fields are still scanned so the reported maxima
    /// cover the whole case.
    #[must_use]
    pub fn compare(&self, reference: &CaseRecord, candidate: &CaseRecord) -> CaseOutcome {
        let tolerance = self.effective_tolerance(reference);

        let mut max_abs = 0.0_f64;
        let mut max_rel = 0.0_f64;
        let mut first_error: Option<(String, bool)> = None; // (detail, structural)

        for (field, ref_value) in &reference.fields {
            let Some(cand_value) = candidate.fields.get(field) else {
                if first_error.is_none() {
                    first_error = Some((format!("field '{field}' missing from candidate"), true));
                }
                continue;
            };

            let ref_elems = ref_value.elements();
            let cand_elems = cand_value.elements();
            if ref_elems.len() != cand_elems.len() {
                if first_error.is_none() {
                    first_error = Some((
                        format!(
                            "field '{field}' length mismatch: reference {}, candidate {}",
                            ref_elems.len(),
                            cand_elems.len()
                        ),
                        true,
                    ));
                }
                continue;
            }

            for (index, (r, c)) in ref_elems.iter().zip(cand_elems.iter()).enumerate() {
                let abs_err = (r - c).abs();
                let rel_err = abs_err / r.abs().max(RELATIVE_EPSILON);
                max_abs = max_abs.max(abs_err);
                max_rel = max_rel.max(rel_err);

                if abs_err > tolerance && first_error.is_none() {
                    first_error = Some((
                        format!(
                            "field '{field}'[{index}]: reference {r} vs candidate {c} \
                             (abs err {abs_err:e} > tolerance {tolerance:e})"
                        ),
                        false,
                    ));
                }
            }
        }

        match first_error {
            None => CaseOutcome::passed(&reference.name, max_abs, max_rel, tolerance),
            Some((detail, true)) => {
                let mut outcome = CaseOutcome::structural(&reference.name, tolerance, detail);
                // Keep whatever numeric maxima were accumulated from the
                // fields that did line up.
                outcome.max_absolute_error = max_abs;
                outcome.max_relative_error = max_rel;
                outcome
            }
            Some((detail, false)) => {
                CaseOutcome::exceeded(&reference.name, max_abs, max_rel, tolerance, detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equivalence::value::{ResultSet, ResultSource};
    use serde_json::json;

    fn case(set: &ResultSet, name: &str) -> CaseRecord {
        set.cases[name].clone()
    }

    fn parse(value: serde_json::Value, source: ResultSource) -> ResultSet {
        ResultSet::from_json(&value, source).unwrap()
    }

    #[test]
    fn test_identical_values_pass_with_zero_error() {
        let reference = parse(
            json!([{"test_name": "t", "actual_x": [1.0, 2.0], "tolerance": 1e-10}]),
            ResultSource::Reference,
        );
        let candidate = parse(
            json!([{"test_name": "t", "actual_x": [1.0, 2.0]}]),
            ResultSource::Candidate,
        );

        let outcome = ToleranceComparator::new(1e-10)
            .compare(&case(&reference, "t"), &case(&candidate, "t"));

        assert!(outcome.passed);
        assert_eq!(outcome.max_absolute_error, 0.0);
        assert_eq!(outcome.max_relative_error, 0.0);
    }

    #[test]
    fn test_error_magnitude_is_symmetric() {
        let comparator = ToleranceComparator::new(1.0);
        let a = parse(
            json!([{"test_name": "t", "actual_x": 1.0}]),
            ResultSource::Reference,
        );
        let b = parse(
            json!([{"test_name": "t", "actual_x": 1.5}]),
            ResultSource::Candidate,
        );

        let forward = comparator.compare(&case(&a, "t"), &case(&b, "t"));
        let backward = comparator.compare(&case(&b, "t"), &case(&a, "t"));
        assert_eq!(forward.max_absolute_error, backward.max_absolute_error);
    }

    #[test]
    fn test_exceeding_tolerance_fails_with_both_values() {
        let reference = parse(
            json!([{"test_name": "t1", "actual_x": [1.0, 2.0], "tolerance": 1e-10}]),
            ResultSource::Reference,
        );
        let candidate = parse(
            json!([{"test_name": "t1", "actual_x": [1.0, 2.000_000_000_3]}]),
            ResultSource::Candidate,
        );

        let outcome = ToleranceComparator::new(1e-10)
            .compare(&case(&reference, "t1"), &case(&candidate, "t1"));

        assert!(!outcome.passed);
        assert!(!outcome.structural);
        // abs err = 3e-10, beyond the 1e-10 tolerance.
        assert!(outcome.max_absolute_error > 1e-10);
        assert!((outcome.max_absolute_error - 3e-10).abs() < 1e-12);
        let detail = outcome.error.unwrap();
        assert!(detail.contains("reference 2"));
        assert!(detail.contains("candidate 2.0000000003"));
    }

    #[test]
    fn test_case_override_beats_run_default() {
        let reference = parse(
            json!([{"test_name": "t", "actual_x": 1.0, "tolerance": 0.5}]),
            ResultSource::Reference,
        );
        let candidate = parse(
            json!([{"test_name": "t", "actual_x": 1.3}]),
            ResultSource::Candidate,
        );

        // Run default would fail this; the case override allows it.
        let outcome = ToleranceComparator::new(1e-10)
            .compare(&case(&reference, "t"), &case(&candidate, "t"));
        assert!(outcome.passed);
        assert_eq!(outcome.tolerance, 0.5);
    }

    #[test]
    fn test_length_mismatch_is_structural() {
        let reference = parse(
            json!([{"test_name": "t", "actual_x": [1.0, 2.0]}]),
            ResultSource::Reference,
        );
        let candidate = parse(
            json!([{"test_name": "t", "actual_x": [1.0]}]),
            ResultSource::Candidate,
        );

        let outcome = ToleranceComparator::new(1e-10)
            .compare(&case(&reference, "t"), &case(&candidate, "t"));
        assert!(!outcome.passed);
        assert!(outcome.structural);
        assert!(outcome.error.unwrap().contains("length mismatch"));
    }

    #[test]
    fn test_missing_candidate_field_is_structural() {
        let reference = parse(
            json!([{"test_name": "t", "actual_x": 1.0, "actual_y": 2.0}]),
            ResultSource::Reference,
        );
        let candidate = parse(
            json!([{"test_name": "t", "actual_x": 1.0}]),
            ResultSource::Candidate,
        );

        let outcome = ToleranceComparator::new(1e-10)
            .compare(&case(&reference, "t"), &case(&candidate, "t"));
        assert!(!outcome.passed);
        assert!(outcome.structural);
        assert!(outcome.error.unwrap().contains("missing from candidate"));
    }

    #[test]
    fn test_relative_error_near_zero_reference() {
        let reference = parse(
            json!([{"test_name": "t", "actual_x": 0.0, "tolerance": 1.0}]),
            ResultSource::Reference,
        );
        let candidate = parse(
            json!([{"test_name": "t", "actual_x": 1e-16}]),
            ResultSource::Candidate,
        );

        let outcome = ToleranceComparator::new(1e-10)
            .compare(&case(&reference, "t"), &case(&candidate, "t"));
        assert!(outcome.passed);
        // Division is guarded by epsilon, so the relative error is finite.
        assert!(outcome.max_relative_error.is_finite());
    }

    #[test]
    fn test_scalar_treated_as_single_element_sequence() {
        let reference = parse(
            json!([{"test_name": "t", "actual_x": 1.0}]),
            ResultSource::Reference,
        );
        let candidate = parse(
            json!([{"test_name": "t", "actual_x": [1.0]}]),
            ResultSource::Candidate,
        );

        let outcome = ToleranceComparator::new(1e-10)
            .compare(&case(&reference, "t"), &case(&candidate, "t"));
        assert!(outcome.passed);
    }
}
