//! Result-set parsing for equivalence runs.
//!
//! Producers emit a JSON array of objects keyed by test-case name with
//! `actual_*` numeric fields (scalar or ordered sequence) and a
//! `tolerance` field. Shapes outside that contract are rejected rather
//! than coerced.

use crate::errors::PipelineError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Field prefix marking an output under comparison.
pub const ACTUAL_PREFIX: &str = "actual_";

/// Fields never treated as outputs by the legacy fallback.
const RESERVED_FIELDS: [&str; 4] = ["test_name", "tolerance", "status", "description"];

/// Which producer a result set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    /// The authoring environment's outputs.
    Reference,
    /// The generated implementation's outputs.
    Candidate,
}

impl fmt::Display for ResultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference => write!(f, "reference"),
            Self::Candidate => write!(f, "candidate"),
        }
    }
}

/// A numeric output field: a scalar or an ordered sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Numeric {
    /// A single value.
    Scalar(f64),
    /// An ordered sequence of values.
    Sequence(Vec<f64>),
}

impl Numeric {
    /// Parses a JSON value, rejecting non-numeric shapes.
    pub fn from_json(value: &Value) -> Result<Self, PipelineError> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .map(Self::Scalar)
                .ok_or_else(|| PipelineError::Input(format!("non-finite number: {n}"))),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Number(n) => out.push(n.as_f64().ok_or_else(|| {
                            PipelineError::Input(format!("non-finite number in sequence: {n}"))
                        })?),
                        other => {
                            return Err(PipelineError::Input(format!(
                                "sequence element is not a number: {other}"
                            )))
                        }
                    }
                }
                Ok(Self::Sequence(out))
            }
            other => Err(PipelineError::Input(format!(
                "expected number or array of numbers, got: {other}"
            ))),
        }
    }

    /// Views the value as a slice; scalars are single-element sequences.
    #[must_use]
    pub fn elements(&self) -> &[f64] {
        match self {
            Self::Scalar(v) => std::slice::from_ref(v),
            Self::Sequence(v) => v.as_slice(),
        }
    }

    /// Returns the element count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements().len()
    }

    /// Returns true if the sequence is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements().is_empty()
    }
}

/// Per-case tolerance. The absolute bound gates; the relative bound is
/// recorded for diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tolerance {
    /// Maximum allowed absolute difference.
    pub absolute: Option<f64>,
    /// Maximum expected relative difference, diagnostics only.
    pub relative: Option<f64>,
}

impl Tolerance {
    fn from_json(value: &Value) -> Result<Self, PipelineError> {
        match value {
            Value::Number(n) => Ok(Self {
                absolute: n.as_f64(),
                relative: None,
            }),
            Value::Object(map) => {
                let field = |key: &str| -> Result<Option<f64>, PipelineError> {
                    match map.get(key) {
                        None | Some(Value::Null) => Ok(None),
                        Some(Value::Number(n)) => Ok(n.as_f64()),
                        Some(other) => Err(PipelineError::Input(format!(
                            "tolerance.{key} is not a number: {other}"
                        ))),
                    }
                };
                Ok(Self {
                    absolute: field("absolute")?,
                    relative: field("relative")?,
                })
            }
            other => Err(PipelineError::Input(format!(
                "tolerance is neither a number nor an object: {other}"
            ))),
        }
    }
}

/// One test case's named output fields from one producer.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRecord {
    /// Case name, unique within a run.
    pub name: String,
    /// Output fields keyed by name, sorted for deterministic reports.
    pub fields: BTreeMap<String, Numeric>,
    /// Per-case tolerance override.
    pub tolerance: Tolerance,
}

impl CaseRecord {
    fn from_json(value: &Value, source: ResultSource) -> Result<Self, PipelineError> {
        let Value::Object(map) = value else {
            return Err(PipelineError::Input(format!(
                "{source} result entry is not an object: {value}"
            )));
        };

        let name = map
            .get("test_name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PipelineError::Input(format!("{source} result entry is missing 'test_name'"))
            })?
            .to_string();

        let tolerance = match map.get("tolerance") {
            Some(value) => Tolerance::from_json(value)
                .map_err(|e| PipelineError::Input(format!("case '{name}': {e}")))?,
            None => Tolerance::default(),
        };

        let mut fields = BTreeMap::new();
        let has_actual = map.keys().any(|k| k.starts_with(ACTUAL_PREFIX));
        for (key, raw) in map {
            let is_output = if has_actual {
                key.starts_with(ACTUAL_PREFIX)
            } else {
                // Legacy producers did not prefix outputs; take every
                // field except identity, tolerance and status fields.
                !RESERVED_FIELDS.contains(&key.as_str())
            };
            if !is_output {
                continue;
            }
            let numeric = Numeric::from_json(raw)
                .map_err(|e| PipelineError::Input(format!("case '{name}', field '{key}': {e}")))?;
            fields.insert(key.clone(), numeric);
        }

        Ok(Self {
            name,
            fields,
            tolerance,
        })
    }
}

/// All of one producer's test cases, keyed by case name.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// Cases keyed by name, sorted.
    pub cases: BTreeMap<String, CaseRecord>,
}

impl ResultSet {
    /// Parses a producer's JSON result array.
    ///
    /// Duplicate case names are rejected: case names must be unique
    /// within an equivalence run.
    pub fn from_json(value: &Value, source: ResultSource) -> Result<Self, PipelineError> {
        let Value::Array(entries) = value else {
            return Err(PipelineError::Input(format!(
                "{source} result set is not an array: got {}",
                type_name(value)
            )));
        };

        let mut cases = BTreeMap::new();
        for entry in entries {
            let record = CaseRecord::from_json(entry, source)?;
            let name = record.name.clone();
            if cases.insert(name.clone(), record).is_some() {
                return Err(PipelineError::Input(format!(
                    "{source} result set has duplicate case '{name}'"
                )));
            }
        }

        Ok(Self { cases })
    }

    /// Returns the number of cases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Returns true if there are no cases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_scalar_and_sequence() {
        let scalar = Numeric::from_json(&json!(1.5)).unwrap();
        assert_eq!(scalar.elements(), &[1.5]);

        let seq = Numeric::from_json(&json!([1.0, 2.0])).unwrap();
        assert_eq!(seq.elements(), &[1.0, 2.0]);
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn test_numeric_rejects_malformed_shapes() {
        assert!(Numeric::from_json(&json!("1.0")).is_err());
        assert!(Numeric::from_json(&json!([1.0, "x"])).is_err());
        assert!(Numeric::from_json(&json!({"v": 1.0})).is_err());
        assert!(Numeric::from_json(&json!(null)).is_err());
    }

    #[test]
    fn test_result_set_parses_producer_shape() {
        let value = json!([
            {
                "test_name": "nominal",
                "actual_state": [1.0, 2.0],
                "actual_covariance": [0.1, 0.0, 0.0, 0.1],
                "tolerance": 1e-10
            }
        ]);

        let set = ResultSet::from_json(&value, ResultSource::Reference).unwrap();
        assert_eq!(set.len(), 1);

        let case = &set.cases["nominal"];
        assert_eq!(case.fields.len(), 2);
        assert_eq!(case.tolerance.absolute, Some(1e-10));
        assert!(case.fields.contains_key("actual_state"));
    }

    #[test]
    fn test_tolerance_object_form() {
        let value = json!([
            {
                "test_name": "t",
                "actual_x": 1.0,
                "tolerance": {"absolute": 1e-8, "relative": 1e-6}
            }
        ]);
        let set = ResultSet::from_json(&value, ResultSource::Candidate).unwrap();
        let tol = set.cases["t"].tolerance;
        assert_eq!(tol.absolute, Some(1e-8));
        assert_eq!(tol.relative, Some(1e-6));
    }

    #[test]
    fn test_legacy_fallback_takes_unprefixed_fields() {
        let value = json!([
            {
                "test_name": "t",
                "description": "legacy case",
                "state": [1.0],
                "status": "passed",
                "tolerance": 1e-10
            }
        ]);
        let set = ResultSet::from_json(&value, ResultSource::Reference).unwrap();
        let case = &set.cases["t"];
        assert_eq!(case.fields.len(), 1);
        assert!(case.fields.contains_key("state"));
    }

    #[test]
    fn test_prefixed_fields_win_over_fallback() {
        let value = json!([
            {
                "test_name": "t",
                "actual_x": 1.0,
                "unprefixed": 2.0
            }
        ]);
        let set = ResultSet::from_json(&value, ResultSource::Reference).unwrap();
        assert_eq!(set.cases["t"].fields.len(), 1);
    }

    #[test]
    fn test_duplicate_case_names_rejected() {
        let value = json!([
            {"test_name": "t", "actual_x": 1.0},
            {"test_name": "t", "actual_x": 2.0}
        ]);
        let err = ResultSet::from_json(&value, ResultSource::Candidate).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_missing_test_name_rejected() {
        let value = json!([{"actual_x": 1.0}]);
        assert!(ResultSet::from_json(&value, ResultSource::Reference).is_err());
    }

    #[test]
    fn test_non_array_rejected() {
        assert!(ResultSet::from_json(&json!({}), ResultSource::Reference).is_err());
    }
}
