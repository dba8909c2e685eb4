//! Size bounds predicate

use crate::predicate::{parse_options, Predicate, PredicateContext, PredicateError, Violation};
use serde::Deserialize;
use serde_json::Value;

const NAME: &str = "length";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LengthOptions {
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
}

impl LengthOptions {
    fn parse(options: &Value) -> Result<Self, PredicateError> {
        let opts: LengthOptions = parse_options(NAME, options)?;
        match (opts.min, opts.max) {
            (None, None) => Err(PredicateError::invalid_options(
                NAME,
                "at least one of \"min\" or \"max\" is required",
            )),
            (Some(min), Some(max)) if min > max => Err(PredicateError::invalid_options(
                NAME,
                format!("min ({}) is greater than max ({})", min, max),
            )),
            _ => Ok(opts),
        }
    }
}

/// Measure a value: characters, items, keys, or the number itself
fn measure(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => Some(s.chars().count() as f64),
        Value::Array(items) => Some(items.len() as f64),
        Value::Object(map) => Some(map.len() as f64),
        Value::Number(n) => n.as_f64(),
        Value::Bool(_) | Value::Null => None,
    }
}

/// Fails when a value's size falls outside `min`/`max`
pub struct Length;

impl Predicate for Length {
    fn name(&self) -> &str {
        NAME
    }

    fn validate_options(&self, options: &Value) -> Result<(), PredicateError> {
        LengthOptions::parse(options).map(|_| ())
    }

    fn evaluate(
        &self,
        value: Option<&Value>,
        options: &Value,
        _context: &PredicateContext<'_>,
    ) -> Result<Vec<Violation>, PredicateError> {
        let Some(value) = value else {
            return Ok(Vec::new());
        };
        let size = measure(value).ok_or_else(|| {
            PredicateError::type_mismatch(NAME, "a string, number, array or object", value)
        })?;

        let opts = LengthOptions::parse(options)?;
        let mut violations = Vec::new();
        if let Some(min) = opts.min {
            if size < min {
                violations.push(Violation::new(NAME, format!("must not be shorter than {}", min)));
            }
        }
        if let Some(max) = opts.max {
            if size > max {
                violations.push(Violation::new(NAME, format!("must not be longer than {}", max)));
            }
        }
        Ok(violations)
    }
}
