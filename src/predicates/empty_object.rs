//! Vacuous container predicate
//!
//! Catches `security: {}` entries (and `security: []` lists) that look like
//! security is applied while enforcing nothing.

use super::subject;
use crate::predicate::{Predicate, PredicateContext, PredicateError, Violation};
use serde_json::Value;

/// Fails when the value is a mapping with no keys or an empty sequence
pub struct EmptyObject;

impl Predicate for EmptyObject {
    fn name(&self) -> &str {
        "empty-object"
    }

    fn evaluate(
        &self,
        value: Option<&Value>,
        _options: &Value,
        context: &PredicateContext<'_>,
    ) -> Result<Vec<Violation>, PredicateError> {
        let empty = match value {
            Some(Value::Object(map)) => map.is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            _ => false,
        };
        if !empty {
            return Ok(Vec::new());
        }
        Ok(vec![Violation::new(
            "empty-object",
            format!("{} must not be empty", subject(context)),
        )])
    }
}
