//! Success-path response predicate

use crate::predicate::{Predicate, PredicateContext, PredicateError, Violation};
use serde_json::Value;

const NAME: &str = "default-response-fallback";

/// `default`, a concrete 2xx code, or the `2XX` range
fn is_success_or_default(key: &str) -> bool {
    if key == "default" || key.eq_ignore_ascii_case("2xx") {
        return true;
    }
    let bytes = key.as_bytes();
    bytes.len() == 3 && bytes[0] == b'2' && bytes[1..].iter().all(u8::is_ascii_digit)
}

/// Fails when a responses object documents neither a 2xx response nor `default`
pub struct DefaultResponseFallback;

impl Predicate for DefaultResponseFallback {
    fn name(&self) -> &str {
        NAME
    }

    fn evaluate(
        &self,
        value: Option<&Value>,
        _options: &Value,
        _context: &PredicateContext<'_>,
    ) -> Result<Vec<Violation>, PredicateError> {
        let responses = match value {
            None => return Ok(Vec::new()),
            Some(Value::Object(map)) => map,
            Some(other) => return Err(PredicateError::type_mismatch(NAME, "a responses object", other)),
        };

        if responses.keys().any(|key| is_success_or_default(key)) {
            return Ok(Vec::new());
        }
        Ok(vec![Violation::new(
            "missing-success-response",
            "responses must include a 2xx response or a default response",
        )])
    }
}
