//! Presence and truthiness predicates

use super::subject;
use crate::predicate::{Predicate, PredicateContext, PredicateError, Violation};
use serde_json::Value;

/// A value is falsy when absent, `null`, `false`, `0`, `""` or an empty container
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

/// Fails unless the value is truthy
pub struct Truthy;

impl Predicate for Truthy {
    fn name(&self) -> &str {
        "truthy"
    }

    fn evaluate(
        &self,
        value: Option<&Value>,
        _options: &Value,
        context: &PredicateContext<'_>,
    ) -> Result<Vec<Violation>, PredicateError> {
        if is_truthy(value) {
            return Ok(Vec::new());
        }
        Ok(vec![Violation::new(
            "truthy",
            format!("{} must be truthy", subject(context)),
        )])
    }
}

/// Fails when the value is truthy
pub struct Falsy;

impl Predicate for Falsy {
    fn name(&self) -> &str {
        "falsy"
    }

    fn evaluate(
        &self,
        value: Option<&Value>,
        _options: &Value,
        context: &PredicateContext<'_>,
    ) -> Result<Vec<Violation>, PredicateError> {
        if !is_truthy(value) {
            return Ok(Vec::new());
        }
        Ok(vec![Violation::new(
            "falsy",
            format!("{} must be falsy", subject(context)),
        )])
    }
}

/// Fails when the value is absent
pub struct Defined;

impl Predicate for Defined {
    fn name(&self) -> &str {
        "defined"
    }

    fn evaluate(
        &self,
        value: Option<&Value>,
        _options: &Value,
        context: &PredicateContext<'_>,
    ) -> Result<Vec<Violation>, PredicateError> {
        if value.is_some() {
            return Ok(Vec::new());
        }
        Ok(vec![Violation::new(
            "defined",
            format!("{} must be defined", subject(context)),
        )])
    }
}

/// Fails when the value is present
pub struct Undefined;

impl Predicate for Undefined {
    fn name(&self) -> &str {
        "undefined"
    }

    fn evaluate(
        &self,
        value: Option<&Value>,
        _options: &Value,
        context: &PredicateContext<'_>,
    ) -> Result<Vec<Violation>, PredicateError> {
        if value.is_none() {
            return Ok(Vec::new());
        }
        Ok(vec![Violation::new(
            "undefined",
            format!("{} must be undefined", subject(context)),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::test_support::run;
    use serde_json::json;

    #[test]
    fn test_truthy_failures() {
        for falsy in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
            let violations = run("truthy", Some(&falsy), Value::Null).unwrap();
            assert_eq!(violations.len(), 1, "{} should be falsy", falsy);
            assert_eq!(violations[0].code, "truthy");
        }
        assert_eq!(run("truthy", None, Value::Null).unwrap().len(), 1);
    }

    #[test]
    fn test_truthy_passes() {
        for truthy in [json!(true), json!(1), json!("x"), json!([0]), json!({"a": 1})] {
            assert!(run("truthy", Some(&truthy), Value::Null).unwrap().is_empty());
        }
    }

    #[test]
    fn test_falsy() {
        assert!(run("falsy", None, Value::Null).unwrap().is_empty());
        assert!(run("falsy", Some(&json!("")), Value::Null).unwrap().is_empty());
        let violations = run("falsy", Some(&json!({"a": 1})), Value::Null).unwrap();
        assert_eq!(violations[0].code, "falsy");
    }

    #[test]
    fn test_defined_and_undefined() {
        assert!(run("defined", Some(&json!(null)), Value::Null).unwrap().is_empty());
        assert_eq!(run("defined", None, Value::Null).unwrap().len(), 1);
        assert!(run("undefined", None, Value::Null).unwrap().is_empty());
        assert_eq!(run("undefined", Some(&json!(0)), Value::Null).unwrap().len(), 1);
    }
}
