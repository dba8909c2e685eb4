//! HTTP method declaration order predicate

use crate::predicate::{parse_options, Check, Predicate, PredicateContext, PredicateError, Violation};
use serde::Deserialize;
use serde_json::Value;

const NAME: &str = "operation-ordering";

/// Canonical order of operations within a path item
pub const DEFAULT_ORDER: [&str; 8] = ["get", "post", "put", "patch", "delete", "options", "head", "trace"];

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OrderingOptions {
    #[serde(default)]
    order: Option<Vec<String>>,
}

impl OrderingOptions {
    fn parse(options: &Value) -> Result<Vec<String>, PredicateError> {
        let opts: OrderingOptions = parse_options(NAME, options)?;
        let order = match opts.order {
            Some(order) => order,
            None => return Ok(DEFAULT_ORDER.iter().map(|m| m.to_string()).collect()),
        };
        if order.is_empty() {
            return Err(PredicateError::invalid_options(NAME, "order must not be empty"));
        }
        for (i, method) in order.iter().enumerate() {
            if order[..i].contains(method) {
                return Err(PredicateError::invalid_options(
                    NAME,
                    format!("\"{}\" appears more than once in order", method),
                ));
            }
        }
        Ok(order)
    }
}

/// Method names in their expected order
struct MethodOrder(Vec<String>);

impl Check for MethodOrder {
    fn check(&self, value: Option<&Value>, _context: &PredicateContext<'_>) -> Result<Vec<Violation>, PredicateError> {
        let map = match value {
            None => return Ok(Vec::new()),
            Some(Value::Object(map)) => map,
            Some(other) => return Err(PredicateError::type_mismatch(NAME, "a path item object", other)),
        };

        let rank = |key: &str| self.0.iter().position(|m| m == key);

        let declared: Vec<(&str, usize)> = map
            .keys()
            .filter_map(|key| rank(key).map(|r| (key.as_str(), r)))
            .collect();

        for (i, &(key, key_rank)) in declared.iter().enumerate() {
            let Some(&(before, _)) = declared[..i].iter().find(|(_, r)| *r > key_rank) else {
                continue;
            };

            let expected = declared.iter().filter(|(_, r)| *r < key_rank).count() + 1;
            return Ok(vec![Violation::new(
                "operation-order",
                format!(
                    "\"{}\" must be declared before \"{}\" (expected position {} of {})",
                    key,
                    before,
                    expected,
                    declared.len()
                ),
            )
            .at(key)]);
        }

        Ok(Vec::new())
    }
}

/// Fails when a path item declares its operations out of order.
///
/// Reports at most one violation per path item, at the first key that comes
/// too late.
pub struct OperationOrdering;

impl Predicate for OperationOrdering {
    fn name(&self) -> &str {
        NAME
    }

    fn prepare<'a>(&'a self, options: &'a Value) -> Result<Box<dyn Check + 'a>, PredicateError> {
        Ok(Box::new(MethodOrder(OrderingOptions::parse(options)?)))
    }

    fn evaluate(
        &self,
        value: Option<&Value>,
        options: &Value,
        context: &PredicateContext<'_>,
    ) -> Result<Vec<Violation>, PredicateError> {
        MethodOrder(OrderingOptions::parse(options)?).check(value, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::PathSegment;
    use crate::predicate::test_support::run;
    use serde_json::json;

    #[test]
    fn test_out_of_order_names_key() {
        let path_item = json!({"post": {}, "get": {}});
        let violations = run(NAME, Some(&path_item), Value::Null).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "operation-order");
        assert_eq!(
            violations[0].message,
            "\"get\" must be declared before \"post\" (expected position 1 of 2)"
        );
        assert_eq!(violations[0].path, vec![PathSegment::Key("get".into())]);
    }

    #[test]
    fn test_canonical_order_passes() {
        let path_item = json!({"get": {}, "post": {}, "put": {}, "patch": {}, "delete": {}});
        assert!(run(NAME, Some(&path_item), Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_one_violation_per_path_item() {
        let path_item = json!({"delete": {}, "patch": {}, "put": {}, "get": {}});
        let violations = run(NAME, Some(&path_item), Value::Null).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, vec![PathSegment::Key("patch".into())]);
    }

    #[test]
    fn test_non_method_keys_ignored() {
        let path_item = json!({"summary": "s", "get": {}, "parameters": [], "post": {}});
        assert!(run(NAME, Some(&path_item), Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_custom_order() {
        let opts = json!({"order": ["post", "get"]});
        let path_item = json!({"post": {}, "get": {}});
        assert!(run(NAME, Some(&path_item), opts.clone()).unwrap().is_empty());

        let path_item = json!({"get": {}, "post": {}});
        assert_eq!(run(NAME, Some(&path_item), opts).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_options() {
        let err = run(NAME, Some(&json!({})), json!({"order": []})).unwrap_err();
        assert!(matches!(err, PredicateError::InvalidOptions { .. }));

        let err = run(NAME, Some(&json!({})), json!({"order": ["get", "get"]})).unwrap_err();
        assert!(matches!(err, PredicateError::InvalidOptions { .. }));
    }
}
