//! Filter expression evaluation

use super::ast::{CompareOp, FilterExpr, Operand, PropertyKey};
use crate::diagnostic::PathSegment;
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;

/// The child being tested by a filter, with the keys around it
pub(crate) struct FilterScope<'a> {
    pub value: &'a Value,
    pub property: &'a PathSegment,
    pub parent_property: Option<&'a PathSegment>,
}

impl FilterExpr {
    /// Evaluate the filter against one child
    pub(crate) fn matches(&self, scope: &FilterScope<'_>) -> bool {
        match self {
            FilterExpr::Or(left, right) => left.matches(scope) || right.matches(scope),
            FilterExpr::And(left, right) => left.matches(scope) && right.matches(scope),
            FilterExpr::Not(inner) => !inner.matches(scope),
            FilterExpr::Test(operand) => resolve(operand, scope).is_some_and(|v| is_truthy(&v)),
            FilterExpr::Compare { left, op, right } => {
                compare(resolve(left, scope), *op, resolve(right, scope))
            }
            FilterExpr::In { left, list } => resolve(left, scope)
                .is_some_and(|v| list.iter().any(|item| loosely_equal(&v, item))),
            FilterExpr::Matches { left, regex } => resolve(left, scope)
                .is_some_and(|v| v.as_str().is_some_and(|s| regex.is_match(s))),
        }
    }
}

/// Resolve an operand; `None` means the referenced value does not exist
fn resolve<'a>(operand: &'a Operand, scope: &FilterScope<'a>) -> Option<Cow<'a, Value>> {
    match operand {
        Operand::Literal(value) => Some(Cow::Borrowed(value)),
        Operand::Property => Some(Cow::Owned(segment_value(scope.property))),
        Operand::ParentProperty => scope.parent_property.map(|p| Cow::Owned(segment_value(p))),
        Operand::Current(keys) => {
            let mut current = scope.value;
            for key in keys {
                current = match (key, current) {
                    (PropertyKey::Name(name), Value::Object(map)) => map.get(name)?,
                    (PropertyKey::Index(index), Value::Array(items)) => {
                        items.get(normalize_index(*index, items.len())?)?
                    }
                    (PropertyKey::Index(index), Value::Object(map)) => {
                        map.get(&index.to_string())?
                    }
                    _ => return None,
                };
            }
            Some(Cow::Borrowed(current))
        }
    }
}

fn segment_value(segment: &PathSegment) -> Value {
    match segment {
        PathSegment::Key(key) => Value::String(key.clone()),
        PathSegment::Index(index) => Value::from(*index),
    }
}

/// Map a possibly negative index onto `0..len`
pub(crate) fn normalize_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        let index = usize::try_from(index).ok()?;
        (index < len).then_some(index)
    } else {
        let back = usize::try_from(index.unsigned_abs()).ok()?;
        len.checked_sub(back)
    }
}

/// Truthiness as filter expressions see it: containers are always truthy
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Equality that lets a number match its string form, so
/// `@property == 200` matches the key "200"
fn loosely_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            let s = s.trim();
            !s.is_empty() && s.parse::<f64>().ok() == n.as_f64()
        }
        _ => left == right,
    }
}

fn compare(left: Option<Cow<'_, Value>>, op: CompareOp, right: Option<Cow<'_, Value>>) -> bool {
    match op {
        CompareOp::Eq => match (&left, &right) {
            (Some(l), Some(r)) => loosely_equal(l, r),
            (None, None) => true,
            _ => false,
        },
        CompareOp::Ne => !compare(left, CompareOp::Eq, right),
        _ => {
            let (Some(l), Some(r)) = (left, right) else {
                return false;
            };
            let ordering = match (l.as_ref(), r.as_ref()) {
                (Value::Number(a), Value::Number(b)) => a
                    .as_f64()
                    .zip(b.as_f64())
                    .and_then(|(a, b)| a.partial_cmp(&b)),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => None,
            };
            match ordering {
                Some(Ordering::Less) => matches!(op, CompareOp::Lt | CompareOp::Le),
                Some(Ordering::Equal) => matches!(op, CompareOp::Le | CompareOp::Ge),
                Some(Ordering::Greater) => matches!(op, CompareOp::Gt | CompareOp::Ge),
                None => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::ast::{Selector, Step};
    use crate::selector::parse;
    use serde_json::json;

    fn filter_of(expression: &str) -> FilterExpr {
        let expr = parse(expression).unwrap();
        match expr.steps().last() {
            Some(Step::Child(Selector::Filter(f))) => f.clone(),
            other => panic!("not a filter: {:?}", other),
        }
    }

    fn check(expression: &str, value: &Value, property: &str) -> bool {
        let property = PathSegment::Key(property.to_string());
        let parent = PathSegment::Key("parent".to_string());
        filter_of(expression).matches(&FilterScope {
            value,
            property: &property,
            parent_property: Some(&parent),
        })
    }

    #[test]
    fn test_property_equality() {
        let v = json!({});
        assert!(check("$[?(@property == 'post')]", &v, "post"));
        assert!(!check("$[?(@property == 'post')]", &v, "get"));
        assert!(check("$[?(@property != '204')]", &v, "200"));
        assert!(!check("$[?(@property != '204')]", &v, "204"));
        assert!(check("$[?(@parentProperty === 'parent')]", &v, "x"));
    }

    #[test]
    fn test_number_matches_numeric_key() {
        let v = json!({});
        assert!(check("$[?(@property == 200)]", &v, "200"));
        assert!(check("$[?(@property != 204)]", &v, "200"));
        assert!(!check("$[?(@property == 200)]", &v, "default"));
        assert!(check("$[?(@property in [200, 201])]", &v, "201"));
        assert!(check("$[?(@.code == '7')]", &json!({"code": 7}), "x"));
    }

    #[test]
    fn test_logical_operators() {
        let v = json!({});
        let expr = "$[?(@property == 'post' || @property == 'put' || @property == 'delete')]";
        assert!(check(expr, &v, "put"));
        assert!(check(expr, &v, "delete"));
        assert!(!check(expr, &v, "get"));

        let v = json!({"a": 1, "b": true});
        assert!(check("$[?(@.a == 1 && @.b)]", &v, "x"));
        assert!(!check("$[?(@.a == 1 && !@.b)]", &v, "x"));
    }

    #[test]
    fn test_truthiness_of_members() {
        let v = json!({"get": {}, "summary": "", "count": 0});
        assert!(check("$[?(@.get || @.post)]", &v, "x"));
        assert!(!check("$[?(@.post)]", &v, "x"));
        assert!(!check("$[?(@.summary)]", &v, "x"));
        assert!(!check("$[?(@.count)]", &v, "x"));
    }

    #[test]
    fn test_membership_and_regex() {
        let v = json!({"in": "query", "name": "X-Trace"});
        assert!(check("$[?(@.in in ['query', 'header'])]", &v, "x"));
        assert!(!check("$[?(@.in in ['path'])]", &v, "x"));
        assert!(check("$[?(@.name =~ /^x-/i)]", &v, "x"));
        assert!(!check("$[?(@.name =~ /^x-/)]", &v, "x"));
    }

    #[test]
    fn test_ordering_comparisons() {
        let v = json!({"n": 3, "s": "b"});
        assert!(check("$[?(@.n > 2)]", &v, "x"));
        assert!(check("$[?(@.n <= 3)]", &v, "x"));
        assert!(!check("$[?(@.n < 3)]", &v, "x"));
        assert!(check("$[?(@.s >= 'a')]", &v, "x"));
        assert!(!check("$[?(@.s > 1)]", &v, "x"));
        assert!(!check("$[?(@.missing > 1)]", &v, "x"));
    }

    #[test]
    fn test_missing_values() {
        let v = json!({"a": null});
        assert!(check("$[?(@.missing != 'x')]", &v, "x"));
        assert!(!check("$[?(@.missing == 'x')]", &v, "x"));
        assert!(check("$[?(@.a == null)]", &v, "x"));
    }

    #[test]
    fn test_normalize_index() {
        assert_eq!(normalize_index(0, 3), Some(0));
        assert_eq!(normalize_index(3, 3), None);
        assert_eq!(normalize_index(-1, 3), Some(2));
        assert_eq!(normalize_index(-4, 3), None);
    }
}
