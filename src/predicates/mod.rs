//! Built-in predicates

pub mod casing;
pub mod empty_object;
pub mod enumeration;
pub mod length;
pub mod operation_ordering;
pub mod pattern;
pub mod responses;
pub mod truthy;

pub use casing::Casing;
pub use empty_object::EmptyObject;
pub use enumeration::Enumeration;
pub use length::Length;
pub use operation_ordering::OperationOrdering;
pub use pattern::Pattern;
pub use responses::DefaultResponseFallback;
pub use truthy::{Defined, Falsy, Truthy, Undefined};

use crate::predicate::{PredicateContext, PredicateRegistry};
use serde_json::Value;
use std::sync::Arc;

/// Register every built-in predicate
pub fn register_builtins(registry: &mut PredicateRegistry) {
    registry.register(Arc::new(Truthy));
    registry.register(Arc::new(Falsy));
    registry.register(Arc::new(Defined));
    registry.register(Arc::new(Undefined));
    registry.register(Arc::new(Pattern));
    registry.register(Arc::new(Casing));
    registry.register(Arc::new(Enumeration));
    registry.register(Arc::new(Length));
    registry.register(Arc::new(EmptyObject));
    registry.register(Arc::new(OperationOrdering));
    registry.register(Arc::new(DefaultResponseFallback));
}

/// `"name" property` for the evaluated location, or `value` at the root
pub(crate) fn subject(context: &PredicateContext<'_>) -> String {
    match context.location.last() {
        Some(segment) => format!("\"{}\" property", segment.as_property()),
        None => "value".to_string(),
    }
}

/// Scalar rendered as text; containers have no text form
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
