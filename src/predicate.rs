//! Predicate contract and registry
//!
//! A predicate is a named validation function. It receives the selected
//! value (or `None` when a projected field is absent), its options and a
//! context, and returns zero or more violations. External rule authors add
//! domain checks by implementing [`Predicate`] and registering it.

use crate::diagnostic::{Location, PathSegment};
use crate::document::Document;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Error evaluating a predicate; recovered into a `predicate-error` diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    #[error("invalid options for '{function}': {message}")]
    InvalidOptions { function: String, message: String },

    #[error("'{function}' expects {expected}, got {found}")]
    TypeMismatch {
        function: String,
        expected: String,
        found: String,
    },

    #[error("'{function}' failed: {message}")]
    Internal { function: String, message: String },
}

impl PredicateError {
    pub fn invalid_options(function: &str, message: impl Into<String>) -> Self {
        PredicateError::InvalidOptions {
            function: function.to_string(),
            message: message.into(),
        }
    }

    pub fn type_mismatch(function: &str, expected: &str, found: &Value) -> Self {
        PredicateError::TypeMismatch {
            function: function.to_string(),
            expected: expected.to_string(),
            found: value_kind(found).to_string(),
        }
    }

    pub fn internal(function: &str, message: impl Into<String>) -> Self {
        PredicateError::Internal {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

/// JSON type name of a value, for error messages
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One non-conformance found by a predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub message: String,
    pub code: String,
    /// Path below the evaluated value the violation points at
    pub path: Vec<PathSegment>,
}

impl Violation {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.to_string(),
            path: Vec::new(),
        }
    }

    /// Point the violation at a child of the evaluated value
    pub fn at(mut self, segment: impl Into<PathSegment>) -> Self {
        self.path.push(segment.into());
        self
    }
}

/// What a predicate knows about the value it is evaluating
#[derive(Debug, Clone, Copy)]
pub struct PredicateContext<'a> {
    pub document: &'a Document,
    pub rule_name: &'a str,
    /// Location of the evaluated value (after field projection)
    pub location: &'a Location,
    /// Location of the node the rule's `given` selected
    pub given_location: &'a Location,
}

/// A predicate bound to the options of one invocation
pub trait Check {
    fn check(&self, value: Option<&Value>, context: &PredicateContext<'_>) -> Result<Vec<Violation>, PredicateError>;
}

/// Check for predicates with nothing to prepare
struct Deferred<'a, P: ?Sized> {
    predicate: &'a P,
    options: &'a Value,
}

impl<P: Predicate + ?Sized> Check for Deferred<'_, P> {
    fn check(&self, value: Option<&Value>, context: &PredicateContext<'_>) -> Result<Vec<Violation>, PredicateError> {
        self.predicate.evaluate(value, self.options, context)
    }
}

/// A named validation function
pub trait Predicate: Send + Sync {
    /// Unique name used by rules (e.g. "pattern")
    fn name(&self) -> &str;

    /// Check options once per invocation, before any value is evaluated
    fn validate_options(&self, _options: &Value) -> Result<(), PredicateError> {
        Ok(())
    }

    /// Parse options and compile what they describe, once per invocation.
    ///
    /// The returned check is reused for every selected node. The default
    /// validates the options and defers to [`Predicate::evaluate`].
    fn prepare<'a>(&'a self, options: &'a Value) -> Result<Box<dyn Check + 'a>, PredicateError> {
        self.validate_options(options)?;
        Ok(Box::new(Deferred { predicate: self, options }))
    }

    /// Evaluate a value; `None` means the value is absent
    fn evaluate(
        &self,
        value: Option<&Value>,
        options: &Value,
        context: &PredicateContext<'_>,
    ) -> Result<Vec<Violation>, PredicateError>;
}

/// Deserialize predicate options into a typed struct.
///
/// A missing options object (`null`) deserializes from `{}`.
pub fn parse_options<T: DeserializeOwned>(function: &str, options: &Value) -> Result<T, PredicateError> {
    let options = if options.is_null() {
        Value::Object(Default::default())
    } else {
        options.clone()
    };
    serde_json::from_value(options)
        .map_err(|e| PredicateError::invalid_options(function, e.to_string()))
}

/// Registry of predicates keyed by name
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    predicates: HashMap<String, Arc<dyn Predicate>>,
}

impl PredicateRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in predicate
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::predicates::register_builtins(&mut registry);
        registry
    }

    /// Register a predicate, replacing any previous one with the same name
    pub fn register(&mut self, predicate: Arc<dyn Predicate>) -> Option<Arc<dyn Predicate>> {
        self.predicates
            .insert(predicate.name().to_string(), predicate)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Predicate>> {
        self.predicates.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up and run a predicate by name
    pub fn evaluate(
        &self,
        name: &str,
        value: Option<&Value>,
        options: &Value,
        context: &PredicateContext<'_>,
    ) -> Result<Vec<Violation>, PredicateError> {
        let predicate = self
            .get(name)
            .ok_or_else(|| PredicateError::internal(name, "no such function"))?;
        let check = predicate.prepare(options)?;
        check.check(value, context)
    }
}

impl std::fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateRegistry")
            .field("predicates", &self.names())
            .finish()
    }
}
