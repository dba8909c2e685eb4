//! Allowed-values predicate

use super::scalar_text;
use crate::predicate::{parse_options, Check, Predicate, PredicateContext, PredicateError, Violation};
use serde::Deserialize;
use serde_json::Value;

const NAME: &str = "enumeration";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnumerationOptions {
    values: Vec<Value>,
}

/// Validated allowed values
struct Allowed {
    values: Vec<Value>,
    listing: String,
}

impl Allowed {
    fn from_options(options: &Value) -> Result<Self, PredicateError> {
        let opts: EnumerationOptions = parse_options(NAME, options)?;
        if let Some(bad) = opts.values.iter().find(|v| v.is_array() || v.is_object()) {
            return Err(PredicateError::invalid_options(
                NAME,
                format!("values must be scalars, found {}", bad),
            ));
        }
        let listing = opts
            .values
            .iter()
            .filter_map(scalar_text)
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Self {
            values: opts.values,
            listing,
        })
    }
}

impl Check for Allowed {
    fn check(&self, value: Option<&Value>, _context: &PredicateContext<'_>) -> Result<Vec<Violation>, PredicateError> {
        let Some(value) = value else {
            return Ok(Vec::new());
        };
        let text = scalar_text(value)
            .ok_or_else(|| PredicateError::type_mismatch(NAME, "a scalar", value))?;

        if self.values.contains(value) {
            return Ok(Vec::new());
        }
        Ok(vec![Violation::new(
            NAME,
            format!("\"{}\" must be one of: {}", text, self.listing),
        )])
    }
}

/// Fails when a scalar is not one of `values`
pub struct Enumeration;

impl Predicate for Enumeration {
    fn name(&self) -> &str {
        NAME
    }

    fn prepare<'a>(&'a self, options: &'a Value) -> Result<Box<dyn Check + 'a>, PredicateError> {
        Ok(Box::new(Allowed::from_options(options)?))
    }

    fn evaluate(
        &self,
        value: Option<&Value>,
        options: &Value,
        context: &PredicateContext<'_>,
    ) -> Result<Vec<Violation>, PredicateError> {
        Allowed::from_options(options)?.check(value, context)
    }
}
