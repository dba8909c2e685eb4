//! Path selector: a JSONPath subset for picking nodes out of a document
//!
//! Supports:
//! - `$.info.version`, `$['x-tags']`, `$.paths[requestBody]` : child access
//! - `$.servers[0]`, `$.servers[-1]` : array index
//! - `$.paths[*]`, `$.paths.*` : wildcard, in document order
//! - `$..operationId` : recursive descent
//! - `$.paths.*[post,put]` : unions, in the order written
//! - `$.paths.*[?(@property == 'post' || @.deprecated)]` : filters
//! - `$.paths[*]~` : keys of the matched members

pub mod ast;
pub mod evaluator;
pub mod filter;
pub mod parser;

pub use ast::PathExpression;
pub use evaluator::Selected;
pub use parser::parse;

use serde_json::Value;
use thiserror::Error;

/// Error parsing a path expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset} in '{expression}'")]
pub struct SelectorError {
    pub expression: String,
    /// Byte offset into the trimmed expression
    pub offset: usize,
    pub message: String,
}

impl std::str::FromStr for PathExpression {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse `expression` and select from `root` in one call
pub fn select<'a>(root: &'a Value, expression: &str) -> Result<Vec<Selected<'a>>, SelectorError> {
    Ok(parse(expression)?.select(root))
}
