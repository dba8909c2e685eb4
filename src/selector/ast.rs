//! Path expression syntax tree
//!
//! An expression is parsed once into a flat list of [`Step`]s; evaluation
//! walks the list instead of re-reading the query text at every node.

use regex::Regex;
use serde_json::Value;
use std::fmt;

/// A compiled path expression such as `$.paths[*][*].responses`
#[derive(Debug, Clone)]
pub struct PathExpression {
    pub(crate) source: String,
    pub(crate) steps: Vec<Step>,
    /// Trailing `~`: yield the keys of the matched members instead of their values
    pub(crate) keys: bool,
}

impl PathExpression {
    /// The expression text as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Whether the expression selects member keys (`~` suffix)
    pub fn selects_keys(&self) -> bool {
        self.keys
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// One step of an expression, applied to every node in the current set
#[derive(Debug, Clone)]
pub enum Step {
    /// Apply to the node itself (`.name`, `[0]`, `[*]`, `[?(...)]`)
    Child(Selector),
    /// Apply to the node and every descendant (`..name`)
    Descendant(Selector),
}

/// What a step picks out of a node
#[derive(Debug, Clone)]
pub enum Selector {
    /// Member by key
    Name(String),
    /// Array element; negative indices count from the end
    Index(i64),
    /// Every member or element, in document order
    Wildcard,
    /// Several names/indices, in the order written
    Union(Vec<UnionMember>),
    /// Members or elements satisfying a filter
    Filter(FilterExpr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnionMember {
    Name(String),
    Index(i64),
}

/// Boolean filter expression evaluated against one child
#[derive(Debug, Clone)]
pub enum FilterExpr {
    Or(Box<FilterExpr>, Box<FilterExpr>),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
    /// Bare operand, tested for truthiness
    Test(Operand),
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    /// `operand in [a, b, ...]`
    In { left: Operand, list: Vec<Value> },
    /// `operand =~ /re/`
    Matches { left: Operand, regex: Regex },
}

/// A value referenced from inside a filter
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `@`, `@.a.b`, `@['a-b'][0]`
    Current(Vec<PropertyKey>),
    /// `@property`: key or index of the child being tested
    Property,
    /// `@parentProperty`: key or index of the node owning the child
    ParentProperty,
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKey {
    Name(String),
    Index(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        f.write_str(op)
    }
}
