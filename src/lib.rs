//! oaslint - Declarative Rule Engine for API Specification Documents
//!
//! Validates OpenAPI-style documents against a declarative set of structural
//! and stylistic rules. Each rule selects nodes with a path expression, runs
//! predicates against them, and reports violations as diagnostics.
//!
//! # Architecture
//!
//! ```text
//! RuleSet -> resolve -> Evaluator -> Path Selector -> Predicate -> Diagnostic
//! ```
//!
//! Rule sets may extend other sets; resolution merges the inheritance graph
//! into one ordered list of rules before any document is evaluated. The
//! evaluator never mutates the document and may run rules in parallel,
//! restoring declaration order in its report.
//!
//! # Writing Rules
//!
//! Rules are data, written in YAML or JSON:
//!
//! ```yaml
//! extends: [api-guidelines]
//! rules:
//!   semver: off
//!   info-contact:
//!     description: Info object must have a contact
//!     severity: warn
//!     given: $.info
//!     then:
//!       field: contact
//!       function: truthy
//! ```
//!
//! New checks are added by implementing [`Predicate`] and registering it in a
//! [`PredicateRegistry`].

pub mod config;
pub mod diagnostic;
pub mod document;
pub mod engine;
pub mod loader;
pub mod predicate;
pub mod predicates;
pub mod presets;
pub mod rule;
pub mod ruleset;
pub mod selector;
pub mod template;

// Re-export main types
pub use config::{ConfigError, EngineConfig};
pub use diagnostic::{Diagnostic, Location, PathSegment, RuleSeverity, Severity};
pub use document::{Document, DocumentError, Format};
pub use engine::{Evaluator, RuleTiming, RunContext, RunReport};
pub use loader::RulesetLoader;
pub use predicate::{Check, Predicate, PredicateContext, PredicateError, PredicateRegistry, Violation};
pub use rule::{Field, InvocationSpec, Rule, RuleDefinition, RuleSpec, RuleType};
pub use ruleset::{ResolvedRuleSet, RuleSet, RuleSetCatalog};
pub use selector::{select, PathExpression, Selected, SelectorError};
