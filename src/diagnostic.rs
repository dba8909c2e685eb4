//! Diagnostic types for linting results

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure code used when a predicate could not evaluate a value
pub const PREDICATE_ERROR_CODE: &str = "predicate-error";

/// Severity level for diagnostics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    #[serde(alias = "hint")]
    Info,
    /// Warning - potential issue
    #[default]
    #[serde(alias = "warning")]
    Warn,
    /// Error - definite problem
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warn => write!(f, "warn"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "hint" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" | "err" => Ok(Severity::Error),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// Severity as configured on a rule, including the `off` switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    #[serde(alias = "hint")]
    Info,
    #[default]
    #[serde(alias = "warning")]
    Warn,
    Error,
    Off,
}

impl RuleSeverity {
    /// Severity carried by the rule's diagnostics, `None` when the rule is off
    pub fn level(self) -> Option<Severity> {
        match self {
            RuleSeverity::Info => Some(Severity::Info),
            RuleSeverity::Warn => Some(Severity::Warn),
            RuleSeverity::Error => Some(Severity::Error),
            RuleSeverity::Off => None,
        }
    }

    pub fn is_off(self) -> bool {
        self == RuleSeverity::Off
    }
}

impl From<Severity> for RuleSeverity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Info => RuleSeverity::Info,
            Severity::Warn => RuleSeverity::Warn,
            Severity::Error => RuleSeverity::Error,
        }
    }
}

impl fmt::Display for RuleSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level() {
            Some(level) => level.fmt(f),
            None => write!(f, "off"),
        }
    }
}

impl std::str::FromStr for RuleSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("off") {
            return Ok(RuleSeverity::Off);
        }
        s.parse::<Severity>().map(RuleSeverity::from)
    }
}

/// One step of a location inside the document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    /// Render the segment the way it is used as a property name
    pub fn as_property(&self) -> String {
        match self {
            PathSegment::Key(key) => key.clone(),
            PathSegment::Index(index) => index.to_string(),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Location of a node, as the sequence of keys and indices from the root
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(pub Vec<PathSegment>);

impl Location {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Location of a child of this node
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Location of this node extended by a relative path
    pub fn join(&self, relative: &[PathSegment]) -> Self {
        let mut segments = self.0.clone();
        segments.extend(relative.iter().cloned());
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Location {
    /// JSON pointer form, e.g. `#/paths/~1pets/get`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#")?;
        for segment in &self.0 {
            let raw = segment.as_property();
            write!(f, "/{}", raw.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for Location {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A lint diagnostic produced by one rule against one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Rule that triggered this diagnostic
    pub rule_name: String,
    /// Severity level
    pub severity: Severity,
    /// Human-readable message, already template-expanded
    pub message: String,
    /// Location in the document
    pub path: Location,
    /// Predicate-specific failure code (e.g. "pattern-mismatch")
    pub code: String,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(
        rule_name: &str,
        severity: Severity,
        message: &str,
        path: Location,
        code: &str,
    ) -> Self {
        Self {
            rule_name: rule_name.to_string(),
            severity,
            message: message.to_string(),
            path,
            code: code.to_string(),
        }
    }

    /// Create the diagnostic reported when a predicate fails to evaluate
    pub fn predicate_error(rule_name: &str, message: &str, path: Location) -> Self {
        Self::new(
            rule_name,
            Severity::Error,
            message,
            path,
            PREDICATE_ERROR_CODE,
        )
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Check if this is a warning
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warn
    }

    pub fn is_predicate_error(&self) -> bool {
        self.code == PREDICATE_ERROR_CODE
    }
}
