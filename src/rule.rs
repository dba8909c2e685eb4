//! Rule definition and field projection

use crate::config::ConfigError;
use crate::diagnostic::{Location, PathSegment, RuleSeverity};
use crate::document::Format;
use crate::selector::{parse, PathExpression, SelectorError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// Rule type, informational only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    /// Stylistic convention
    Style,
    /// Structural validity
    Validation,
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleType::Style => write!(f, "style"),
            RuleType::Validation => write!(f, "validation"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// Accept either a single item or a list of items
pub(crate) fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(item) => vec![item],
        OneOrMany::Many(items) => items,
    })
}

fn optional_one_or_many<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    one_or_many(deserializer).map(Some)
}

/// One entry of a rule's `then`, as written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationSpec {
    /// Projection applied to each selected node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Predicate name
    pub function: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_options: Option<Value>,
}

impl InvocationSpec {
    pub fn new(function: &str) -> Self {
        Self {
            field: None,
            function: function.to_string(),
            function_options: None,
        }
    }

    pub fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.function_options = Some(options);
        self
    }
}

/// A rule as written in a rule-set file.
///
/// Every field is optional so the same shape serves both complete rules and
/// patches onto an inherited rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Message template (see [`crate::template`])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<RuleSeverity>,

    /// Path expressions selecting the nodes to check
    #[serde(
        default,
        deserialize_with = "optional_one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub given: Option<Vec<String>>,

    /// Predicate invocations run against each selected node
    #[serde(
        default,
        deserialize_with = "optional_one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub then: Option<Vec<InvocationSpec>>,

    /// Document formats the rule applies to (empty = all)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formats: Option<Vec<Format>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended: Option<bool>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<RuleType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,

    /// Merge onto the inherited rule instead of replacing it
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub patch: bool,
}

impl RuleSpec {
    /// A complete rule selecting `given` and running `then`
    pub fn new(given: &str, then: InvocationSpec) -> Self {
        Self {
            given: Some(vec![given.to_string()]),
            then: Some(vec![then]),
            ..Self::default()
        }
    }

    /// An empty patch
    pub fn patch() -> Self {
        Self {
            patch: true,
            ..Self::default()
        }
    }

    pub fn with_severity(mut self, severity: RuleSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_given(mut self, given: &str) -> Self {
        self.given.get_or_insert_with(Vec::new).push(given.to_string());
        self
    }

    pub fn with_then(mut self, then: InvocationSpec) -> Self {
        self.then.get_or_insert_with(Vec::new).push(then);
        self
    }

    pub fn with_formats(mut self, formats: &[Format]) -> Self {
        self.formats = Some(formats.to_vec());
        self
    }

    pub fn with_resolved(mut self, resolved: bool) -> Self {
        self.resolved = Some(resolved);
        self
    }

    pub fn with_recommended(mut self, recommended: bool) -> Self {
        self.recommended = Some(recommended);
        self
    }

    /// Overlay every field set on `patch`
    pub fn merge(&mut self, patch: &RuleSpec) {
        fn overlay<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                target.clone_from(value);
            }
        }

        overlay(&mut self.description, &patch.description);
        overlay(&mut self.message, &patch.message);
        overlay(&mut self.severity, &patch.severity);
        overlay(&mut self.given, &patch.given);
        overlay(&mut self.then, &patch.then);
        overlay(&mut self.formats, &patch.formats);
        overlay(&mut self.resolved, &patch.resolved);
        overlay(&mut self.recommended, &patch.recommended);
        overlay(&mut self.rule_type, &patch.rule_type);
        overlay(&mut self.documentation_url, &patch.documentation_url);
    }
}

/// A rule entry in a rule set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleDefinition {
    /// `true` enables an inherited rule, `false` turns it off
    Enabled(bool),
    /// Change only the severity of an inherited rule
    Severity(RuleSeverity),
    /// Complete rule, or a patch when `patch: true`
    Spec(RuleSpec),
}

impl RuleDefinition {
    /// Whether this definition needs an inherited rule to apply to
    pub fn is_patch(&self) -> bool {
        match self {
            RuleDefinition::Enabled(_) | RuleDefinition::Severity(_) => true,
            RuleDefinition::Spec(spec) => spec.patch,
        }
    }

    /// Apply onto an inherited rule. Returns `false` for a complete
    /// definition, which replaces instead of merging.
    pub fn apply_to(&self, base: &mut RuleSpec) -> bool {
        match self {
            RuleDefinition::Enabled(true) => {
                base.recommended = Some(true);
                if base.severity == Some(RuleSeverity::Off) {
                    base.severity = None;
                }
            }
            RuleDefinition::Enabled(false) => base.severity = Some(RuleSeverity::Off),
            RuleDefinition::Severity(severity) => {
                base.severity = Some(*severity);
                if !severity.is_off() {
                    base.recommended = Some(true);
                }
            }
            RuleDefinition::Spec(spec) if spec.patch => base.merge(spec),
            RuleDefinition::Spec(_) => return false,
        }
        true
    }
}

impl From<RuleSpec> for RuleDefinition {
    fn from(spec: RuleSpec) -> Self {
        RuleDefinition::Spec(spec)
    }
}

impl From<RuleSeverity> for RuleDefinition {
    fn from(severity: RuleSeverity) -> Self {
        RuleDefinition::Severity(severity)
    }
}

impl From<bool> for RuleDefinition {
    fn from(enabled: bool) -> Self {
        RuleDefinition::Enabled(enabled)
    }
}

/// Projection from a selected node to the value a predicate receives
#[derive(Debug, Clone)]
pub enum Field {
    /// Child path; the exact key wins, otherwise dots separate segments
    Child(String),
    /// `@key`: the selected node's own key
    Key,
    /// `$.`/`$[` path evaluated relative to the node
    Relative(PathExpression),
}

/// A projected value and where it sits; `value` is `None` when absent
#[derive(Debug, Clone, PartialEq)]
pub struct Projected<'a> {
    pub value: Option<Cow<'a, Value>>,
    pub location: Location,
}

impl Field {
    pub fn parse(field: &str) -> Result<Self, SelectorError> {
        if field == "@key" {
            Ok(Field::Key)
        } else if field == "$" || field.starts_with("$.") || field.starts_with("$[") {
            parse(field).map(Field::Relative)
        } else {
            Ok(Field::Child(field.to_string()))
        }
    }

    /// Project `node`, found at `location`, onto this field
    pub fn project<'a>(&self, node: &'a Value, location: &Location) -> Vec<Projected<'a>> {
        match self {
            Field::Key => vec![Projected {
                value: location
                    .last()
                    .map(|key| Cow::Owned(Value::String(key.as_property()))),
                location: location.clone(),
            }],
            Field::Relative(path) => path
                .select_from(node, location)
                .into_iter()
                .map(|selected| Projected {
                    value: Some(selected.value),
                    location: selected.location,
                })
                .collect(),
            Field::Child(path) => {
                if let Some(value) = node.as_object().and_then(|map| map.get(path)) {
                    return vec![Projected {
                        value: Some(Cow::Borrowed(value)),
                        location: location.child(path.as_str()),
                    }];
                }

                let mut current = Some(node);
                let mut at = location.clone();
                for part in path.split('.') {
                    let segment = match current {
                        Some(Value::Array(items)) => match part.parse::<usize>() {
                            Ok(index) => {
                                current = items.get(index);
                                PathSegment::Index(index)
                            }
                            Err(_) => {
                                current = None;
                                PathSegment::from(part)
                            }
                        },
                        Some(Value::Object(map)) => {
                            current = map.get(part);
                            PathSegment::from(part)
                        }
                        _ => {
                            current = None;
                            PathSegment::from(part)
                        }
                    };
                    at = at.child(segment);
                }
                vec![Projected {
                    value: current.map(Cow::Borrowed),
                    location: at,
                }]
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Child(path) => write!(f, "{}", path),
            Field::Key => write!(f, "@key"),
            Field::Relative(path) => write!(f, "{}", path),
        }
    }
}

/// A compiled `then` entry
#[derive(Debug, Clone)]
pub struct PredicateInvocation {
    pub function: String,
    pub field: Option<Field>,
    /// `null` when the rule gives no options
    pub options: Value,
}

/// An effective rule, with its path expressions compiled
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub description: Option<String>,
    pub message: Option<String>,
    pub severity: RuleSeverity,
    pub given: Vec<PathExpression>,
    pub then: Vec<PredicateInvocation>,
    pub formats: Vec<Format>,
    pub resolved: bool,
    pub recommended: bool,
    pub rule_type: Option<RuleType>,
    pub documentation_url: Option<String>,
}

impl Rule {
    /// Compile a rule spec, parsing every path expression once
    pub fn compile(name: &str, spec: &RuleSpec) -> Result<Self, ConfigError> {
        let invalid = |source: SelectorError| ConfigError::InvalidPath {
            rule: name.to_string(),
            source,
        };

        let given = spec
            .given
            .iter()
            .flatten()
            .map(|expr| parse(expr).map_err(invalid))
            .collect::<Result<Vec<_>, _>>()?;

        let then = spec
            .then
            .iter()
            .flatten()
            .map(|inv| {
                let field = inv.field.as_deref().map(Field::parse).transpose().map_err(invalid)?;
                Ok(PredicateInvocation {
                    function: inv.function.clone(),
                    field,
                    options: inv.function_options.clone().unwrap_or(Value::Null),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            name: name.to_string(),
            description: spec.description.clone(),
            message: spec.message.clone(),
            severity: spec.severity.unwrap_or_default(),
            given,
            then,
            formats: spec.formats.clone().unwrap_or_default(),
            resolved: spec.resolved.unwrap_or(true),
            recommended: spec.recommended.unwrap_or(true),
            rule_type: spec.rule_type,
            documentation_url: spec.documentation_url.clone(),
        })
    }

    /// Whether the evaluator runs this rule at all
    pub fn is_active(&self) -> bool {
        !self.severity.is_off() && self.recommended && !self.given.is_empty() && !self.then.is_empty()
    }

    /// Why an inactive rule is skipped
    pub fn inactive_reason(&self) -> Option<&'static str> {
        if self.severity.is_off() {
            Some("severity is off")
        } else if !self.recommended {
            Some("not recommended")
        } else if self.given.is_empty() {
            Some("no given")
        } else if self.then.is_empty() {
            Some("no then")
        } else {
            None
        }
    }
}
