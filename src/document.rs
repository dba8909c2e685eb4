//! Parsed specification documents
//!
//! A [`Document`] is an immutable, ordered tree. Mappings keep the order in
//! which keys appear in the source text, so selection and reporting follow
//! document order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Error turning text into a document
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported YAML key at {0}")]
    UnsupportedKey(String),
}

/// Specification format a document conforms to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "oas2")]
    Oas2,
    #[serde(rename = "oas3")]
    Oas3,
    #[serde(rename = "oas3.0", alias = "oas3_0")]
    Oas3_0,
    #[serde(rename = "oas3.1", alias = "oas3_1")]
    Oas3_1,
}

impl Format {
    /// Whether a document in `detected` format satisfies this format filter
    pub fn accepts(self, detected: &[Format]) -> bool {
        detected.contains(&self)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Oas2 => write!(f, "oas2"),
            Format::Oas3 => write!(f, "oas3"),
            Format::Oas3_0 => write!(f, "oas3.0"),
            Format::Oas3_1 => write!(f, "oas3.1"),
        }
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "oas2" => Ok(Format::Oas2),
            "oas3" => Ok(Format::Oas3),
            "oas3.0" | "oas3_0" => Ok(Format::Oas3_0),
            "oas3.1" | "oas3_1" => Ok(Format::Oas3_1),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Detect the formats of a document from its root version markers
pub fn detect_formats(root: &Value) -> Vec<Format> {
    let mut formats = Vec::new();

    if let Some(swagger) = root.get("swagger") {
        if version_text(swagger).is_some_and(|v| v == "2.0" || v == "2") {
            formats.push(Format::Oas2);
        }
    }

    if let Some(version) = root.get("openapi").and_then(version_text) {
        if version == "3" || version.starts_with("3.") {
            formats.push(Format::Oas3);
            if version.starts_with("3.0") {
                formats.push(Format::Oas3_0);
            } else if version.starts_with("3.1") {
                formats.push(Format::Oas3_1);
            }
        }
    }

    formats
}

fn version_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A resolved specification document, read-only for the duration of a run
#[derive(Debug, Clone)]
pub struct Document {
    root: Value,
    unresolved: Option<Value>,
    formats: Vec<Format>,
}

impl Document {
    /// Wrap an already-parsed, resolved tree
    pub fn new(root: Value) -> Self {
        let formats = detect_formats(&root);
        Self {
            root,
            unresolved: None,
            formats,
        }
    }

    /// Parse JSON text
    pub fn from_json_str(text: &str) -> Result<Self, DocumentError> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    /// Parse YAML text, turning scalar keys such as `200:` into strings
    pub fn from_yaml_str(text: &str) -> Result<Self, DocumentError> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
        Ok(Self::new(yaml_to_json(yaml, "#")?))
    }

    /// Attach the tree as it was before `$ref` resolution
    pub fn with_unresolved(mut self, unresolved: Value) -> Self {
        self.unresolved = Some(unresolved);
        self
    }

    /// The resolved tree
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// The tree rules run against; rules declaring `resolved: false`
    /// read the unresolved twin when one is attached
    pub fn tree(&self, resolved: bool) -> &Value {
        if resolved {
            &self.root
        } else {
            self.unresolved.as_ref().unwrap_or(&self.root)
        }
    }

    /// Formats detected from the root version markers
    pub fn formats(&self) -> &[Format] {
        &self.formats
    }

    /// Check whether the document matches any of the given formats
    /// (an empty filter matches every document)
    pub fn matches_formats(&self, filter: &[Format]) -> bool {
        filter.is_empty() || filter.iter().any(|f| f.accepts(&self.formats))
    }
}

impl From<Value> for Document {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}

fn yaml_to_json(value: serde_yaml::Value, at: &str) -> Result<Value, DocumentError> {
    Ok(match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| yaml_to_json(item, &format!("{}/{}", at, i)))
                .collect::<Result<_, _>>()?,
        ),
        serde_yaml::Value::Mapping(mapping) => {
            let mut object = Map::new();
            for (key, item) in mapping {
                let key = match key {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    serde_yaml::Value::Null => "null".to_string(),
                    _ => return Err(DocumentError::UnsupportedKey(at.to_string())),
                };
                let child_at = format!("{}/{}", at, key);
                object.insert(key, yaml_to_json(item, &child_at)?);
            }
            Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value, at)?,
    })
}
