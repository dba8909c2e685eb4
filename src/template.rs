//! Message templates
//!
//! Rule messages may contain `{{token}}` placeholders:
//! `{{property}}`, `{{value}}`, `{{error}}`, `{{description}}` and `{{path}}`.
//! Unknown tokens are left as written.

use crate::diagnostic::Location;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

/// Template used when a rule has no message
pub const DEFAULT_TEMPLATE: &str = "{{error}}";

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_]+)\s*\}\}").expect("valid token regex")
});

/// Values available to a message template
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    /// Location of the evaluated value
    pub location: &'a Location,
    pub value: Option<&'a Value>,
    /// Message of the violation being reported
    pub error: &'a str,
    pub description: Option<&'a str>,
}

/// Render a value the way it reads in a message
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
        other => other.to_string(),
    }
}

/// Substitute every known token in `template`
pub fn render(template: &str, context: &TemplateContext<'_>) -> String {
    TOKEN
        .replace_all(template, |caps: &Captures| match &caps[1] {
            "property" => context
                .location
                .last()
                .map(|segment| segment.as_property())
                .unwrap_or_default(),
            "value" => context.value.map(display_value).unwrap_or_default(),
            "error" => context.error.to_string(),
            "description" => context.description.unwrap_or_default().to_string(),
            "path" => context.location.to_string(),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context<'a>(location: &'a Location, value: Option<&'a Value>) -> TemplateContext<'a> {
        TemplateContext {
            location,
            value,
            error: "must be truthy",
            description: Some("Every request SHOULD support JSON"),
        }
    }

    #[test]
    fn test_render_tokens() {
        let location = Location::root().child("info").child("version");
        let value = json!("v1");
        let ctx = context(&location, Some(&value));

        assert_eq!(
            render("Specs should follow semantic versioning. {{value}} is not a valid version.", &ctx),
            "Specs should follow semantic versioning. v1 is not a valid version."
        );
        assert_eq!(render("{{property}}: {{error}}", &ctx), "version: must be truthy");
        assert_eq!(render("{{description}}", &ctx), "Every request SHOULD support JSON");
        assert_eq!(render("at {{path}}", &ctx), "at #/info/version");
        assert_eq!(render("{{ property }}", &ctx), "version");
    }

    #[test]
    fn test_unknown_token_kept() {
        let location = Location::root();
        let ctx = context(&location, None);
        assert_eq!(render("{{nope}} {{value}}!", &ctx), "{{nope}} !");
        assert_eq!(render(DEFAULT_TEMPLATE, &ctx), "must be truthy");
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("x")), "x");
        assert_eq!(display_value(&json!(1.5)), "1.5");
        assert_eq!(display_value(&json!(null)), "null");
        assert_eq!(display_value(&json!({"a": [1]})), r#"{"a":[1]}"#);
    }
}
