//! Rule sets bundled with the crate

use crate::config::ConfigError;
use crate::ruleset::{RuleSet, RuleSetCatalog};

/// Name the API guidelines preset is registered under
pub const API_GUIDELINES: &str = "api-guidelines";

const API_GUIDELINES_YAML: &str = include_str!("../rulesets/api-guidelines.yaml");

/// API design guidelines: HTTPS servers, kebab-case paths and operation ids,
/// snake_case fields and query parameters, enforced security on write
/// endpoints, success responses and canonical operation order
pub fn api_guidelines() -> Result<RuleSet, ConfigError> {
    RuleSet::from_yaml_str(API_GUIDELINES_YAML)
}

/// Get a preset by name
pub fn preset(name: &str) -> Option<Result<RuleSet, ConfigError>> {
    match name {
        API_GUIDELINES => Some(api_guidelines()),
        _ => None,
    }
}

/// Names of every bundled preset
pub fn names() -> &'static [&'static str] {
    &[API_GUIDELINES]
}

/// Register every preset in `catalog` under its name
pub fn register_all(catalog: &mut RuleSetCatalog) -> Result<(), ConfigError> {
    for name in names() {
        if let Some(set) = preset(name) {
            catalog.insert(name, set?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::RuleSeverity;
    use crate::engine::Evaluator;

    #[test]
    fn test_api_guidelines_rules() {
        let set = api_guidelines().unwrap();
        assert!(set.extends.is_empty());
        let names: Vec<&str> = set.rules.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "path-keys-no-trailing-slash",
                "semver",
                "content-type-application-json-specific",
                "paths-kebab-case",
                "default-response-fallback",
                "security-must-be-enforced-for-unsafe-endpoints",
                "security-object-must-not-be-a-hacked-in-empty-object",
                "security-object-must-not-be-empty",
                "request-GET-no-body",
                "query-parameter-snake-case",
                "oas3-protocol-https-only",
                "field-name-snake-case",
                "content-entry-provided",
                "endpoint-verb-order",
                "operationid-must-be-kebab-cased",
            ]
        );
    }

    #[test]
    fn test_api_guidelines_compiles() {
        let resolved = api_guidelines().unwrap().resolve().unwrap();
        assert_eq!(resolved.active_rules().count(), 15);
        assert_eq!(resolved.get("field-name-snake-case").unwrap().severity, RuleSeverity::Warn);
        assert!(Evaluator::with_builtins(resolved).is_ok());
    }

    #[test]
    fn test_register_all() {
        let mut catalog = RuleSetCatalog::new();
        register_all(&mut catalog).unwrap();
        assert!(catalog.contains(API_GUIDELINES));
        assert!(preset("unknown").is_none());
    }
}
