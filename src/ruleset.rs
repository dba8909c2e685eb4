//! Rule sets, inheritance and resolution
//!
//! A rule set names the sets it `extends` and declares its own rules. The
//! effective rules are found by merging the inheritance graph breadth-first:
//! deeper sets first, the root last, so nearer definitions win.

use crate::config::{ConfigError, ConfigFormat};
use crate::rule::{one_or_many, Rule, RuleDefinition, RuleSpec};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A rule set as written
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Base sets, by catalog name
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,

    /// Rules in declaration order
    #[serde(default)]
    pub rules: IndexMap<String, RuleDefinition>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_str_with_format(text: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Yaml => Self::from_yaml_str(text),
            ConfigFormat::Json => Self::from_json_str(text),
        }
    }

    pub fn with_extends(mut self, base: &str) -> Self {
        self.extends.push(base.to_string());
        self
    }

    pub fn with_rule(mut self, name: &str, definition: impl Into<RuleDefinition>) -> Self {
        self.rules.insert(name.to_string(), definition.into());
        self
    }

    /// Resolve a set that extends nothing
    pub fn resolve(&self) -> Result<ResolvedRuleSet, ConfigError> {
        let mut catalog = RuleSetCatalog::new();
        catalog.insert("<inline>", self.clone());
        catalog.resolve("<inline>")
    }
}

/// Named rule sets that `extends` entries refer to
#[derive(Debug, Clone, Default)]
pub struct RuleSetCatalog {
    sets: HashMap<String, RuleSet>,
}

impl RuleSetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a set, replacing any set with the same name
    pub fn insert(&mut self, name: &str, set: RuleSet) -> Option<RuleSet> {
        self.sets.insert(name.to_string(), set)
    }

    pub fn get(&self, name: &str) -> Option<&RuleSet> {
        self.sets.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut RuleSet> {
        self.sets.get_mut(name)
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<RuleSet> {
        self.sets.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sets.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn lookup(&self, name: &str) -> Result<&RuleSet, ConfigError> {
        self.sets
            .get(name)
            .ok_or_else(|| ConfigError::UnknownRuleSet(name.to_string()))
    }

    /// Resolve `name` and everything it extends into effective rules
    pub fn resolve(&self, name: &str) -> Result<ResolvedRuleSet, ConfigError> {
        let mut finished = HashSet::new();
        self.check_cycles(name, &mut Vec::new(), &mut finished)?;

        let levels = self.levels(name)?;
        debug!(
            "Resolving rule set '{}' across {} level(s) of inheritance",
            name,
            levels.len()
        );

        let mut specs: IndexMap<String, RuleSpec> = IndexMap::new();
        for level in levels.iter().rev() {
            for set_name in level {
                let set = self.lookup(set_name)?;
                for (rule_name, definition) in &set.rules {
                    apply(&mut specs, rule_name, definition)?;
                }
            }
        }

        let rules = specs
            .iter()
            .map(|(rule_name, spec)| Ok((rule_name.clone(), Rule::compile(rule_name, spec)?)))
            .collect::<Result<IndexMap<_, _>, ConfigError>>()?;

        debug!("Rule set '{}' resolved to {} rule(s)", name, rules.len());
        Ok(ResolvedRuleSet { rules })
    }

    /// Depth-first walk of `extends`, failing on the first cycle
    fn check_cycles(
        &self,
        name: &str,
        chain: &mut Vec<String>,
        finished: &mut HashSet<String>,
    ) -> Result<(), ConfigError> {
        if finished.contains(name) {
            return Ok(());
        }
        if let Some(start) = chain.iter().position(|n| n == name) {
            let mut cycle = chain[start..].to_vec();
            cycle.push(name.to_string());
            return Err(ConfigError::CyclicExtends(cycle));
        }

        let set = self.lookup(name)?;
        chain.push(name.to_string());
        for base in &set.extends {
            self.check_cycles(base, chain, finished)?;
        }
        chain.pop();
        finished.insert(name.to_string());
        Ok(())
    }

    /// Sets grouped by breadth-first depth, each at its shallowest depth
    fn levels(&self, root: &str) -> Result<Vec<Vec<String>>, ConfigError> {
        let mut seen: HashSet<String> = HashSet::from([root.to_string()]);
        let mut levels = vec![vec![root.to_string()]];

        loop {
            let mut next = Vec::new();
            if let Some(current) = levels.last() {
                for set_name in current {
                    for base in &self.lookup(set_name)?.extends {
                        if seen.insert(base.clone()) {
                            next.push(base.clone());
                        }
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            levels.push(next);
        }

        Ok(levels)
    }
}

fn apply(
    specs: &mut IndexMap<String, RuleSpec>,
    rule_name: &str,
    definition: &RuleDefinition,
) -> Result<(), ConfigError> {
    match specs.get_mut(rule_name) {
        Some(base) => {
            if !definition.apply_to(base) {
                if let RuleDefinition::Spec(spec) = definition {
                    *base = spec.clone();
                }
            }
        }
        None if definition.is_patch() => {
            return Err(ConfigError::PatchWithoutBase(rule_name.to_string()));
        }
        None => {
            if let RuleDefinition::Spec(spec) = definition {
                specs.insert(rule_name.to_string(), spec.clone());
            }
        }
    }
    Ok(())
}

/// Effective rules in declaration order
#[derive(Debug, Clone, Default)]
pub struct ResolvedRuleSet {
    rules: IndexMap<String, Rule>,
}

impl ResolvedRuleSet {
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// Rules the evaluator will run
    pub fn active_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values().filter(|rule| rule.is_active())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<Rule> for ResolvedRuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().map(|rule| (rule.name.clone(), rule)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::RuleSeverity;
    use crate::rule::InvocationSpec;
    use pretty_assertions::assert_eq;

    fn truthy_rule(given: &str) -> RuleSpec {
        RuleSpec::new(given, InvocationSpec::new("truthy"))
    }

    #[test]
    fn test_yaml_rule_set() {
        let set = RuleSet::from_yaml_str(
            r#"
extends: base
rules:
  semver: off
  info-contact:
    given: $.info
    then:
      field: contact
      function: truthy
"#,
        )
        .unwrap();
        assert_eq!(set.extends, vec!["base"]);
        assert_eq!(set.rules.len(), 2);
        assert_eq!(set.rules["semver"], RuleDefinition::Severity(RuleSeverity::Off));
    }

    #[test]
    fn test_severity_override_through_extends() {
        let mut catalog = RuleSetCatalog::new();
        catalog.insert(
            "base",
            RuleSet::new().with_rule("semver", truthy_rule("$.info.version").with_severity(RuleSeverity::Error)),
        );
        catalog.insert(
            "derived",
            RuleSet::new().with_extends("base").with_rule("semver", RuleSeverity::Off),
        );

        let resolved = catalog.resolve("derived").unwrap();
        let semver = resolved.get("semver").unwrap();
        assert_eq!(semver.severity, RuleSeverity::Off);
        assert!(!semver.is_active());
        assert_eq!(resolved.active_rules().count(), 0);
    }

    #[test]
    fn test_full_definition_replaces() {
        let mut catalog = RuleSetCatalog::new();
        catalog.insert(
            "base",
            RuleSet::new().with_rule(
                "r",
                truthy_rule("$.a").with_message("base").with_severity(RuleSeverity::Error),
            ),
        );
        catalog.insert(
            "derived",
            RuleSet::new().with_extends("base").with_rule("r", truthy_rule("$.b")),
        );

        let rule = catalog.resolve("derived").unwrap().get("r").cloned().unwrap();
        assert_eq!(rule.given[0].as_str(), "$.b");
        assert_eq!(rule.message, None);
        assert_eq!(rule.severity, RuleSeverity::Warn);
    }

    #[test]
    fn test_patch_merges() {
        let mut catalog = RuleSetCatalog::new();
        catalog.insert(
            "base",
            RuleSet::new().with_rule("r", truthy_rule("$.a").with_message("base")),
        );
        catalog.insert(
            "derived",
            RuleSet::new()
                .with_extends("base")
                .with_rule("r", RuleSpec::patch().with_severity(RuleSeverity::Info)),
        );

        let rule = catalog.resolve("derived").unwrap().get("r").cloned().unwrap();
        assert_eq!(rule.given[0].as_str(), "$.a");
        assert_eq!(rule.message.as_deref(), Some("base"));
        assert_eq!(rule.severity, RuleSeverity::Info);
    }

    #[test]
    fn test_patch_without_base() {
        let set = RuleSet::new().with_rule("ghost", true);
        let err = set.resolve().unwrap_err();
        assert!(matches!(err, ConfigError::PatchWithoutBase(ref name) if name == "ghost"));
    }

    #[test]
    fn test_cyclic_extends() {
        let mut catalog = RuleSetCatalog::new();
        catalog.insert("a", RuleSet::new().with_extends("b"));
        catalog.insert("b", RuleSet::new().with_extends("a"));

        let err = catalog.resolve("a").unwrap_err();
        match err {
            ConfigError::CyclicExtends(chain) => assert_eq!(chain, vec!["a", "b", "a"]),
            other => panic!("expected a cycle, got {}", other),
        }
    }

    #[test]
    fn test_unknown_base() {
        let set = RuleSet::new().with_extends("missing");
        let err = set.resolve().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRuleSet(ref name) if name == "missing"));
    }

    #[test]
    fn test_breadth_first_precedence_and_order() {
        // root -> [left, right]; left -> deep; right redefines a rule from deep
        let mut catalog = RuleSetCatalog::new();
        catalog.insert(
            "deep",
            RuleSet::new()
                .with_rule("one", truthy_rule("$.deep"))
                .with_rule("two", truthy_rule("$.deep")),
        );
        catalog.insert("left", RuleSet::new().with_extends("deep").with_rule("three", truthy_rule("$.left")));
        catalog.insert("right", RuleSet::new().with_rule("two", truthy_rule("$.right")));
        catalog.insert(
            "root",
            RuleSet::new()
                .with_extends("left")
                .with_extends("right")
                .with_rule("four", truthy_rule("$.root")),
        );

        let resolved = catalog.resolve("root").unwrap();
        let names: Vec<&str> = resolved.names().collect();
        assert_eq!(names, vec!["one", "two", "three", "four"]);
        assert_eq!(resolved.get("two").unwrap().given[0].as_str(), "$.right");
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let mut catalog = RuleSetCatalog::new();
        catalog.insert("shared", RuleSet::new().with_rule("r", truthy_rule("$")));
        catalog.insert("a", RuleSet::new().with_extends("shared"));
        catalog.insert("b", RuleSet::new().with_extends("shared"));
        catalog.insert("root", RuleSet::new().with_extends("a").with_extends("b"));

        assert_eq!(catalog.resolve("root").unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_path_fails_resolution() {
        let set = RuleSet::new().with_rule("bad", truthy_rule("$[?(@.a =="));
        assert!(matches!(set.resolve(), Err(ConfigError::InvalidPath { .. })));
    }
}
