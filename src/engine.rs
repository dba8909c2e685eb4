//! Rule evaluation engine

use crate::config::{ConfigError, EngineConfig};
use crate::diagnostic::{Diagnostic, PathSegment, Severity};
use crate::document::Document;
use crate::predicate::{Check, Predicate, PredicateContext, PredicateRegistry};
use crate::rule::{PredicateInvocation, Projected, Rule};
use crate::ruleset::ResolvedRuleSet;
use crate::selector::Selected;
use crate::template::{render, TemplateContext, DEFAULT_TEMPLATE};
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use serde_json::Value;
use std::any::Any;
use std::borrow::Cow;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-rule timing statistics
#[derive(Debug, Clone, Default)]
pub struct RuleTiming {
    pub rule_name: String,
    /// Total time spent on this rule
    pub total_time: Duration,
    /// Nodes selected by the rule's `given`
    pub selection_count: usize,
    /// Diagnostics the rule produced
    pub violation_count: usize,
}

impl RuleTiming {
    pub fn new(rule_name: &str) -> Self {
        Self {
            rule_name: rule_name.to_string(),
            ..Default::default()
        }
    }

    /// Average time per selected node
    pub fn avg_time(&self) -> Duration {
        if self.selection_count > 0 {
            self.total_time / self.selection_count as u32
        } else {
            Duration::ZERO
        }
    }
}

/// Cooperative cancellation for a run.
///
/// Checked before each rule starts; a rule already running completes.
#[derive(Debug, Default)]
pub struct RunContext {
    cancelled: AtomicBool,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop issuing further rule evaluations
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Result of evaluating a rule set against one document
#[derive(Debug, Default)]
pub struct RunReport {
    /// Diagnostics in rule declaration order, then location
    pub diagnostics: Vec<Diagnostic>,

    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,

    /// Rules that ran to completion
    pub rules_evaluated: usize,

    /// Rules that were inactive, did not match the document format, or were
    /// never started because the run was cancelled
    pub rules_skipped: usize,

    /// The run was cancelled before every rule was evaluated
    pub cancelled: bool,

    /// Processing duration
    pub duration: Duration,

    /// Timings of evaluated rules, in declaration order
    pub rule_timings: Vec<RuleTiming>,
}

impl RunReport {
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.warning_count > 0
    }

    /// No errors or warnings
    pub fn is_clean(&self) -> bool {
        self.error_count == 0 && self.warning_count == 0
    }

    /// Diagnostics produced by one rule
    pub fn for_rule<'a>(&'a self, rule_name: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.rule_name == rule_name)
    }

    /// Rule timings sorted by total time (descending)
    pub fn sorted_timings(&self) -> Vec<&RuleTiming> {
        let mut timings: Vec<_> = self.rule_timings.iter().collect();
        timings.sort_by(|a, b| b.total_time.cmp(&a.total_time));
        timings
    }

    /// Format timing statistics as a table
    pub fn format_timings(&self) -> String {
        let timings = self.sorted_timings();
        if timings.is_empty() {
            return "No timing data available".to_string();
        }

        let mut output = String::new();
        output.push_str("Rule Timing Statistics:\n");
        output.push_str(&format!(
            "{:<48} {:>12} {:>12} {:>10} {:>12}\n",
            "Rule", "Total", "Avg", "Nodes", "Violations"
        ));
        output.push_str(&"-".repeat(98));
        output.push('\n');

        for timing in timings {
            let total_ms = timing.total_time.as_secs_f64() * 1000.0;
            let avg_us = timing.avg_time().as_secs_f64() * 1_000_000.0;
            output.push_str(&format!(
                "{:<48} {:>10.2}ms {:>10.2}µs {:>10} {:>12}\n",
                timing.rule_name, total_ms, avg_us, timing.selection_count, timing.violation_count
            ));
        }

        output
    }

    fn count(&mut self, diagnostic: &Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.error_count += 1,
            Severity::Warn => self.warning_count += 1,
            Severity::Info => self.info_count += 1,
        }
    }
}

struct RuleOutcome {
    diagnostics: Vec<Diagnostic>,
    timing: RuleTiming,
}

/// Runs a resolved rule set against documents
pub struct Evaluator {
    rules: Vec<Rule>,
    registry: PredicateRegistry,
    config: EngineConfig,
}

impl Evaluator {
    /// Create an evaluator, checking that every function the rules name is
    /// registered
    pub fn new(
        rules: ResolvedRuleSet,
        registry: PredicateRegistry,
        config: EngineConfig,
    ) -> Result<Self, ConfigError> {
        for rule in rules.rules() {
            for invocation in &rule.then {
                if !registry.contains(&invocation.function) {
                    return Err(ConfigError::UnknownPredicate {
                        rule: rule.name.clone(),
                        function: invocation.function.clone(),
                    });
                }
            }
        }

        Ok(Self {
            rules: rules.rules().cloned().collect(),
            registry,
            config,
        })
    }

    /// An evaluator using the built-in predicates and default settings
    pub fn with_builtins(rules: ResolvedRuleSet) -> Result<Self, ConfigError> {
        Self::new(rules, PredicateRegistry::with_builtins(), EngineConfig::default())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate every applicable rule against `document`
    pub fn run(&self, document: &Document) -> RunReport {
        self.run_with_context(document, &RunContext::new())
    }

    /// Evaluate with cancellation support
    pub fn run_with_context(&self, document: &Document, context: &RunContext) -> RunReport {
        let start = Instant::now();
        let mut report = RunReport::default();

        let applicable: Vec<&Rule> = self
            .rules
            .iter()
            .filter(|rule| {
                if let Some(reason) = rule.inactive_reason() {
                    debug!("Skipping rule '{}': {}", rule.name, reason);
                    return false;
                }
                if !document.matches_formats(&rule.formats) {
                    debug!("Skipping rule '{}': document format does not match", rule.name);
                    return false;
                }
                true
            })
            .collect();
        report.rules_skipped = self.rules.len() - applicable.len();

        let outcomes = self.evaluate_all(&applicable, document, context);

        for outcome in outcomes {
            let Some(outcome) = outcome else {
                report.rules_skipped += 1;
                continue;
            };
            report.rules_evaluated += 1;
            for diagnostic in &outcome.diagnostics {
                report.count(diagnostic);
            }
            report.diagnostics.extend(outcome.diagnostics);
            report.rule_timings.push(outcome.timing);
        }

        report.cancelled = context.is_cancelled() && report.rules_evaluated < applicable.len();
        report.duration = start.elapsed();

        info!(
            "Evaluated {} rule(s), skipped {}: {} error(s), {} warning(s), {} info in {:?}{}",
            report.rules_evaluated,
            report.rules_skipped,
            report.error_count,
            report.warning_count,
            report.info_count,
            report.duration,
            if report.cancelled { " (cancelled)" } else { "" }
        );
        report
    }

    /// Evaluate rules, keeping declaration order; `None` marks a rule that was
    /// not started because of cancellation
    fn evaluate_all(
        &self,
        rules: &[&Rule],
        document: &Document,
        context: &RunContext,
    ) -> Vec<Option<RuleOutcome>> {
        let evaluate = |rule: &&Rule| {
            if context.is_cancelled() {
                return None;
            }
            Some(self.evaluate_rule(rule, document))
        };

        if self.config.parallel && rules.len() > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.worker_threads())
                .build()
            {
                Ok(pool) => return pool.install(|| rules.par_iter().map(evaluate).collect()),
                Err(e) => warn!("Failed to build worker pool, evaluating sequentially: {}", e),
            }
        }

        rules.iter().map(evaluate).collect()
    }

    fn evaluate_rule(&self, rule: &Rule, document: &Document) -> RuleOutcome {
        let start = Instant::now();
        let mut timing = RuleTiming::new(&rule.name);

        let tree = document.tree(rule.resolved);
        let selected: Vec<Selected<'_>> = rule.given.iter().flat_map(|given| given.select(tree)).collect();
        timing.selection_count = selected.len();
        trace!("Rule '{}' selected {} node(s)", rule.name, selected.len());

        // Each diagnostic is tagged with the index of the node it came from
        let mut found: Vec<(usize, Diagnostic)> = Vec::new();
        for invocation in &rule.then {
            self.invoke(rule, invocation, &selected, document, &mut found);
        }

        // Selection order, then `then` order for diagnostics of the same node
        found.sort_by_key(|(index, _)| *index);
        let mut seen = HashSet::new();
        let diagnostics: Vec<Diagnostic> = found
            .into_iter()
            .map(|(_, diagnostic)| diagnostic)
            .filter(|d| seen.insert((d.path.clone(), d.code.clone(), d.message.clone())))
            .collect();

        timing.violation_count = diagnostics.len();
        timing.total_time = start.elapsed();
        RuleOutcome { diagnostics, timing }
    }

    fn invoke(
        &self,
        rule: &Rule,
        invocation: &PredicateInvocation,
        selected: &[Selected<'_>],
        document: &Document,
        found: &mut Vec<(usize, Diagnostic)>,
    ) {
        let Some(predicate) = self.registry.get(&invocation.function) else {
            return;
        };
        let Some(severity) = rule.severity.level() else {
            return;
        };
        let Some(first) = selected.first() else {
            return;
        };

        let check = match predicate.prepare(&invocation.options) {
            Ok(check) => check,
            Err(err) => {
                warn!("Rule '{}': {}", rule.name, err);
                found.push((0, Diagnostic::predicate_error(&rule.name, &err.to_string(), first.location.clone())));
                return;
            }
        };

        for (index, node) in selected.iter().enumerate() {
            let targets = match &invocation.field {
                Some(field) => field.project(&node.value, &node.location),
                None => vec![Projected {
                    value: Some(Cow::Borrowed(node.value.as_ref())),
                    location: node.location.clone(),
                }],
            };

            for target in targets {
                for diagnostic in self.check_target(rule, severity, check.as_ref(), invocation, node, &target, document) {
                    found.push((index, diagnostic));
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_target(
        &self,
        rule: &Rule,
        severity: Severity,
        check: &dyn Check,
        invocation: &PredicateInvocation,
        node: &Selected<'_>,
        target: &Projected<'_>,
        document: &Document,
    ) -> Vec<Diagnostic> {
        let value = target.value.as_deref();
        let context = PredicateContext {
            document,
            rule_name: &rule.name,
            location: &target.location,
            given_location: &node.location,
        };
        trace!("Rule '{}': {} at {}", rule.name, invocation.function, target.location);

        let result = panic::catch_unwind(AssertUnwindSafe(|| check.check(value, &context)));

        let violations = match result {
            Ok(Ok(violations)) => violations,
            Ok(Err(err)) => {
                warn!("Rule '{}' at {}: {}", rule.name, target.location, err);
                return vec![Diagnostic::predicate_error(
                    &rule.name,
                    &err.to_string(),
                    target.location.clone(),
                )];
            }
            Err(payload) => {
                let message = format!("'{}' panicked: {}", invocation.function, panic_message(payload.as_ref()));
                warn!("Rule '{}' at {}: {}", rule.name, target.location, message);
                return vec![Diagnostic::predicate_error(&rule.name, &message, target.location.clone())];
            }
        };

        let template = rule.message.as_deref().unwrap_or(DEFAULT_TEMPLATE);
        violations
            .into_iter()
            .map(|violation| {
                let path = target.location.join(&violation.path);
                let shown = value.and_then(|v| descend(v, &violation.path));
                let message = render(
                    template,
                    &TemplateContext {
                        location: &path,
                        value: shown,
                        error: &violation.message,
                        description: rule.description.as_deref(),
                    },
                );
                Diagnostic::new(&rule.name, severity, &message, path, &violation.code)
            })
            .collect()
    }
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("rules", &self.rules.len())
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

/// Shareable cancellation handle
pub type SharedRunContext = Arc<RunContext>;

/// Value below `value` at a relative path
fn descend<'v>(value: &'v Value, path: &[PathSegment]) -> Option<&'v Value> {
    path.iter().try_fold(value, |current, segment| match segment {
        PathSegment::Key(key) => current.get(key.as_str()),
        PathSegment::Index(index) => current.get(*index),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::RuleSeverity;
    use crate::document::Format;
    use crate::predicate::{PredicateError, Violation};
    use crate::rule::{InvocationSpec, RuleSpec};
    use crate::ruleset::RuleSet;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn evaluator(set: RuleSet) -> Evaluator {
        Evaluator::new(
            set.resolve().unwrap(),
            PredicateRegistry::with_builtins(),
            EngineConfig::sequential(),
        )
        .unwrap()
    }

    fn petstore() -> Document {
        Document::new(json!({
            "openapi": "3.0.3",
            "info": {"title": "Petstore", "version": "1.0.0"},
            "servers": [{"url": "http://api.example.com"}],
            "paths": {
                "/pets": {
                    "post": {"responses": {"404": {"description": "missing"}}},
                    "get": {"responses": {"200": {"description": "ok"}}}
                }
            }
        }))
    }

    struct Panics;

    impl Predicate for Panics {
        fn name(&self) -> &str {
            "panics"
        }

        fn evaluate(
            &self,
            _value: Option<&Value>,
            _options: &Value,
            _context: &PredicateContext<'_>,
        ) -> Result<Vec<Violation>, PredicateError> {
            panic!("boom")
        }
    }

    struct CancelsRun(SharedRunContext);

    impl Predicate for CancelsRun {
        fn name(&self) -> &str {
            "cancels-run"
        }

        fn evaluate(
            &self,
            _value: Option<&Value>,
            _options: &Value,
            _context: &PredicateContext<'_>,
        ) -> Result<Vec<Violation>, PredicateError> {
            self.0.cancel();
            Ok(vec![Violation::new("cancelled", "cancelling")])
        }
    }

    struct CountsPrepares(Arc<AtomicUsize>);

    impl Predicate for CountsPrepares {
        fn name(&self) -> &str {
            "counts-prepares"
        }

        fn validate_options(&self, _options: &Value) -> Result<(), PredicateError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn evaluate(
            &self,
            _value: Option<&Value>,
            _options: &Value,
            _context: &PredicateContext<'_>,
        ) -> Result<Vec<Violation>, PredicateError> {
            Ok(vec![Violation::new("counted", "counted")])
        }
    }

    #[test]
    fn test_pattern_rule_reports_at_value() {
        let set = RuleSet::new().with_rule(
            "oas3-protocol-https-only",
            RuleSpec::new(
                "$.servers..url",
                InvocationSpec::new("pattern").with_options(json!({"match": "/^https:/"})),
            )
            .with_severity(RuleSeverity::Error)
            .with_message("Servers MUST be https and no other protocol is allowed."),
        );

        let report = evaluator(set).run(&petstore());
        assert_eq!(report.diagnostics.len(), 1);
        let d = &report.diagnostics[0];
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.code, "pattern-mismatch");
        assert_eq!(d.path.to_string(), "#/servers/0/url");
        assert_eq!(d.message, "Servers MUST be https and no other protocol is allowed.");
        assert_eq!(report.error_count, 1);
    }

    #[test]
    fn test_missing_field_is_undefined() {
        let set = RuleSet::new().with_rule(
            "info-contact",
            RuleSpec::new("$.info", InvocationSpec::new("truthy").with_field("contact")),
        );
        let report = evaluator(set).run(&petstore());
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].path.to_string(), "#/info/contact");
        assert_eq!(report.diagnostics[0].message, "\"contact\" property must be truthy");
        assert_eq!(report.diagnostics[0].severity, Severity::Warn);
    }

    #[test]
    fn test_violation_path_and_template() {
        let set = RuleSet::new().with_rule(
            "endpoint-verb-order",
            RuleSpec::new("$.paths[*]", InvocationSpec::new("operation-ordering"))
                .with_message("{{property}} at {{path}}: {{error}}"),
        );
        let report = evaluator(set).run(&petstore());
        assert_eq!(report.diagnostics.len(), 1);
        let d = &report.diagnostics[0];
        assert_eq!(d.path.to_string(), "#/paths/~1pets/get");
        assert!(d.message.starts_with("get at #/paths/~1pets/get: \"get\" must be declared before \"post\""));
    }

    #[test]
    fn test_format_filter() {
        let rule = RuleSpec::new("$.info", InvocationSpec::new("falsy"));
        let set = RuleSet::new()
            .with_rule("oas2-only", rule.clone().with_formats(&[Format::Oas2]))
            .with_rule("oas3-only", rule.with_formats(&[Format::Oas3]));

        let report = evaluator(set).run(&petstore());
        let names: Vec<&str> = report.diagnostics.iter().map(|d| d.rule_name.as_str()).collect();
        assert_eq!(names, vec!["oas3-only"]);
        assert_eq!(report.rules_skipped, 1);
        assert_eq!(report.rules_evaluated, 1);
    }

    #[test]
    fn test_unresolved_twin() {
        let document = Document::new(json!({"info": {"title": "resolved"}}))
            .with_unresolved(json!({"info": {"$ref": "#/x"}}));
        let set = RuleSet::new().with_rule(
            "no-refs",
            RuleSpec::new("$.info", InvocationSpec::new("undefined").with_field("$ref")).with_resolved(false),
        );
        let report = evaluator(set).run(&document);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].path.to_string(), "#/info/$ref");
    }

    #[test]
    fn test_invalid_options_reported_once() {
        let set = RuleSet::new()
            .with_rule(
                "broken",
                RuleSpec::new("$.paths.*.*", InvocationSpec::new("pattern").with_options(json!({"match": "("}))),
            )
            .with_rule("fine", RuleSpec::new("$.info", InvocationSpec::new("falsy")));

        let report = evaluator(set).run(&petstore());
        let broken: Vec<_> = report.for_rule("broken").collect();
        assert_eq!(broken.len(), 1);
        assert!(broken[0].is_predicate_error());
        assert_eq!(broken[0].severity, Severity::Error);
        assert_eq!(broken[0].path.to_string(), "#/paths/~1pets/post");
        assert_eq!(report.for_rule("fine").count(), 1);
    }

    #[test]
    fn test_type_mismatch_becomes_predicate_error() {
        let set = RuleSet::new().with_rule(
            "casing-on-object",
            RuleSpec::new("$.info", InvocationSpec::new("casing").with_options(json!({"type": "snake"}))),
        );
        let report = evaluator(set).run(&petstore());
        assert_eq!(report.diagnostics.len(), 1);
        assert!(report.diagnostics[0].is_predicate_error());
        assert_eq!(report.diagnostics[0].path.to_string(), "#/info");
    }

    #[test]
    fn test_panic_is_contained() {
        let mut registry = PredicateRegistry::with_builtins();
        registry.register(Arc::new(Panics));
        let set = RuleSet::new()
            .with_rule("explodes", RuleSpec::new("$.info", InvocationSpec::new("panics")))
            .with_rule("fine", RuleSpec::new("$.info", InvocationSpec::new("falsy")));

        let evaluator = Evaluator::new(set.resolve().unwrap(), registry, EngineConfig::sequential()).unwrap();
        let report = evaluator.run(&petstore());
        assert_eq!(report.diagnostics.len(), 2);
        assert!(report.diagnostics[0].is_predicate_error());
        assert!(report.diagnostics[0].message.contains("boom"));
        assert_eq!(report.diagnostics[1].rule_name, "fine");
    }

    #[test]
    fn test_unknown_predicate() {
        let set = RuleSet::new().with_rule("r", RuleSpec::new("$", InvocationSpec::new("nope")));
        let err = Evaluator::with_builtins(set.resolve().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPredicate { ref function, .. } if function == "nope"));
    }

    #[test]
    fn test_dedupe_keeps_selection_order() {
        let set = RuleSet::new().with_rule(
            "twice",
            RuleSpec::new("$.paths.*.*", InvocationSpec::new("defined").with_field("summary"))
                .with_given("$.paths['/pets'][get,post]"),
        );
        let report = evaluator(set).run(&petstore());
        let paths: Vec<String> = report.diagnostics.iter().map(|d| d.path.to_string()).collect();
        assert_eq!(paths, vec!["#/paths/~1pets/post/summary", "#/paths/~1pets/get/summary"]);
    }

    #[test]
    fn test_diagnostics_follow_document_order() {
        let set = RuleSet::new().with_rule(
            "needs-x",
            RuleSpec::new("$.paths[*]", InvocationSpec::new("truthy").with_field("x")),
        );
        let document = Document::new(json!({"paths": {"/zoo": {}, "/apple": {}, "/mid": {}}}));
        let report = evaluator(set).run(&document);
        let paths: Vec<String> = report.diagnostics.iter().map(|d| d.path.to_string()).collect();
        assert_eq!(paths, vec!["#/paths/~1zoo/x", "#/paths/~1apple/x", "#/paths/~1mid/x"]);
    }

    #[test]
    fn test_same_node_keeps_then_order() {
        let set = RuleSet::new().with_rule(
            "two-checks",
            RuleSpec::new("$.paths[*]", InvocationSpec::new("truthy").with_field("b"))
                .with_then(InvocationSpec::new("truthy").with_field("a")),
        );
        let document = Document::new(json!({"paths": {"/one": {}, "/two": {}}}));
        let report = evaluator(set).run(&document);
        let paths: Vec<String> = report.diagnostics.iter().map(|d| d.path.to_string()).collect();
        assert_eq!(
            paths,
            vec!["#/paths/~1one/b", "#/paths/~1one/a", "#/paths/~1two/b", "#/paths/~1two/a"]
        );
    }

    #[test]
    fn test_invalid_options_without_selection_are_silent() {
        let set = RuleSet::new().with_rule(
            "broken",
            RuleSpec::new("$.nowhere", InvocationSpec::new("pattern").with_options(json!({"match": "("}))),
        );
        let report = evaluator(set).run(&petstore());
        assert!(report.diagnostics.is_empty());
        assert_eq!(report.rules_evaluated, 1);
    }

    #[test]
    fn test_prepared_once_per_invocation() {
        let prepared = Arc::new(AtomicUsize::new(0));
        let mut registry = PredicateRegistry::with_builtins();
        registry.register(Arc::new(CountsPrepares(Arc::clone(&prepared))));

        let set = RuleSet::new().with_rule(
            "counted",
            RuleSpec::new("$.paths.*.*", InvocationSpec::new("counts-prepares")),
        );
        let evaluator = Evaluator::new(set.resolve().unwrap(), registry, EngineConfig::sequential()).unwrap();
        let report = evaluator.run(&petstore());

        assert_eq!(report.rule_timings[0].selection_count, 2);
        assert_eq!(report.diagnostics.len(), 2);
        assert_eq!(prepared.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut set = RuleSet::new();
        for i in 0..16 {
            set = set.with_rule(
                &format!("rule-{}", i),
                RuleSpec::new("$..responses", InvocationSpec::new("default-response-fallback")),
            );
        }
        let resolved = set.resolve().unwrap();

        let sequential =
            Evaluator::new(resolved.clone(), PredicateRegistry::with_builtins(), EngineConfig::sequential()).unwrap();
        let parallel = Evaluator::new(
            resolved,
            PredicateRegistry::with_builtins(),
            EngineConfig { parallel: true, jobs: 4 },
        )
        .unwrap();

        let document = petstore();
        assert_eq!(sequential.run(&document).diagnostics, parallel.run(&document).diagnostics);
    }

    #[test]
    fn test_cancel_before_run() {
        let set = RuleSet::new().with_rule("r", RuleSpec::new("$.info", InvocationSpec::new("falsy")));
        let context = RunContext::new();
        context.cancel();

        let report = evaluator(set).run_with_context(&petstore(), &context);
        assert!(report.cancelled);
        assert!(report.diagnostics.is_empty());
        assert_eq!(report.rules_skipped, 1);
    }

    #[test]
    fn test_cancel_mid_run_keeps_diagnostics() {
        let context: SharedRunContext = Arc::new(RunContext::new());
        let mut registry = PredicateRegistry::with_builtins();
        registry.register(Arc::new(CancelsRun(Arc::clone(&context))));

        let set = RuleSet::new()
            .with_rule("first", RuleSpec::new("$.info", InvocationSpec::new("cancels-run")))
            .with_rule("second", RuleSpec::new("$.info", InvocationSpec::new("falsy")));
        let evaluator = Evaluator::new(set.resolve().unwrap(), registry, EngineConfig::sequential()).unwrap();

        let report = evaluator.run_with_context(&petstore(), &context);
        assert!(report.cancelled);
        assert_eq!(report.rules_evaluated, 1);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].rule_name, "first");
    }

    #[test]
    fn test_timings() {
        let set = RuleSet::new().with_rule("r", RuleSpec::new("$.paths.*.*", InvocationSpec::new("truthy")));
        let report = evaluator(set).run(&petstore());
        assert_eq!(report.rule_timings.len(), 1);
        assert_eq!(report.rule_timings[0].selection_count, 2);
        assert_eq!(report.rule_timings[0].violation_count, 0);
        assert!(report.format_timings().contains("Rule Timing Statistics"));
    }
}
