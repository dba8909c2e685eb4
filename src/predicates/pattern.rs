//! Regular expression predicate

use super::scalar_text;
use crate::predicate::{parse_options, Check, Predicate, PredicateContext, PredicateError, Violation};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::Value;

const NAME: &str = "pattern";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct PatternOptions {
    #[serde(default, rename = "match")]
    must_match: Option<String>,
    #[serde(default)]
    not_match: Option<String>,
}

/// Compile `pattern`, accepting the `/body/flags` literal form.
///
/// Anchors are taken as written: `/^https:/` only anchors the start.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    if let Some(rest) = pattern.strip_prefix('/') {
        if let Some(end) = rest.rfind('/') {
            let (body, flags) = (&rest[..end], &rest[end + 1..]);
            if flags.chars().all(|c| "gimsuxy".contains(c)) {
                return RegexBuilder::new(body)
                    .case_insensitive(flags.contains('i'))
                    .multi_line(flags.contains('m'))
                    .dot_matches_new_line(flags.contains('s'))
                    .ignore_whitespace(flags.contains('x'))
                    .build();
            }
        }
    }
    Regex::new(pattern)
}

/// Compiled `match`/`notMatch` expressions with their sources
struct PatternCheck {
    must_match: Option<(Regex, String)>,
    not_match: Option<(Regex, String)>,
}

impl PatternCheck {
    fn from_options(options: &Value) -> Result<Self, PredicateError> {
        let opts: PatternOptions = parse_options(NAME, options)?;
        if opts.must_match.is_none() && opts.not_match.is_none() {
            return Err(PredicateError::invalid_options(
                NAME,
                "at least one of \"match\" or \"notMatch\" is required",
            ));
        }

        let compile = |source: Option<String>| -> Result<Option<(Regex, String)>, PredicateError> {
            source
                .map(|src| compile_pattern(&src).map(|re| (re, src)))
                .transpose()
                .map_err(|e| PredicateError::invalid_options(NAME, e.to_string()))
        };

        Ok(Self {
            must_match: compile(opts.must_match)?,
            not_match: compile(opts.not_match)?,
        })
    }
}

impl Check for PatternCheck {
    fn check(&self, value: Option<&Value>, _context: &PredicateContext<'_>) -> Result<Vec<Violation>, PredicateError> {
        let Some(value) = value else {
            return Ok(Vec::new());
        };
        let text = scalar_text(value)
            .ok_or_else(|| PredicateError::type_mismatch(NAME, "a scalar", value))?;

        let mut violations = Vec::new();

        if let Some((re, source)) = &self.must_match {
            if !re.is_match(&text) {
                violations.push(Violation::new(
                    "pattern-mismatch",
                    format!("\"{}\" must match the pattern \"{}\"", text, source),
                ));
            }
        }

        if let Some((re, source)) = &self.not_match {
            if re.is_match(&text) {
                violations.push(Violation::new(
                    "pattern-forbidden-match",
                    format!("\"{}\" must not match the pattern \"{}\"", text, source),
                ));
            }
        }

        Ok(violations)
    }
}

/// Fails when the value does not match `match` or matches `notMatch`
pub struct Pattern;

impl Predicate for Pattern {
    fn name(&self) -> &str {
        NAME
    }

    fn prepare<'a>(&'a self, options: &'a Value) -> Result<Box<dyn Check + 'a>, PredicateError> {
        Ok(Box::new(PatternCheck::from_options(options)?))
    }

    fn evaluate(
        &self,
        value: Option<&Value>,
        options: &Value,
        context: &PredicateContext<'_>,
    ) -> Result<Vec<Violation>, PredicateError> {
        PatternCheck::from_options(options)?.check(value, context)
    }
}
