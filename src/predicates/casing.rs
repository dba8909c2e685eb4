//! Identifier casing predicate
//!
//! Conformance is decided by a regular expression per casing type. When a
//! value does not conform, it is scanned again to report each deviation
//! separately: offending character runs first, then structural faults.
//! Positions are 0-based character offsets.

use crate::predicate::{parse_options, Check, Predicate, PredicateContext, PredicateError, Violation};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

const NAME: &str = "casing";

/// Supported casing conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseKind {
    Flat,
    Camel,
    Pascal,
    Kebab,
    Cobol,
    Snake,
    Macro,
}

impl CaseKind {
    fn pattern(self, digits: &str) -> String {
        let d = digits;
        match self {
            CaseKind::Flat => format!("[a-z][a-z{d}]*"),
            CaseKind::Camel => format!("[a-z][a-z{d}]*(?:[A-Z{d}](?:[a-z{d}]+|$))*"),
            CaseKind::Pascal => format!("[A-Z][a-z{d}]*(?:[A-Z{d}](?:[a-z{d}]+|$))*"),
            CaseKind::Kebab => format!("[a-z][a-z{d}]*(?:-[a-z{d}]+)*"),
            CaseKind::Cobol => format!("[A-Z][A-Z{d}]*(?:-[A-Z{d}]+)*"),
            CaseKind::Snake => format!("[a-z][a-z{d}]*(?:_[a-z{d}]+)*"),
            CaseKind::Macro => format!("[A-Z][A-Z{d}]*(?:_[A-Z{d}]+)*"),
        }
    }

    fn letters(self) -> Letters {
        match self {
            CaseKind::Flat | CaseKind::Kebab | CaseKind::Snake => Letters::Lower,
            CaseKind::Cobol | CaseKind::Macro => Letters::Upper,
            CaseKind::Camel | CaseKind::Pascal => Letters::Mixed,
        }
    }

    fn word_separator(self) -> Option<char> {
        match self {
            CaseKind::Kebab | CaseKind::Cobol => Some('-'),
            CaseKind::Snake | CaseKind::Macro => Some('_'),
            _ => None,
        }
    }
}

impl fmt::Display for CaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaseKind::Flat => "flat",
            CaseKind::Camel => "camel",
            CaseKind::Pascal => "pascal",
            CaseKind::Kebab => "kebab",
            CaseKind::Cobol => "cobol",
            CaseKind::Snake => "snake",
            CaseKind::Macro => "macro",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Letters {
    Lower,
    Upper,
    Mixed,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct SeparatorOptions {
    #[serde(rename = "char")]
    character: String,
    #[serde(default)]
    allow_leading: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct CasingOptions {
    #[serde(rename = "type")]
    kind: CaseKind,
    #[serde(default)]
    disallow_digits: bool,
    #[serde(default)]
    separator: Option<SeparatorOptions>,
}

/// Validated options, ready to check values
struct Checker {
    kind: CaseKind,
    digits: bool,
    separator: Option<(char, bool)>,
    regex: Regex,
}

impl Checker {
    fn from_options(options: &Value) -> Result<Self, PredicateError> {
        let opts: CasingOptions = parse_options(NAME, options)?;

        let separator = match &opts.separator {
            None => None,
            Some(sep) => {
                let mut chars = sep.character.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some((c, sep.allow_leading)),
                    _ => {
                        return Err(PredicateError::invalid_options(
                            NAME,
                            "separator.char must be exactly one character",
                        ))
                    }
                }
            }
        };

        let digits = if opts.disallow_digits { "" } else { "0-9" };
        let case = format!("(?:{})", opts.kind.pattern(digits));
        let source = match separator {
            None => format!("^{}$", case),
            Some((c, allow_leading)) => {
                let sep = regex::escape(&c.to_string());
                let leading = if allow_leading { format!("{}?", sep) } else { String::new() };
                format!("^{leading}{case}(?:{sep}{case})*$")
            }
        };
        let regex = Regex::new(&source)
            .map_err(|e| PredicateError::internal(NAME, e.to_string()))?;

        Ok(Self {
            kind: opts.kind,
            digits: !opts.disallow_digits,
            separator,
            regex,
        })
    }

    fn conforms(&self, value: &str) -> bool {
        if let Some((c, true)) = self.separator {
            let mut chars = value.chars();
            if chars.next() == Some(c) && chars.next().is_none() {
                return true;
            }
        }
        self.regex.is_match(value)
    }

    fn deviations(&self, value: &str) -> Vec<String> {
        let chars: Vec<char> = value.chars().collect();
        let mut found = self.character_runs(&chars);

        let custom = self.separator.map(|(c, _)| c);
        let mut start = 0;
        if let Some((c, allow_leading)) = self.separator {
            found.extend(separator_faults(&chars, 0, c, allow_leading));
            if allow_leading && chars.first() == Some(&c) {
                start = 1;
            }
        }

        // Words between custom separators each follow the casing rules
        let mut offset = start;
        for segment in chars[start..].split(|ch| Some(*ch) == custom) {
            if !segment.is_empty() {
                found.extend(self.segment_faults(segment, offset));
            }
            offset += segment.len() + 1;
        }

        if found.is_empty() {
            found.push(format!("must be {} case", self.kind));
        }
        found
    }

    fn classify(&self, ch: char) -> Option<&'static str> {
        if Some(ch) == self.kind.word_separator() || Some(ch) == self.separator.map(|(c, _)| c) {
            return None;
        }
        let letters = self.kind.letters();
        if ch.is_ascii_digit() {
            (!self.digits).then_some("digits")
        } else if ch.is_ascii_lowercase() {
            (letters == Letters::Upper).then_some("lowercase letters")
        } else if ch.is_ascii_uppercase() {
            (letters == Letters::Lower).then_some("uppercase letters")
        } else if matches!(ch, '-' | '_' | '.' | ' ') {
            Some("separator")
        } else {
            Some("characters")
        }
    }

    fn character_runs(&self, chars: &[char]) -> Vec<String> {
        let mut found = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let Some(label) = self.classify(chars[i]) else {
                i += 1;
                continue;
            };
            let start = i;
            while i < chars.len() && self.classify(chars[i]) == Some(label) {
                i += 1;
            }
            let run: String = chars[start..i].iter().collect();
            found.push(format!(
                "{} \"{}\" at position {} not allowed in {} case",
                label, run, start, self.kind
            ));
        }
        found
    }

    fn segment_faults(&self, segment: &[char], offset: usize) -> Vec<String> {
        let mut found = Vec::new();

        if segment[0].is_ascii_digit() {
            found.push(format!("must not start with a digit at position {}", offset));
        }

        if let Some(sep) = self.kind.word_separator() {
            found.extend(separator_faults(segment, offset, sep, false));
        }

        if self.kind.letters() == Letters::Mixed {
            let first = segment[0];
            if self.kind == CaseKind::Camel && first.is_ascii_uppercase() {
                found.push(format!("must start with a lowercase letter at position {}", offset));
            }
            if self.kind == CaseKind::Pascal && first.is_ascii_lowercase() {
                found.push(format!("must start with an uppercase letter at position {}", offset));
            }

            let mut i = 0;
            while i < segment.len() {
                if !segment[i].is_ascii_uppercase() {
                    i += 1;
                    continue;
                }
                let start = i;
                while i < segment.len() && segment[i].is_ascii_uppercase() {
                    i += 1;
                }
                if i - start > 1 {
                    let run: String = segment[start..i].iter().collect();
                    found.push(format!(
                        "consecutive capitals \"{}\" at position {}",
                        run,
                        offset + start
                    ));
                }
            }
        }

        found
    }
}

fn separator_faults(chars: &[char], offset: usize, sep: char, allow_leading: bool) -> Vec<String> {
    let mut found = Vec::new();
    if chars.is_empty() {
        return found;
    }

    if chars[0] == sep && !allow_leading {
        found.push(format!("leading separator \"{}\" at position {}", sep, offset));
    }
    let last = chars.len() - 1;
    if last > 0 && chars[last] == sep {
        found.push(format!("trailing separator \"{}\" at position {}", sep, offset + last));
    }
    for i in 1..chars.len() {
        if chars[i] == sep && chars[i - 1] == sep && (i < 2 || chars[i - 2] != sep) {
            found.push(format!("doubled separator \"{}{}\" at position {}", sep, sep, offset + i - 1));
        }
    }
    found
}

/// Fails when a string does not follow a casing convention
pub struct Casing;

impl Check for Checker {
    fn check(&self, value: Option<&Value>, _context: &PredicateContext<'_>) -> Result<Vec<Violation>, PredicateError> {
        let text = match value {
            None => return Ok(Vec::new()),
            Some(Value::String(s)) => s,
            Some(other) => return Err(PredicateError::type_mismatch(NAME, "a string", other)),
        };
        if text.is_empty() || self.conforms(text) {
            return Ok(Vec::new());
        }

        Ok(self
            .deviations(text)
            .into_iter()
            .map(|message| Violation::new(NAME, message))
            .collect())
    }
}

impl Predicate for Casing {
    fn name(&self) -> &str {
        NAME
    }

    fn prepare<'a>(&'a self, options: &'a Value) -> Result<Box<dyn Check + 'a>, PredicateError> {
        Ok(Box::new(Checker::from_options(options)?))
    }

    fn evaluate(
        &self,
        value: Option<&Value>,
        options: &Value,
        context: &PredicateContext<'_>,
    ) -> Result<Vec<Violation>, PredicateError> {
        Checker::from_options(options)?.check(value, context)
    }
}
