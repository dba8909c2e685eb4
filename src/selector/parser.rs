//! Recursive-descent parser for path expressions

use super::ast::{
    CompareOp, FilterExpr, Operand, PathExpression, PropertyKey, Selector, Step, UnionMember,
};
use super::SelectorError;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

/// Parse a path expression such as `$.paths[*][?(@property == 'get')]`
pub fn parse(expression: &str) -> Result<PathExpression, SelectorError> {
    let source = expression.trim();
    let (body, keys) = match source.strip_suffix('~') {
        Some(rest) => (rest, true),
        None => (source, false),
    };

    let mut parser = Parser::new(body, source);
    let steps = parser.parse_steps()?;

    Ok(PathExpression {
        source: source.to_string(),
        steps,
        keys,
    })
}

struct Parser<'s> {
    chars: Vec<char>,
    pos: usize,
    source: &'s str,
}

impl<'s> Parser<'s> {
    fn new(body: &str, source: &'s str) -> Self {
        Self {
            chars: body.chars().collect(),
            pos: 0,
            source,
        }
    }

    fn error(&self, message: impl Into<String>) -> SelectorError {
        SelectorError {
            expression: self.source.to_string(),
            offset: self.chars[..self.pos.min(self.chars.len())]
                .iter()
                .map(|c| c.len_utf8())
                .sum(),
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.starts_with(text) {
            self.pos += text.chars().count();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), SelectorError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c)))
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn parse_steps(&mut self) -> Result<Vec<Step>, SelectorError> {
        if !self.eat("$") {
            return Err(self.error("expression must start with '$'"));
        }

        let mut steps = Vec::new();
        while !self.at_end() {
            if self.eat("..") {
                let selector = match self.peek() {
                    Some('[') => self.parse_bracket()?,
                    Some('*') => {
                        self.pos += 1;
                        Selector::Wildcard
                    }
                    _ => Selector::Name(self.parse_name()?),
                };
                steps.push(Step::Descendant(selector));
            } else if self.eat(".") {
                match self.peek() {
                    // `$.paths.[*]` is the same as `$.paths[*]`
                    Some('[') => continue,
                    Some('*') => {
                        self.pos += 1;
                        steps.push(Step::Child(Selector::Wildcard));
                    }
                    _ => steps.push(Step::Child(Selector::Name(self.parse_name()?))),
                }
            } else if self.peek() == Some('[') {
                steps.push(Step::Child(self.parse_bracket()?));
            } else {
                return Err(self.error("expected '.', '..' or '['"));
            }
        }

        Ok(steps)
    }

    fn parse_name(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '.' || c == '[' || c == ']' || c.is_whitespace() {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a member name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_bracket(&mut self) -> Result<Selector, SelectorError> {
        self.expect('[')?;
        self.skip_ws();

        if self.peek() == Some('*') {
            self.pos += 1;
            self.skip_ws();
            self.expect(']')?;
            return Ok(Selector::Wildcard);
        }

        if self.peek() == Some('?') {
            self.pos += 1;
            self.skip_ws();
            let expr = self.parse_or()?;
            self.skip_ws();
            self.expect(']')?;
            return Ok(Selector::Filter(expr));
        }

        let mut members = Vec::new();
        loop {
            self.skip_ws();
            members.push(self.parse_union_member()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }

        if members.len() == 1 {
            return Ok(match members.remove(0) {
                UnionMember::Name(name) => Selector::Name(name),
                UnionMember::Index(index) => Selector::Index(index),
            });
        }
        Ok(Selector::Union(members))
    }

    fn parse_union_member(&mut self) -> Result<UnionMember, SelectorError> {
        match self.peek() {
            Some('\'') | Some('"') => Ok(UnionMember::Name(self.parse_quoted()?)),
            Some(c) if c == '-' || c.is_ascii_digit() => {
                let start = self.pos;
                if let Ok(index) = self.parse_integer() {
                    self.skip_ws();
                    if matches!(self.peek(), Some(',' | ']')) {
                        return Ok(UnionMember::Index(index));
                    }
                }
                // Not an index after all, e.g. `[2XX]`
                self.pos = start;
                self.parse_bare_member()
            }
            Some(_) => self.parse_bare_member(),
            None => Err(self.error("unterminated '['")),
        }
    }

    fn parse_bare_member(&mut self) -> Result<UnionMember, SelectorError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == ',' || c == ']' {
                break;
            }
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        let name = name.trim();
        if name.is_empty() {
            return Err(self.error("expected a member name"));
        }
        Ok(UnionMember::Name(name.to_string()))
    }

    fn parse_quoted(&mut self) -> Result<String, SelectorError> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted string")),
        };
        self.pos += 1;

        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => out.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                    self.pos += 1;
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_integer(&mut self) -> Result<i64, SelectorError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map_err(|_| self.error(format!("invalid index '{}'", text)))
    }

    // Filter expressions: or := and ('||' and)*, and := unary ('&&' unary)*

    fn parse_or(&mut self) -> Result<FilterExpr, SelectorError> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_ws();
            if !self.eat("||") {
                return Ok(left);
            }
            let right = self.parse_and()?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        }
    }

    fn parse_and(&mut self) -> Result<FilterExpr, SelectorError> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_ws();
            if !self.eat("&&") {
                return Ok(left);
            }
            let right = self.parse_unary()?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<FilterExpr, SelectorError> {
        self.skip_ws();
        if self.peek() == Some('!') && self.peek_at(1) != Some('=') {
            self.pos += 1;
            let inner = self.parse_unary()?;
            return Ok(FilterExpr::Not(Box::new(inner)));
        }
        if self.peek() == Some('(') {
            self.pos += 1;
            let inner = self.parse_or()?;
            self.skip_ws();
            self.expect(')')?;
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<FilterExpr, SelectorError> {
        let left = self.parse_operand()?;
        self.skip_ws();

        if self.eat("=~") {
            self.skip_ws();
            let regex = self.parse_regex_literal()?;
            return Ok(FilterExpr::Matches { left, regex });
        }

        if self.starts_with("in") && !self.peek_at(2).is_some_and(is_ident_char) {
            self.pos += 2;
            self.skip_ws();
            let list = self.parse_literal_list()?;
            return Ok(FilterExpr::In { left, list });
        }

        let op = if self.eat("===") || self.eat("==") {
            CompareOp::Eq
        } else if self.eat("!==") || self.eat("!=") {
            CompareOp::Ne
        } else if self.eat("<=") {
            CompareOp::Le
        } else if self.eat(">=") {
            CompareOp::Ge
        } else if self.eat("<") {
            CompareOp::Lt
        } else if self.eat(">") {
            CompareOp::Gt
        } else {
            return Ok(FilterExpr::Test(left));
        };

        self.skip_ws();
        let right = self.parse_operand()?;
        Ok(FilterExpr::Compare { left, op, right })
    }

    fn parse_operand(&mut self) -> Result<Operand, SelectorError> {
        self.skip_ws();
        match self.peek() {
            Some('@') => {
                self.pos += 1;
                self.parse_current()
            }
            Some('\'') | Some('"') => Ok(Operand::Literal(Value::String(self.parse_quoted()?))),
            Some(_) => Ok(Operand::Literal(self.parse_scalar_literal()?)),
            None => Err(self.error("expected an operand")),
        }
    }

    fn parse_current(&mut self) -> Result<Operand, SelectorError> {
        if self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            let word = self.parse_identifier();
            return match word.as_str() {
                "property" => Ok(Operand::Property),
                "parentProperty" => Ok(Operand::ParentProperty),
                _ => Err(self.error(format!("unknown reference '@{}'", word))),
            };
        }

        let mut keys = Vec::new();
        loop {
            if self.peek() == Some('.') && self.peek_at(1).is_some_and(is_ident_char) {
                self.pos += 1;
                keys.push(PropertyKey::Name(self.parse_identifier()));
            } else if self.peek() == Some('[') {
                self.pos += 1;
                self.skip_ws();
                let key = match self.peek() {
                    Some('\'') | Some('"') => PropertyKey::Name(self.parse_quoted()?),
                    _ => PropertyKey::Index(self.parse_integer()?),
                };
                self.skip_ws();
                self.expect(']')?;
                keys.push(key);
            } else {
                return Ok(Operand::Current(keys));
            }
        }
    }

    fn parse_identifier(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_scalar_literal(&mut self) -> Result<Value, SelectorError> {
        if self.peek().is_some_and(|c| c == '-' || c.is_ascii_digit()) {
            let start = self.pos;
            self.pos += 1;
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E')
            {
                self.pos += 1;
            }
            let text: String = self.chars[start..self.pos].iter().collect();
            return serde_json::from_str::<Value>(&text)
                .ok()
                .filter(Value::is_number)
                .ok_or_else(|| self.error(format!("invalid number '{}'", text)));
        }

        let word = self.parse_identifier();
        match word.as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "null" => Ok(Value::Null),
            "" => Err(self.error("expected an operand")),
            _ => Err(self.error(format!("unexpected literal '{}'", word))),
        }
    }

    fn parse_literal_list(&mut self) -> Result<Vec<Value>, SelectorError> {
        self.expect('[')?;
        let mut list = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(']') && list.is_empty() {
                self.pos += 1;
                return Ok(list);
            }
            let item = match self.peek() {
                Some('\'') | Some('"') => Value::String(self.parse_quoted()?),
                _ => self.parse_scalar_literal()?,
            };
            list.push(item);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    return Ok(list);
                }
                _ => return Err(self.error("expected ',' or ']' in list")),
            }
        }
    }

    fn parse_regex_literal(&mut self) -> Result<Regex, SelectorError> {
        self.expect('/')?;
        let mut pattern = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated regular expression")),
                Some('\\') if self.peek_at(1) == Some('/') => {
                    pattern.push('/');
                    self.pos += 2;
                }
                Some('\\') => {
                    pattern.push('\\');
                    if let Some(next) = self.peek_at(1) {
                        pattern.push(next);
                    }
                    self.pos += 2;
                }
                Some('/') => {
                    self.pos += 1;
                    break;
                }
                Some(c) => {
                    pattern.push(c);
                    self.pos += 1;
                }
            }
        }

        let flags = self.parse_identifier();
        RegexBuilder::new(&pattern)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build()
            .map_err(|e| self.error(format!("invalid regular expression: {}", e)))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '$'
}
