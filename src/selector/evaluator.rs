//! Path expression evaluation over a document tree

use super::ast::{PathExpression, Selector, Step, UnionMember};
use super::filter::{normalize_index, FilterScope};
use crate::diagnostic::{Location, PathSegment};
use serde_json::Value;
use std::borrow::Cow;

/// A node picked out by a path expression
#[derive(Debug, Clone, PartialEq)]
pub struct Selected<'a> {
    /// The node, or the member key when the expression selects keys
    pub value: Cow<'a, Value>,
    /// Where the node sits in the document
    pub location: Location,
}

impl PathExpression {
    /// Select every matching node of `root`, in document order
    pub fn select<'a>(&self, root: &'a Value) -> Vec<Selected<'a>> {
        self.select_from(root, &Location::root())
    }

    /// Select relative to a node already located at `base`
    pub fn select_from<'a>(&self, node: &'a Value, base: &Location) -> Vec<Selected<'a>> {
        let mut current: Vec<(&'a Value, Location)> = vec![(node, base.clone())];

        for step in &self.steps {
            let mut next = Vec::new();
            for &(value, ref location) in &current {
                match step {
                    Step::Child(selector) => apply(selector, value, location, &mut next),
                    Step::Descendant(selector) => {
                        let mut nodes = Vec::new();
                        descendants_or_self(value, location, &mut nodes);
                        for (descendant, at) in nodes {
                            apply(selector, descendant, &at, &mut next);
                        }
                    }
                }
            }
            current = next;
            if current.is_empty() {
                break;
            }
        }

        if self.keys {
            return current
                .into_iter()
                .filter_map(|(_, location)| {
                    let key = location.last()?.as_property();
                    Some(Selected {
                        value: Cow::Owned(Value::String(key)),
                        location,
                    })
                })
                .collect();
        }

        current
            .into_iter()
            .map(|(value, location)| Selected {
                value: Cow::Borrowed(value),
                location,
            })
            .collect()
    }
}

fn apply<'a>(
    selector: &Selector,
    node: &'a Value,
    location: &Location,
    out: &mut Vec<(&'a Value, Location)>,
) {
    match selector {
        Selector::Name(name) => select_name(node, name, location, out),
        Selector::Index(index) => select_index(node, *index, location, out),
        Selector::Wildcard => {
            for (segment, child) in children(node) {
                out.push((child, location.child(segment)));
            }
        }
        Selector::Union(members) => {
            for member in members {
                match member {
                    UnionMember::Name(name) => select_name(node, name, location, out),
                    UnionMember::Index(index) => select_index(node, *index, location, out),
                }
            }
        }
        Selector::Filter(expr) => {
            let parent_property = location.last();
            for (segment, child) in children(node) {
                let scope = FilterScope {
                    value: child,
                    property: &segment,
                    parent_property,
                };
                if expr.matches(&scope) {
                    out.push((child, location.child(segment)));
                }
            }
        }
    }
}

fn select_name<'a>(
    node: &'a Value,
    name: &str,
    location: &Location,
    out: &mut Vec<(&'a Value, Location)>,
) {
    if let Value::Object(map) = node {
        if let Some(child) = map.get(name) {
            out.push((child, location.child(name)));
        }
    }
}

fn select_index<'a>(
    node: &'a Value,
    index: i64,
    location: &Location,
    out: &mut Vec<(&'a Value, Location)>,
) {
    match node {
        Value::Array(items) => {
            if let Some(i) = normalize_index(index, items.len()) {
                out.push((&items[i], location.child(i)));
            }
        }
        // `responses[200]` addresses the "200" member
        Value::Object(_) => select_name(node, &index.to_string(), location, out),
        _ => {}
    }
}

/// Members of a mapping (document order) or elements of a sequence
fn children(node: &Value) -> Vec<(PathSegment, &Value)> {
    match node {
        Value::Object(map) => map
            .iter()
            .map(|(key, child)| (PathSegment::Key(key.clone()), child))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, child)| (PathSegment::Index(i), child))
            .collect(),
        _ => Vec::new(),
    }
}

/// Pre-order walk: the node first, then each subtree in document order
fn descendants_or_self<'a>(
    node: &'a Value,
    location: &Location,
    out: &mut Vec<(&'a Value, Location)>,
) {
    out.push((node, location.clone()));
    for (segment, child) in children(node) {
        descendants_or_self(child, &location.child(segment), out);
    }
}
