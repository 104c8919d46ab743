//! Iterator-based traversal of query trees and normalized queries.
//!
//! Every traversal yields [`Visit`] records in left-to-right order. Field
//! arguments accept aliases (`r` finds `repo` parameters); the empty field
//! name selects patterns.

use crate::ast::{Annotation, Basic, Node, Parameter, Pattern};
use crate::fields::{canonical_name, FIELD_DEFAULT};

/// One pattern or parameter occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit<'a> {
    /// Canonical field name, `""` for patterns.
    pub field: &'a str,
    pub value: &'a str,
    pub negated: bool,
    pub annotation: Annotation,
}

impl<'a> Visit<'a> {
    pub fn pattern(pattern: &'a Pattern) -> Self {
        Self {
            field: FIELD_DEFAULT,
            value: &pattern.value,
            negated: pattern.negated,
            annotation: pattern.annotation,
        }
    }

    pub fn parameter(parameter: &'a Parameter) -> Self {
        Self {
            field: &parameter.field,
            value: &parameter.value,
            negated: parameter.negated,
            annotation: parameter.annotation,
        }
    }

    pub fn is_pattern(&self) -> bool {
        self.field == FIELD_DEFAULT
    }
}

/// Depth-first, left-to-right iterator over the leaves of a tree.
///
/// Leaf negation flags are reported as written; enclosing `not` operators
/// are not applied.
pub struct Leaves<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                Node::Operator(op) => self.stack.extend(op.operands.iter().rev()),
                leaf => return Some(leaf),
            }
        }
        None
    }
}

pub fn leaves(nodes: &[Node]) -> Leaves<'_> {
    Leaves {
        stack: nodes.iter().rev().collect(),
    }
}

fn visit_leaf(node: &Node) -> Option<Visit<'_>> {
    match node {
        Node::Pattern(pattern) => Some(Visit::pattern(pattern)),
        Node::Parameter(parameter) => Some(Visit::parameter(parameter)),
        Node::Operator(_) => None,
    }
}

/// Every pattern and parameter in the tree.
pub fn visit_all(nodes: &[Node]) -> impl Iterator<Item = Visit<'_>> {
    leaves(nodes).filter_map(visit_leaf)
}

pub fn patterns(nodes: &[Node]) -> impl Iterator<Item = Visit<'_>> {
    visit_all(nodes).filter(Visit::is_pattern)
}

pub fn parameters(nodes: &[Node]) -> impl Iterator<Item = Visit<'_>> {
    visit_all(nodes).filter(|visit| !visit.is_pattern())
}

/// Occurrences of one field; `""` selects patterns.
pub fn field<'a>(nodes: &'a [Node], field: &str) -> impl Iterator<Item = Visit<'a>> {
    let field = canonical_name(field);
    visit_all(nodes).filter(move |visit| visit.field == field)
}

impl Basic {
    /// The pattern (if any) followed by the parameters, in order.
    pub fn visit_all(&self) -> impl Iterator<Item = Visit<'_>> {
        self.pattern
            .iter()
            .map(Visit::pattern)
            .chain(self.parameters.iter().map(Visit::parameter))
    }

    /// Occurrences of one field; `""` selects the pattern.
    pub fn visit(&self, field: &str) -> impl Iterator<Item = Visit<'_>> {
        let field = canonical_name(field);
        self.visit_all().filter(move |visit| visit.field == field)
    }
}
