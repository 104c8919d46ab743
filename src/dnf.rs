//! Disjunctive normal form.
//!
//! A query tree is rewritten into an ordered list of [`Basic`] queries whose
//! disjunction is equivalent to the tree. `not` is pushed down to the
//! leaves with De Morgan's laws and `and` is distributed over `or`:
//!
//! ```text
//! (a or b) (c or d)      =>  [a c] [a d] [b c] [b d]
//! not (repo:x or foo)    =>  [-repo:x (not foo)]
//! ```
//!
//! The order of the output is the left-to-right order of the expanded
//! alternatives. Executors may run them independently and stop at the
//! first hit, so the order is part of the contract.

use crate::ast::{Basic, Node, OperatorKind, Q, SearchType};
use crate::error::QueryError;
use crate::fields::FIELD_PATTERN_TYPE;
use crate::visitor;

/// A conjunction of leaves with their effective negation.
type Conjunct = Vec<Node>;

/// Upper bound on the number of sub-queries one query may expand into.
pub const MAX_SUB_QUERIES: usize = 1024;

/// Rejects queries that parse but cannot be normalized: a sub-query that
/// would need more than one pattern, an expansion into more than
/// [`MAX_SUB_QUERIES`] sub-queries, and conflicting pattern types.
pub fn check_supported(q: &Q) -> Result<(), QueryError> {
    let patterns: usize = q.nodes().iter().map(|node| max_patterns(node, false)).sum();
    if patterns > 1 {
        return Err(QueryError::Unsupported(format!(
            "{q} requires {patterns} patterns to match in the same sub-query; \
             write them as one pattern or as alternatives joined by `or`"
        )));
    }

    let disjuncts = q
        .nodes()
        .iter()
        .map(|node| count_disjuncts(node, false))
        .fold(1usize, usize::saturating_mul);
    if disjuncts > MAX_SUB_QUERIES {
        return Err(QueryError::Unsupported(format!(
            "query expands into more than {MAX_SUB_QUERIES} sub-queries"
        )));
    }

    let mut pattern_types = visitor::parameters(q.nodes())
        .filter(|visit| visit.field == FIELD_PATTERN_TYPE)
        .filter_map(|visit| visit.value.parse::<SearchType>().ok().map(|st| (st, visit.value)));
    if let Some((first, first_value)) = pattern_types.next() {
        if let Some((_, other_value)) = pattern_types.find(|(st, _)| *st != first) {
            return Err(QueryError::Unsupported(format!(
                "conflicting pattern types `{first_value}` and `{other_value}`"
            )));
        }
    }

    Ok(())
}

/// Largest number of patterns any single conjunct of `node` will hold after
/// expansion.
fn max_patterns(node: &Node, negated: bool) -> usize {
    match node {
        Node::Pattern(_) => 1,
        Node::Parameter(_) => 0,
        Node::Operator(op) => {
            let counts = op.operands.iter().map(|operand| match op.kind {
                OperatorKind::Not => max_patterns(operand, !negated),
                _ => max_patterns(operand, negated),
            });
            match (op.kind, negated) {
                (OperatorKind::Or, false) | (OperatorKind::And, true) => counts.max().unwrap_or(0),
                _ => counts.sum(),
            }
        }
    }
}

/// Number of conjuncts `node` (negated if `negated`) expands into,
/// saturating at `usize::MAX`.
fn count_disjuncts(node: &Node, negated: bool) -> usize {
    match node {
        Node::Pattern(_) | Node::Parameter(_) => 1,
        Node::Operator(op) => {
            let counts = op.operands.iter().map(|operand| match op.kind {
                OperatorKind::Not => count_disjuncts(operand, !negated),
                _ => count_disjuncts(operand, negated),
            });
            match (op.kind, negated) {
                (OperatorKind::Or, false) | (OperatorKind::And, true) => {
                    counts.fold(0, usize::saturating_add)
                }
                _ => counts.fold(1, usize::saturating_mul),
            }
        }
    }
}

/// Normalizes `q` into its ordered list of sub-queries.
///
/// Runs [`check_supported`] first, so unsupported input is reported as
/// [`QueryError::Unsupported`]. [`QueryError::Invariant`] means the
/// expansion itself went wrong.
pub fn to_dnf(q: &Q) -> Result<Vec<Basic>, QueryError> {
    check_supported(q)?;
    let disjuncts = product(q.nodes().iter().map(|node| expand(node, false)));
    disjuncts.into_iter().map(to_basic).collect()
}

/// Expands `node` (negated if `negated`) into a disjunction of conjuncts.
fn expand(node: &Node, negated: bool) -> Vec<Conjunct> {
    match node {
        Node::Pattern(pattern) => {
            let mut pattern = pattern.clone();
            pattern.negated ^= negated;
            vec![vec![Node::Pattern(pattern)]]
        }
        Node::Parameter(parameter) => {
            let mut parameter = parameter.clone();
            parameter.negated ^= negated;
            vec![vec![Node::Parameter(parameter)]]
        }
        Node::Operator(op) => match (op.kind, negated) {
            (OperatorKind::Not, _) => product(op.operands.iter().map(|operand| expand(operand, !negated))),
            (OperatorKind::And, false) | (OperatorKind::Or, true) => {
                product(op.operands.iter().map(|operand| expand(operand, negated)))
            }
            (OperatorKind::Or, false) | (OperatorKind::And, true) => op
                .operands
                .iter()
                .flat_map(|operand| expand(operand, negated))
                .collect(),
        },
    }
}

/// Conjoins disjunctions: `[[a], [b]] x [[c], [d]]` gives
/// `[[a, c], [a, d], [b, c], [b, d]]`.
fn product(disjunctions: impl Iterator<Item = Vec<Conjunct>>) -> Vec<Conjunct> {
    let mut acc: Vec<Conjunct> = vec![Vec::new()];
    for alternatives in disjunctions {
        let mut next = Vec::with_capacity(acc.len() * alternatives.len());
        for prefix in &acc {
            for alternative in &alternatives {
                let mut conjunct = prefix.clone();
                conjunct.extend(alternative.iter().cloned());
                next.push(conjunct);
            }
        }
        acc = next;
    }
    acc
}

fn to_basic(conjunct: Conjunct) -> Result<Basic, QueryError> {
    let mut basic = Basic::default();
    for node in conjunct {
        match node {
            Node::Pattern(pattern) => {
                if let Some(existing) = &basic.pattern {
                    return Err(QueryError::Invariant(format!(
                        "sub-query has more than one pattern: {existing} and {pattern}"
                    )));
                }
                basic.pattern = Some(pattern);
            }
            Node::Parameter(parameter) => basic.parameters.push(parameter),
            Node::Operator(op) => {
                return Err(QueryError::Invariant(format!(
                    "operator left in sub-query: {}",
                    Node::Operator(op)
                )))
            }
        }
    }
    Ok(basic)
}
