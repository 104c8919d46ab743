//! Query syntax tree: patterns, parameters and boolean operators.

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

/// Default interpretation of free-text patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    #[serde(alias = "regexp")]
    Regex,
    Literal,
    Structural,
}

impl SearchType {
    /// The label patterns receive under this search type.
    pub fn label(self) -> Labels {
        match self {
            SearchType::Regex => Labels::REGEXP,
            SearchType::Literal => Labels::LITERAL,
            SearchType::Structural => Labels::STRUCTURAL,
        }
    }
}

impl FromStr for SearchType {
    type Err = String;

    /// Accepts the spellings allowed by the `patterntype:` field.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "regexp" | "regex" => Ok(SearchType::Regex),
            "literal" => Ok(SearchType::Literal),
            "structural" => Ok(SearchType::Structural),
            _ => Err(format!("unknown search type {s:?}")),
        }
    }
}

/// Set of annotation labels on a pattern or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Labels(u8);

impl Labels {
    pub const NONE: Labels = Labels(0);
    pub const LITERAL: Labels = Labels(1);
    pub const REGEXP: Labels = Labels(1 << 1);
    pub const STRUCTURAL: Labels = Labels(1 << 2);
    pub const IS_ALIAS: Labels = Labels(1 << 3);
    pub const QUOTED: Labels = Labels(1 << 4);

    const NAMES: [(Labels, &'static str); 5] = [
        (Labels::LITERAL, "Literal"),
        (Labels::REGEXP, "Regexp"),
        (Labels::STRUCTURAL, "Structural"),
        (Labels::IS_ALIAS, "IsAlias"),
        (Labels::QUOTED, "Quoted"),
    ];

    pub fn is_set(self, other: Labels) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: Labels) {
        self.0 |= other.0;
    }

    pub fn unset(&mut self, other: Labels) {
        self.0 &= !other.0;
    }

    /// The label that decides how a pattern value resolves, if any.
    pub fn kind(self) -> Labels {
        Labels(self.0 & (Labels::LITERAL.0 | Labels::REGEXP.0 | Labels::STRUCTURAL.0))
    }

    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .into_iter()
            .filter(move |(label, _)| self.is_set(*label))
            .map(|(_, name)| name)
    }
}

impl std::ops::BitOr for Labels {
    type Output = Labels;

    fn bitor(self, rhs: Labels) -> Labels {
        Labels(self.0 | rhs.0)
    }
}

impl Serialize for Labels {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names: Vec<_> = self.names().collect();
        let mut seq = serializer.serialize_seq(Some(names.len()))?;
        for name in names {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

/// Metadata describing how a node's value is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Annotation {
    pub labels: Labels,
}

impl Annotation {
    pub fn new(labels: Labels) -> Self {
        Self { labels }
    }
}

/// Free-text search pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pattern {
    pub value: String,
    pub negated: bool,
    pub annotation: Annotation,
}

impl Pattern {
    pub fn new(value: impl Into<String>, labels: Labels) -> Self {
        Self {
            value: value.into(),
            negated: false,
            annotation: Annotation::new(labels),
        }
    }
}

/// `field:value` parameter. `field` is already canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub field: String,
    pub value: String,
    pub negated: bool,
    pub annotation: Annotation,
}

impl Parameter {
    pub fn new(field: impl Into<String>, value: impl Into<String>, negated: bool) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            negated,
            annotation: Annotation::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorKind {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operator {
    pub kind: OperatorKind,
    pub operands: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Pattern(Pattern),
    Parameter(Parameter),
    Operator(Operator),
}

impl Node {
    pub fn and(operands: Vec<Node>) -> Node {
        Node::Operator(Operator {
            kind: OperatorKind::And,
            operands,
        })
    }

    pub fn or(operands: Vec<Node>) -> Node {
        Node::Operator(Operator {
            kind: OperatorKind::Or,
            operands,
        })
    }

    pub fn not(operand: Node) -> Node {
        Node::Operator(Operator {
            kind: OperatorKind::Not,
            operands: vec![operand],
        })
    }
}

/// A parsed query: top-level nodes, implicitly conjoined.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Q(pub Vec<Node>);

impl Q {
    pub fn nodes(&self) -> &[Node] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A normalized query: at most one pattern plus the parameters that scope it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Basic {
    pub pattern: Option<Pattern>,
    pub parameters: Vec<Parameter>,
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    f.write_str("\"")
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("(not ")?;
            write_quoted(f, &self.value)?;
            f.write_str(")")
        } else {
            write_quoted(f, &self.value)
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.negated { "-" } else { "" };
        write_quoted(f, &format!("{sign}{}:{}", self.field, self.value))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Pattern(pattern) => pattern.fmt(f),
            Node::Parameter(parameter) => parameter.fmt(f),
            Node::Operator(op) => {
                let name = match op.kind {
                    OperatorKind::And => "and",
                    OperatorKind::Or => "or",
                    OperatorKind::Not => "not",
                };
                write!(f, "({name}")?;
                for operand in &op.operands {
                    write!(f, " {operand}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for Q {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            node.fmt(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for Basic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for parameter in &self.parameters {
            if !first {
                f.write_str(" ")?;
            }
            parameter.fmt(f)?;
            first = false;
        }
        if let Some(pattern) = &self.pattern {
            if !first {
                f.write_str(" ")?;
            }
            pattern.fmt(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let mut labels = Labels::LITERAL | Labels::QUOTED;
        assert!(labels.is_set(Labels::LITERAL));
        assert!(!labels.is_set(Labels::REGEXP));
        assert!(!labels.is_set(Labels::NONE));
        assert_eq!(labels.kind(), Labels::LITERAL);

        labels.unset(Labels::QUOTED);
        labels.set(Labels::IS_ALIAS);
        assert_eq!(labels.names().collect::<Vec<_>>(), vec!["Literal", "IsAlias"]);
    }

    #[test]
    fn test_search_type_from_str() {
        assert_eq!("regexp".parse::<SearchType>(), Ok(SearchType::Regex));
        assert_eq!("Literal".parse::<SearchType>(), Ok(SearchType::Literal));
        assert!("fuzzy".parse::<SearchType>().is_err());
    }

    #[test]
    fn test_display() {
        let q = Q(vec![
            Node::Parameter(Parameter::new("repo", "foo", true)),
            Node::or(vec![
                Node::Pattern(Pattern::new("a\"b", Labels::LITERAL)),
                Node::not(Node::Pattern(Pattern::new("c", Labels::REGEXP))),
            ]),
        ]);
        assert_eq!(q.to_string(), r#""-repo:foo" (or "a\"b" (not "c"))"#);
    }

    #[test]
    fn test_basic_display() {
        let basic = Basic {
            pattern: Some(Pattern::new("bar", Labels::LITERAL)),
            parameters: vec![Parameter::new("repo", "foo", false)],
        };
        assert_eq!(basic.to_string(), r#""repo:foo" "bar""#);
        assert_eq!(Basic::default().to_string(), "");
    }

    #[test]
    fn test_serialize_labels() {
        let pattern = Pattern::new("foo", Labels::LITERAL | Labels::QUOTED);
        let json = serde_json::to_value(&pattern).unwrap();
        assert_eq!(json["annotation"]["labels"], serde_json::json!(["Literal", "Quoted"]));
    }
}
