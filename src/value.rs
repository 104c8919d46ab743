//! Typed field values.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::Serialize;

/// The resolved, typed form of a pattern or parameter value.
#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Regexp(Regex),
    Bool(bool),
    Int(i64),
}

impl Value {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_regexp(&self) -> Option<&Regex> {
        match self {
            Value::Regexp(re) => Some(re),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Source text of string and regexp values.
    pub fn source(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Regexp(re) => Some(re.as_str()),
            _ => None,
        }
    }
}

// Regexps compare by source text.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Regexp(a), Value::Regexp(b)) => a.as_str() == b.as_str(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Regexp(re) => write!(f, "/{}/", re.as_str()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
        }
    }
}

/// Tri-state used by the `archived`, `fork` and `index` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNoOnly {
    Yes,
    No,
    Only,
}

impl FromStr for YesNoOnly {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yes" | "y" => Ok(YesNoOnly::Yes),
            "no" | "n" => Ok(YesNoOnly::No),
            "only" | "o" => Ok(YesNoOnly::Only),
            _ => Err(()),
        }
    }
}

impl fmt::Display for YesNoOnly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            YesNoOnly::Yes => "yes",
            YesNoOnly::No => "no",
            YesNoOnly::Only => "only",
        })
    }
}

/// Permissive boolean grammar: `yes/true/1` and `no/false/0`, any case.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Some(true),
        "no" | "false" | "0" => Some(false),
        _ => None,
    }
}
