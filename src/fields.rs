//! Field table: canonical field names, aliases and value grammars.
//!
//! Both tables are compile-time perfect hash maps, so lookups never touch
//! shared mutable state.

use std::borrow::Cow;
use std::fmt;

use phf::phf_map;
use regex::Regex;
use thiserror::Error;

use crate::ast::{Annotation, Labels};
use crate::value::{parse_bool, Value, YesNoOnly};

/// The pseudo-field under which patterns are reported.
pub const FIELD_DEFAULT: &str = "";
pub const FIELD_REPO: &str = "repo";
pub const FIELD_REPO_GROUP: &str = "repo-group";
pub const FIELD_FILE: &str = "file";
pub const FIELD_LANG: &str = "lang";
pub const FIELD_AUTHOR: &str = "author";
pub const FIELD_COMMITTER: &str = "committer";
pub const FIELD_MESSAGE: &str = "message";
pub const FIELD_REPO_HAS_FILE: &str = "repohasfile";
pub const FIELD_REPO_HAS_COMMIT_AFTER: &str = "repohascommitafter";
pub const FIELD_BEFORE: &str = "before";
pub const FIELD_AFTER: &str = "after";
pub const FIELD_CASE: &str = "case";
pub const FIELD_ARCHIVED: &str = "archived";
pub const FIELD_FORK: &str = "fork";
pub const FIELD_INDEX: &str = "index";
pub const FIELD_COUNT: &str = "count";
pub const FIELD_MAX: &str = "max";
pub const FIELD_TIMEOUT: &str = "timeout";
pub const FIELD_TYPE: &str = "type";
pub const FIELD_PATTERN_TYPE: &str = "patterntype";
pub const FIELD_CONTENT: &str = "content";
pub const FIELD_CONTEXT: &str = "context";
pub const FIELD_COMBY_RULE: &str = "combyrule";

/// Grammar a field's value must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Regexp,
    Bool,
    /// Non-negative integer.
    Int,
    YesNoOnly,
    /// One of a fixed set of lower-case words.
    Enum(&'static [&'static str]),
}

pub const RESULT_TYPES: &[&str] = &["repo", "symbol", "file", "commit", "diff", "path"];
pub const PATTERN_TYPES: &[&str] = &["regexp", "regex", "literal", "structural"];

static FIELDS: phf::Map<&'static str, FieldKind> = phf_map! {
    "repo" => FieldKind::Regexp,
    "repo-group" => FieldKind::String,
    "file" => FieldKind::Regexp,
    "lang" => FieldKind::String,
    "author" => FieldKind::Regexp,
    "committer" => FieldKind::Regexp,
    "message" => FieldKind::Regexp,
    "repohasfile" => FieldKind::Regexp,
    "repohascommitafter" => FieldKind::String,
    "before" => FieldKind::String,
    "after" => FieldKind::String,
    "case" => FieldKind::Bool,
    "archived" => FieldKind::YesNoOnly,
    "fork" => FieldKind::YesNoOnly,
    "index" => FieldKind::YesNoOnly,
    "count" => FieldKind::Int,
    "max" => FieldKind::Int,
    "timeout" => FieldKind::String,
    "type" => FieldKind::Enum(RESULT_TYPES),
    "patterntype" => FieldKind::Enum(PATTERN_TYPES),
    "content" => FieldKind::String,
    "context" => FieldKind::String,
    "combyrule" => FieldKind::String,
};

static ALIASES: phf::Map<&'static str, &'static str> = phf_map! {
    "r" => "repo",
    "g" => "repo-group",
    "repogroup" => "repo-group",
    "f" => "file",
    "l" => "lang",
    "language" => "lang",
    "m" => "message",
    "msg" => "message",
    "since" => "after",
    "until" => "before",
};

/// Canonical name of a field spelling, resolving aliases. `None` for
/// unknown fields.
pub fn canonical(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    if let Some(&canonical) = ALIASES.get(lower.as_str()) {
        return Some(canonical);
    }
    FIELDS.get_entry(lower.as_str()).map(|(name, _)| *name)
}

/// Like [`canonical`], but unknown names come back lower-cased instead of
/// being rejected.
pub fn canonical_name(name: &str) -> Cow<'static, str> {
    match canonical(name) {
        Some(canonical) => Cow::Borrowed(canonical),
        None => Cow::Owned(name.to_ascii_lowercase()),
    }
}

pub fn is_alias(name: &str) -> bool {
    ALIASES.contains_key(name.to_ascii_lowercase().as_str())
}

/// Value grammar of a canonical field.
pub fn kind(field: &str) -> Option<FieldKind> {
    FIELDS.get(field).copied()
}

/// All canonical field names.
pub fn known_fields() -> impl Iterator<Item = &'static str> {
    FIELDS.keys().copied()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldErrorKind {
    #[error("unrecognized field")]
    UnknownField,
    #[error("invalid regular expression: {0}")]
    InvalidRegexp(String),
    #[error("expected a boolean (yes/no, true/false, 1/0)")]
    InvalidBool,
    #[error("expected one of yes, no, only")]
    InvalidYesNoOnly,
    #[error("expected a non-negative integer")]
    InvalidInt,
    #[error("expected one of {}", .0.join(", "))]
    InvalidEnum(&'static [&'static str]),
    #[error("negation is not supported for this field")]
    NegationNotAllowed,
    #[error("field may appear at most once, found {0} occurrences")]
    Repeated(usize),
    #[error("cannot be combined with `{0}`")]
    Exclusive(String),
}

/// A problem with one field occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub value: String,
    pub kind: FieldErrorKind,
}

impl FieldError {
    pub fn new(field: impl Into<String>, value: impl Into<String>, kind: FieldErrorKind) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            kind,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "pattern {:?}: {}", self.value, self.kind)
        } else {
            write!(f, "field `{}` (value {:?}): {}", self.field, self.value, self.kind)
        }
    }
}

impl std::error::Error for FieldError {}

/// Resolves one occurrence of `field` into its typed value.
///
/// `field` may be an alias. The pattern field (`""`) resolves by its
/// annotation: `Regexp` compiles, everything else stays a string.
pub fn resolve(field: &str, value: &str, annotation: Annotation) -> Result<Value, FieldError> {
    let fail = |reason| FieldError::new(field, value, reason);

    if field == FIELD_DEFAULT {
        if annotation.labels.is_set(Labels::REGEXP) {
            return compile(value).map_err(fail);
        }
        return Ok(Value::String(value.to_string()));
    }

    let field_kind = canonical(field)
        .and_then(kind)
        .ok_or_else(|| fail(FieldErrorKind::UnknownField))?;

    match field_kind {
        FieldKind::String => Ok(Value::String(value.to_string())),
        FieldKind::Regexp => compile(value).map_err(fail),
        FieldKind::Bool => parse_bool(value)
            .map(Value::Bool)
            .ok_or_else(|| fail(FieldErrorKind::InvalidBool)),
        FieldKind::Int => value
            .parse::<u32>()
            .map(|n| Value::Int(i64::from(n)))
            .map_err(|_| fail(FieldErrorKind::InvalidInt)),
        FieldKind::YesNoOnly => value
            .parse::<YesNoOnly>()
            .map(|_| Value::String(value.to_string()))
            .map_err(|_| fail(FieldErrorKind::InvalidYesNoOnly)),
        FieldKind::Enum(allowed) => {
            if allowed.iter().any(|a| a.eq_ignore_ascii_case(value)) {
                Ok(Value::String(value.to_string()))
            } else {
                Err(fail(FieldErrorKind::InvalidEnum(allowed)))
            }
        }
    }
}

fn compile(value: &str) -> Result<Value, FieldErrorKind> {
    Regex::new(value)
        .map(Value::Regexp)
        .map_err(|e| FieldErrorKind::InvalidRegexp(e.to_string()))
}
