//! The token definition for the search query language.

use std::borrow::Cow;

use serde::Serialize;

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // Keywords
    And, // "and" / "AND"
    Or,  // "or" / "OR"
    Not, // "not" / "NOT"

    // Punctuation
    LParen, // (
    RParen, // )

    /// Unquoted free text, kept exactly as typed.
    Word(&'a str),
    /// Double-quoted free text with `\"` and `\\` unescaped.
    Quoted(Cow<'a, str>),
    /// `field:value`, optionally negated with a leading `-`.
    Field {
        field: &'a str,
        value: Cow<'a, str>,
        negated: bool,
        quoted: bool,
    },

    // Special
    UnterminatedQuote, // `"` without its closing quote
}

impl TokenKind<'_> {
    /// True for tokens that can start an operand.
    pub fn starts_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::Not
                | TokenKind::LParen
                | TokenKind::Word(_)
                | TokenKind::Quoted(_)
                | TokenKind::Field { .. }
        )
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The slice of `input` covered by this span.
    pub fn slice<'a>(&self, input: &'a str) -> &'a str {
        input.get(self.start..self.end).unwrap_or_default()
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
