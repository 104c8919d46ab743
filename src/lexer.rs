//! Lexer for the search query language.
//!
//! Terms are separated by whitespace. A term is one of: a parenthesis, a
//! double-quoted string, an operator keyword, a `field:value` parameter, or
//! a free-text word. Words are scanned with parenthesis balancing so that
//! `foo(bar)` stays one term while the `)` in `(foo)` closes the group.

use std::borrow::Cow;

use crate::token::{Span, Token, TokenKind};

/// Iterator over the tokens of a query string. Never fails: problems such
/// as a missing closing quote are reported as tokens for the parser.
pub struct Lexer<'a> {
    input: &'a str,
    /// Current position in the input (byte offset).
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `input`. Tokens borrow from it, and spans are
    /// byte offsets into it.
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        self.input[self.position..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Reads the body of a double-quoted string. The opening quote has
    /// already been consumed. Returns `None` if the closing quote is missing.
    fn read_quoted(&mut self) -> Option<Cow<'a, str>> {
        let content_start = self.position;
        let mut has_escapes = false;
        loop {
            match self.peek()? {
                '"' => break,
                '\\' if matches!(self.peek_next(), Some('"' | '\\')) => {
                    has_escapes = true;
                    self.bump();
                    self.bump();
                }
                _ => {
                    self.bump();
                }
            }
        }
        let content = &self.input[content_start..self.position];
        self.bump(); // closing quote

        if has_escapes {
            Some(Cow::Owned(unescape(content)))
        } else {
            Some(Cow::Borrowed(content))
        }
    }

    /// Reads free text up to whitespace or an unbalanced `)`.
    fn read_word(&mut self) -> &'a str {
        let start = self.position;
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                c if c.is_whitespace() => break,
                '\\' => {
                    self.bump();
                    self.bump();
                }
                '(' => {
                    depth += 1;
                    self.bump();
                }
                ')' => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    self.bump();
                }
                _ => {
                    self.bump();
                }
            }
        }
        &self.input[start..self.position]
    }

    /// Recognises `-?[A-Za-z][A-Za-z0-9-]*:` at the current position.
    /// Returns the negation flag, the field name and the prefix length.
    fn field_prefix(&self) -> Option<(bool, &'a str, usize)> {
        let rest = &self.input[self.position..];
        let (negated, body) = match rest.strip_prefix('-') {
            Some(body) => (true, body),
            None => (false, rest),
        };

        let mut chars = body.char_indices();
        let (_, first) = chars.next()?;
        if !first.is_ascii_alphabetic() {
            return None;
        }
        let name_end = chars
            .find(|&(_, c)| !(c.is_ascii_alphanumeric() || c == '-'))
            .map(|(i, _)| i)?;
        if body[name_end..].starts_with(':') {
            let field = &body[..name_end];
            Some((negated, field, usize::from(negated) + name_end + 1))
        } else {
            None
        }
    }

    fn read_field(&mut self, negated: bool, field: &'a str, prefix_len: usize) -> TokenKind<'a> {
        self.position += prefix_len;
        if self.peek() == Some('"') {
            self.bump();
            match self.read_quoted() {
                Some(value) => TokenKind::Field {
                    field,
                    value,
                    negated,
                    quoted: true,
                },
                None => TokenKind::UnterminatedQuote,
            }
        } else {
            TokenKind::Field {
                field,
                value: Cow::Borrowed(self.read_word()),
                negated,
                quoted: false,
            }
        }
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next @ ('"' | '\\')) = chars.peek() {
                out.push(next);
                chars.next();
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn match_keyword(s: &str) -> TokenKind<'_> {
    if s.eq_ignore_ascii_case("and") {
        TokenKind::And
    } else if s.eq_ignore_ascii_case("or") {
        TokenKind::Or
    } else if s.eq_ignore_ascii_case("not") {
        TokenKind::Not
    } else {
        TokenKind::Word(s)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;

        let kind = match self.peek()? {
            '(' => {
                self.bump();
                TokenKind::LParen
            }
            ')' => {
                self.bump();
                TokenKind::RParen
            }
            '"' => {
                self.bump();
                match self.read_quoted() {
                    Some(value) => TokenKind::Quoted(value),
                    None => TokenKind::UnterminatedQuote,
                }
            }
            _ => match self.field_prefix() {
                Some((negated, field, len)) => self.read_field(negated, field, len),
                None => match_keyword(self.read_word()),
            },
        };

        Some(Token {
            kind,
            span: Span::new(start, self.position),
        })
    }
}
