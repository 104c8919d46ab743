//! Parser for the search query language.
//!
//! ## Grammar (lowest precedence first)
//!
//! ```text
//! query    ::= or_expr?
//! or_expr  ::= and_expr ("or" and_expr)*
//! and_expr ::= sequence ("and" sequence)*
//! sequence ::= unary+                 (implicit "and")
//! unary    ::= "not" unary | primary
//! primary  ::= "(" or_expr ")" | pattern | field:value
//! ```
//!
//! Free-text patterns that sit next to each other in one sequence are
//! concatenated into a single pattern, so `foo bar` searches for the text
//! `foo bar` rather than for two independent patterns. A quoted term next
//! to a regexp is escaped into it, so `"a.b" c+` searches for `a\.b c+`.
//!
//! Groups and `not` operators may nest at most [`MAX_DEPTH`] deep.
//!
//! ## Examples
//!
//! ```text
//! repo:foo bar                  one pattern, one parameter
//! foo or bar                    two alternatives
//! -file:_test.go (a or b)       negated parameter and a group
//! not repo:x "quoted text"      operator negation and a literal pattern
//! ```

use thiserror::Error;

use crate::ast::{Labels, Node, OperatorKind, Parameter, Pattern, SearchType, Q};
use crate::fields::{self, FIELD_PATTERN_TYPE};
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Malformed query text.
    #[error("syntax error at {span}: {message}")]
    Syntax {
        message: String,
        span: Span,
        /// The offending piece of the input.
        text: String,
    },

    /// An operator with nothing to operate on.
    #[error("expected operand at {span}: {message}")]
    ExpectedOperand { message: String, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Syntax { span, .. } | ParseError::ExpectedOperand { span, .. } => *span,
        }
    }

    pub fn is_expected_operand(&self) -> bool {
        matches!(self, ParseError::ExpectedOperand { .. })
    }
}

/// Deepest nesting of groups and `not` operators accepted by the parser.
pub const MAX_DEPTH: usize = 128;

pub struct Parser<'a> {
    input: &'a str,
    tokens: &'a [Token<'a>],
    position: usize,
    /// Label given to unquoted patterns.
    labels: Labels,
    /// Open groups and `not` operators enclosing the current position.
    depth: usize,
}

/// Lexes and parses `input`.
pub fn parse(input: &str, search_type: SearchType) -> Result<Q, ParseError> {
    let tokens: Vec<_> = Lexer::new(input).collect();
    tracing::trace!(tokens = tokens.len(), "lexed query");
    Parser::new(input, &tokens, search_type).parse()
}

impl<'a> Parser<'a> {
    /// A `patterntype:` parameter anywhere in the query takes precedence
    /// over `search_type`.
    pub fn new(input: &'a str, tokens: &'a [Token<'a>], search_type: SearchType) -> Self {
        let search_type = pattern_type_override(tokens).unwrap_or(search_type);
        Self {
            input,
            tokens,
            position: 0,
            labels: search_type.label(),
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&'a Token<'a>> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<&'a Token<'a>> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    fn match_token(&self, kind: &TokenKind) -> bool {
        self.peek()
            .is_some_and(|token| std::mem::discriminant(&token.kind) == std::mem::discriminant(kind))
    }

    fn end_span(&self) -> Span {
        Span::new(self.input.len(), self.input.len())
    }

    fn syntax_error(&self, message: impl Into<String>, span: Span) -> ParseError {
        ParseError::Syntax {
            message: message.into(),
            span,
            text: span.slice(self.input).to_string(),
        }
    }

    /// Parses the whole token stream into a query.
    ///
    /// A top-level conjunction is spliced into the returned [`Q`]; any other
    /// root becomes its single node. Tokens left over after a complete
    /// expression (a stray `)`) are a syntax error.
    pub fn parse(&mut self) -> Result<Q, ParseError> {
        if self.tokens.is_empty() {
            return Ok(Q::default());
        }

        let node = self.parse_or_expression()?;

        if let Some(token) = self.peek() {
            return Err(match token.kind {
                TokenKind::RParen => self.syntax_error("unbalanced parentheses: unexpected `)`", token.span),
                _ => self.syntax_error("unexpected token", token.span),
            });
        }

        Ok(match node {
            Node::Operator(op) if op.kind == OperatorKind::And => Q(op.operands),
            node => Q(vec![node]),
        })
    }

    /// Steps one level deeper into the tree, failing past [`MAX_DEPTH`].
    fn enter(&mut self, span: Span) -> Result<(), ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.syntax_error("query nested too deeply", span));
        }
        self.depth += 1;
        Ok(())
    }

    /// Checks that the token after an operator can start an operand.
    fn expect_operand(&self, keyword: &str, span: Span) -> Result<(), ParseError> {
        match self.peek() {
            Some(token) if starts_operand(&token.kind) => Ok(()),
            _ => Err(ParseError::ExpectedOperand {
                message: format!("expected operand after `{keyword}`"),
                span,
            }),
        }
    }

    /// `and_expr (OR and_expr)*`
    fn parse_or_expression(&mut self) -> Result<Node, ParseError> {
        let mut operands = vec![self.parse_and_expression()?];

        while self.match_token(&TokenKind::Or) {
            if let Some(token) = self.advance() {
                self.expect_operand("or", token.span)?;
            }
            operands.push(self.parse_and_expression()?);
        }

        Ok(combine(OperatorKind::Or, operands))
    }

    /// `sequence (AND sequence)*`
    fn parse_and_expression(&mut self) -> Result<Node, ParseError> {
        let mut operands = vec![self.parse_sequence()?];

        while self.match_token(&TokenKind::And) {
            if let Some(token) = self.advance() {
                self.expect_operand("and", token.span)?;
            }
            operands.push(self.parse_sequence()?);
        }

        Ok(combine(OperatorKind::And, operands))
    }

    /// One or more adjacent operands, implicitly conjoined.
    fn parse_sequence(&mut self) -> Result<Node, ParseError> {
        match self.peek() {
            None => {
                return Err(ParseError::ExpectedOperand {
                    message: "expected operand at end of input".to_string(),
                    span: self.end_span(),
                })
            }
            Some(token) if matches!(token.kind, TokenKind::And | TokenKind::Or) => {
                let keyword = token.span.slice(self.input).to_ascii_lowercase();
                return Err(ParseError::ExpectedOperand {
                    message: format!("expected operand before `{keyword}`"),
                    span: token.span,
                });
            }
            Some(token) if token.kind == TokenKind::RParen => {
                return Err(self.syntax_error("unbalanced parentheses: unexpected `)`", token.span));
            }
            Some(_) => {}
        }

        let mut nodes = Vec::new();
        while self.peek().is_some_and(|token| starts_operand(&token.kind)) {
            nodes.push(self.parse_unary_expression()?);
        }

        Ok(combine(OperatorKind::And, concat_patterns(nodes)))
    }

    /// `NOT* primary`
    fn parse_unary_expression(&mut self) -> Result<Node, ParseError> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Not => {
                self.advance();
                self.expect_operand("not", token.span)?;
                self.enter(token.span)?;
                let operand = self.parse_unary_expression();
                self.depth -= 1;
                Ok(Node::not(operand?))
            }
            _ => self.parse_primary_expression(),
        }
    }

    fn parse_primary_expression(&mut self) -> Result<Node, ParseError> {
        let Some(token) = self.advance() else {
            return Err(ParseError::ExpectedOperand {
                message: "expected operand at end of input".to_string(),
                span: self.end_span(),
            });
        };

        match &token.kind {
            TokenKind::LParen => {
                if let Some(close) = self.peek().filter(|t| t.kind == TokenKind::RParen) {
                    return Err(self.syntax_error("empty group", Span::new(token.span.start, close.span.end)));
                }
                if self.peek().is_none() {
                    return Err(self.syntax_error("unbalanced parentheses: missing `)`", token.span));
                }
                self.enter(token.span)?;
                let node = self.parse_or_expression();
                self.depth -= 1;
                let node = node?;
                if self.match_token(&TokenKind::RParen) {
                    self.advance();
                    Ok(node)
                } else {
                    Err(self.syntax_error("unbalanced parentheses: missing `)`", token.span))
                }
            }
            TokenKind::Word(text) => Ok(Node::Pattern(Pattern::new(*text, self.labels))),
            TokenKind::Quoted(text) => Ok(Node::Pattern(Pattern::new(
                text.to_string(),
                Labels::LITERAL | Labels::QUOTED,
            ))),
            TokenKind::Field {
                field,
                value,
                negated,
                quoted,
            } => {
                let mut parameter = Parameter::new(
                    fields::canonical_name(field).into_owned(),
                    value.to_string(),
                    *negated,
                );
                if fields::is_alias(field) {
                    parameter.annotation.labels.set(Labels::IS_ALIAS);
                }
                if *quoted {
                    parameter.annotation.labels.set(Labels::QUOTED);
                }
                Ok(Node::Parameter(parameter))
            }
            TokenKind::UnterminatedQuote => Err(self.syntax_error("unterminated quoted string", token.span)),
            _ => Err(self.syntax_error("unexpected token", token.span)),
        }
    }
}

fn starts_operand(kind: &TokenKind) -> bool {
    // An unterminated quote is reported by the primary expression.
    kind.starts_operand() || *kind == TokenKind::UnterminatedQuote
}

fn pattern_type_override(tokens: &[Token]) -> Option<SearchType> {
    tokens.iter().find_map(|token| match &token.kind {
        TokenKind::Field { field, value, .. } if fields::canonical(field) == Some(FIELD_PATTERN_TYPE) => {
            value.parse().ok()
        }
        _ => None,
    })
}

/// Builds an `and`/`or` node, splicing in operands of the same kind and
/// collapsing a single operand.
fn combine(kind: OperatorKind, operands: Vec<Node>) -> Node {
    let mut flat = Vec::with_capacity(operands.len());
    for operand in operands {
        match operand {
            Node::Operator(op) if op.kind == kind => flat.extend(op.operands),
            other => flat.push(other),
        }
    }
    if flat.len() == 1 {
        if let Some(node) = flat.pop() {
            return node;
        }
    }
    match kind {
        OperatorKind::Or => Node::or(flat),
        _ => Node::and(flat),
    }
}

/// Joins the plain patterns of a sequence into the first one, separated by
/// a space.
///
/// A regexp pattern next to a literal one yields a regexp in which the
/// literal text is escaped; other mixes become literal. The result keeps
/// `Quoted` only if every part was quoted.
fn concat_patterns(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    let mut anchor: Option<usize> = None;

    for node in nodes {
        let pattern = match node {
            Node::Pattern(pattern) => pattern,
            other => {
                out.push(other);
                continue;
            }
        };

        if let Some(Node::Pattern(first)) = anchor.and_then(|i| out.get_mut(i)) {
            append_pattern(first, pattern);
            continue;
        }

        anchor = Some(out.len());
        out.push(Node::Pattern(pattern));
    }
    out
}

fn append_pattern(first: &mut Pattern, next: Pattern) {
    let first_kind = first.annotation.labels.kind();
    let next_kind = next.annotation.labels.kind();
    let kind_bits = Labels::LITERAL | Labels::REGEXP | Labels::STRUCTURAL;

    let next_value = if first_kind == next_kind {
        next.value
    } else if first_kind == Labels::REGEXP {
        regex::escape(&next.value)
    } else if next_kind == Labels::REGEXP {
        first.value = regex::escape(&first.value);
        first.annotation.labels.unset(kind_bits);
        first.annotation.labels.set(Labels::REGEXP);
        next.value
    } else {
        first.annotation.labels.unset(kind_bits);
        first.annotation.labels.set(Labels::LITERAL);
        next.value
    };

    first.value.push(' ');
    first.value.push_str(&next_value);
    if !next.annotation.labels.is_set(Labels::QUOTED) {
        first.annotation.labels.unset(Labels::QUOTED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_string(input: &str) -> Result<Q, ParseError> {
        parse(input, SearchType::Regex)
    }

    fn pattern(value: &str, labels: Labels) -> Node {
        Node::Pattern(Pattern::new(value, labels))
    }

    fn param(field: &str, value: &str, negated: bool) -> Node {
        Node::Parameter(Parameter::new(field, value, negated))
    }

    #[test]
    fn test_empty_query() {
        assert_eq!(parse_string("").unwrap(), Q::default());
        assert_eq!(parse_string("  \t ").unwrap(), Q::default());
    }

    #[test]
    fn test_parameter_and_pattern() {
        let q = parse("repo:foo bar", SearchType::Literal).unwrap();
        assert_eq!(
            q,
            Q(vec![param("repo", "foo", false), pattern("bar", Labels::LITERAL)])
        );
    }

    #[test]
    fn test_pattern_labels_follow_search_type() {
        let q = parse("foo", SearchType::Structural).unwrap();
        assert_eq!(q, Q(vec![pattern("foo", Labels::STRUCTURAL)]));

        let q = parse(r#""a.b""#, SearchType::Regex).unwrap();
        assert_eq!(q, Q(vec![pattern("a.b", Labels::LITERAL | Labels::QUOTED)]));
    }

    #[test]
    fn test_patterntype_overrides_search_type() {
        let q = parse("patterntype:literal a.b", SearchType::Regex).unwrap();
        assert_eq!(
            q,
            Q(vec![param("patterntype", "literal", false), pattern("a.b", Labels::LITERAL)])
        );
    }

    #[test]
    fn test_adjacent_patterns_concatenate() {
        let q = parse_string("foo repo:x bar").unwrap();
        assert_eq!(
            q,
            Q(vec![pattern("foo bar", Labels::REGEXP), param("repo", "x", false)])
        );
    }

    #[test]
    fn test_quoted_pattern_joins_regexp() {
        let q = parse_string(r#""foo" bar"#).unwrap();
        assert_eq!(q, Q(vec![pattern("foo bar", Labels::REGEXP)]));

        let q = parse_string(r#"a+ "x.y" b"#).unwrap();
        assert_eq!(q, Q(vec![pattern(r"a+ x\.y b", Labels::REGEXP)]));

        let q = parse_string(r#""x.y" b"#).unwrap();
        assert_eq!(q, Q(vec![pattern(r"x\.y b", Labels::REGEXP)]));
    }

    #[test]
    fn test_quoted_pattern_joins_literal() {
        let q = parse(r#""x.y" b"#, SearchType::Literal).unwrap();
        assert_eq!(q, Q(vec![pattern("x.y b", Labels::LITERAL)]));

        let q = parse(r#""a" "b""#, SearchType::Regex).unwrap();
        assert_eq!(q, Q(vec![pattern("a b", Labels::LITERAL | Labels::QUOTED)]));

        let q = parse(r#"foo "b""#, SearchType::Structural).unwrap();
        assert_eq!(q, Q(vec![pattern("foo b", Labels::LITERAL)]));
    }

    #[test]
    fn test_or_expression() {
        let q = parse_string("foo or bar OR baz").unwrap();
        assert_eq!(
            q,
            Q(vec![Node::or(vec![
                pattern("foo", Labels::REGEXP),
                pattern("bar", Labels::REGEXP),
                pattern("baz", Labels::REGEXP),
            ])])
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let q = parse_string("repo:a foo or repo:b and bar").unwrap();
        assert_eq!(
            q,
            Q(vec![Node::or(vec![
                Node::and(vec![param("repo", "a", false), pattern("foo", Labels::REGEXP)]),
                Node::and(vec![param("repo", "b", false), pattern("bar", Labels::REGEXP)]),
            ])])
        );
    }

    #[test]
    fn test_groups_and_not() {
        let q = parse_string("not (repo:a or -file:b) c").unwrap();
        assert_eq!(
            q,
            Q(vec![
                Node::not(Node::or(vec![param("repo", "a", false), param("file", "b", true)])),
                pattern("c", Labels::REGEXP),
            ])
        );
    }

    #[test]
    fn test_field_aliases_are_canonicalized() {
        let q = parse_string("R:foo Language:go").unwrap();
        let mut repo = Parameter::new("repo", "foo", false);
        repo.annotation.labels.set(Labels::IS_ALIAS);
        let mut lang = Parameter::new("lang", "go", false);
        lang.annotation.labels.set(Labels::IS_ALIAS);
        assert_eq!(q, Q(vec![Node::Parameter(repo), Node::Parameter(lang)]));
    }

    #[test]
    fn test_unknown_field_is_kept_lower_cased() {
        let q = parse_string("Colour:red").unwrap();
        assert_eq!(q, Q(vec![param("colour", "red", false)]));
    }

    #[test]
    fn test_quoted_field_value() {
        let q = parse_string(r#"repo:"a b""#).unwrap();
        let mut repo = Parameter::new("repo", "a b", false);
        repo.annotation.labels.set(Labels::QUOTED);
        assert_eq!(q, Q(vec![Node::Parameter(repo)]));
    }

    #[test]
    fn test_parse_is_pure() {
        let input = "(a or b) and repo:c -file:d";
        assert_eq!(parse_string(input).unwrap(), parse_string(input).unwrap());
    }

    #[test]
    fn test_trailing_operator_expects_operand() {
        let err = parse_string("repo: and").unwrap_err();
        assert!(err.is_expected_operand());
        assert_eq!(err.span(), Span::new(6, 9));

        assert!(parse_string("foo or").unwrap_err().is_expected_operand());
        assert!(parse_string("foo not").unwrap_err().is_expected_operand());
        assert!(parse_string("(foo and)").unwrap_err().is_expected_operand());
    }

    #[test]
    fn test_leading_operator_expects_operand() {
        let err = parse_string("or foo").unwrap_err();
        assert_eq!(
            err,
            ParseError::ExpectedOperand {
                message: "expected operand before `or`".to_string(),
                span: Span::new(0, 2),
            }
        );
        assert!(parse_string("foo and or bar").unwrap_err().is_expected_operand());
    }

    #[test]
    fn test_unbalanced_parentheses() {
        let err = parse_string("(foo").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { ref text, .. } if text == "("));

        let err = parse_string("foo)").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { span, .. } if span == Span::new(3, 4)));

        assert!(matches!(parse_string(")"), Err(ParseError::Syntax { .. })));
        assert!(matches!(parse_string("("), Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn test_empty_group() {
        let err = parse_string("foo ()").unwrap_err();
        assert_eq!(
            err,
            ParseError::Syntax {
                message: "empty group".to_string(),
                span: Span::new(4, 6),
                text: "()".to_string(),
            }
        );
    }

    #[test]
    fn test_unterminated_quote() {
        let err = parse_string(r#"foo "bar"#).unwrap_err();
        assert_eq!(
            err,
            ParseError::Syntax {
                message: "unterminated quoted string".to_string(),
                span: Span::new(4, 8),
                text: "\"bar".to_string(),
            }
        );
        assert!(matches!(parse_string(r#"repo:"x"#), Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| format!("{}repo:a{}", "(".repeat(depth), ")".repeat(depth));

        assert!(parse_string(&nested(MAX_DEPTH)).is_ok());

        let err = parse_string(&nested(MAX_DEPTH + 1)).unwrap_err();
        assert_eq!(
            err,
            ParseError::Syntax {
                message: "query nested too deeply".to_string(),
                span: Span::new(MAX_DEPTH, MAX_DEPTH + 1),
                text: "(".to_string(),
            }
        );

        assert!(!parse_string(&nested(5_000)).unwrap_err().is_expected_operand());
    }

    #[test]
    fn test_not_chain_limit() {
        let chain = |n: usize| format!("{}repo:a", "not ".repeat(n));

        assert!(parse_string(&chain(MAX_DEPTH)).is_ok());

        let err = parse_string(&chain(20_000)).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { ref message, .. } if message == "query nested too deeply"));
    }

    #[test]
    fn test_depth_resets_between_groups() {
        let input = vec!["(".repeat(MAX_DEPTH) + "a" + &")".repeat(MAX_DEPTH); 3].join(" or ");
        assert!(parse_string(&input).is_ok());
    }
}
