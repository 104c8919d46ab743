//! Errors surfaced by the query compiler.

use thiserror::Error;

use crate::parser::ParseError;
use crate::validate::ValidationErrors;

pub type Result<T> = std::result::Result<T, QueryError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Malformed query text, including a dangling operator.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Every field problem found in the first invalid sub-query.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Query parses but cannot be executed as written.
    #[error("unsupported query: {0}")]
    Unsupported(String),

    /// A compiler bug, never caused by user input.
    #[error("internal query compiler error: {0}")]
    Invariant(String),
}

impl QueryError {
    /// True for errors caused by the query text rather than by the compiler.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, QueryError::Invariant(_))
    }
}
