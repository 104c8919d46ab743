//! Search query front end.
//!
//! Turns a raw query string such as `repo:foo -file:test (bar or baz)` into
//! a list of normalized sub-queries, each holding at most one pattern and
//! the parameters that scope it:
//!
//! ```
//! use search_query::{compile, QueryInfo, SearchType};
//!
//! let compiled = compile("repo:foo (bar or baz)", SearchType::Literal).unwrap();
//! assert_eq!(compiled.basics.len(), 2);
//! assert_eq!(compiled.basics[0].string_values("r"), (vec!["foo"], vec![]));
//! ```

pub mod ast;
pub mod compiler;
pub mod config;
pub mod dnf;
pub mod error;
pub mod fields;
pub mod lexer;
pub mod parser;
pub mod query_info;
pub mod token;
pub mod validate;
pub mod value;
pub mod visitor;

pub use ast::{Annotation, Basic, Labels, Node, Operator, OperatorKind, Parameter, Pattern, SearchType, Q};
pub use compiler::{CompiledQuery, QueryCompiler};
pub use config::{CompilerConfig, ConfigError, FieldRule, ValidationConfig};
pub use error::{QueryError, Result};
pub use fields::{FieldError, FieldErrorKind};
pub use parser::{parse, ParseError};
pub use query_info::QueryInfo;
pub use validate::{validate, ValidationErrors};
pub use value::{Value, YesNoOnly};

/// Compiles `input` with the default constraint table.
pub fn compile(input: &str, search_type: SearchType) -> Result<CompiledQuery> {
    QueryCompiler::new().compile_with(input, search_type)
}
