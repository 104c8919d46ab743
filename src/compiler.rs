//! Query compiler: raw query text in, validated sub-queries out.

use serde::Serialize;
use tracing::debug;

use crate::ast::{Basic, SearchType, Q};
use crate::config::CompilerConfig;
use crate::dnf;
use crate::error::Result;
use crate::fields::FIELD_PATTERN_TYPE;
use crate::parser;
use crate::validate::validate;
use crate::visitor;

/// Output of a successful compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledQuery {
    /// The parsed tree, before normalization.
    pub query: Q,
    /// Independent sub-queries whose results are combined with `or`.
    pub basics: Vec<Basic>,
    /// Search type patterns were labeled with.
    pub search_type: SearchType,
}

impl CompiledQuery {
    /// The sub-queries in execution order.
    pub fn basics(&self) -> &[Basic] {
        &self.basics
    }
}

/// Runs the parse, support check, normalization and validation stages.
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    config: CompilerConfig,
}

impl QueryCompiler {
    /// A compiler with the default constraint table and regexp patterns.
    pub fn new() -> Self {
        Self::default()
    }

    /// A compiler using `config`, typically loaded with
    /// [`CompilerConfig::from_json_file`].
    pub fn from_config(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles `input` with the configured default search type.
    pub fn compile(&self, input: &str) -> Result<CompiledQuery> {
        self.compile_with(input, self.config.search_type)
    }

    /// Compiles `input`, labeling unquoted patterns by `search_type` unless
    /// the query carries its own `patterntype:`.
    ///
    /// Stages run in order: parse, support check and normalization, then
    /// validation of each sub-query. Nothing is returned unless every
    /// sub-query is valid; otherwise the error carries all violations of the
    /// first invalid one.
    pub fn compile_with(&self, input: &str, search_type: SearchType) -> Result<CompiledQuery> {
        debug!(input, ?search_type, "compiling query");

        let query = parser::parse(input, search_type)?;
        debug!(query = %query, "parsed query");

        let basics = dnf::to_dnf(&query)?;
        debug!(count = basics.len(), "normalized query");

        for (index, basic) in basics.iter().enumerate() {
            if let Err(errors) = validate(basic, &self.config.validation) {
                debug!(index, basic = %basic, %errors, "sub-query failed validation");
                return Err(errors.into());
            }
        }

        let search_type = effective_search_type(&query).unwrap_or(search_type);
        Ok(CompiledQuery {
            query,
            basics,
            search_type,
        })
    }
}

fn effective_search_type(query: &Q) -> Option<SearchType> {
    visitor::field(query.nodes(), FIELD_PATTERN_TYPE).find_map(|visit| visit.value.parse().ok())
}
