//! Compiler and validation configuration, optionally loaded from JSON.
//!
//! A config file overrides the built-in constraint table field by field:
//!
//! ```json
//! {
//!     "search_type": "literal",
//!     "fields": { "lang": { "singleton": true } },
//!     "exclusive": [["repo-group", "context"]]
//! }
//! ```
//!
//! Field names may be aliases. `exclusive`, when given, replaces the
//! default pairs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::SearchType;
use crate::fields::{self, FIELD_CONTEXT, FIELD_REPO_GROUP};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown field `{0}` in config")]
    UnknownField(String),
}

const NEGATABLE: &[&str] = &[
    "repo",
    "file",
    "lang",
    "author",
    "committer",
    "message",
    "repohasfile",
    "content",
];

const SINGLETON: &[&str] = &[
    "case",
    "archived",
    "fork",
    "index",
    "count",
    "max",
    "timeout",
    "patterntype",
    "context",
    "repohascommitafter",
    "before",
    "after",
    "combyrule",
    "type",
];

/// Constraints on how one field may be used within a sub-query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldRule {
    pub negatable: bool,
    pub singleton: bool,
}

/// Query-level constraints checked on every normalized sub-query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationConfig {
    /// Keyed by canonical field name.
    pub fields: BTreeMap<String, FieldRule>,
    /// Pairs of fields that may not appear together.
    pub exclusive: Vec<(String, String)>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let fields = fields::known_fields()
            .map(|field| {
                let rule = FieldRule {
                    negatable: NEGATABLE.contains(&field),
                    singleton: SINGLETON.contains(&field),
                };
                (field.to_string(), rule)
            })
            .collect();

        Self {
            fields,
            exclusive: vec![(FIELD_REPO_GROUP.to_string(), FIELD_CONTEXT.to_string())],
        }
    }
}

impl ValidationConfig {
    /// Rule for a canonical field. Unknown fields get the most restrictive
    /// rule; validation reports them separately.
    pub fn rule(&self, field: &str) -> FieldRule {
        self.fields.get(field).copied().unwrap_or_default()
    }

    /// Loads overrides of the default table from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Ok(CompilerConfig::from_json_file(path)?.validation)
    }

    fn apply(&mut self, overrides: ConfigFile) -> Result<(), ConfigError> {
        for (name, rule) in overrides.fields {
            let field = known_field(&name)?;
            let entry = self.fields.entry(field.to_string()).or_default();
            if let Some(negatable) = rule.negatable {
                entry.negatable = negatable;
            }
            if let Some(singleton) = rule.singleton {
                entry.singleton = singleton;
            }
        }

        if let Some(pairs) = overrides.exclusive {
            self.exclusive = pairs
                .into_iter()
                .map(|(a, b)| Ok((known_field(&a)?.to_string(), known_field(&b)?.to_string())))
                .collect::<Result<_, ConfigError>>()?;
        }
        Ok(())
    }
}

fn known_field(name: &str) -> Result<&'static str, ConfigError> {
    fields::canonical(name).ok_or_else(|| ConfigError::UnknownField(name.to_string()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleOverride {
    negatable: Option<bool>,
    singleton: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    search_type: Option<SearchType>,
    #[serde(default)]
    fields: BTreeMap<String, RuleOverride>,
    #[serde(default)]
    exclusive: Option<Vec<(String, String)>>,
}

/// Everything a [`QueryCompiler`](crate::compiler::QueryCompiler) needs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CompilerConfig {
    /// Used when a query does not carry `patterntype:`.
    pub search_type: SearchType,
    pub validation: ValidationConfig,
}

impl CompilerConfig {
    /// Loads a config file, applying its overrides on top of the defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Same as [`CompilerConfig::from_json_file`] for JSON already in memory.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let mut overrides: ConfigFile = serde_json::from_str(content)?;
        let mut config = CompilerConfig::default();
        if let Some(search_type) = overrides.search_type.take() {
            config.search_type = search_type;
        }
        config.validation.apply(overrides)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_table() {
        let config = ValidationConfig::default();
        assert_eq!(config.rule("repo"), FieldRule { negatable: true, singleton: false });
        assert_eq!(config.rule("case"), FieldRule { negatable: false, singleton: true });
        assert_eq!(config.rule("max"), FieldRule { negatable: false, singleton: true });
        assert_eq!(config.rule("repo-group"), FieldRule { negatable: false, singleton: false });
        assert_eq!(config.rule("nope"), FieldRule::default());
        assert_eq!(config.exclusive, vec![("repo-group".to_string(), "context".to_string())]);
        assert_eq!(config.fields.len(), fields::known_fields().count());
    }

    #[test]
    fn test_overrides_from_str() {
        let config = CompilerConfig::from_json_str(
            r#"{
                "search_type": "literal",
                "fields": { "l": { "singleton": true }, "case": { "negatable": true } },
                "exclusive": [["r", "context"]]
            }"#,
        )
        .unwrap();

        assert_eq!(config.search_type, SearchType::Literal);
        let lang = config.validation.rule("lang");
        assert!(lang.negatable);
        assert!(lang.singleton);
        let case = config.validation.rule("case");
        assert!(case.negatable);
        assert!(case.singleton);
        assert_eq!(
            config.validation.exclusive,
            vec![("repo".to_string(), "context".to_string())]
        );
    }

    #[test]
    fn test_empty_object_keeps_defaults() {
        let config = CompilerConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CompilerConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = CompilerConfig::from_json_str(r#"{ "fields": { "colour": { "singleton": true } } }"#);
        assert!(matches!(result, Err(ConfigError::UnknownField(name)) if name == "colour"));

        let result = CompilerConfig::from_json_str(r#"{ "exclusive": [["repo", "colour"]] }"#);
        assert!(matches!(result, Err(ConfigError::UnknownField(_))));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = CompilerConfig::from_json_str(r#"{ "feilds": {} }"#);
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_load_json_file() {
        let temp_file = "test_search_query_config.json";
        let mut file = fs::File::create(temp_file).unwrap();
        writeln!(file, r#"{{ "fields": {{ "fork": {{ "singleton": false }} }} }}"#).unwrap();

        let config = ValidationConfig::from_json_file(temp_file).unwrap();
        assert!(!config.rule("fork").singleton);
        assert!(config.rule("archived").singleton);

        fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_invalid_json_file() {
        let temp_file = "test_search_query_invalid.json";
        let mut file = fs::File::create(temp_file).unwrap();
        writeln!(file, "invalid json").unwrap();

        let result = CompilerConfig::from_json_file(temp_file);
        assert!(matches!(result, Err(ConfigError::Json(_))));

        fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_missing_file() {
        let result = CompilerConfig::from_json_file("non_existent_search_query_config.json");
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
