//! Query-level checks on normalized sub-queries.

use std::collections::BTreeMap;
use std::fmt;

use crate::ast::Basic;
use crate::config::ValidationConfig;
use crate::fields::{self, FieldError, FieldErrorKind};

/// Every violation found in one sub-query, in the order found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            error.fmt(f)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Checks `basic` against the field grammars and the constraints in
/// `config`, collecting every violation instead of stopping at the first.
///
/// Value errors come first in occurrence order, then repeated singleton
/// fields, then exclusive pairs.
pub fn validate(basic: &Basic, config: &ValidationConfig) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    let mut seen: BTreeMap<&str, (usize, &str)> = BTreeMap::new();

    for visit in basic.visit_all() {
        if let Err(err) = fields::resolve(visit.field, visit.value, visit.annotation) {
            let unknown = err.kind == FieldErrorKind::UnknownField;
            errors.push(err);
            if unknown {
                continue;
            }
        }
        if visit.is_pattern() {
            continue;
        }

        if visit.negated && !config.rule(visit.field).negatable {
            errors.push(FieldError::new(
                visit.field,
                visit.value,
                FieldErrorKind::NegationNotAllowed,
            ));
        }

        let entry = seen.entry(visit.field).or_insert((0, visit.value));
        entry.0 += 1;
        entry.1 = visit.value;
    }

    for (&field, &(count, value)) in &seen {
        if count > 1 && config.rule(field).singleton {
            errors.push(FieldError::new(field, value, FieldErrorKind::Repeated(count)));
        }
    }

    for (a, b) in &config.exclusive {
        if let (Some(&(_, value)), Some(_)) = (seen.get(a.as_str()), seen.get(b.as_str())) {
            errors.push(FieldError::new(a.as_str(), value, FieldErrorKind::Exclusive(b.clone())));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}
