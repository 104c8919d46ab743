//! Read access to the values that drive search execution.

use std::collections::BTreeMap;

use crate::ast::Basic;
use crate::fields::{self, FieldError, FieldErrorKind, FIELD_ARCHIVED, FIELD_CASE, FIELD_COUNT, FIELD_FORK};
use crate::value::{parse_bool, Value, YesNoOnly};
use crate::visitor::Visit;

/// Typed accessors over a normalized query.
///
/// Field names may be aliases. Values are resolved on every call; nothing is
/// cached. Accessors that resolve values return the [`FieldError`] of the
/// first occurrence that does not fit its field's grammar, which cannot
/// happen for queries that passed validation.
pub trait QueryInfo {
    /// Typed values of `field` in order; `""` resolves the pattern.
    fn values(&self, field: &str) -> Result<Vec<Value>, FieldError>;

    /// All typed values grouped by canonical field, the pattern under `""`.
    fn fields(&self) -> Result<BTreeMap<String, Vec<Value>>, FieldError>;

    /// The last positive and the last negated value of `field`.
    fn string_value(&self, field: &str) -> (Option<&str>, Option<&str>);

    /// Positive and negated values of `field`, in order.
    fn string_values(&self, field: &str) -> (Vec<&str>, Vec<&str>);

    /// Positive and negated regular expression sources of `field`.
    fn regexp_patterns(&self, field: &str) -> (Vec<&str>, Vec<&str>);

    /// `false` when the field is absent.
    fn bool_value(&self, field: &str) -> bool;

    fn count(&self) -> Result<Option<u32>, FieldError>;

    fn archived(&self) -> Result<Option<YesNoOnly>, FieldError>;

    fn fork(&self) -> Result<Option<YesNoOnly>, FieldError>;

    fn is_case_sensitive(&self) -> bool {
        self.bool_value(FIELD_CASE)
    }
}

fn resolve(visit: &Visit<'_>) -> Result<Value, FieldError> {
    fields::resolve(visit.field, visit.value, visit.annotation)
}

fn partition<'a>(visits: impl Iterator<Item = Visit<'a>>) -> (Vec<&'a str>, Vec<&'a str>) {
    let mut values = Vec::new();
    let mut negated = Vec::new();
    for visit in visits {
        if visit.negated {
            negated.push(visit.value);
        } else {
            values.push(visit.value);
        }
    }
    (values, negated)
}

impl Basic {
    fn yes_no_only(&self, field: &str) -> Result<Option<YesNoOnly>, FieldError> {
        let Some(visit) = self.visit(field).last() else {
            return Ok(None);
        };
        visit
            .value
            .parse()
            .map(Some)
            .map_err(|_| FieldError::new(field, visit.value, FieldErrorKind::InvalidYesNoOnly))
    }
}

impl QueryInfo for Basic {
    fn values(&self, field: &str) -> Result<Vec<Value>, FieldError> {
        self.visit(field).map(|visit| resolve(&visit)).collect()
    }

    fn fields(&self) -> Result<BTreeMap<String, Vec<Value>>, FieldError> {
        let mut fields: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        for visit in self.visit_all() {
            let value = resolve(&visit)?;
            fields.entry(visit.field.to_string()).or_default().push(value);
        }
        Ok(fields)
    }

    fn string_value(&self, field: &str) -> (Option<&str>, Option<&str>) {
        let mut value = None;
        let mut negated = None;
        for visit in self.visit(field) {
            if visit.negated {
                negated = Some(visit.value);
            } else {
                value = Some(visit.value);
            }
        }
        (value, negated)
    }

    fn string_values(&self, field: &str) -> (Vec<&str>, Vec<&str>) {
        partition(self.visit(field))
    }

    fn regexp_patterns(&self, field: &str) -> (Vec<&str>, Vec<&str>) {
        partition(self.visit(field))
    }

    fn bool_value(&self, field: &str) -> bool {
        self.visit(field)
            .last()
            .and_then(|visit| parse_bool(visit.value))
            .unwrap_or(false)
    }

    fn count(&self) -> Result<Option<u32>, FieldError> {
        let Some(visit) = self.visit(FIELD_COUNT).last() else {
            return Ok(None);
        };
        visit
            .value
            .parse()
            .map(Some)
            .map_err(|_| FieldError::new(FIELD_COUNT, visit.value, FieldErrorKind::InvalidInt))
    }

    fn archived(&self) -> Result<Option<YesNoOnly>, FieldError> {
        self.yes_no_only(FIELD_ARCHIVED)
    }

    fn fork(&self) -> Result<Option<YesNoOnly>, FieldError> {
        self.yes_no_only(FIELD_FORK)
    }
}
