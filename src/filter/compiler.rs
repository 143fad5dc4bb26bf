//! Raw filter parameters to predicate compilation

use std::collections::BTreeMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{QueryError, QueryResult};

use super::predicate::{Clause, DateRange, Operand, Predicate};
use super::registry::{self, Exposure, FieldSpec, ValueKind};

/// Transport form of a multi-select filter: field name to raw tokens
pub type RawFilters = BTreeMap<String, Vec<String>>;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Compiles raw filters against the field registry.
///
/// The output always starts with the `draft == true` clause.
#[derive(Debug, Clone, Copy)]
pub struct FilterCompiler {
    allow_internal: bool,
}

impl FilterCompiler {
    /// Compiler for client requests; internal fields are unknown
    pub fn public() -> Self {
        Self {
            allow_internal: false,
        }
    }

    /// Compiler for server-configured predicates
    pub fn internal() -> Self {
        Self {
            allow_internal: true,
        }
    }

    pub fn compile(&self, raw: &RawFilters) -> QueryResult<Predicate> {
        let mut predicate = Predicate::draft_scope();

        for (name, values) in raw {
            let spec = self.resolve(name)?;
            let operands = Self::operands(spec, values)?;
            if operands.is_empty() {
                continue;
            }
            predicate = predicate.and(Clause::new(spec.field, operands));
        }

        Ok(predicate)
    }

    fn resolve(&self, name: &str) -> QueryResult<&'static FieldSpec> {
        match registry::lookup(name) {
            Some(spec) if spec.exposure == Exposure::Public || self.allow_internal => Ok(spec),
            _ => Err(QueryError::validation(name, "unknown filter field")),
        }
    }

    fn operands(spec: &FieldSpec, values: &[String]) -> QueryResult<Vec<Operand>> {
        let mut operands: Vec<Operand> = Vec::with_capacity(values.len());
        for token in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
            let operand = parse_operand(spec, token)?;
            if !operands.contains(&operand) {
                operands.push(operand);
            }
        }
        Ok(operands)
    }
}

/// Compiles a client filter mapping
pub fn compile_filters(raw: &RawFilters) -> QueryResult<Predicate> {
    FilterCompiler::public().compile(raw)
}

fn is_null_token(token: &str) -> bool {
    token == "null" || token == "None"
}

fn parse_operand(spec: &FieldSpec, token: &str) -> QueryResult<Operand> {
    let invalid = |reason: String| QueryError::validation(spec.name, reason);

    match spec.kind {
        ValueKind::Id { nullable } => {
            if is_null_token(token) {
                return if nullable {
                    Ok(Operand::Null)
                } else {
                    Err(invalid("null is not allowed".to_string()))
                };
            }
            Uuid::parse_str(token)
                .map(Operand::Id)
                .map_err(|_| invalid(format!("not a UUID: {}", token)))
        }
        ValueKind::Priority => token
            .parse()
            .map(Operand::Priority)
            .map_err(|_| invalid(format!("unknown priority: {}", token))),
        ValueKind::StateGroup { nullable } => {
            if nullable && is_null_token(token) {
                return Ok(Operand::Null);
            }
            token
                .parse()
                .map(Operand::StateGroup)
                .map_err(|_| invalid(format!("unknown state group: {}", token)))
        }
        ValueKind::InboxStatus { nullable } => {
            if nullable && is_null_token(token) {
                return Ok(Operand::Null);
            }
            token
                .parse()
                .map(Operand::InboxStatus)
                .map_err(|_| invalid(format!("unknown inbox status: {}", token)))
        }
        ValueKind::Date => parse_date_range(token).map(Operand::Range).map_err(invalid),
        ValueKind::Flag => match token {
            "true" => Ok(Operand::Flag(true)),
            "false" => Ok(Operand::Flag(false)),
            _ => Err(invalid(format!("expected true or false, got {}", token))),
        },
    }
}

fn parse_date(token: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(token, DATE_FORMAT).map_err(|_| format!("not a date: {}", token))
}

fn parse_bound(token: &str) -> Result<Option<NaiveDate>, String> {
    if token.is_empty() {
        Ok(None)
    } else {
        parse_date(token).map(Some)
    }
}

/// Accepts `from..to`, `from..`, `..to`, `date;after`, `date;before` and a bare date.
fn parse_date_range(token: &str) -> Result<DateRange, String> {
    if let Some((from, to)) = token.split_once("..") {
        let range = DateRange {
            from: parse_bound(from.trim())?,
            to: parse_bound(to.trim())?,
        };
        return match (range.from, range.to) {
            (None, None) => Err(format!("range has no bounds: {}", token)),
            (Some(f), Some(t)) if f > t => Err(format!("range is empty: {}", token)),
            _ => Ok(range),
        };
    }

    if let Some((date, direction)) = token.split_once(';') {
        let date = parse_date(date.trim())?;
        return match direction.trim() {
            "after" => Ok(DateRange {
                from: Some(date),
                to: None,
            }),
            "before" => Ok(DateRange {
                from: None,
                to: Some(date),
            }),
            other => Err(format!("unknown range direction: {}", other)),
        };
    }

    let date = parse_date(token)?;
    Ok(DateRange::between(date, date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterField;
    use crate::model::Priority;

    fn raw(pairs: &[(&str, &[&str])]) -> RawFilters {
        pairs
            .iter()
            .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_filters_compile_to_draft_scope() {
        let predicate = compile_filters(&RawFilters::new()).unwrap();
        assert_eq!(predicate, Predicate::draft_scope());
    }

    #[test]
    fn test_one_clause_per_field() {
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();
        let predicate = compile_filters(&raw(&[
            ("state", &[&s1.to_string(), &s2.to_string()]),
            ("priority", &["high"]),
        ]))
        .unwrap();

        let clauses = predicate.clauses();
        assert_eq!(clauses.len(), 3);
        assert_eq!(clauses[0].field, FilterField::Draft);
        assert_eq!(clauses[1].field, FilterField::Priority);
        assert_eq!(clauses[1].operands, vec![Operand::Priority(Priority::High)]);
        assert_eq!(clauses[2].field, FilterField::State);
        assert_eq!(clauses[2].operands.len(), 2);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = compile_filters(&raw(&[("colour", &["red"])])).unwrap_err();
        assert_eq!(err.field(), Some("colour"));
    }

    #[test]
    fn test_draft_cannot_be_overridden() {
        let err = compile_filters(&raw(&[("draft", &["false"])])).unwrap_err();
        assert_eq!(err.field(), Some("draft"));
    }

    #[test]
    fn test_malformed_uuid_names_field() {
        let err = compile_filters(&raw(&[("assignees", &["not-a-uuid"])])).unwrap_err();
        assert_eq!(err.field(), Some("assignees"));
        assert!(err.to_string().contains("not-a-uuid"));
    }

    #[test]
    fn test_null_token() {
        let predicate = compile_filters(&raw(&[("labels", &["null"])])).unwrap();
        assert_eq!(predicate.clauses()[1].operands, vec![Operand::Null]);

        let err = compile_filters(&raw(&[("created_by", &["null"])])).unwrap_err();
        assert_eq!(err.field(), Some("created_by"));
    }

    #[test]
    fn test_duplicate_and_blank_tokens_collapsed() {
        let predicate = compile_filters(&raw(&[("priority", &["high", " high", ""])])).unwrap();
        assert_eq!(predicate.clauses()[1].operands.len(), 1);

        let predicate = compile_filters(&raw(&[("priority", &[""])])).unwrap();
        assert_eq!(predicate.clauses().len(), 1);
    }

    #[test]
    fn test_date_range_forms() {
        assert_eq!(
            parse_date_range("2024-01-01..2024-02-01").unwrap(),
            DateRange::between(date(2024, 1, 1), date(2024, 2, 1))
        );
        assert_eq!(
            parse_date_range("2024-01-01..").unwrap(),
            DateRange { from: Some(date(2024, 1, 1)), to: None }
        );
        assert_eq!(
            parse_date_range("2024-01-01;before").unwrap(),
            DateRange { from: None, to: Some(date(2024, 1, 1)) }
        );
        assert_eq!(
            parse_date_range("2024-03-09").unwrap(),
            DateRange::between(date(2024, 3, 9), date(2024, 3, 9))
        );
        assert!(parse_date_range("..").is_err());
        assert!(parse_date_range("2024-02-01..2024-01-01").is_err());
        assert!(parse_date_range("2024-01-01;sometime").is_err());
    }

    #[test]
    fn test_internal_compiler_accepts_internal_fields() {
        let filters = raw(&[("inbox_status", &["accepted", "null"]), ("archived", &["true"])]);
        assert!(compile_filters(&filters).is_err());

        let predicate = FilterCompiler::internal().compile(&filters).unwrap();
        assert!(predicate.constrains(FilterField::InboxStatus));
        assert!(predicate.constrains(FilterField::Archived));
    }
}
