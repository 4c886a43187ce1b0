//! # Record Filtering
//!
//! Evaluates a [`WhereExpr`] against JSON records with SQL null semantics:
//! a missing or null column satisfies only `IsNull`.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

use crate::query::value::parse_date;
use crate::query::{OrderBy, Predicate, SortDirection, TypedValue, WhereExpr};

use super::Record;

/// Check if a record matches an expression
pub fn matches(expr: &WhereExpr, record: &Record) -> bool {
    match expr {
        WhereExpr::And { clauses } => clauses.iter().all(|c| matches(c, record)),
        WhereExpr::Or { clauses } => clauses.iter().any(|c| matches(c, record)),
        WhereExpr::Const { value } => *value,
        WhereExpr::Column { column, predicate } => {
            matches_predicate(non_null(record.get(column)), predicate)
        }
        WhereExpr::MaskCovers { column, mask } => non_null(record.get(column))
            .and_then(as_bits)
            .map(|bits| bits & u64::from(mask.bits()) == u64::from(mask.bits()))
            .unwrap_or(false),
    }
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn as_bits(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn matches_predicate(value: Option<&Value>, predicate: &Predicate) -> bool {
    let value = match (value, predicate) {
        (None, Predicate::IsNull) | (Some(_), Predicate::NotNull) => return true,
        (None, _) | (Some(_), Predicate::IsNull) => return false,
        (Some(v), _) => v,
    };

    match predicate {
        Predicate::Equals(t) => compare_typed(value, t) == Some(Ordering::Equal),
        Predicate::NotEquals(t) => matches!(compare_typed(value, t), Some(o) if o != Ordering::Equal),
        Predicate::GreaterThan(t) => compare_typed(value, t) == Some(Ordering::Greater),
        Predicate::GreaterOrEqual(t) => {
            matches!(compare_typed(value, t), Some(Ordering::Greater | Ordering::Equal))
        }
        Predicate::LessThan(t) => compare_typed(value, t) == Some(Ordering::Less),
        Predicate::LessOrEqual(t) => {
            matches!(compare_typed(value, t), Some(Ordering::Less | Ordering::Equal))
        }
        Predicate::Like { pattern, .. } => match (value.as_str(), pattern.as_str()) {
            (Some(text), Some(pattern)) => matches_like_pattern(text, pattern),
            _ => false,
        },
        Predicate::In(list) => list
            .iter()
            .any(|t| compare_typed(value, t) == Some(Ordering::Equal)),
        Predicate::IsNull | Predicate::NotNull => false,
    }
}

/// Orders a stored value against a typed operand; `None` when incomparable.
fn compare_typed(stored: &Value, operand: &TypedValue) -> Option<Ordering> {
    match operand {
        TypedValue::Bool(b) => stored.as_bool().map(|s| s.cmp(b)),
        TypedValue::Number(n) => as_number(stored).and_then(|s| s.partial_cmp(n)),
        TypedValue::Date(d) => stored.as_str().and_then(parse_stored_date).map(|s| s.cmp(d)),
        TypedValue::Text(t) | TypedValue::RawText(t) => match stored {
            Value::String(s) => Some(s.as_str().cmp(t.as_str())),
            Value::Number(n) => Some(n.to_string().as_str().cmp(t.as_str())),
            Value::Bool(b) => Some(b.to_string().as_str().cmp(t.as_str())),
            _ => None,
        },
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_stored_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_date(raw).ok())
}

/// SQL LIKE: `%` any run, `_` one character. Case-sensitive.
fn matches_like_pattern(value: &str, pattern: &str) -> bool {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push_str("(?s)^");
    for ch in pattern.chars() {
        match ch {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    re.push('$');

    Regex::new(&re).map(|r| r.is_match(value)).unwrap_or(false)
}

/// Compare two stored values for ordering; nulls sort first.
pub fn compare_json_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (non_null(a), non_null(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a_f = a.as_f64().unwrap_or(0.0);
            let b_f = b.as_f64().unwrap_or(0.0);
            a_f.partial_cmp(&b_f).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (parse_stored_date(a), parse_stored_date(b)) {
                (Some(da), Some(db)) => da.cmp(&db),
                _ => a.cmp(b),
            }
        }
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// Stable multi-column sort.
pub fn sort_records(records: &mut [Record], order_by: &[OrderBy]) {
    if order_by.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for order in order_by {
            let ord = compare_json_values(a.get(&order.column), b.get(&order.column));
            let ord = match order.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}
