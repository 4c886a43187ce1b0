//! Type coercion
//!
//! Turns a raw request string into a value typed by the owning column's
//! declared type. Dates are compared by instant, never by string.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::schema::{ColumnMeta, DeclaredType};

use super::errors::{QueryError, QueryResult};

/// A scalar typed for one column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TypedValue {
    Bool(bool),
    Number(f64),
    Date(DateTime<Utc>),
    Text(String),
    /// Literal bound for a non-unicode column. Adapters for dialects that
    /// default to unicode literals must emit it without the unicode marker.
    RawText(String),
}

impl TypedValue {
    /// Text content of `Text`/`RawText`, `None` for the other variants.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) | TypedValue::RawText(s) => Some(s),
            _ => None,
        }
    }

    /// Rewrites the text content, keeping the unicode marking.
    pub fn map_text(self, f: impl FnOnce(String) -> String) -> Self {
        match self {
            TypedValue::Text(s) => TypedValue::Text(f(s)),
            TypedValue::RawText(s) => TypedValue::RawText(f(s)),
            other => other,
        }
    }

    /// Canonical string form; coercing it again yields an equal value.
    pub fn canonical(&self) -> String {
        match self {
            TypedValue::Bool(b) => b.to_string(),
            TypedValue::Number(n) => n.to_string(),
            TypedValue::Date(d) => d.to_rfc3339_opts(SecondsFormat::Millis, true),
            TypedValue::Text(s) | TypedValue::RawText(s) => s.clone(),
        }
    }

    /// JSON form as stored in records.
    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::Bool(b) => Value::Bool(*b),
            TypedValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            TypedValue::Date(_) => Value::String(self.canonical()),
            TypedValue::Text(s) | TypedValue::RawText(s) => Value::String(s.clone()),
        }
    }
}

/// Coerces `raw` according to `column.declared_type`.
pub fn coerce(raw: &str, column: &ColumnMeta) -> QueryResult<TypedValue> {
    let declared = column.declared_type;

    if declared == DeclaredType::Boolean {
        return match raw.to_lowercase().as_str() {
            "true" => Ok(TypedValue::Bool(true)),
            "false" => Ok(TypedValue::Bool(false)),
            _ => Err(QueryError::invalid_value(
                &column.name,
                "Boolean arguments can only be 'true' or 'false'",
            )),
        };
    }

    if declared.is_numeric() {
        return match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(TypedValue::Number(n)),
            _ => Err(QueryError::invalid_value(
                &column.name,
                format!("Invalid numeric format: '{}'", raw),
            )),
        };
    }

    if declared.is_temporal() {
        return parse_date(raw)
            .map(TypedValue::Date)
            .map_err(|reason| QueryError::invalid_value(&column.name, reason));
    }

    if declared.is_textual() && column.unicode == Some(false) {
        return Ok(TypedValue::RawText(raw.to_string()));
    }

    Ok(TypedValue::Text(raw.to_string()))
}

/// Accepts `YYYY-MM-DD` (UTC midnight) or a 24-character timestamp such as
/// `2014-01-31T12:30:58.123Z`.
pub(crate) fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    match raw.chars().count() {
        10 => {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| format!("Invalid date string: '{}'", raw))?;
            let midnight = date
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| format!("Invalid date string: '{}'", raw))?;
            Ok(Utc.from_utc_datetime(&midnight))
        }
        24 => DateTime::parse_from_rfc3339(raw)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|_| format!("Invalid date string: '{}'", raw)),
        _ => Err(format!(
            "Invalid string length for date parsing: '{}'",
            raw
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(t: DeclaredType) -> ColumnMeta {
        ColumnMeta::new("c", t)
    }

    #[test]
    fn test_boolean() {
        assert_eq!(coerce("TRUE", &col(DeclaredType::Boolean)).unwrap(), TypedValue::Bool(true));
        assert_eq!(coerce("false", &col(DeclaredType::Boolean)).unwrap(), TypedValue::Bool(false));
        assert!(coerce("yes", &col(DeclaredType::Boolean)).is_err());
    }

    #[test]
    fn test_numeric() {
        assert_eq!(coerce("42", &col(DeclaredType::Integer)).unwrap(), TypedValue::Number(42.0));
        assert_eq!(coerce("-1.5", &col(DeclaredType::Decimal)).unwrap(), TypedValue::Number(-1.5));
        assert!(coerce("abc", &col(DeclaredType::Float)).is_err());
        assert!(coerce("inf", &col(DeclaredType::Float)).is_err());
        assert!(coerce("NaN", &col(DeclaredType::Integer)).is_err());
    }

    #[test]
    fn test_date_only_is_utc_midnight() {
        let v = coerce("2014-01-31", &col(DeclaredType::DateOnly)).unwrap();
        let expected = Utc.with_ymd_and_hms(2014, 1, 31, 0, 0, 0).unwrap();
        assert_eq!(v, TypedValue::Date(expected));
    }

    #[test]
    fn test_full_timestamp() {
        let v = coerce("2014-01-31T12:30:58.123Z", &col(DeclaredType::Date)).unwrap();
        match v {
            TypedValue::Date(d) => assert_eq!(d.timestamp_millis(), 1391171458123),
            other => panic!("expected date, got {:?}", other),
        }
    }

    #[test]
    fn test_date_rejects_other_lengths() {
        let err = coerce("2014-1-31", &col(DeclaredType::Date)).unwrap_err();
        assert!(matches!(err, QueryError::InvalidValue { .. }));
        assert!(coerce("2014-13-45", &col(DeclaredType::Date)).is_err());
        assert!(coerce("2014-01-31 12:30:58.123ZZ", &col(DeclaredType::Time)).is_err());
    }

    #[test]
    fn test_non_unicode_string_is_raw() {
        let ascii = ColumnMeta::new("code", DeclaredType::Char).unicode(false);
        assert_eq!(coerce("AB", &ascii).unwrap(), TypedValue::RawText("AB".to_string()));

        let unicode = ColumnMeta::new("name", DeclaredType::String).unicode(true);
        assert_eq!(coerce("AB", &unicode).unwrap(), TypedValue::Text("AB".to_string()));
        assert_eq!(coerce("AB", &col(DeclaredType::Text)).unwrap(), TypedValue::Text("AB".to_string()));
    }

    #[test]
    fn test_opaque_passthrough() {
        let id = "9f1c2c1e-3a51-4c55-a0a5-3f5f8b7f4a10";
        assert_eq!(coerce(id, &col(DeclaredType::Uuid)).unwrap(), TypedValue::Text(id.to_string()));
        // unicode flag is ignored outside textual columns
        let other = ColumnMeta::new("blob", DeclaredType::Other).unicode(false);
        assert_eq!(coerce("x", &other).unwrap(), TypedValue::Text("x".to_string()));
    }

    #[test]
    fn test_canonical_round_trip() {
        let cases = [
            (DeclaredType::Boolean, "true"),
            (DeclaredType::Integer, "17"),
            (DeclaredType::Float, "0.25"),
            (DeclaredType::Date, "2020-02-29T23:59:59.999Z"),
            (DeclaredType::DateOnly, "2020-02-29"),
            (DeclaredType::String, "héllo"),
            (DeclaredType::Uuid, "abc"),
        ];
        for (declared, raw) in cases {
            let column = col(declared);
            let first = coerce(raw, &column).unwrap();
            let second = coerce(&first.canonical(), &column).unwrap();
            assert_eq!(first, second, "round trip failed for {:?}", declared);
        }
    }
}
