//! Operator grammar
//!
//! A raw attribute value carries its operator as a leading symbol:
//!
//! | raw            | predicate                    |
//! |----------------|------------------------------|
//! | `~x` `~>x` `~<x` | LIKE contains / prefix / suffix |
//! | `>=x` `>x`     | greater or equal / greater   |
//! | `<=x` `<x`     | less or equal / less         |
//! | `!isnull`      | not null                     |
//! | `!x`           | not equals                   |
//! | `[a,b,c]`      | in list                      |
//! | `isnull`       | is null                      |
//! | `x`            | equals                       |
//!
//! Rows are matched top to bottom; the first hit wins.

use serde::Serialize;

use crate::schema::ColumnMeta;

use super::errors::{QueryError, QueryResult};
use super::value::{coerce, TypedValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeAnchor {
    Contains,
    Prefix,
    Suffix,
}

impl LikeAnchor {
    /// Wraps a literal with `%` wildcards for this anchor.
    pub fn wildcard(&self, literal: String) -> String {
        match self {
            LikeAnchor::Contains => format!("%{}%", literal),
            LikeAnchor::Prefix => format!("{}%", literal),
            LikeAnchor::Suffix => format!("%{}", literal),
        }
    }
}

/// A typed condition on one column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", content = "operand", rename_all = "snake_case")]
pub enum Predicate {
    Equals(TypedValue),
    NotEquals(TypedValue),
    GreaterThan(TypedValue),
    GreaterOrEqual(TypedValue),
    LessThan(TypedValue),
    LessOrEqual(TypedValue),
    Like {
        pattern: TypedValue,
        anchor: LikeAnchor,
    },
    IsNull,
    NotNull,
    In(Vec<TypedValue>),
}

/// Operator recognised from the leading symbols, operand still raw.
#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Like(LikeAnchor, &'a str),
    GreaterOrEqual(&'a str),
    GreaterThan(&'a str),
    LessOrEqual(&'a str),
    LessThan(&'a str),
    NotNull,
    NotEquals(&'a str),
    InList(&'a str),
    IsNull,
    Equals(&'a str),
}

fn tokenize(raw: &str) -> Token<'_> {
    if let Some(rest) = raw.strip_prefix('~') {
        if let Some(literal) = rest.strip_prefix('>') {
            return Token::Like(LikeAnchor::Prefix, literal);
        }
        if let Some(literal) = rest.strip_prefix('<') {
            return Token::Like(LikeAnchor::Suffix, literal);
        }
        return Token::Like(LikeAnchor::Contains, rest);
    }
    if let Some(rest) = raw.strip_prefix('>') {
        return match rest.strip_prefix('=') {
            Some(operand) => Token::GreaterOrEqual(operand),
            None => Token::GreaterThan(rest),
        };
    }
    if let Some(rest) = raw.strip_prefix('<') {
        return match rest.strip_prefix('=') {
            Some(operand) => Token::LessOrEqual(operand),
            None => Token::LessThan(rest),
        };
    }
    if raw.eq_ignore_ascii_case("!isnull") {
        return Token::NotNull;
    }
    if let Some(rest) = raw.strip_prefix('!') {
        return Token::NotEquals(rest);
    }
    if raw.len() >= 2 && raw.starts_with('[') && raw.ends_with(']') {
        return Token::InList(&raw[1..raw.len() - 1]);
    }
    if raw.eq_ignore_ascii_case("isnull") {
        return Token::IsNull;
    }
    Token::Equals(raw)
}

/// Parses one raw value for `column` into a typed predicate.
pub fn parse_predicate(column: &ColumnMeta, raw: &str) -> QueryResult<Predicate> {
    let predicate = match tokenize(raw) {
        Token::Like(anchor, literal) => {
            if !column.declared_type.is_textual() {
                return Err(QueryError::UnsupportedOperator {
                    column: column.name.clone(),
                    operator: "like",
                    declared_type: column.declared_type.type_name(),
                });
            }
            let pattern = coerce(literal, column)?.map_text(|s| anchor.wildcard(s));
            Predicate::Like { pattern, anchor }
        }
        Token::GreaterOrEqual(operand) => Predicate::GreaterOrEqual(coerce(operand, column)?),
        Token::GreaterThan(operand) => Predicate::GreaterThan(coerce(operand, column)?),
        Token::LessOrEqual(operand) => Predicate::LessOrEqual(coerce(operand, column)?),
        Token::LessThan(operand) => Predicate::LessThan(coerce(operand, column)?),
        Token::NotNull => Predicate::NotNull,
        Token::NotEquals(operand) => Predicate::NotEquals(coerce(operand, column)?),
        Token::InList(inner) => Predicate::In(
            inner
                .split(',')
                .map(|item| coerce(item, column))
                .collect::<QueryResult<Vec<_>>>()?,
        ),
        Token::IsNull => Predicate::IsNull,
        Token::Equals(operand) => Predicate::Equals(coerce(operand, column)?),
    };
    Ok(predicate)
}
