//! Query build errors
//!
//! Raised while translating request parameters, always before the store is
//! touched. Each message names the offending attribute or token.

use thiserror::Error;

/// Result type for query translation
pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Raw value could not be coerced to the column's declared type
    #[error("Invalid value for '{column}': {reason}")]
    InvalidValue { column: String, reason: String },

    #[error("Operator '{operator}' is not supported on '{column}' ({declared_type})")]
    UnsupportedOperator {
        column: String,
        operator: &'static str,
        declared_type: &'static str,
    },

    #[error("{entity}.{column} is not a queryable attribute")]
    NonQueryableAttribute { entity: String, column: String },

    #[error("Invalid sort attribute: {0}")]
    InvalidSortAttribute(String),

    #[error("Invalid entry in the _select list: {0}")]
    InvalidSelectAttribute(String),

    #[error("Unknown operand: {0}")]
    UnknownOperand(String),
}

impl QueryError {
    pub fn invalid_value(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Stable kind string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidValue { .. } => "INVALID_VALUE",
            Self::UnsupportedOperator { .. } => "UNSUPPORTED_OPERATOR",
            Self::NonQueryableAttribute { .. } => "NON_QUERYABLE_ATTRIBUTE",
            Self::InvalidSortAttribute(_) => "INVALID_SORT_ATTRIBUTE",
            Self::InvalidSelectAttribute(_) => "INVALID_SELECT_ATTRIBUTE",
            Self::UnknownOperand(_) => "UNKNOWN_OPERAND",
        }
    }
}
