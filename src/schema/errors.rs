//! Schema loading errors
//!
//! All of these are deployment problems: they surface while the registry is
//! being built, never per request.

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Entity '{entity}' is invalid: {reason}")]
    InvalidEntity { entity: String, reason: String },

    #[error("Entity '{entity}' declares reserved operand '{column}' as a column")]
    ReservedColumnName { entity: String, column: String },

    #[error("Entity '{entity}' declares column '{column}' more than once")]
    DuplicateColumn { entity: String, column: String },

    #[error("Entity '{0}' is defined more than once")]
    DuplicateEntity(String),

    #[error("Malformed schema at {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("Failed to read schema file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl SchemaError {
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
