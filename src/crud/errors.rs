//! # CRUD Errors
//!
//! One taxonomy for everything a dispatcher call can fail with. Query-build
//! and ACL failures are raised before the store is touched.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::acl::AclError;
use crate::query::QueryError;
use crate::store::StoreError;

/// Result type for dispatcher operations
pub type CrudResult<T> = Result<T, CrudError>;

#[derive(Debug, Error)]
pub enum CrudError {
    // ==================
    // Request Errors (4xx)
    // ==================
    #[error("{0}")]
    Query(#[from] QueryError),

    #[error("Missing id parameter")]
    MissingId,

    #[error("Request body must contain a \"{0}\" field")]
    MissingField(String),

    #[error("Not allowed to create {0} records")]
    InsertNotAllowed(String),

    #[error("Resource not found")]
    NotFound,

    // ==================
    // Deployment Errors (5xx)
    // ==================
    #[error("{0}")]
    Acl(#[from] AclError),

    #[error("Entity '{0}' has no primary key")]
    NoPrimaryKey(String),

    #[error("Entity '{entity}' has a composite primary key ({columns}); a single key column is required")]
    MultiplePrimaryKeys { entity: String, columns: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CrudError {
    /// Stable kind string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            CrudError::Query(e) => e.code(),
            CrudError::Acl(e) => e.code(),
            CrudError::MissingId => "MISSING_ID",
            CrudError::MissingField(_) => "MISSING_FIELD",
            CrudError::InsertNotAllowed(_) => "INSERT_NOT_ALLOWED",
            CrudError::NotFound => "NOT_FOUND",
            CrudError::NoPrimaryKey(_) => "NO_PRIMARY_KEY",
            CrudError::MultiplePrimaryKeys { .. } => "MULTIPLE_PRIMARY_KEYS",
            CrudError::Store(_) => "STORE_ERROR",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            CrudError::Query(_) => StatusCode::BAD_REQUEST,
            CrudError::MissingId => StatusCode::BAD_REQUEST,
            CrudError::MissingField(_) => StatusCode::BAD_REQUEST,

            CrudError::InsertNotAllowed(_) => StatusCode::FORBIDDEN,

            CrudError::NotFound => StatusCode::NOT_FOUND,

            CrudError::Acl(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CrudError::NoPrimaryKey(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CrudError::MultiplePrimaryKeys { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            CrudError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    pub status: u16,
}

impl From<&CrudError> for ErrorResponse {
    fn from(err: &CrudError) -> Self {
        Self {
            error: err.to_string(),
            code: err.code(),
            status: err.status_code().as_u16(),
        }
    }
}

impl IntoResponse for CrudError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(&self));
        (status, body).into_response()
    }
}
