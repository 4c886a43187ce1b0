//! # Response Envelopes
//!
//! Shapes dispatcher results for the wire. ACL columns never leave through
//! an envelope; they are stripped here, after enforcement has happened in
//! the store query.

use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::schema::ACL_COLUMNS;
use crate::store::Record;

/// Header listing insert body fields the entity does not declare
pub const IGNORED_ATTRIBUTES: &str = "ignored-attributes";

/// Removes the four ACL columns from an outbound record.
pub fn scrub_acl_values(mut record: Record) -> Record {
    for column in ACL_COLUMNS {
        record.remove(column);
    }
    record
}

/// List response
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub data: Vec<Record>,
}

impl ListResponse {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            data: records.into_iter().map(scrub_acl_values).collect(),
        }
    }
}

/// Single record response; serialized as the bare record
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct RecordResponse(pub Record);

impl RecordResponse {
    pub fn new(record: Record) -> Self {
        Self(scrub_acl_values(record))
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

impl CountResponse {
    pub fn new(count: u64) -> Self {
        Self { count }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeletedCount {
    pub deleted: u64,
}

/// Delete response: `{ "data": { "deleted": n } }`
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeleteResponse {
    pub data: DeletedCount,
}

impl DeleteResponse {
    pub fn new(deleted: u64) -> Self {
        Self {
            data: DeletedCount { deleted },
        }
    }
}

/// Result of an insert
///
/// `skipped_fields` travels in the `Ignored-Attributes` header, never in
/// the record body.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOutcome {
    pub record: Record,
    pub skipped_fields: Vec<String>,
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

impl IntoResponse for RecordResponse {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

impl IntoResponse for CountResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

impl IntoResponse for InsertOutcome {
    fn into_response(self) -> Response {
        let mut response = RecordResponse::new(self.record).into_response();
        if !self.skipped_fields.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&self.skipped_fields.join(",")) {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static(IGNORED_ATTRIBUTES), value);
            }
        }
        response
    }
}
