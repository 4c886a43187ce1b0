//! # CRUD Operations
//!
//! The six canonical operations over registered entities, plus the result
//! envelopes and error taxonomy callers see.

pub mod dispatcher;
pub mod errors;
pub mod plan;
pub mod response;

pub use dispatcher::CrudDispatcher;
pub use errors::{CrudError, CrudResult, ErrorResponse};
pub use plan::{plan, plan_batch_delete, secure, single_primary_key, Operation};
pub use response::{
    scrub_acl_values, CountResponse, DeleteResponse, InsertOutcome, ListResponse, RecordResponse,
    IGNORED_ATTRIBUTES,
};
