//! # Store Adapters
//!
//! The dispatcher talks to storage only through [`Store`]. Each call is one
//! suspension point and is expected to be atomic on its own; no transaction
//! spans two calls.

pub mod errors;
pub mod filter;
pub mod memory;

use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};

use crate::query::BuiltQuery;
use crate::schema::{EntityDescriptor, SequenceSpec};

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;

/// One row, keyed by column name
pub type Record = Map<String, Value>;

/// Boxed future returned by store calls
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Backend executing built queries
///
/// Implementations lower [`BuiltQuery::where_expr`] onto their native
/// predicate language, including the `MaskCovers` bitwise test.
pub trait Store: Send + Sync {
    /// Rows matching the query, ordered, paged and projected as it asks.
    fn find_all<'a>(
        &'a self,
        entity: &'a EntityDescriptor,
        query: &'a BuiltQuery,
    ) -> StoreFuture<'a, Vec<Record>>;

    /// First matching row.
    fn find_one<'a>(
        &'a self,
        entity: &'a EntityDescriptor,
        query: &'a BuiltQuery,
    ) -> StoreFuture<'a, Option<Record>>;

    fn count<'a>(
        &'a self,
        entity: &'a EntityDescriptor,
        query: &'a BuiltQuery,
    ) -> StoreFuture<'a, u64>;

    /// Inserts a row and returns it as stored, generated keys included.
    fn create<'a>(&'a self, entity: &'a EntityDescriptor, record: Record)
        -> StoreFuture<'a, Record>;

    /// Deletes every matching row and returns how many went.
    fn destroy<'a>(
        &'a self,
        entity: &'a EntityDescriptor,
        query: &'a BuiltQuery,
    ) -> StoreFuture<'a, u64>;

    /// Applies `changes` to the first matching row and returns the result,
    /// or `None` when nothing matched.
    fn update<'a>(
        &'a self,
        entity: &'a EntityDescriptor,
        query: &'a BuiltQuery,
        changes: Record,
    ) -> StoreFuture<'a, Option<Record>>;

    fn next_sequence_value<'a>(
        &'a self,
        entity: &'a EntityDescriptor,
        sequence: &'a SequenceSpec,
    ) -> StoreFuture<'a, Value>;
}
