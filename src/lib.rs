//! crudgate - query translation, row-level ACL and CRUD dispatch
//!
//! Turns flat request parameters into typed store queries, secures them
//! with an owner/group/public privilege predicate, and routes the canonical
//! CRUD operations to a pluggable async store.

pub mod acl;
pub mod cli;
pub mod crud;
pub mod query;
pub mod schema;
pub mod store;
