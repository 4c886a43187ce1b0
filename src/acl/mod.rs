//! # Row-Level Access Control
//!
//! Rows of an ACL-enabled entity carry an owner, a group, and two privilege
//! masks. Reads, writes and deletes are filtered in the store query itself;
//! nothing is checked after rows are fetched.

pub mod errors;
pub mod injector;
pub mod principal;
pub mod privilege;

pub use errors::{AclError, AclResult};
pub use injector::{
    add_acl, allow_insert, compute_insert_defaults, ensure_acl_columns, AclInsertDefaults, NO_GROUP,
};
pub use principal::Principal;
pub use privilege::Privilege;
