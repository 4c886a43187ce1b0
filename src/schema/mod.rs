//! Schema descriptors for crudgate
//!
//! Column and entity metadata supplied by store introspection. Loaded once,
//! never mutated while requests are served.

pub mod errors;
pub mod registry;
pub mod types;

pub use errors::{SchemaError, SchemaResult};
pub use registry::EntityRegistry;
pub use types::{
    AclDefaults, AuditColumns, ColumnMeta, DeclaredType, DefaultGroup, EntityDef,
    EntityDescriptor, OwnerPolicy, SequenceSpec, ACL_COLUMNS, ACL_GROUP, ACL_GROUP_PRIVS,
    ACL_OWNER, ACL_PUBLIC_PRIVS,
};
