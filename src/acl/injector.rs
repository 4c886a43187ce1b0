//! # ACL Predicate Injector
//!
//! Every ACL-enabled query gets one extra clause:
//!
//! ```text
//! owner = principal.id
//!   OR (group IN principal.groups AND group_privs & required == required)
//!   OR public_privs & required == required
//! ```
//!
//! The clause is ANDed with whatever the query already filters on, so it
//! can only narrow a result, never widen it.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::query::{coerce, BuiltQuery, Predicate, TypedValue, WhereExpr};
use crate::schema::{
    ColumnMeta, EntityDescriptor, OwnerPolicy, ACL_COLUMNS, ACL_GROUP, ACL_GROUP_PRIVS,
    ACL_OWNER, ACL_PUBLIC_PRIVS,
};

use super::errors::{AclError, AclResult};
use super::principal::Principal;
use super::privilege::Privilege;

/// Group written on insert when the entity configures none
pub const NO_GROUP: &str = "none";

/// Columns the injector reads, resolved once per call.
struct AclColumns<'a> {
    owner: &'a ColumnMeta,
    group: &'a ColumnMeta,
}

/// Fails unless the entity declares all four ACL columns.
pub fn ensure_acl_columns(entity: &EntityDescriptor) -> AclResult<()> {
    let missing: Vec<&str> = ACL_COLUMNS
        .iter()
        .copied()
        .filter(|c| !entity.has_column(c))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(AclError::MisconfiguredAcl {
        entity: entity.name.clone(),
        missing: missing.join(", "),
    })
}

fn acl_columns(entity: &EntityDescriptor) -> AclResult<AclColumns<'_>> {
    ensure_acl_columns(entity)?;
    let column = |name: &str| {
        entity.column(name).ok_or_else(|| AclError::MisconfiguredAcl {
            entity: entity.name.clone(),
            missing: name.to_string(),
        })
    };
    Ok(AclColumns {
        owner: column(ACL_OWNER)?,
        group: column(ACL_GROUP)?,
    })
}

/// ANDs the ownership/group/public disjunction for `required` onto `query`.
pub fn add_acl(
    entity: &EntityDescriptor,
    mut query: BuiltQuery,
    principal: &Principal,
    required: Privilege,
) -> AclResult<BuiltQuery> {
    let columns = acl_columns(entity)?;

    let owner_clause = principal
        .id
        .as_deref()
        .and_then(|id| coerce_principal_value(columns.owner, id))
        .map(|id| WhereExpr::column(ACL_OWNER, Predicate::Equals(id)))
        .unwrap_or_else(WhereExpr::never);

    let groups: Vec<_> = principal
        .groups
        .iter()
        .filter_map(|g| coerce_principal_value(columns.group, g))
        .collect();
    let group_clause = if groups.is_empty() {
        WhereExpr::never()
    } else {
        WhereExpr::and(vec![
            WhereExpr::column(ACL_GROUP, Predicate::In(groups)),
            WhereExpr::mask_covers(ACL_GROUP_PRIVS, required),
        ])
    };

    let public_clause = WhereExpr::mask_covers(ACL_PUBLIC_PRIVS, required);

    debug!(
        entity = %entity.name,
        privilege = %required,
        principal = principal.id.as_deref().unwrap_or("-"),
        "Injecting ACL clause"
    );

    query.and_where(WhereExpr::or(vec![owner_clause, group_clause, public_clause]));
    Ok(query)
}

/// Principal ids and groups are typed like the column they are compared to.
/// A value the column cannot hold can never match it.
fn coerce_principal_value(column: &ColumnMeta, raw: &str) -> Option<TypedValue> {
    match coerce(raw, column) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(column = %column.name, error = %e, "Principal value does not fit ACL column");
            None
        }
    }
}

/// ACL column values for a new row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AclInsertDefaults {
    pub owner: Value,
    pub group: Value,
    pub group_privileges: Privilege,
    pub public_privileges: Privilege,
}

impl AclInsertDefaults {
    /// The four values keyed by ACL column name.
    pub fn into_record(self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert(ACL_OWNER.to_string(), self.owner);
        record.insert(ACL_GROUP.to_string(), self.group);
        record.insert(
            ACL_GROUP_PRIVS.to_string(),
            Value::from(self.group_privileges.bits()),
        );
        record.insert(
            ACL_PUBLIC_PRIVS.to_string(),
            Value::from(self.public_privileges.bits()),
        );
        record
    }
}

pub fn compute_insert_defaults(entity: &EntityDescriptor, principal: &Principal) -> AclInsertDefaults {
    let defaults = &entity.acl_defaults;

    let owner = match (defaults.owner_policy, principal.id.as_deref()) {
        (OwnerPolicy::CurrentPrincipal, Some(id)) => entity
            .column(ACL_OWNER)
            .and_then(|column| coerce(id, column).ok())
            .map(|v| v.to_json())
            .unwrap_or_else(|| Value::String(id.to_string())),
        _ => defaults.owner_value.clone(),
    };

    let (group, group_privileges) = match &defaults.group {
        Some(group) => (Value::String(group.name.clone()), group.privileges),
        None => (Value::String(NO_GROUP.to_string()), Privilege::NONE),
    };

    AclInsertDefaults {
        owner,
        group,
        group_privileges,
        public_privileges: defaults.public_privileges,
    }
}

/// True when the entity has no create group or the principal belongs to it.
pub fn allow_insert(entity: &EntityDescriptor, principal: &Principal) -> bool {
    match &entity.create_group {
        Some(group) => principal.in_group(group),
        None => true,
    }
}
