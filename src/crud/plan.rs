//! # Query Planning
//!
//! Builds the exact query an operation will hand to the store: translated
//! filters, primary-key match, and the ACL clause for the privilege the
//! operation needs. Pure; used by the dispatcher and by `crudgate explain`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::acl::{add_acl, Principal, Privilege};
use crate::query::{
    build_query, coerce, BuiltQuery, Predicate, QueryError, QueryKind, RequestParams, TypedValue,
};
use crate::schema::{ColumnMeta, EntityDescriptor};

use super::errors::{CrudError, CrudResult};

/// Operations that run a filtered store query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Find,
    FindById,
    Count,
    Delete,
    DeleteById,
    UpdateById,
}

impl Operation {
    pub fn required_privilege(&self) -> Privilege {
        match self {
            Operation::Find | Operation::FindById | Operation::Count => Privilege::READ,
            Operation::UpdateById => Privilege::WRITE,
            Operation::Delete | Operation::DeleteById => Privilege::DELETE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Find => "find",
            Operation::FindById => "find_by_id",
            Operation::Count => "count",
            Operation::Delete => "delete",
            Operation::DeleteById => "delete_by_id",
            Operation::UpdateById => "update_by_id",
        }
    }
}

/// Builds the secured query for `operation`.
///
/// `id` is only read by the by-id operations; `params` is ignored by
/// delete-by-id and update-by-id.
pub fn plan(
    entity: &EntityDescriptor,
    operation: Operation,
    params: &RequestParams,
    id: Option<&str>,
    principal: &Principal,
) -> CrudResult<BuiltQuery> {
    let query = match operation {
        Operation::Find => build_query(params, entity, QueryKind::Find)?,
        Operation::Count => build_query(params, entity, QueryKind::Count)?,
        Operation::Delete => build_query(params, entity, QueryKind::Delete)?,
        Operation::FindById => {
            let (pk, id) = primary_key_value(entity, id)?;
            build_query(params, entity, QueryKind::FindOne)?
                .filter(pk.name.clone(), Predicate::Equals(id))
        }
        Operation::DeleteById | Operation::UpdateById => {
            let (pk, id) = primary_key_value(entity, id)?;
            BuiltQuery::new().filter(pk.name.clone(), Predicate::Equals(id))
        }
    };
    secure(entity, query, principal, operation.required_privilege())
}

/// Builds the secured query for a batch delete.
///
/// The body's primary-key field holds one key or an array of keys; both
/// forms produce the same `IN` predicate.
pub fn plan_batch_delete(
    entity: &EntityDescriptor,
    body: &Map<String, Value>,
    principal: &Principal,
) -> CrudResult<BuiltQuery> {
    let pk = single_primary_key(entity)?;
    let keys = body
        .get(&pk.name)
        .ok_or_else(|| CrudError::MissingField(pk.name.clone()))?;

    let keys = match keys {
        Value::Array(items) => items
            .iter()
            .map(|v| coerce_json_key(pk, v))
            .collect::<Result<Vec<_>, _>>()?,
        scalar => vec![coerce_json_key(pk, scalar)?],
    };

    let query = BuiltQuery::new().filter(pk.name.clone(), Predicate::In(keys));
    secure(entity, query, principal, Privilege::DELETE)
}

/// Adds the ACL clause when the entity has ACL enabled.
pub fn secure(
    entity: &EntityDescriptor,
    query: BuiltQuery,
    principal: &Principal,
    required: Privilege,
) -> CrudResult<BuiltQuery> {
    if !entity.acl_enabled {
        return Ok(query);
    }
    Ok(add_acl(entity, query, principal, required)?)
}

/// The entity's only primary-key column.
pub fn single_primary_key(entity: &EntityDescriptor) -> CrudResult<&ColumnMeta> {
    match entity.primary_key_columns.as_slice() {
        [] => Err(CrudError::NoPrimaryKey(entity.name.clone())),
        [pk] => entity
            .column(pk)
            .ok_or_else(|| CrudError::NoPrimaryKey(entity.name.clone())),
        columns => Err(CrudError::MultiplePrimaryKeys {
            entity: entity.name.clone(),
            columns: columns.join(", "),
        }),
    }
}

fn primary_key_value<'e>(
    entity: &'e EntityDescriptor,
    id: Option<&str>,
) -> CrudResult<(&'e ColumnMeta, TypedValue)> {
    let id = id.ok_or(CrudError::MissingId)?;
    let pk = single_primary_key(entity)?;
    Ok((pk, coerce(id, pk)?))
}

/// Coerces one key taken from a JSON body.
fn coerce_json_key(pk: &ColumnMeta, value: &Value) -> Result<TypedValue, QueryError> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => {
            return Err(QueryError::invalid_value(
                &pk.name,
                format!("Unsupported key value: {}", other),
            ))
        }
    };
    coerce(&raw, pk)
}
