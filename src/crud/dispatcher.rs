//! # CRUD Dispatcher
//!
//! One method per canonical operation. Each call builds its query, injects
//! the ACL clause when the entity has ACL enabled, then makes exactly one
//! store call (two for update-by-id and sequenced inserts). Everything that
//! can be rejected is rejected before the first store call.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::acl::{allow_insert, compute_insert_defaults, ensure_acl_columns, Principal};
use crate::query::{BuiltQuery, RequestParams};
use crate::schema::{EntityDescriptor, ACL_COLUMNS};
use crate::store::{Record, Store, StoreError};

use super::errors::{CrudError, CrudResult};
use super::plan::{plan, plan_batch_delete, Operation};
use super::response::InsertOutcome;

/// Routes CRUD operations through the translator, the ACL injector and a store
#[derive(Clone)]
pub struct CrudDispatcher {
    store: Arc<dyn Store>,
}

impl CrudDispatcher {
    pub fn new(store: impl Store + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Wraps a store that is also used elsewhere.
    pub fn with_shared(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Lists records matching `params`.
    #[tracing::instrument(skip_all, fields(entity = %entity.name, request_id = %Uuid::new_v4()))]
    pub async fn find(
        &self,
        entity: &EntityDescriptor,
        params: &RequestParams,
        principal: &Principal,
    ) -> CrudResult<Vec<Record>> {
        debug!("find");
        let query = plan(entity, Operation::Find, params, None, principal)?;

        self.store
            .find_all(entity, &query)
            .await
            .map_err(|e| store_failure(entity, "find", e))
    }

    /// Fetches one record by primary key.
    #[tracing::instrument(skip_all, fields(entity = %entity.name, request_id = %Uuid::new_v4()))]
    pub async fn find_by_id(
        &self,
        entity: &EntityDescriptor,
        id: Option<&str>,
        params: &RequestParams,
        principal: &Principal,
    ) -> CrudResult<Record> {
        debug!(id, "find_by_id");
        let query = plan(entity, Operation::FindById, params, id, principal)?;

        self.store
            .find_one(entity, &query)
            .await
            .map_err(|e| store_failure(entity, "find_by_id", e))?
            .ok_or(CrudError::NotFound)
    }

    /// Counts records matching `params`; paging controls are ignored.
    #[tracing::instrument(skip_all, fields(entity = %entity.name, request_id = %Uuid::new_v4()))]
    pub async fn count(
        &self,
        entity: &EntityDescriptor,
        params: &RequestParams,
        principal: &Principal,
    ) -> CrudResult<u64> {
        debug!("count");
        let query = plan(entity, Operation::Count, params, None, principal)?;

        self.store
            .count(entity, &query)
            .await
            .map_err(|e| store_failure(entity, "count", e))
    }

    /// Creates a record from `body`.
    ///
    /// Body fields the entity does not declare are dropped and reported in
    /// [`InsertOutcome::skipped_fields`]. ACL defaults, when enabled, are
    /// written over whatever the body carried for those columns.
    #[tracing::instrument(skip_all, fields(entity = %entity.name, request_id = %Uuid::new_v4()))]
    pub async fn insert(
        &self,
        entity: &EntityDescriptor,
        mut body: Record,
        principal: &Principal,
    ) -> CrudResult<InsertOutcome> {
        debug!("insert");
        if entity.acl_enabled {
            ensure_acl_columns(entity)?;
            if !allow_insert(entity, principal) {
                return Err(CrudError::InsertNotAllowed(entity.name.clone()));
            }
        }

        if let Some(sequence) = &entity.sequence {
            let value = self
                .store
                .next_sequence_value(entity, sequence)
                .await
                .map_err(|e| store_failure(entity, "next_sequence_value", e))?;
            body.insert(sequence.column.clone(), value);
        }

        let (mut record, skipped_fields) = prune_unknown(entity, body);
        if !skipped_fields.is_empty() {
            debug!(skipped = ?skipped_fields, "Ignoring unknown attributes");
        }

        stamp_audit(entity, &mut record, principal, true);

        if entity.acl_enabled {
            record.extend(compute_insert_defaults(entity, principal).into_record());
        }

        let record = self
            .store
            .create(entity, record)
            .await
            .map_err(|e| store_failure(entity, "insert", e))?;

        Ok(InsertOutcome {
            record,
            skipped_fields,
        })
    }

    /// Deletes every record matching `params`.
    #[tracing::instrument(skip_all, fields(entity = %entity.name, request_id = %Uuid::new_v4()))]
    pub async fn delete(
        &self,
        entity: &EntityDescriptor,
        params: &RequestParams,
        principal: &Principal,
    ) -> CrudResult<u64> {
        debug!("delete");
        let query = plan(entity, Operation::Delete, params, None, principal)?;
        self.destroy(entity, &query, "delete").await
    }

    /// Deletes one record by primary key; returns 0 when nothing matched.
    #[tracing::instrument(skip_all, fields(entity = %entity.name, request_id = %Uuid::new_v4()))]
    pub async fn delete_by_id(
        &self,
        entity: &EntityDescriptor,
        id: Option<&str>,
        principal: &Principal,
    ) -> CrudResult<u64> {
        debug!(id, "delete_by_id");
        let query = plan(entity, Operation::DeleteById, &RequestParams::new(), id, principal)?;
        self.destroy(entity, &query, "delete_by_id").await
    }

    /// Deletes the records whose keys are listed in the body's primary-key
    /// field, given either as one scalar or as an array.
    #[tracing::instrument(skip_all, fields(entity = %entity.name, request_id = %Uuid::new_v4()))]
    pub async fn delete_batch(
        &self,
        entity: &EntityDescriptor,
        body: &Record,
        principal: &Principal,
    ) -> CrudResult<u64> {
        debug!("delete_batch");
        let query = plan_batch_delete(entity, body, principal)?;
        self.destroy(entity, &query, "delete_batch").await
    }

    /// Applies `body` as a partial update to one record and returns it.
    ///
    /// ACL columns and undeclared fields in the body are ignored; ownership
    /// cannot be reassigned through an update.
    #[tracing::instrument(skip_all, fields(entity = %entity.name, request_id = %Uuid::new_v4()))]
    pub async fn update_by_id(
        &self,
        entity: &EntityDescriptor,
        id: Option<&str>,
        body: Record,
        principal: &Principal,
    ) -> CrudResult<Record> {
        debug!(id, "update_by_id");
        let query = plan(entity, Operation::UpdateById, &RequestParams::new(), id, principal)?;

        let (mut changes, skipped) = prune_unknown(entity, body);
        for column in ACL_COLUMNS {
            changes.remove(column);
        }
        if !skipped.is_empty() {
            debug!(skipped = ?skipped, "Ignoring unknown attributes");
        }
        stamp_audit(entity, &mut changes, principal, false);

        let existing = self
            .store
            .find_one(entity, &query)
            .await
            .map_err(|e| store_failure(entity, "update_by_id", e))?;
        if existing.is_none() {
            return Err(CrudError::NotFound);
        }

        self.store
            .update(entity, &query, changes)
            .await
            .map_err(|e| store_failure(entity, "update_by_id", e))?
            .ok_or(CrudError::NotFound)
    }

    async fn destroy(
        &self,
        entity: &EntityDescriptor,
        query: &BuiltQuery,
        operation: &'static str,
    ) -> CrudResult<u64> {
        let deleted = self
            .store
            .destroy(entity, query)
            .await
            .map_err(|e| store_failure(entity, operation, e))?;
        debug!(deleted, "Deleted records");
        Ok(deleted)
    }
}

fn store_failure(entity: &EntityDescriptor, operation: &str, err: StoreError) -> CrudError {
    warn!(entity = %entity.name, operation, error = %err, "Store call failed");
    CrudError::Store(err)
}

/// Splits a body into declared fields and the names of the rest.
fn prune_unknown(entity: &EntityDescriptor, body: Record) -> (Record, Vec<String>) {
    let mut skipped = Vec::new();
    let record = body
        .into_iter()
        .filter(|(key, _)| {
            let known = entity.has_column(key);
            if !known {
                skipped.push(key.clone());
            }
            known
        })
        .collect();
    (record, skipped)
}

fn stamp_audit(entity: &EntityDescriptor, record: &mut Record, principal: &Principal, creating: bool) {
    let name = match principal.audit_name() {
        Some(name) => name,
        None => return,
    };
    let columns = [
        entity.audit.created_by.as_ref().filter(|_| creating),
        entity.audit.updated_by.as_ref(),
    ];
    for column in columns.into_iter().flatten() {
        if entity.has_column(column) {
            record.insert(column.clone(), Value::String(name.to_string()));
        }
    }
}
