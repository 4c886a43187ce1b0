//! CRUD Dispatch Tests
//!
//! The canonical operations against the in-memory store:
//! - Result shapes and primary-key handling
//! - Batch delete accepting one key or a list of keys
//! - Insert reporting of undeclared fields
//! - Store failures surfacing with their cause

use std::error::Error;

use axum::response::IntoResponse;
use crudgate::acl::Principal;
use crudgate::crud::{plan_batch_delete, CrudDispatcher, CrudError, ErrorResponse};
use crudgate::query::RequestParams;
use crudgate::schema::{ColumnMeta, DeclaredType, EntityDescriptor};
use crudgate::store::{MemoryStore, Record};
use serde_json::{json, Value};
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn books() -> EntityDescriptor {
    EntityDescriptor::new(
        "books",
        vec![
            ColumnMeta::new("id", DeclaredType::Integer).primary_key(),
            ColumnMeta::new("title", DeclaredType::String),
            ColumnMeta::new("pages", DeclaredType::Integer),
            ColumnMeta::new("published", DeclaredType::Date),
        ],
    )
    .unwrap()
}

async fn shelf() -> (CrudDispatcher, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = CrudDispatcher::with_shared(store.clone());
    let anonymous = Principal::anonymous();
    for (title, pages, published) in [
        ("Dune", 412, "1965-08-01"),
        ("Emma", 474, "1815-12-23"),
        ("Ubik", 202, "1969-05-01"),
    ] {
        dispatcher
            .insert(
                &books(),
                record(json!({"title": title, "pages": pages, "published": published})),
                &anonymous,
            )
            .await
            .unwrap();
    }
    (dispatcher, store)
}

fn titles(rows: &[Record]) -> Vec<&str> {
    rows.iter().filter_map(|r| r["title"].as_str()).collect()
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn test_find_filters_sorts_and_pages() {
    let (dispatcher, _) = shelf().await;
    let params = RequestParams::from_pairs([("pages", ">300"), ("_sort", "-title")]);
    let rows = dispatcher.find(&books(), &params, &Principal::anonymous()).await.unwrap();
    assert_eq!(titles(&rows), vec!["Emma", "Dune"]);

    let params = RequestParams::from_pairs([("_sort", "title"), ("_skip", "1"), ("_limit", "1")]);
    let rows = dispatcher.find(&books(), &params, &Principal::anonymous()).await.unwrap();
    assert_eq!(titles(&rows), vec!["Emma"]);
}

#[tokio::test]
async fn test_dates_filter_by_instant() {
    let (dispatcher, _) = shelf().await;
    let params = RequestParams::new().with("published", ">=1900-01-01");
    let rows = dispatcher
        .find(&books(), &params.with("_sort", "published"), &Principal::anonymous())
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["Dune", "Ubik"]);
}

#[tokio::test]
async fn test_find_by_id_projects() {
    let (dispatcher, _) = shelf().await;
    let found = dispatcher
        .find_by_id(
            &books(),
            Some("2"),
            &RequestParams::new().with("_select", "title"),
            &Principal::anonymous(),
        )
        .await
        .unwrap();
    assert_eq!(found, record(json!({"title": "Emma"})));

    let err = dispatcher
        .find_by_id(&books(), Some("99"), &RequestParams::new(), &Principal::anonymous())
        .await
        .unwrap_err();
    assert!(matches!(err, CrudError::NotFound));
    assert_eq!(err.status_code().as_u16(), 404);
}

#[tokio::test]
async fn test_missing_id_rejected_before_store() {
    let (dispatcher, store) = shelf().await;
    store.set_failure(Some("should not be reached".to_string()));

    let err = dispatcher
        .find_by_id(&books(), None, &RequestParams::new(), &Principal::anonymous())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "MISSING_ID");
}

#[tokio::test]
async fn test_count_ignores_paging_operands() {
    let (dispatcher, _) = shelf().await;
    let params = RequestParams::from_pairs([("_limit", "1"), ("_sort", "ghost"), ("_select", "ghost")]);
    let count = dispatcher.count(&books(), &params, &Principal::anonymous()).await.unwrap();
    assert_eq!(count, 3);
}

// =============================================================================
// Writes
// =============================================================================

#[tokio::test]
async fn test_insert_reports_undeclared_fields() {
    let dispatcher = CrudDispatcher::new(MemoryStore::new());
    let outcome = dispatcher
        .insert(
            &books(),
            record(json!({"title": "Solaris", "color": "blue", "isbn": "x"})),
            &Principal::anonymous(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.skipped_fields, vec!["color", "isbn"]);
    assert!(!outcome.record.contains_key("color"));
    assert_eq!(outcome.record["id"], json!(1));

    let response = outcome.into_response();
    assert_eq!(response.headers().get("Ignored-Attributes").unwrap(), "color,isbn");
}

#[tokio::test]
async fn test_update_by_id() {
    let (dispatcher, _) = shelf().await;
    let updated = dispatcher
        .update_by_id(
            &books(),
            Some("3"),
            record(json!({"pages": 210, "bogus": 1})),
            &Principal::anonymous(),
        )
        .await
        .unwrap();
    assert_eq!(updated["pages"], json!(210));
    assert_eq!(updated["title"], json!("Ubik"));
    assert!(!updated.contains_key("bogus"));

    let err = dispatcher
        .update_by_id(&books(), Some("42"), record(json!({"pages": 1})), &Principal::anonymous())
        .await
        .unwrap_err();
    assert!(matches!(err, CrudError::NotFound));
}

#[tokio::test]
async fn test_delete_by_id_reports_count() {
    let (dispatcher, _) = shelf().await;
    let anonymous = Principal::anonymous();
    assert_eq!(dispatcher.delete_by_id(&books(), Some("1"), &anonymous).await.unwrap(), 1);
    assert_eq!(dispatcher.delete_by_id(&books(), Some("1"), &anonymous).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_by_filter() {
    let (dispatcher, store) = shelf().await;
    let params = RequestParams::new().with("title", "~>U");
    let deleted = dispatcher.delete(&books(), &params, &Principal::anonymous()).await.unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(titles(&store.rows("books").unwrap()), vec!["Dune", "Emma"]);
}

// =============================================================================
// Batch Delete
// =============================================================================

#[test]
fn test_batch_scalar_and_list_build_same_query() {
    let anonymous = Principal::anonymous();
    let scalar = plan_batch_delete(&books(), &record(json!({"id": "2"})), &anonymous).unwrap();
    let list = plan_batch_delete(&books(), &record(json!({"id": ["2"]})), &anonymous).unwrap();
    assert_eq!(scalar, list);
}

#[tokio::test]
async fn test_batch_delete() {
    let (dispatcher, store) = shelf().await;
    let anonymous = Principal::anonymous();

    let deleted = dispatcher
        .delete_batch(&books(), &record(json!({"id": [1, 3, 99]})), &anonymous)
        .await
        .unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(titles(&store.rows("books").unwrap()), vec!["Emma"]);

    let err = dispatcher
        .delete_batch(&books(), &record(json!({"ids": [2]})), &anonymous)
        .await
        .unwrap_err();
    assert!(matches!(err, CrudError::MissingField(ref field) if field == "id"));
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_store_failure_keeps_cause() {
    let (dispatcher, store) = shelf().await;
    store.set_failure(Some("connection reset".to_string()));

    let err = dispatcher
        .count(&books(), &RequestParams::new(), &Principal::anonymous())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "STORE_ERROR");
    assert_eq!(err.status_code().as_u16(), 500);

    let store_err = err.source().unwrap();
    assert!(store_err.source().unwrap().to_string().contains("connection reset"));
}

#[tokio::test]
async fn test_composite_key_rejected() {
    let lines = EntityDescriptor::new(
        "lines",
        vec![
            ColumnMeta::new("order_id", DeclaredType::Integer).primary_key(),
            ColumnMeta::new("line_no", DeclaredType::Integer).primary_key(),
        ],
    )
    .unwrap();
    let dispatcher = CrudDispatcher::new(MemoryStore::new());

    let err = dispatcher
        .delete_by_id(&lines, Some("1"), &Principal::anonymous())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "MULTIPLE_PRIMARY_KEYS");
}

#[test]
fn test_error_response_body() {
    let body = ErrorResponse::from(&CrudError::MissingField("id".to_string()));
    assert_eq!(
        serde_json::to_value(&body).unwrap(),
        json!({"error": "Request body must contain a \"id\" field", "code": "MISSING_FIELD", "status": 400})
    );
}
