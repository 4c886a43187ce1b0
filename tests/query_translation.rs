//! Query Translation Tests
//!
//! Request parameters in, typed queries out:
//! - Operator grammar and LIKE anchoring
//! - Sort, select and paging operands
//! - Per-kind operand handling (count and delete ignore paging)
//! - Rejection of malformed input before anything reaches a store

use crudgate::query::{
    build_query, LikeAnchor, OrderBy, Predicate, QueryError, QueryKind, RequestParams, TypedValue,
    DEFAULT_LIMIT,
};
use crudgate::schema::{ColumnMeta, DeclaredType, EntityDescriptor};

// =============================================================================
// Helper Functions
// =============================================================================

fn people() -> EntityDescriptor {
    EntityDescriptor::new(
        "people",
        vec![
            ColumnMeta::new("id", DeclaredType::Integer).primary_key(),
            ColumnMeta::new("name", DeclaredType::String),
            ColumnMeta::new("age", DeclaredType::Integer),
            ColumnMeta::new("born", DeclaredType::Date),
            ColumnMeta::new("active", DeclaredType::Boolean),
            ColumnMeta::new("secret", DeclaredType::String).not_queryable(),
        ],
    )
    .unwrap()
}

fn text(s: &str) -> TypedValue {
    TypedValue::Text(s.to_string())
}

// =============================================================================
// Operator Grammar
// =============================================================================

#[test]
fn test_like_anchors_translate_to_wildcards() {
    let cases = [
        ("~abc", "%abc%", LikeAnchor::Contains),
        ("~>abc", "abc%", LikeAnchor::Prefix),
        ("~<abc", "%abc", LikeAnchor::Suffix),
    ];
    for (raw, pattern, anchor) in cases {
        let params = RequestParams::new().with("name", raw);
        let query = build_query(&params, &people(), QueryKind::Find).unwrap();
        assert_eq!(
            query.attribute_filters["name"],
            vec![Predicate::Like { pattern: text(pattern), anchor }],
            "raw value {}",
            raw
        );
    }
}

#[test]
fn test_like_on_date_column_is_unsupported() {
    let params = RequestParams::new().with("born", "~x");
    let err = build_query(&params, &people(), QueryKind::Find).unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedOperator { ref column, .. } if column == "born"));
    assert_eq!(err.code(), "UNSUPPORTED_OPERATOR");
}

#[test]
fn test_comparison_and_list_operators() {
    let params = RequestParams::from_pairs([("age", ">=18"), ("id", "[1,2,3]"), ("name", "!bob")]);
    let query = build_query(&params, &people(), QueryKind::Find).unwrap();

    assert_eq!(
        query.attribute_filters["age"],
        vec![Predicate::GreaterOrEqual(TypedValue::Number(18.0))]
    );
    assert_eq!(
        query.attribute_filters["id"],
        vec![Predicate::In(vec![
            TypedValue::Number(1.0),
            TypedValue::Number(2.0),
            TypedValue::Number(3.0)
        ])]
    );
    assert_eq!(query.attribute_filters["name"], vec![Predicate::NotEquals(text("bob"))]);
}

#[test]
fn test_repeated_key_ands_predicates() {
    let mut params = RequestParams::new();
    params.append("age", ">20");
    params.append("age", "<30");

    let query = build_query(&params, &people(), QueryKind::Find).unwrap();
    assert_eq!(
        query.attribute_filters["age"],
        vec![
            Predicate::GreaterThan(TypedValue::Number(20.0)),
            Predicate::LessThan(TypedValue::Number(30.0)),
        ]
    );
}

#[test]
fn test_bad_value_names_the_column() {
    let params = RequestParams::new().with("age", "old");
    let err = build_query(&params, &people(), QueryKind::Find).unwrap_err();
    assert_eq!(err.code(), "INVALID_VALUE");
    assert!(err.to_string().contains("age"));
}

// =============================================================================
// Operands
// =============================================================================

#[test]
fn test_sort_directions() {
    let params = RequestParams::new().with("_sort", "-name,age");
    let query = build_query(&params, &people(), QueryKind::Find).unwrap();
    assert_eq!(query.order_by, vec![OrderBy::desc("name"), OrderBy::asc("age")]);
}

#[test]
fn test_unknown_sort_attribute() {
    let params = RequestParams::new().with("_sort", "ghost");
    let err = build_query(&params, &people(), QueryKind::Find).unwrap_err();
    assert_eq!(err, QueryError::InvalidSortAttribute("ghost".to_string()));
}

#[test]
fn test_paging_defaults() {
    let query = build_query(&RequestParams::new(), &people(), QueryKind::Find).unwrap();
    assert_eq!(query.offset, Some(0));
    assert_eq!(query.limit, Some(DEFAULT_LIMIT));

    let params = RequestParams::from_pairs([("_skip", "-3"), ("_limit", "abc")]);
    let query = build_query(&params, &people(), QueryKind::Find).unwrap();
    assert_eq!(query.offset, Some(0));
    assert_eq!(query.limit, Some(1000));

    let params = RequestParams::from_pairs([("_skip", "20"), ("_limit", "5")]);
    let query = build_query(&params, &people(), QueryKind::Find).unwrap();
    assert_eq!(query.offset, Some(20));
    assert_eq!(query.limit, Some(5));
}

#[test]
fn test_select_projection() {
    let params = RequestParams::new().with("_select", "id,name");
    let query = build_query(&params, &people(), QueryKind::Find).unwrap();
    assert_eq!(query.projection, vec!["id", "name"]);

    let params = RequestParams::new().with("_select", "id,ghost");
    let err = build_query(&params, &people(), QueryKind::Find).unwrap_err();
    assert_eq!(err, QueryError::InvalidSelectAttribute("ghost".to_string()));
}

#[test]
fn test_count_and_delete_ignore_paging_operands() {
    let params = RequestParams::from_pairs([
        ("_sort", "ghost"),
        ("_select", "ghost"),
        ("_limit", "5"),
        ("active", "true"),
    ]);

    for kind in [QueryKind::Count, QueryKind::Delete] {
        let query = build_query(&params, &people(), kind).unwrap();
        assert!(query.is_filter_only());
        assert_eq!(
            query.attribute_filters["active"],
            vec![Predicate::Equals(TypedValue::Bool(true))]
        );
    }
}

#[test]
fn test_find_one_keeps_projection_only() {
    let params = RequestParams::from_pairs([("_select", "name"), ("_limit", "5"), ("_sort", "age")]);
    let query = build_query(&params, &people(), QueryKind::FindOne).unwrap();
    assert_eq!(query.projection, vec!["name"]);
    assert_eq!(query.limit, None);
    assert!(query.order_by.is_empty());
}

// =============================================================================
// Rejections
// =============================================================================

#[test]
fn test_unknown_single_underscore_operand() {
    let params = RequestParams::new().with("_bogus", "1");
    let err = build_query(&params, &people(), QueryKind::Find).unwrap_err();
    assert_eq!(err, QueryError::UnknownOperand("_bogus".to_string()));
}

#[test]
fn test_routing_extras_are_ignored() {
    let params = RequestParams::from_pairs([("__id", "7"), ("color", "red")]);
    let query = build_query(&params, &people(), QueryKind::Find).unwrap();
    assert!(query.attribute_filters.is_empty());
}

#[test]
fn test_non_queryable_attribute() {
    let params = RequestParams::new().with("secret", "x");
    let err = build_query(&params, &people(), QueryKind::Count).unwrap_err();
    assert_eq!(err.code(), "NON_QUERYABLE_ATTRIBUTE");
    assert!(err.to_string().contains("secret"));
}
