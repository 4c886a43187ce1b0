//! # Query Translator
//!
//! Turns raw request parameters into a [`BuiltQuery`] for one entity.
//!
//! Keys fall into three buckets: reserved operand controls (`_skip`,
//! `_limit`, `_sort`, `_select`, plus the inert `_connect`, `_populate`,
//! `_keywords`, `_type`), entity column names, and extras. Extras are
//! ignored, except that a single-underscore key which is not a known
//! operand is rejected as a likely typo.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::schema::EntityDescriptor;

use super::errors::{QueryError, QueryResult};
use super::expr::WhereExpr;
use super::params::{ParamValue, RequestParams};
use super::predicate::{parse_predicate, Predicate};

/// Operand keys; entities may not declare columns with these names.
pub const RESERVED_OPERANDS: [&str; 8] = [
    "_skip",
    "_limit",
    "_sort",
    "_select",
    "_connect",
    "_populate",
    "_keywords",
    "_type",
];

/// Row cap applied when `_limit` is absent
pub const DEFAULT_LIMIT: usize = 1000;

/// What the built query will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Paged list: filters, offset/limit, sort, projection
    Find,
    /// Single row: filters and projection only
    FindOne,
    /// Filters only
    Count,
    /// Filters only
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// A query ready to hand to a store
///
/// The effective filter is the AND of every attribute predicate and every
/// extra clause (such as the ACL disjunction); see [`BuiltQuery::where_expr`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuiltQuery {
    /// Per-column predicates; several on one column are ANDed
    pub attribute_filters: BTreeMap<String, Vec<Predicate>>,

    /// Additional clauses ANDed with the attribute filters
    pub where_clauses: Vec<WhereExpr>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,

    /// Columns to return; empty means all
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub projection: Vec<String>,
}

impl BuiltQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate on `column`.
    pub fn filter(mut self, column: impl Into<String>, predicate: Predicate) -> Self {
        self.add_filter(column, predicate);
        self
    }

    pub fn add_filter(&mut self, column: impl Into<String>, predicate: Predicate) {
        self.attribute_filters
            .entry(column.into())
            .or_default()
            .push(predicate);
    }

    /// ANDs an extra clause onto the query.
    pub fn and_where(&mut self, expr: WhereExpr) {
        self.where_clauses.push(expr);
    }

    /// The complete filter as one expression.
    pub fn where_expr(&self) -> WhereExpr {
        let mut clauses: Vec<WhereExpr> = self
            .attribute_filters
            .iter()
            .flat_map(|(column, predicates)| {
                predicates
                    .iter()
                    .map(move |p| WhereExpr::column(column.clone(), p.clone()))
            })
            .collect();
        clauses.extend(self.where_clauses.iter().cloned());

        match clauses.len() {
            0 => WhereExpr::always(),
            1 => clauses.remove(0),
            _ => WhereExpr::and(clauses),
        }
    }

    /// True when no pagination, ordering or projection is set.
    pub fn is_filter_only(&self) -> bool {
        self.offset.is_none()
            && self.limit.is_none()
            && self.order_by.is_empty()
            && self.projection.is_empty()
    }
}

/// Request parameters split by role
#[derive(Debug, Default)]
struct Separated<'a> {
    operands: BTreeMap<&'a str, &'a ParamValue>,
    attributes: Vec<(&'a str, &'a ParamValue)>,
    extras: Vec<&'a str>,
}

fn separate<'a>(
    params: &'a RequestParams,
    entity: &EntityDescriptor,
) -> QueryResult<Separated<'a>> {
    let mut separated = Separated::default();

    for (key, value) in params.iter() {
        if RESERVED_OPERANDS.contains(&key) {
            separated.operands.insert(key, value);
        } else if entity.has_column(key) {
            separated.attributes.push((key, value));
        } else if key.starts_with('_') && !key.starts_with("__") {
            return Err(QueryError::UnknownOperand(key.to_string()));
        } else {
            separated.extras.push(key);
        }
    }

    Ok(separated)
}

/// Builds a query for `entity` from request parameters.
pub fn build_query(
    params: &RequestParams,
    entity: &EntityDescriptor,
    kind: QueryKind,
) -> QueryResult<BuiltQuery> {
    let separated = separate(params, entity)?;
    if !separated.extras.is_empty() {
        debug!(entity = %entity.name, extras = ?separated.extras, "Ignoring unrecognised parameters");
    }

    let mut query = BuiltQuery::new();

    for (key, value) in &separated.attributes {
        let column = match entity.column(key) {
            Some(column) => column,
            None => continue,
        };
        if !column.queryable {
            return Err(QueryError::NonQueryableAttribute {
                entity: entity.name.clone(),
                column: column.name.clone(),
            });
        }
        for raw in value.values() {
            query.add_filter(column.name.clone(), parse_predicate(column, raw)?);
        }
    }

    match kind {
        QueryKind::Count | QueryKind::Delete => return Ok(query),
        QueryKind::FindOne => {}
        QueryKind::Find => {
            let ops = &separated.operands;
            query.offset = Some(positive_int(ops.get("_skip").copied()).unwrap_or(0));
            query.limit = Some(positive_int(ops.get("_limit").copied()).unwrap_or(DEFAULT_LIMIT));
            if let Some(sort) = ops.get("_sort") {
                query.order_by = parse_sort(entity, sort)?;
            }
        }
    }

    if let Some(select) = separated.operands.get("_select") {
        for list in select.values() {
            query.projection.extend(resolve_select(entity, list)?);
        }
    }

    Ok(query)
}

/// Validates a comma-separated projection list against the entity.
pub fn resolve_select(entity: &EntityDescriptor, list: &str) -> QueryResult<Vec<String>> {
    if list.is_empty() {
        return Ok(Vec::new());
    }

    list.split(',')
        .map(|attr| {
            if entity.has_column(attr) {
                Ok(attr.to_string())
            } else {
                Err(QueryError::InvalidSelectAttribute(attr.to_string()))
            }
        })
        .collect()
}

fn parse_sort(entity: &EntityDescriptor, sort: &ParamValue) -> QueryResult<Vec<OrderBy>> {
    let mut orders = Vec::new();

    for list in sort.values().into_iter().filter(|l| !l.is_empty()) {
        for token in list.split(',') {
            let order = match token.strip_prefix('-') {
                Some(column) => OrderBy::desc(column),
                None => OrderBy::asc(token),
            };
            if !entity.has_column(&order.column) {
                return Err(QueryError::InvalidSortAttribute(token.to_string()));
            }
            orders.push(order);
        }
    }

    Ok(orders)
}

/// `_skip`/`_limit` value, or `None` when it should fall back to a default
fn positive_int(value: Option<&ParamValue>) -> Option<usize> {
    value
        .and_then(ParamValue::first)
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
}
