//! # Query Translation
//!
//! Request parameters in, typed store-agnostic queries out. Everything here
//! is pure and synchronous; nothing touches the store.

pub mod builder;
pub mod errors;
pub mod expr;
pub mod params;
pub mod predicate;
pub mod value;

pub use builder::{
    build_query, resolve_select, BuiltQuery, OrderBy, QueryKind, SortDirection, DEFAULT_LIMIT,
    RESERVED_OPERANDS,
};
pub use errors::{QueryError, QueryResult};
pub use expr::WhereExpr;
pub use params::{ParamValue, RequestParams};
pub use predicate::{parse_predicate, LikeAnchor, Predicate};
pub use value::{coerce, TypedValue};
