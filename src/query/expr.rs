//! Store-agnostic boolean expression tree
//!
//! Store adapters lower this tree onto their native predicate language.
//! `MaskCovers` is the bitwise test `(column & mask) == mask`.

use serde::Serialize;

use crate::acl::Privilege;

use super::predicate::Predicate;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WhereExpr {
    And { clauses: Vec<WhereExpr> },
    Or { clauses: Vec<WhereExpr> },
    Column { column: String, predicate: Predicate },
    MaskCovers { column: String, mask: Privilege },
    Const { value: bool },
}

impl WhereExpr {
    pub fn and(clauses: Vec<WhereExpr>) -> Self {
        WhereExpr::And { clauses }
    }

    pub fn or(clauses: Vec<WhereExpr>) -> Self {
        WhereExpr::Or { clauses }
    }

    pub fn column(column: impl Into<String>, predicate: Predicate) -> Self {
        WhereExpr::Column {
            column: column.into(),
            predicate,
        }
    }

    pub fn mask_covers(column: impl Into<String>, mask: Privilege) -> Self {
        WhereExpr::MaskCovers {
            column: column.into(),
            mask,
        }
    }

    /// A clause that matches no row
    pub fn never() -> Self {
        WhereExpr::Const { value: false }
    }

    pub fn always() -> Self {
        WhereExpr::Const { value: true }
    }
}
