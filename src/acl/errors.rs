//! # ACL Errors

use thiserror::Error;

/// Result type for ACL operations
pub type AclResult<T> = Result<T, AclError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AclError {
    /// Entity has ACL enabled but lacks one of the four ACL columns.
    /// A deployment problem, still reported per request.
    #[error("Entity '{entity}' is missing ACL columns: {missing}")]
    MisconfiguredAcl { entity: String, missing: String },
}

impl AclError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MisconfiguredAcl { .. } => "MISCONFIGURED_ACL",
        }
    }
}
