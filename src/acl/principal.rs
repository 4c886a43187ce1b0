//! The authenticated caller
//!
//! Passed explicitly into every dispatcher and ACL call. An absent principal
//! (`Principal::anonymous()`) has no id and no groups.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub groups: BTreeSet<String>,

    /// Display name stamped into audit columns
    #[serde(default)]
    pub username: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            groups: BTreeSet::new(),
            username: None,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    /// Identity written to audit columns: username, else id.
    pub fn audit_name(&self) -> Option<&str> {
        self.username.as_deref().or(self.id.as_deref())
    }
}
