//! Entity and column descriptors
//!
//! Descriptors are produced once by whatever introspects the store and are
//! read-only afterwards. The JSON form lists columns in declaration order;
//! the primary key is the ordered subset flagged `primary_key`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::acl::Privilege;
use crate::query::RESERVED_OPERANDS;

use super::errors::{SchemaError, SchemaResult};

/// Column names carrying row-level permission data.
pub const ACL_OWNER: &str = "acl_owner";
pub const ACL_GROUP: &str = "acl_group";
pub const ACL_GROUP_PRIVS: &str = "acl_group_privs";
pub const ACL_PUBLIC_PRIVS: &str = "acl_public_privs";

/// All four ACL columns, in the order they are checked.
pub const ACL_COLUMNS: [&str; 4] = [ACL_OWNER, ACL_GROUP, ACL_GROUP_PRIVS, ACL_PUBLIC_PRIVS];

/// Declared storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    Boolean,
    Integer,
    Float,
    Decimal,
    Date,
    DateOnly,
    Time,
    Char,
    String,
    Text,
    Uuid,
    #[serde(other)]
    Other,
}

impl DeclaredType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DeclaredType::Integer | DeclaredType::Float | DeclaredType::Decimal
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            DeclaredType::Date | DeclaredType::DateOnly | DeclaredType::Time
        )
    }

    /// Char, string and text columns; the only ones that accept LIKE.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            DeclaredType::Char | DeclaredType::String | DeclaredType::Text
        )
    }

    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            DeclaredType::Boolean => "boolean",
            DeclaredType::Integer => "integer",
            DeclaredType::Float => "float",
            DeclaredType::Decimal => "decimal",
            DeclaredType::Date => "date",
            DeclaredType::DateOnly => "dateonly",
            DeclaredType::Time => "time",
            DeclaredType::Char => "char",
            DeclaredType::String => "string",
            DeclaredType::Text => "text",
            DeclaredType::Uuid => "uuid",
            DeclaredType::Other => "other",
        }
    }
}

fn default_true() -> bool {
    true
}

/// Per-column descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,

    #[serde(rename = "type")]
    pub declared_type: DeclaredType,

    #[serde(default = "default_true")]
    pub nullable: bool,

    #[serde(default)]
    pub primary_key: bool,

    #[serde(default = "default_true")]
    pub queryable: bool,

    /// Only meaningful for textual columns. `Some(false)` marks a
    /// non-unicode column whose literals must not carry a unicode prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unicode: Option<bool>,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, declared_type: DeclaredType) -> Self {
        Self {
            name: name.into(),
            declared_type,
            nullable: true,
            primary_key: false,
            queryable: true,
            unicode: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_queryable(mut self) -> Self {
        self.queryable = false;
        self
    }

    pub fn unicode(mut self, unicode: bool) -> Self {
        self.unicode = Some(unicode);
        self
    }
}

/// Who owns a freshly inserted row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerPolicy {
    /// Always use the configured owner value
    #[default]
    Fixed,
    /// Use the calling principal's id when there is one
    CurrentPrincipal,
}

fn default_owner_value() -> Value {
    Value::from(0)
}

/// Default group granted on insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultGroup {
    pub name: String,
    #[serde(default)]
    pub privileges: Privilege,
}

/// ACL values applied to inserted rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclDefaults {
    #[serde(default)]
    pub owner_policy: OwnerPolicy,

    /// Owner used under `Fixed`, or when no principal is present
    #[serde(default = "default_owner_value")]
    pub owner_value: Value,

    #[serde(default)]
    pub public_privileges: Privilege,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<DefaultGroup>,
}

impl Default for AclDefaults {
    fn default() -> Self {
        Self {
            owner_policy: OwnerPolicy::Fixed,
            owner_value: default_owner_value(),
            public_privileges: Privilege::NONE,
            group: None,
        }
    }
}

/// Columns stamped with the caller's identity on writes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditColumns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

/// A store-side sequence feeding one column on insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSpec {
    pub name: String,
    pub column: String,
}

/// Wire form of an entity, as found in schema files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDef {
    pub name: String,
    pub columns: Vec<ColumnMeta>,
    #[serde(default)]
    pub acl_enabled: bool,
    #[serde(default)]
    pub acl_defaults: AclDefaults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_group: Option<String>,
    #[serde(default)]
    pub audit: AuditColumns,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<SequenceSpec>,
}

/// A named table exposed as a CRUD resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EntityDef", into = "EntityDef")]
pub struct EntityDescriptor {
    pub name: String,
    pub columns: BTreeMap<String, ColumnMeta>,
    /// Column names in declaration order
    pub column_order: Vec<String>,
    pub primary_key_columns: Vec<String>,
    pub acl_enabled: bool,
    pub acl_defaults: AclDefaults,
    pub create_group: Option<String>,
    pub audit: AuditColumns,
    pub sequence: Option<SequenceSpec>,
}

impl EntityDescriptor {
    /// Build a descriptor from ordered columns.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnMeta>) -> SchemaResult<Self> {
        Self::try_from(EntityDef {
            name: name.into(),
            columns,
            acl_enabled: false,
            acl_defaults: AclDefaults::default(),
            create_group: None,
            audit: AuditColumns::default(),
            sequence: None,
        })
    }

    pub fn with_acl(mut self, defaults: AclDefaults) -> Self {
        self.acl_enabled = true;
        self.acl_defaults = defaults;
        self
    }

    pub fn with_create_group(mut self, group: impl Into<String>) -> Self {
        self.create_group = Some(group.into());
        self
    }

    pub fn with_audit(mut self, audit: AuditColumns) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_sequence(mut self, sequence: SequenceSpec) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.get(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// True when all four ACL columns are declared.
    pub fn has_acl_columns(&self) -> bool {
        ACL_COLUMNS.iter().all(|c| self.columns.contains_key(*c))
    }
}

impl TryFrom<EntityDef> for EntityDescriptor {
    type Error = SchemaError;

    fn try_from(def: EntityDef) -> SchemaResult<Self> {
        if def.name.trim().is_empty() {
            return Err(SchemaError::InvalidEntity {
                entity: def.name,
                reason: "entity name cannot be empty".to_string(),
            });
        }

        let mut columns = BTreeMap::new();
        let mut column_order = Vec::with_capacity(def.columns.len());
        let mut primary_key_columns = Vec::new();

        for column in def.columns {
            if RESERVED_OPERANDS.contains(&column.name.as_str()) {
                return Err(SchemaError::ReservedColumnName {
                    entity: def.name,
                    column: column.name,
                });
            }
            if columns.contains_key(&column.name) {
                return Err(SchemaError::DuplicateColumn {
                    entity: def.name,
                    column: column.name,
                });
            }
            if column.primary_key {
                primary_key_columns.push(column.name.clone());
            }
            column_order.push(column.name.clone());
            columns.insert(column.name.clone(), column);
        }

        if let Some(seq) = &def.sequence {
            if !columns.contains_key(&seq.column) {
                return Err(SchemaError::InvalidEntity {
                    entity: def.name,
                    reason: format!("sequence column '{}' is not declared", seq.column),
                });
            }
        }

        Ok(Self {
            name: def.name,
            columns,
            column_order,
            primary_key_columns,
            acl_enabled: def.acl_enabled,
            acl_defaults: def.acl_defaults,
            create_group: def.create_group,
            audit: def.audit,
            sequence: def.sequence,
        })
    }
}

impl From<EntityDescriptor> for EntityDef {
    fn from(mut entity: EntityDescriptor) -> Self {
        let columns = entity
            .column_order
            .iter()
            .filter_map(|name| entity.columns.remove(name))
            .collect();
        Self {
            name: entity.name,
            columns,
            acl_enabled: entity.acl_enabled,
            acl_defaults: entity.acl_defaults,
            create_group: entity.create_group,
            audit: entity.audit,
            sequence: entity.sequence,
        }
    }
}
