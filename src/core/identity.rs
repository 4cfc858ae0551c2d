use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Primary key of a persisted entity.
///
/// Membership tests in relationship collections go through this key, never
/// through structural equality of the referenced entity: two references to
/// the same persisted identity are the same member even if transient
/// attributes differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKey {
    Int(i64),
    Text(String),
    Uuid(Uuid),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "{}", s),
            Self::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl From<i64> for EntityKey {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<String> for EntityKey {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for EntityKey {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Uuid> for EntityKey {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

/// Fully resolved identity of a tracked entity: type name plus key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId {
    entity_type: String,
    key: EntityKey,
}

impl EntityId {
    pub fn new(entity_type: impl Into<String>, key: impl Into<EntityKey>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn key(&self) -> &EntityKey {
        &self.key
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity_type, self.key)
    }
}

/// A reference to another entity as it appears inside a relationship field.
///
/// The key is optional: a member that has not been assigned its primary key
/// yet (e.g. a transient instance awaiting id generation) is *unresolved*.
/// Unresolved members cannot participate in identity-keyed set differences.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    entity_type: String,
    key: Option<EntityKey>,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, key: impl Into<EntityKey>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: Some(key.into()),
        }
    }

    /// A reference whose identity is not yet known.
    pub fn unresolved(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: None,
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn key(&self) -> Option<&EntityKey> {
        self.key.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.key.is_some()
    }

    /// Two refs point at the same persisted member iff both are resolved
    /// and agree on type and key.
    pub fn same_member(&self, other: &EntityRef) -> bool {
        match (&self.key, &other.key) {
            (Some(a), Some(b)) => self.entity_type == other.entity_type && a == b,
            _ => false,
        }
    }
}

impl From<EntityId> for EntityRef {
    fn from(id: EntityId) -> Self {
        Self {
            entity_type: id.entity_type,
            key: Some(id.key),
        }
    }
}

impl From<&EntityId> for EntityRef {
    fn from(id: &EntityId) -> Self {
        Self {
            entity_type: id.entity_type.clone(),
            key: Some(id.key.clone()),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}#{}", self.entity_type, key),
            None => write!(f, "{}#?", self.entity_type),
        }
    }
}
