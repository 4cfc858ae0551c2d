use crate::core::{EntityId, TrackedValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to the entity in this unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// One changed field: old and new value as judged by the equality policy.
/// Only produced for pairs the policy judged *not equal*; for inserts the
/// old value is always absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTrackingFieldData {
    field: String,
    old_value: TrackedValue,
    new_value: TrackedValue,
}

impl EntityTrackingFieldData {
    pub fn new(
        field: impl Into<String>,
        old_value: TrackedValue,
        new_value: TrackedValue,
    ) -> Self {
        Self {
            field: field.into(),
            old_value,
            new_value,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn old_value(&self) -> &TrackedValue {
        &self.old_value
    }

    pub fn new_value(&self) -> &TrackedValue {
        &self.new_value
    }

    pub(crate) fn replace_new_value(&mut self, new_value: TrackedValue) {
        self.new_value = new_value;
    }
}

impl fmt::Display for EntityTrackingFieldData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.field, self.old_value, self.new_value)
    }
}

/// The finished tracking record for one entity in one unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityTrackingData {
    entity_id: EntityId,
    operation: OperationKind,
    fields: Vec<EntityTrackingFieldData>,
}

impl EntityTrackingData {
    pub fn new(
        entity_id: EntityId,
        operation: OperationKind,
        fields: Vec<EntityTrackingFieldData>,
    ) -> Self {
        Self {
            entity_id,
            operation,
            fields,
        }
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn entity_type(&self) -> &str {
        self.entity_id.entity_type()
    }

    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    /// Changed fields, in the order declared by the trackable type.
    pub fn fields(&self) -> &[EntityTrackingFieldData] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&EntityTrackingFieldData> {
        self.fields.iter().find(|f| f.field() == name)
    }

    pub(crate) fn operation_mut(&mut self) -> &mut OperationKind {
        &mut self.operation
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Vec<EntityTrackingFieldData> {
        &mut self.fields
    }
}

impl fmt::Display for EntityTrackingData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({} fields)", self.operation, self.entity_id, self.fields.len())
    }
}
