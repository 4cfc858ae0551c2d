use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared kind of a tracked field.
///
/// The kind fixes the comparison strategy at registration time: scalar
/// fields use structural equality, ordered fields use their total-order
/// comparison, collection fields go through the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Scalar,
    Ordered,
    Reference,
    ReferenceCollection,
    ValueCollection,
}

impl FieldKind {
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::ReferenceCollection | Self::ValueCollection)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Ordered => write!(f, "ordered"),
            Self::Reference => write!(f, "reference"),
            Self::ReferenceCollection => write!(f, "reference-collection"),
            Self::ValueCollection => write!(f, "value-collection"),
        }
    }
}

/// The mirrored side of a bidirectional relationship field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InverseSide {
    pub entity_type: String,
    pub field: String,
}

/// Declaration of one tracked field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
    inverse: Option<InverseSide>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            inverse: None,
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Scalar)
    }

    pub fn ordered(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Ordered)
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Reference)
    }

    pub fn references(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::ReferenceCollection)
    }

    pub fn values(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::ValueCollection)
    }

    /// Declare the mirrored field on the other side of the relationship.
    pub fn with_inverse(
        mut self,
        entity_type: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        self.inverse = Some(InverseSide {
            entity_type: entity_type.into(),
            field: field.into(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn inverse(&self) -> Option<&InverseSide> {
        self.inverse.as_ref()
    }
}
