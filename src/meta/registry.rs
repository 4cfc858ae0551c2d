use crate::core::{Result, TrackError};
use crate::meta::{FieldDescriptor, FieldKind};
use std::collections::HashMap;
use std::sync::Arc;

/// Tracking metadata for one entity type: its name and the ordered list of
/// tracked fields. Declaration order is the authoritative field order for
/// capture and for emitted records. Immutable once registered.
#[derive(Debug, Clone)]
pub struct TrackableType {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl TrackableType {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name() == name)
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(TrackError::Metadata(
                "trackable type name must not be empty".to_string(),
            ));
        }
        if self.fields.is_empty() {
            return Err(TrackError::Metadata(format!(
                "trackable type '{}' declares no tracked fields",
                self.name
            )));
        }
        for (i, field) in self.fields.iter().enumerate() {
            if field.name().is_empty() {
                return Err(TrackError::Metadata(format!(
                    "trackable type '{}' declares a field with an empty name",
                    self.name
                )));
            }
            if self.fields[..i].iter().any(|f| f.name() == field.name()) {
                return Err(TrackError::Metadata(format!(
                    "trackable type '{}' declares field '{}' twice",
                    self.name,
                    field.name()
                )));
            }
            if field.inverse().is_some() && field.kind() != FieldKind::ReferenceCollection {
                return Err(TrackError::Metadata(format!(
                    "field '{}.{}' declares an inverse side but is {}, not a reference collection",
                    self.name,
                    field.name(),
                    field.kind()
                )));
            }
        }
        Ok(())
    }
}

/// Registry of all trackable types, built once at startup and queried by
/// the engine as plain data.
///
/// Copy-on-write like the storage catalog: `with_type` returns a new
/// registry, the old one stays valid, and a built registry clones cheaply
/// behind an `Arc` for sharing across tracking contexts.
#[derive(Debug, Clone, Default)]
pub struct TrackableRegistry {
    types: Arc<HashMap<String, TrackableType>>,
}

impl TrackableRegistry {
    pub fn new() -> Self {
        Self {
            types: Arc::new(HashMap::new()),
        }
    }

    /// Register a type. Structural problems in the declaration surface here,
    /// before any unit of work runs.
    pub fn with_type(self, trackable: TrackableType) -> Result<Self> {
        trackable.validate()?;

        if self.types.contains_key(trackable.name()) {
            return Err(TrackError::Metadata(format!(
                "trackable type '{}' is already registered",
                trackable.name()
            )));
        }

        let mut new_types = (*self.types).clone();
        new_types.insert(trackable.name().to_string(), trackable);

        Ok(Self {
            types: Arc::new(new_types),
        })
    }

    /// Cross-type validation, run after every type has been registered:
    /// every declared inverse must resolve to a registered reference
    /// collection that points back at the declaring field.
    pub fn validated(self) -> Result<Self> {
        for trackable in self.types.values() {
            for field in trackable.fields() {
                let Some(inverse) = field.inverse() else {
                    continue;
                };
                let other = self.types.get(&inverse.entity_type).ok_or_else(|| {
                    TrackError::Metadata(format!(
                        "field '{}.{}' declares inverse on unregistered type '{}'",
                        trackable.name(),
                        field.name(),
                        inverse.entity_type
                    ))
                })?;
                let other_field = other.field(&inverse.field).ok_or_else(|| {
                    TrackError::Metadata(format!(
                        "field '{}.{}' declares inverse '{}.{}' which does not exist",
                        trackable.name(),
                        field.name(),
                        inverse.entity_type,
                        inverse.field
                    ))
                })?;
                if other_field.kind() != FieldKind::ReferenceCollection {
                    return Err(TrackError::Metadata(format!(
                        "inverse '{}.{}' of '{}.{}' is {}, not a reference collection",
                        inverse.entity_type,
                        inverse.field,
                        trackable.name(),
                        field.name(),
                        other_field.kind()
                    )));
                }
                let points_back = other_field.inverse().is_none_or(|back| {
                    back.entity_type == trackable.name() && back.field == field.name()
                });
                if !points_back {
                    return Err(TrackError::Metadata(format!(
                        "inverse '{}.{}' of '{}.{}' points elsewhere",
                        inverse.entity_type,
                        inverse.field,
                        trackable.name(),
                        field.name()
                    )));
                }
            }
        }
        Ok(self)
    }

    pub fn is_tracked(&self, entity_type: &str) -> bool {
        self.types.contains_key(entity_type)
    }

    pub fn get(&self, entity_type: &str) -> Option<&TrackableType> {
        self.types.get(entity_type)
    }

    /// Ordered field descriptors of a registered type.
    pub fn tracked_fields(&self, entity_type: &str) -> Result<&[FieldDescriptor]> {
        self.types
            .get(entity_type)
            .map(TrackableType::fields)
            .ok_or_else(|| TrackError::UnknownType(entity_type.to_string()))
    }

    pub fn field_kind(&self, entity_type: &str, field: &str) -> Result<FieldKind> {
        let trackable = self
            .types
            .get(entity_type)
            .ok_or_else(|| TrackError::UnknownType(entity_type.to_string()))?;
        trackable
            .field(field)
            .map(FieldDescriptor::kind)
            .ok_or_else(|| {
                TrackError::UnknownField(field.to_string(), entity_type.to_string())
            })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee() -> TrackableType {
        TrackableType::new(
            "Employee",
            vec![
                FieldDescriptor::scalar("name"),
                FieldDescriptor::references("projects").with_inverse("Project", "employees"),
            ],
        )
    }

    fn project() -> TrackableType {
        TrackableType::new(
            "Project",
            vec![
                FieldDescriptor::scalar("name"),
                FieldDescriptor::references("employees").with_inverse("Employee", "projects"),
            ],
        )
    }

    #[test]
    fn test_register_and_query() {
        let registry = TrackableRegistry::new()
            .with_type(employee())
            .unwrap()
            .with_type(project())
            .unwrap()
            .validated()
            .unwrap();

        assert!(registry.is_tracked("Employee"));
        assert!(!registry.is_tracked("Invoice"));
        assert_eq!(registry.tracked_fields("Employee").unwrap().len(), 2);
        assert_eq!(
            registry.field_kind("Employee", "projects").unwrap(),
            FieldKind::ReferenceCollection
        );
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let err = TrackableRegistry::new()
            .with_type(employee())
            .unwrap()
            .with_type(employee());
        assert!(matches!(err, Err(TrackError::Metadata(_))));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let trackable = TrackableType::new(
            "Employee",
            vec![
                FieldDescriptor::scalar("name"),
                FieldDescriptor::scalar("name"),
            ],
        );
        let err = TrackableRegistry::new().with_type(trackable);
        assert!(matches!(err, Err(TrackError::Metadata(_))));
    }

    #[test]
    fn test_empty_field_list_rejected() {
        let err = TrackableRegistry::new().with_type(TrackableType::new("Employee", vec![]));
        assert!(matches!(err, Err(TrackError::Metadata(_))));
    }

    #[test]
    fn test_dangling_inverse_rejected() {
        let err = TrackableRegistry::new()
            .with_type(employee())
            .unwrap()
            .validated();
        assert!(matches!(err, Err(TrackError::Metadata(_))));
    }

    #[test]
    fn test_inverse_pointing_elsewhere_rejected() {
        let crooked = TrackableType::new(
            "Project",
            vec![
                FieldDescriptor::references("employees").with_inverse("Employee", "name"),
            ],
        );
        let err = TrackableRegistry::new()
            .with_type(employee())
            .unwrap()
            .with_type(crooked)
            .unwrap()
            .validated();
        assert!(matches!(err, Err(TrackError::Metadata(_))));
    }

    #[test]
    fn test_inverse_on_scalar_rejected() {
        let trackable = TrackableType::new(
            "Employee",
            vec![FieldDescriptor::scalar("name").with_inverse("Project", "employees")],
        );
        let err = TrackableRegistry::new().with_type(trackable);
        assert!(matches!(err, Err(TrackError::Metadata(_))));
    }

    #[test]
    fn test_old_registry_unchanged_after_with_type() {
        let base = TrackableRegistry::new().with_type(employee()).unwrap();
        let _extended = base.clone().with_type(project()).unwrap();
        assert_eq!(base.len(), 1);
    }
}
