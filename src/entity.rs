use crate::core::{EntityId, EntityKey, EntityRef, Result, ScalarValue, TrackedValue};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Entity-side contract of the tracking engine.
///
/// The persistence runtime hands entities to the lifecycle hooks through
/// this trait; the engine never touches an entity in any other way. Which
/// fields are read, and how their values are compared, is decided by the
/// registered [`TrackableType`](crate::meta::TrackableType) metadata, not
/// by the entity itself.
pub trait Trackable {
    /// Stable type name, matching the registered metadata.
    fn entity_type(&self) -> &'static str;

    /// Primary key, or `None` while the entity is transient.
    fn entity_key(&self) -> Option<EntityKey>;

    /// Read one tracked field as a type-erased value.
    ///
    /// Errors here abort the capture of the whole entity: partial tracking
    /// data would silently read as "no change".
    fn field_value(&self, field: &str) -> Result<TrackedValue>;
}

/// Resolved identity of a trackable entity, if it has one.
pub fn entity_id_of(entity: &dyn Trackable) -> Option<EntityId> {
    entity
        .entity_key()
        .map(|key| EntityId::new(entity.entity_type(), key))
}

/// Reference to a trackable entity as a relationship member. Entities
/// without a key yield an unresolved reference.
pub fn entity_ref_of(entity: &dyn Trackable) -> EntityRef {
    match entity.entity_key() {
        Some(key) => EntityRef::new(entity.entity_type(), key),
        None => EntityRef::unresolved(entity.entity_type()),
    }
}

/// Conversion of plain Rust scalars into type-erased [`ScalarValue`]s.
pub trait TrackedScalar {
    fn to_scalar(&self) -> ScalarValue;
}

/// Conversion of a scalar field into a [`TrackedValue`]. `Option` maps
/// `None` to `Absent`.
pub trait TrackedFieldValue {
    fn tracked_value(&self) -> TrackedValue;
}

macro_rules! impl_tracked_scalar {
    ($ty:ty, |$value:ident| $expr:expr) => {
        impl TrackedScalar for $ty {
            fn to_scalar(&self) -> ScalarValue {
                let $value = self;
                $expr
            }
        }

        impl TrackedFieldValue for $ty {
            fn tracked_value(&self) -> TrackedValue {
                TrackedValue::Scalar(self.to_scalar())
            }
        }
    };
}

impl_tracked_scalar!(i64, |v| ScalarValue::Integer(*v));
impl_tracked_scalar!(i32, |v| ScalarValue::Integer(i64::from(*v)));
impl_tracked_scalar!(i16, |v| ScalarValue::Integer(i64::from(*v)));
impl_tracked_scalar!(i8, |v| ScalarValue::Integer(i64::from(*v)));
impl_tracked_scalar!(u32, |v| ScalarValue::Integer(i64::from(*v)));
impl_tracked_scalar!(u16, |v| ScalarValue::Integer(i64::from(*v)));
impl_tracked_scalar!(u8, |v| ScalarValue::Integer(i64::from(*v)));
impl_tracked_scalar!(f64, |v| ScalarValue::Float(*v));
impl_tracked_scalar!(f32, |v| ScalarValue::Float(f64::from(*v)));
impl_tracked_scalar!(bool, |v| ScalarValue::Boolean(*v));
impl_tracked_scalar!(String, |v| ScalarValue::Text(v.clone()));
impl_tracked_scalar!(DateTime<Utc>, |v| ScalarValue::Timestamp(*v));
impl_tracked_scalar!(Uuid, |v| ScalarValue::Uuid(*v));

impl TrackedScalar for str {
    fn to_scalar(&self) -> ScalarValue {
        ScalarValue::Text(self.to_string())
    }
}

impl<T: TrackedScalar> TrackedFieldValue for Option<T> {
    fn tracked_value(&self) -> TrackedValue {
        match self {
            Some(value) => TrackedValue::Scalar(value.to_scalar()),
            None => TrackedValue::Absent,
        }
    }
}

/// Member types of reference collections.
pub trait AsEntityRef {
    fn as_entity_ref(&self) -> EntityRef;
}

impl AsEntityRef for EntityRef {
    fn as_entity_ref(&self) -> EntityRef {
        self.clone()
    }
}

impl AsEntityRef for EntityId {
    fn as_entity_ref(&self) -> EntityRef {
        EntityRef::from(self)
    }
}

/// Conversion of a reference-collection field into a [`TrackedValue`].
///
/// Backed by `Vec` so that member order is first-observed insertion order;
/// `Option<Vec<..>>` distinguishes a never-materialized collection
/// (`Absent`) from a present-but-empty one.
pub trait TrackedReferences {
    fn tracked_references(&self) -> TrackedValue;
}

impl<T: AsEntityRef> TrackedReferences for Vec<T> {
    fn tracked_references(&self) -> TrackedValue {
        TrackedValue::References(self.iter().map(AsEntityRef::as_entity_ref).collect())
    }
}

impl<T: AsEntityRef> TrackedReferences for Option<Vec<T>> {
    fn tracked_references(&self) -> TrackedValue {
        match self {
            Some(members) => members.tracked_references(),
            None => TrackedValue::Absent,
        }
    }
}

/// Conversion of a value-collection field into a [`TrackedValue`].
pub trait TrackedValues {
    fn tracked_values(&self) -> TrackedValue;
}

impl<T: TrackedScalar> TrackedValues for Vec<T> {
    fn tracked_values(&self) -> TrackedValue {
        TrackedValue::Values(self.iter().map(TrackedScalar::to_scalar).collect())
    }
}

impl<T: TrackedScalar> TrackedValues for Option<Vec<T>> {
    fn tracked_values(&self) -> TrackedValue {
        match self {
            Some(members) => members.tracked_values(),
            None => TrackedValue::Absent,
        }
    }
}

/// Key field types accepted by the derive macro.
pub trait TrackedKey {
    fn entity_key(&self) -> Option<EntityKey>;
}

impl TrackedKey for i64 {
    fn entity_key(&self) -> Option<EntityKey> {
        Some(EntityKey::Int(*self))
    }
}

impl TrackedKey for i32 {
    fn entity_key(&self) -> Option<EntityKey> {
        Some(EntityKey::Int(i64::from(*self)))
    }
}

impl TrackedKey for String {
    fn entity_key(&self) -> Option<EntityKey> {
        Some(EntityKey::Text(self.clone()))
    }
}

impl TrackedKey for Uuid {
    fn entity_key(&self) -> Option<EntityKey> {
        Some(EntityKey::Uuid(*self))
    }
}

impl<T: TrackedKey> TrackedKey for Option<T> {
    fn entity_key(&self) -> Option<EntityKey> {
        self.as_ref().and_then(TrackedKey::entity_key)
    }
}
