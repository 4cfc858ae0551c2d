// ============================================================================
// Field Snapshot Capture
// ============================================================================
//
// Captures the tracked fields of one entity into an immutable snapshot at a
// lifecycle boundary: right after the persistence runtime populates the
// entity (on load) and right before it writes pending changes (on flush).
// Collection values are materialized member lists taken at the capture
// instant, so later in-place mutation of the live collection cannot alter
// the baseline.
//
// ============================================================================

use crate::core::{EntityId, Result, TrackError, TrackedValue};
use crate::entity::{Trackable, entity_id_of};
use crate::meta::{FieldDescriptor, FieldKind, TrackableType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle boundary a snapshot was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureTimepoint {
    OnLoad,
    OnFlush,
}

/// One field's value at one timepoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    field: String,
    value: TrackedValue,
    taken_at: CaptureTimepoint,
}

impl FieldSnapshot {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &TrackedValue {
        &self.value
    }

    pub fn taken_at(&self) -> CaptureTimepoint {
        self.taken_at
    }
}

/// All tracked fields of one entity at one timepoint, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySnapshot {
    entity_id: EntityId,
    taken_at: CaptureTimepoint,
    captured_at: DateTime<Utc>,
    fields: Vec<FieldSnapshot>,
}

impl EntitySnapshot {
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn taken_at(&self) -> CaptureTimepoint {
        self.taken_at
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn fields(&self) -> &[FieldSnapshot] {
        &self.fields
    }

    pub fn field_value(&self, field: &str) -> Option<&TrackedValue> {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(|f| &f.value)
    }
}

/// Capture every tracked field of `entity` as declared by `meta`.
///
/// Fails loudly: an accessor error or a value that contradicts the declared
/// field kind aborts the whole entity's capture. The declared kind also
/// resolves the comparison capability here: a field registered as ordered
/// gets its scalar promoted to comparison-based equality once, at capture,
/// instead of being probed on every comparison.
pub fn capture(
    entity: &dyn Trackable,
    meta: &TrackableType,
    timepoint: CaptureTimepoint,
) -> Result<EntitySnapshot> {
    let entity_id = entity_id_of(entity)
        .ok_or_else(|| TrackError::UnresolvedIdentity(entity.entity_type().to_string()))?;

    let mut fields = Vec::with_capacity(meta.fields().len());
    for descriptor in meta.fields() {
        let raw = entity.field_value(descriptor.name()).map_err(|err| match err {
            TrackError::Capture { .. } => err,
            other => TrackError::capture(meta.name(), descriptor.name(), other.to_string()),
        })?;
        let value = tag_for_kind(meta.name(), descriptor, raw)?;
        fields.push(FieldSnapshot {
            field: descriptor.name().to_string(),
            value,
            taken_at: timepoint,
        });
    }

    Ok(EntitySnapshot {
        entity_id,
        taken_at: timepoint,
        captured_at: Utc::now(),
        fields,
    })
}

/// Check the captured value against the declared kind and apply the kind's
/// comparison capability.
fn tag_for_kind(
    entity_type: &str,
    descriptor: &FieldDescriptor,
    value: TrackedValue,
) -> Result<TrackedValue> {
    let mismatch = |value: &TrackedValue| {
        TrackError::capture(
            entity_type,
            descriptor.name(),
            format!(
                "declared {} but captured {}",
                descriptor.kind(),
                value.type_name()
            ),
        )
    };

    match descriptor.kind() {
        FieldKind::Scalar => match value {
            TrackedValue::Absent | TrackedValue::Scalar(_) => Ok(value),
            other => Err(mismatch(&other)),
        },
        FieldKind::Ordered => match value {
            TrackedValue::Absent | TrackedValue::Ordered(_) => Ok(value),
            TrackedValue::Scalar(s) => Ok(TrackedValue::Ordered(s)),
            other => Err(mismatch(&other)),
        },
        FieldKind::Reference => match value {
            TrackedValue::Absent | TrackedValue::Reference(_) => Ok(value),
            other => Err(mismatch(&other)),
        },
        FieldKind::ReferenceCollection => match value {
            TrackedValue::Absent | TrackedValue::References(_) => Ok(value),
            other => Err(mismatch(&other)),
        },
        FieldKind::ValueCollection => match value {
            TrackedValue::Absent | TrackedValue::Values(_) => Ok(value),
            other => Err(mismatch(&other)),
        },
    }
}
