// ============================================================================
// Bidirectional Collection Reconciler
// ============================================================================
//
// A many-to-many relationship is one logical edge stored in two collection
// fields, one per side. Application code mutates both sides together to
// keep the in-memory graph consistent, so the same edge change is visible
// twice. Each side's field belongs to a different entity's tracking record
// and both must be reported; deduplication means never emitting the *same
// field* twice, not collapsing the two records into one.
//
// ============================================================================

use crate::core::{EntityRef, ScalarValue, TrackedValue};
use crate::equality::collections_equivalent_when_absent;
use crate::record::EntityTrackingFieldData;
use log::warn;

/// Identity-keyed set difference between two member snapshots.
///
/// Membership is by entity key, never by structural equality: two
/// references to the same persisted identity are the same member even when
/// transient attributes differ. Order within `added`/`removed` follows the
/// first-observed insertion order of the underlying snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDelta {
    pub added: Vec<EntityRef>,
    pub removed: Vec<EntityRef>,
}

impl MemberDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub fn member_delta(old_members: &[EntityRef], new_members: &[EntityRef]) -> MemberDelta {
    let added = new_members
        .iter()
        .filter(|member| !old_members.iter().any(|o| o.same_member(member)))
        .cloned()
        .collect();
    let removed = old_members
        .iter()
        .filter(|member| !new_members.iter().any(|n| n.same_member(member)))
        .cloned()
        .collect();
    MemberDelta { added, removed }
}

/// Resolve one side of a relationship field into an emitted diff, or
/// nothing if the field is effectively unchanged.
///
/// Returns `None` when:
/// - the absent/empty pairing makes the change an artifact of lazy
///   initialization timing,
/// - the identity-keyed delta is empty,
/// - a member identity cannot be resolved. An unresolved member makes the
///   delta unprovable, and a field reported unchanged is safer than
///   injected false history; this is logged as a warning, not an error.
pub fn reconcile_references(
    entity_type: &str,
    field: &str,
    old_value: &TrackedValue,
    new_value: &TrackedValue,
) -> Option<EntityTrackingFieldData> {
    if collections_equivalent_when_absent(old_value, new_value) {
        return None;
    }

    let old_members = old_value.reference_members();
    let new_members = new_value.reference_members();

    if let Some(unresolved) = old_members
        .iter()
        .chain(new_members.iter())
        .find(|member| !member.is_resolved())
    {
        warn!(
            target: "rustentitytrack",
            "cannot reconcile {}.{}: member '{}' has no resolved identity, treating field as unchanged",
            entity_type, field, unresolved
        );
        return None;
    }

    if member_delta(old_members, new_members).is_empty() {
        return None;
    }

    Some(EntityTrackingFieldData::new(
        field,
        TrackedValue::References(old_members.to_vec()),
        TrackedValue::References(new_members.to_vec()),
    ))
}

/// Value collections have no member identity; they diff as ordered scalar
/// sequences behind the same absent/empty guard.
pub fn reconcile_values(
    field: &str,
    old_value: &TrackedValue,
    new_value: &TrackedValue,
) -> Option<EntityTrackingFieldData> {
    if collections_equivalent_when_absent(old_value, new_value) {
        return None;
    }

    let old_members = scalar_members(old_value);
    let new_members = scalar_members(new_value);
    if old_members == new_members {
        return None;
    }

    Some(EntityTrackingFieldData::new(
        field,
        TrackedValue::Values(old_members.to_vec()),
        TrackedValue::Values(new_members.to_vec()),
    ))
}

fn scalar_members(value: &TrackedValue) -> &[ScalarValue] {
    match value {
        TrackedValue::Values(members) => members,
        _ => &[],
    }
}
