// ============================================================================
// Tracking Context (Unit of Work)
// ============================================================================
//
// One context per unit of work: it owns the baselines captured on load, the
// recorder accumulating this unit of work's records, and the lifecycle
// state. The surrounding persistence runtime serializes lifecycle callbacks
// for one logical transaction, so the context needs no internal locking;
// concurrent sessions use independent contexts sharing the registry behind
// an Arc.
//
// State transitions:
// ```text
// Active ──commit──> Committed
//   │
//   └──rollback──> RolledBack
// ```
//
// ============================================================================

use crate::core::{EntityId, Result, TrackError, TrackedValue};
use crate::entity::{Trackable, entity_id_of};
use crate::equality::{collections_equivalent_when_absent, values_equal};
use crate::meta::{FieldKind, TrackableRegistry};
use crate::record::{
    EntityTrackingFieldData, TrackingRecorder, TrackingSink,
};
use crate::reconcile::{reconcile_references, reconcile_values};
use crate::snapshot::{CaptureTimepoint, EntitySnapshot, capture};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Lifecycle state of a tracking context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Context accepts lifecycle hooks.
    Active,

    /// Records were delivered to the sink; the unit of work is over.
    Committed,

    /// The unit of work was aborted; nothing reached the sink.
    RolledBack,
}

impl ContextState {
    pub fn is_active(&self) -> bool {
        matches!(self, ContextState::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ContextState::Committed | ContextState::RolledBack)
    }
}

impl std::fmt::Display for ContextState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextState::Active => write!(f, "ACTIVE"),
            ContextState::Committed => write!(f, "COMMITTED"),
            ContextState::RolledBack => write!(f, "ROLLED_BACK"),
        }
    }
}

/// Change-tracking scope for one unit of work.
///
/// The persistence runtime drives it through three hooks: entities are
/// baselined when loaded, diffed when flushed, and marked deleted when
/// removed. `commit` hands the finished records to the sink; `rollback`
/// discards everything.
pub struct TrackingContext {
    registry: Arc<TrackableRegistry>,
    state: ContextState,

    /// Baseline snapshots, advanced after every flush so repeated flushes
    /// of an unchanged entity emit nothing.
    baselines: HashMap<EntityId, EntitySnapshot>,

    recorder: TrackingRecorder,

    /// Start time for diagnostics
    started_at: std::time::Instant,
}

impl TrackingContext {
    pub fn new(registry: Arc<TrackableRegistry>) -> Self {
        Self {
            registry,
            state: ContextState::Active,
            baselines: HashMap::new(),
            recorder: TrackingRecorder::new(),
            started_at: std::time::Instant::now(),
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Number of records accumulated so far in this unit of work.
    pub fn pending_records(&self) -> usize {
        self.recorder.len()
    }

    /// Time since the unit of work began.
    pub fn duration(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    fn ensure_active(&self, operation: &str) -> Result<()> {
        if !self.state.is_active() {
            return Err(TrackError::ContextState(format!(
                "cannot {}: tracking context is {}",
                operation, self.state
            )));
        }
        Ok(())
    }

    /// Baseline capture, invoked right after the persistence runtime
    /// populates the entity from storage. Untracked types are ignored.
    pub fn on_entity_loaded(&mut self, entity: &dyn Trackable) -> Result<()> {
        self.ensure_active("capture baseline")?;

        let Some(meta) = self.registry.get(entity.entity_type()) else {
            return Ok(());
        };
        let snapshot = capture(entity, meta, CaptureTimepoint::OnLoad)?;
        debug!(
            target: "rustentitytrack",
            "baseline captured for {}",
            snapshot.entity_id()
        );
        self.baselines.insert(snapshot.entity_id().clone(), snapshot);
        Ok(())
    }

    /// Re-snapshot and diff every entity the runtime is about to write.
    ///
    /// Entities without a baseline are inserts: every tracked field is
    /// recorded with an absent old value. Entities with a baseline are
    /// diffed field by field under the equality policy, collection fields
    /// through the reconciler. After diffing, the flush snapshot becomes
    /// the entity's new baseline.
    pub fn on_before_flush(&mut self, entities: &[&dyn Trackable]) -> Result<()> {
        self.ensure_active("diff changed entities")?;

        for entity in entities {
            let Some(meta) = self.registry.get(entity.entity_type()) else {
                continue;
            };
            let current = capture(*entity, meta, CaptureTimepoint::OnFlush)?;
            let entity_id = current.entity_id().clone();

            match self.baselines.get(&entity_id) {
                None => {
                    let fields = insert_fields(&current);
                    debug!(
                        target: "rustentitytrack",
                        "insert detected for {} ({} fields)",
                        entity_id,
                        fields.len()
                    );
                    self.recorder.record_insert(entity_id.clone(), fields);
                }
                Some(baseline) => {
                    let changed = diff_fields(self.registry.as_ref(), baseline, &current)?;
                    if !changed.is_empty() {
                        debug!(
                            target: "rustentitytrack",
                            "update detected for {} ({} fields)",
                            entity_id,
                            changed.len()
                        );
                        self.recorder.record_update(entity_id.clone(), changed);
                    }
                }
            }

            self.baselines.insert(entity_id, current);
        }
        Ok(())
    }

    /// Record the removal of an entity. Its baseline is dropped; the delete
    /// record carries identity only.
    pub fn on_entity_removed(&mut self, entity: &dyn Trackable) -> Result<()> {
        self.ensure_active("record removal")?;

        if !self.registry.is_tracked(entity.entity_type()) {
            return Ok(());
        }
        let entity_id = entity_id_of(entity)
            .ok_or_else(|| TrackError::UnresolvedIdentity(entity.entity_type().to_string()))?;
        self.baselines.remove(&entity_id);
        self.recorder.record_delete(entity_id);
        Ok(())
    }

    /// Deliver the unit of work's records to the sink, in flush order, and
    /// close the context.
    pub fn commit(&mut self, sink: &mut dyn TrackingSink) -> Result<()> {
        self.ensure_active("commit")?;

        let records = self.recorder.drain();
        debug!(
            target: "rustentitytrack",
            "committing unit of work: {} records after {:?}",
            records.len(),
            self.duration()
        );
        for record in &records {
            sink.on_entity_tracked(record);
        }
        self.baselines.clear();
        self.state = ContextState::Committed;
        Ok(())
    }

    /// Abort the unit of work: all snapshots and partial records are
    /// discarded, nothing reaches the sink.
    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_active("rollback")?;

        self.recorder.discard();
        self.baselines.clear();
        self.state = ContextState::RolledBack;
        Ok(())
    }
}

/// Insert records carry every tracked field with an absent old value.
/// Fields that are themselves absent, or empty collections carrying no
/// information, are skipped: nothing changed against "no prior value".
fn insert_fields(current: &EntitySnapshot) -> Vec<EntityTrackingFieldData> {
    current
        .fields()
        .iter()
        .filter(|snap| {
            !values_equal(&TrackedValue::Absent, snap.value())
                && !collections_equivalent_when_absent(&TrackedValue::Absent, snap.value())
        })
        .map(|snap| {
            EntityTrackingFieldData::new(snap.field(), TrackedValue::Absent, snap.value().clone())
        })
        .collect()
}

fn diff_fields(
    registry: &TrackableRegistry,
    baseline: &EntitySnapshot,
    current: &EntitySnapshot,
) -> Result<Vec<EntityTrackingFieldData>> {
    let entity_type = current.entity_id().entity_type();
    let mut changed = Vec::new();

    for snap in current.fields() {
        let field = snap.field();
        let old_value = baseline
            .field_value(field)
            .unwrap_or(&TrackedValue::Absent);
        let new_value = snap.value();

        let kind = registry.field_kind(entity_type, field)?;
        let data = match kind {
            FieldKind::ReferenceCollection => {
                reconcile_references(entity_type, field, old_value, new_value)
            }
            FieldKind::ValueCollection => reconcile_values(field, old_value, new_value),
            _ => {
                if values_equal(old_value, new_value) {
                    None
                } else {
                    Some(EntityTrackingFieldData::new(
                        field,
                        old_value.clone(),
                        new_value.clone(),
                    ))
                }
            }
        };
        if let Some(data) = data {
            changed.push(data);
        }
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EntityKey;
    use crate::meta::{FieldDescriptor, TrackableType};
    use crate::record::RecordingSink;

    struct Account {
        id: i64,
        owner: String,
        balance: i64,
    }

    impl Trackable for Account {
        fn entity_type(&self) -> &'static str {
            "Account"
        }

        fn entity_key(&self) -> Option<EntityKey> {
            Some(EntityKey::Int(self.id))
        }

        fn field_value(&self, field: &str) -> Result<TrackedValue> {
            match field {
                "owner" => Ok(TrackedValue::scalar(self.owner.clone())),
                "balance" => Ok(TrackedValue::scalar(self.balance)),
                _ => Err(TrackError::UnknownField(field.into(), "Account".into())),
            }
        }
    }

    fn registry() -> Arc<TrackableRegistry> {
        Arc::new(
            TrackableRegistry::new()
                .with_type(TrackableType::new(
                    "Account",
                    vec![
                        FieldDescriptor::scalar("owner"),
                        FieldDescriptor::scalar("balance"),
                    ],
                ))
                .unwrap(),
        )
    }

    #[test]
    fn test_load_then_unchanged_flush_emits_nothing() {
        let mut ctx = TrackingContext::new(registry());
        let account = Account {
            id: 1,
            owner: "alice".into(),
            balance: 10,
        };
        ctx.on_entity_loaded(&account).unwrap();
        ctx.on_before_flush(&[&account]).unwrap();
        ctx.on_before_flush(&[&account]).unwrap();

        let mut sink = RecordingSink::new();
        ctx.commit(&mut sink).unwrap();
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_update_emits_changed_fields_only() {
        let mut ctx = TrackingContext::new(registry());
        let mut account = Account {
            id: 1,
            owner: "alice".into(),
            balance: 10,
        };
        ctx.on_entity_loaded(&account).unwrap();
        account.balance = 25;
        ctx.on_before_flush(&[&account]).unwrap();

        let mut sink = RecordingSink::new();
        ctx.commit(&mut sink).unwrap();

        let updates = sink.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].fields().len(), 1);
        let field = updates[0].field("balance").unwrap();
        assert_eq!(field.old_value(), &TrackedValue::scalar(10i64));
        assert_eq!(field.new_value(), &TrackedValue::scalar(25i64));
    }

    #[test]
    fn test_insert_has_absent_old_values() {
        let mut ctx = TrackingContext::new(registry());
        let account = Account {
            id: 1,
            owner: "alice".into(),
            balance: 10,
        };
        ctx.on_before_flush(&[&account]).unwrap();

        let mut sink = RecordingSink::new();
        ctx.commit(&mut sink).unwrap();

        let inserts = sink.inserts();
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].operation(), crate::record::OperationKind::Insert);
        for field in inserts[0].fields() {
            assert_eq!(field.old_value(), &TrackedValue::Absent);
        }
    }

    #[test]
    fn test_untracked_type_is_ignored() {
        struct Unknown;
        impl Trackable for Unknown {
            fn entity_type(&self) -> &'static str {
                "Unknown"
            }
            fn entity_key(&self) -> Option<EntityKey> {
                Some(EntityKey::Int(1))
            }
            fn field_value(&self, field: &str) -> Result<TrackedValue> {
                Err(TrackError::UnknownField(field.into(), "Unknown".into()))
            }
        }

        let mut ctx = TrackingContext::new(registry());
        ctx.on_entity_loaded(&Unknown).unwrap();
        ctx.on_before_flush(&[&Unknown]).unwrap();

        let mut sink = RecordingSink::new();
        ctx.commit(&mut sink).unwrap();
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_rollback_discards_everything() {
        let mut ctx = TrackingContext::new(registry());
        let account = Account {
            id: 1,
            owner: "alice".into(),
            balance: 10,
        };
        ctx.on_before_flush(&[&account]).unwrap();
        assert_eq!(ctx.pending_records(), 1);

        ctx.rollback().unwrap();
        assert_eq!(ctx.state(), ContextState::RolledBack);
        assert_eq!(ctx.pending_records(), 0);
        assert!(ctx.on_before_flush(&[&account]).is_err());
    }

    #[test]
    fn test_cannot_commit_twice() {
        let mut ctx = TrackingContext::new(registry());
        let mut sink = RecordingSink::new();
        ctx.commit(&mut sink).unwrap();
        assert!(ctx.commit(&mut sink).is_err());
        assert!(ctx.state().is_terminal());
    }

    #[test]
    fn test_remove_emits_identity_only_delete() {
        let mut ctx = TrackingContext::new(registry());
        let account = Account {
            id: 9,
            owner: "bob".into(),
            balance: 0,
        };
        ctx.on_entity_loaded(&account).unwrap();
        ctx.on_entity_removed(&account).unwrap();

        let mut sink = RecordingSink::new();
        ctx.commit(&mut sink).unwrap();

        let deletes = sink.deletes();
        assert_eq!(deletes.len(), 1);
        assert!(deletes[0].fields().is_empty());
        assert_eq!(deletes[0].entity_id(), &EntityId::new("Account", 9i64));
    }
}
