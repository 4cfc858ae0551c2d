use crate::core::EntityId;
use crate::record::{EntityTrackingData, EntityTrackingFieldData, OperationKind};
use std::collections::HashMap;

/// Accumulates per-field diffs into one record per entity for the current
/// unit of work, preserving flush-processing order.
///
/// Repeated flushes inside one unit of work merge into the entity's
/// existing record: the first-observed old value is kept, the newest new
/// value wins, and the Insert kind is sticky for entities that entered
/// this unit of work as new.
#[derive(Debug, Default)]
pub struct TrackingRecorder {
    records: Vec<EntityTrackingData>,
    by_entity: HashMap<EntityId, usize>,
}

impl TrackingRecorder {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            by_entity: HashMap::new(),
        }
    }

    pub fn record_insert(&mut self, entity_id: EntityId, fields: Vec<EntityTrackingFieldData>) {
        self.merge(entity_id, OperationKind::Insert, fields);
    }

    pub fn record_update(&mut self, entity_id: EntityId, fields: Vec<EntityTrackingFieldData>) {
        self.merge(entity_id, OperationKind::Update, fields);
    }

    /// Delete supersedes whatever was recorded for the entity so far;
    /// the record keeps its original position in flush order.
    pub fn record_delete(&mut self, entity_id: EntityId) {
        if let Some(&index) = self.by_entity.get(&entity_id) {
            let record = &mut self.records[index];
            *record.operation_mut() = OperationKind::Delete;
            record.fields_mut().clear();
        } else {
            self.push(EntityTrackingData::new(
                entity_id,
                OperationKind::Delete,
                Vec::new(),
            ));
        }
    }

    fn merge(
        &mut self,
        entity_id: EntityId,
        operation: OperationKind,
        fields: Vec<EntityTrackingFieldData>,
    ) {
        let Some(&index) = self.by_entity.get(&entity_id) else {
            self.push(EntityTrackingData::new(entity_id, operation, fields));
            return;
        };

        let record = &mut self.records[index];
        // Insert stays Insert when the same entity is flushed again with
        // further changes in the same unit of work.
        if record.operation() == OperationKind::Delete {
            *record.operation_mut() = operation;
        }
        for field in fields {
            let existing = record
                .fields()
                .iter()
                .position(|e| e.field() == field.field());
            match existing {
                Some(index) => {
                    record.fields_mut()[index].replace_new_value(field.new_value().clone());
                }
                None => record.fields_mut().push(field),
            }
        }
    }

    fn push(&mut self, record: EntityTrackingData) {
        self.by_entity
            .insert(record.entity_id().clone(), self.records.len());
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hand out all records in flush order, leaving the recorder empty.
    pub fn drain(&mut self) -> Vec<EntityTrackingData> {
        self.by_entity.clear();
        std::mem::take(&mut self.records)
    }

    pub fn discard(&mut self) {
        self.by_entity.clear();
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TrackedValue;

    fn id(n: i64) -> EntityId {
        EntityId::new("Employee", n)
    }

    fn field(name: &str, old: i64, new: i64) -> EntityTrackingFieldData {
        EntityTrackingFieldData::new(name, TrackedValue::scalar(old), TrackedValue::scalar(new))
    }

    #[test]
    fn test_flush_order_is_preserved() {
        let mut recorder = TrackingRecorder::new();
        recorder.record_update(id(2), vec![field("a", 0, 1)]);
        recorder.record_insert(id(1), vec![]);

        let records = recorder.drain();
        assert_eq!(records[0].entity_id(), &id(2));
        assert_eq!(records[1].entity_id(), &id(1));
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_repeated_update_merges_keeping_first_old_value() {
        let mut recorder = TrackingRecorder::new();
        recorder.record_update(id(1), vec![field("a", 0, 1)]);
        recorder.record_update(id(1), vec![field("a", 1, 2), field("b", 5, 6)]);

        let records = recorder.drain();
        assert_eq!(records.len(), 1);
        let a = records[0].field("a").unwrap();
        assert_eq!(a.old_value(), &TrackedValue::scalar(0i64));
        assert_eq!(a.new_value(), &TrackedValue::scalar(2i64));
        assert!(records[0].field("b").is_some());
    }

    #[test]
    fn test_insert_kind_is_sticky() {
        let mut recorder = TrackingRecorder::new();
        recorder.record_insert(id(1), vec![field("a", 0, 1)]);
        recorder.record_update(id(1), vec![field("a", 1, 2)]);

        let records = recorder.drain();
        assert_eq!(records[0].operation(), OperationKind::Insert);
    }

    #[test]
    fn test_delete_supersedes() {
        let mut recorder = TrackingRecorder::new();
        recorder.record_update(id(1), vec![field("a", 0, 1)]);
        recorder.record_delete(id(1));

        let records = recorder.drain();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].operation(), OperationKind::Delete);
        assert!(records[0].fields().is_empty());
    }
}
