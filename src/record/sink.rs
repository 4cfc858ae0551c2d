use crate::record::{EntityTrackingData, EntityTrackingFieldData, OperationKind};
use log::{info, warn};

/// Consumer of finished tracking records.
///
/// Invoked synchronously, once per changed entity per unit of work, in the
/// order entities were processed by the flush.
pub trait TrackingSink {
    fn on_entity_tracked(&mut self, data: &EntityTrackingData);
}

/// Sink that keeps every record it sees, split-accessible by operation
/// kind. Handy for assertions and for consumers that post-process a whole
/// unit of work at once.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Vec<EntityTrackingData>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[EntityTrackingData] {
        &self.records
    }

    pub fn inserts(&self) -> Vec<&EntityTrackingData> {
        self.by_operation(OperationKind::Insert)
    }

    pub fn updates(&self) -> Vec<&EntityTrackingData> {
        self.by_operation(OperationKind::Update)
    }

    pub fn deletes(&self) -> Vec<&EntityTrackingData> {
        self.by_operation(OperationKind::Delete)
    }

    fn by_operation(&self, operation: OperationKind) -> Vec<&EntityTrackingData> {
        self.records
            .iter()
            .filter(|r| r.operation() == operation)
            .collect()
    }

    /// First update record carrying the named field, across all entities.
    pub fn updated_field(&self, field: &str) -> Option<&EntityTrackingFieldData> {
        self.updates().into_iter().find_map(|r| r.field(field))
    }

    /// First insert record carrying the named field, across all entities.
    pub fn inserted_field(&self, field: &str) -> Option<&EntityTrackingFieldData> {
        self.inserts().into_iter().find_map(|r| r.field(field))
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl TrackingSink for RecordingSink {
    fn on_entity_tracked(&mut self, data: &EntityTrackingData) {
        self.records.push(data.clone());
    }
}

/// Sink that emits each record as one JSON line through the `log` facade.
#[derive(Debug, Default)]
pub struct JsonLogSink;

impl JsonLogSink {
    pub fn new() -> Self {
        Self
    }
}

impl TrackingSink for JsonLogSink {
    fn on_entity_tracked(&mut self, data: &EntityTrackingData) {
        match serde_json::to_string(data) {
            Ok(line) => info!(target: "rustentitytrack", "{}", line),
            Err(err) => warn!(
                target: "rustentitytrack",
                "failed to serialize tracking record for {}: {}",
                data.entity_id(),
                err
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityId, TrackedValue};

    fn update(n: i64, field: &str) -> EntityTrackingData {
        EntityTrackingData::new(
            EntityId::new("Employee", n),
            OperationKind::Update,
            vec![EntityTrackingFieldData::new(
                field,
                TrackedValue::scalar(0i64),
                TrackedValue::scalar(1i64),
            )],
        )
    }

    #[test]
    fn test_recording_sink_splits_by_operation() {
        let mut sink = RecordingSink::new();
        sink.on_entity_tracked(&update(1, "a"));
        sink.on_entity_tracked(&EntityTrackingData::new(
            EntityId::new("Employee", 2),
            OperationKind::Insert,
            vec![],
        ));

        assert_eq!(sink.updates().len(), 1);
        assert_eq!(sink.inserts().len(), 1);
        assert!(sink.deletes().is_empty());
        assert!(sink.updated_field("a").is_some());
        assert!(sink.updated_field("b").is_none());
    }

    #[test]
    fn test_clear() {
        let mut sink = RecordingSink::new();
        sink.on_entity_tracked(&update(1, "a"));
        sink.clear();
        assert!(sink.records().is_empty());
    }
}
