// ============================================================================
// Tracking Records
// ============================================================================
//
// Finished output of the engine: per-entity records of what changed in one
// unit of work, delivered to a caller-supplied sink.
//
// ============================================================================

pub mod data;
pub mod recorder;
pub mod sink;

pub use data::{EntityTrackingData, EntityTrackingFieldData, OperationKind};
pub use recorder::TrackingRecorder;
pub use sink::{JsonLogSink, RecordingSink, TrackingSink};
