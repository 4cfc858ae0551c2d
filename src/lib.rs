// ============================================================================
// RustEntityTrack Library
// ============================================================================

pub mod core;
pub mod equality;
pub mod meta;
pub mod entity;
pub mod snapshot;
pub mod reconcile;
pub mod record;
pub mod context;

// Re-export main types for convenience
pub use self::core::{
    EntityId, EntityKey, EntityRef, Result, ScalarValue, TrackError, TrackedValue,
};
pub use equality::{collections_equivalent_when_absent, values_equal};
pub use meta::{FieldDescriptor, FieldKind, InverseSide, TrackableRegistry, TrackableType};
pub use entity::{
    AsEntityRef, Trackable, TrackedFieldValue, TrackedKey, TrackedReferences, TrackedScalar,
    TrackedValues, entity_id_of, entity_ref_of,
};
pub use snapshot::{CaptureTimepoint, EntitySnapshot, FieldSnapshot};
pub use reconcile::{MemberDelta, member_delta};
pub use record::{
    EntityTrackingData, EntityTrackingFieldData, JsonLogSink, OperationKind, RecordingSink,
    TrackingRecorder, TrackingSink,
};
pub use context::{ContextState, TrackingContext};

// Re-export derive macro
pub use rustentitytrack_derive::Trackable;

use std::sync::Arc;

// ============================================================================
// High-level Engine API
// ============================================================================

/// Change-tracking engine for a persistence layer.
///
/// Holds the trackable-type registry built once at startup and hands out
/// one [`TrackingContext`] per unit of work. Contexts are independent;
/// concurrent sessions each get their own.
///
/// # Examples
///
/// ```
/// use rustentitytrack::{Trackable, TrackableRegistry, TrackingEngine, RecordingSink};
///
/// #[derive(Trackable)]
/// struct Account {
///     #[tracked(key)]
///     id: Option<i64>,
///     #[tracked]
///     owner: String,
/// }
///
/// # fn main() -> rustentitytrack::Result<()> {
/// let registry = TrackableRegistry::new()
///     .with_type(Account::trackable_type())?
///     .validated()?;
/// let engine = TrackingEngine::new(registry);
///
/// let mut ctx = engine.begin();
/// let account = Account { id: Some(1), owner: "alice".to_string() };
/// ctx.on_before_flush(&[&account])?;
///
/// let mut sink = RecordingSink::new();
/// ctx.commit(&mut sink)?;
/// assert_eq!(sink.inserts().len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct TrackingEngine {
    registry: Arc<TrackableRegistry>,
}

impl TrackingEngine {
    /// Build an engine over a finished registry.
    pub fn new(registry: TrackableRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// The registry this engine consults for tracking metadata.
    pub fn registry(&self) -> &TrackableRegistry {
        &self.registry
    }

    /// Open a tracking context for one unit of work.
    ///
    /// # Examples
    ///
    /// ```
    /// # use rustentitytrack::{FieldDescriptor, TrackableRegistry, TrackableType, TrackingEngine};
    /// # fn main() -> rustentitytrack::Result<()> {
    /// let registry = TrackableRegistry::new().with_type(TrackableType::new(
    ///     "Account",
    ///     vec![FieldDescriptor::scalar("owner")],
    /// ))?;
    /// let engine = TrackingEngine::new(registry);
    ///
    /// let ctx = engine.begin();
    /// assert!(ctx.state().is_active());
    /// # Ok(())
    /// # }
    /// ```
    pub fn begin(&self) -> TrackingContext {
        TrackingContext::new(self.registry.clone())
    }
}
