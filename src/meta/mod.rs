pub mod field;
pub mod registry;

pub use field::{FieldDescriptor, FieldKind, InverseSide};
pub use registry::{TrackableRegistry, TrackableType};
