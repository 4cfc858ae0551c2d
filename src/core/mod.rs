pub mod error;
pub mod identity;
pub mod value;

pub use error::{Result, TrackError};
pub use identity::{EntityId, EntityKey, EntityRef};
pub use value::{ScalarValue, TrackedValue};
