use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Capture failed for {entity_type}.{field}: {reason}")]
    Capture {
        entity_type: String,
        field: String,
        reason: String,
    },

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Type '{0}' is not registered as trackable")]
    UnknownType(String),

    #[error("Field '{0}' is not tracked on type '{1}'")]
    UnknownField(String, String),

    #[error("Entity of type '{0}' has no resolved identity")]
    UnresolvedIdentity(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Context error: {0}")]
    ContextState(String),
}

pub type Result<T> = std::result::Result<T, TrackError>;

impl TrackError {
    /// Build a capture error for a single field of a single entity.
    pub fn capture(
        entity_type: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Capture {
            entity_type: entity_type.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}
