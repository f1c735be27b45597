//! Error types for the Totality observation client.

use thiserror::Error;

/// Result type alias using ObservationError.
pub type ObservationResult<T> = Result<T, ObservationError>;

/// Broad classes of failure, independent of the concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A value outside its allowed set or range.
    Validation,
    /// A value of the wrong shape for its field.
    Type,
    /// An unknown field name, or a read of a field that was never set.
    Lookup,
    /// A field or operation the service format does not support yet.
    NotImplemented,
    /// The HTTP request could not be completed.
    Transport,
    /// Client configuration could not be loaded.
    Config,
}

/// Primary error type for observation records, batches and the client.
#[derive(Debug, Error)]
pub enum ObservationError {
    // === Assignment-time errors ===
    #[error("{field} {value} is not valid")]
    Validation { field: String, value: String },

    #[error("Attr {field} must be of type {expected}")]
    Type { field: String, expected: &'static str },

    #[error("Field {0} not recognized")]
    UnknownField(String),

    #[error("NodeId component {0} is not set")]
    FieldNotSet(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    // === Batch errors ===
    #[error("Cannot add a {record} record to a {collection} collection")]
    CollectionMismatch {
        record: &'static str,
        collection: &'static str,
    },

    #[error("Record references a collection that has been dropped")]
    DetachedRecord,

    // === Infrastructure errors ===
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ObservationError {
    /// Shorthand for a vocabulary or range violation.
    pub fn invalid(field: impl Into<String>, value: impl ToString) -> Self {
        ObservationError::Validation {
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Shorthand for a field assigned a value of the wrong type.
    pub fn wrong_type(field: impl Into<String>, expected: &'static str) -> Self {
        ObservationError::Type {
            field: field.into(),
            expected,
        }
    }

    /// Get the taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ObservationError::Validation { .. } | ObservationError::CollectionMismatch { .. } => {
                ErrorKind::Validation
            }
            ObservationError::Type { .. } | ObservationError::Serialization(_) => ErrorKind::Type,
            ObservationError::UnknownField(_)
            | ObservationError::FieldNotSet(_)
            | ObservationError::DetachedRecord => ErrorKind::Lookup,
            ObservationError::NotImplemented(_) => ErrorKind::NotImplemented,
            ObservationError::Transport(_) => ErrorKind::Transport,
            ObservationError::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<serde_json::Error> for ObservationError {
    fn from(err: serde_json::Error) -> Self {
        ObservationError::Serialization(format!("JSON error: {}", err))
    }
}
