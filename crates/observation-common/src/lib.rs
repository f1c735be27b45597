//! Common types and utilities shared across the Totality client crates.

pub mod error;
pub mod time;
pub mod vocabulary;

pub use error::{ErrorKind, ObservationError, ObservationResult};
pub use time::{parse_iso8601, ObservedAt};
pub use vocabulary::ControlledVocabulary;
