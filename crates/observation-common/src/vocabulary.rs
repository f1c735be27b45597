//! Controlled vocabularies for batch metadata fields.
//!
//! Some metadata fields only accept a closed set of values. Membership is
//! exact and case-sensitive. Fields without a registered vocabulary accept
//! any string.

use serde_json::Value;

use crate::{ObservationError, ObservationResult};

/// A closed set of allowed values for a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlledVocabulary {
    /// Field the vocabulary applies to.
    pub field: &'static str,
    /// Allowed values, in registry order.
    pub allowed: &'static [&'static str],
}

/// Allowed values for `organization_type`.
pub const ORGANIZATION_TYPE: ControlledVocabulary = ControlledVocabulary {
    field: "organization_type",
    allowed: &[
        "non-profit",
        "company",
        "government agency",
        "individual",
        "other",
    ],
};

/// Allowed values for `transducer`.
pub const TRANSDUCER: ControlledVocabulary = ControlledVocabulary {
    field: "transducer",
    allowed: &[
        "camera - visible",
        "camera - IR",
        "lidar",
        "SAR",
        "microphone",
        "camera - other",
        "EM - other",
        "other",
        "eye",
        "ear",
        "skin",
        "nose",
        "transponder",
    ],
};

/// Allowed values for `recognition`.
pub const RECOGNITION: ControlledVocabulary = ControlledVocabulary {
    field: "recognition",
    allowed: &[
        "deterministic",
        "perception - human",
        "perception - machine",
        "formal process",
    ],
};

/// Every registered vocabulary.
pub const REGISTRY: &[ControlledVocabulary] = &[ORGANIZATION_TYPE, TRANSDUCER, RECOGNITION];

impl ControlledVocabulary {
    /// Look up the vocabulary registered for a field, if any.
    pub fn for_field(field: &str) -> Option<&'static ControlledVocabulary> {
        REGISTRY.iter().find(|v| v.field == field)
    }

    /// Check whether a value is a member of this vocabulary.
    pub fn contains(&self, value: &str) -> bool {
        self.allowed.contains(&value)
    }

    /// Validate a string value for a field.
    ///
    /// `None` means "not set" and is always accepted.
    pub fn validate<'a>(field: &str, value: Option<&'a str>) -> ObservationResult<Option<&'a str>> {
        let Some(value) = value else {
            return Ok(None);
        };

        match Self::for_field(field) {
            Some(vocab) if !vocab.contains(value) => Err(ObservationError::invalid(field, value)),
            _ => Ok(Some(value)),
        }
    }

    /// Validate a loosely typed value, e.g. one read from a manifest.
    ///
    /// Null is "not set". Anything other than a string or null is a type error.
    pub fn validate_value(field: &str, value: &Value) -> ObservationResult<Option<String>> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Self::validate(field, Some(s))?.map(str::to_string)),
            _ => Err(ObservationError::wrong_type(field, "str")),
        }
    }
}
