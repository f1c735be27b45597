//! Batch-level metadata: who contributed the observations, where they come
//! from and how they were collected.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use observation_common::{ControlledVocabulary, ObservationError, ObservationResult, ObservedAt};

use crate::document::{CollectionMethod, Contributor, ObservationDocument, Source};

/// Which kind of records a collection carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    Nodes,
    Readings,
}

impl CollectionType {
    /// Wire name, also used as the endpoint path segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionType::Nodes => "nodes",
            CollectionType::Readings => "readings",
        }
    }
}

impl FromStr for CollectionType {
    type Err = ObservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nodes" => Ok(CollectionType::Nodes),
            "readings" => Ok(CollectionType::Readings),
            other => Err(ObservationError::invalid("collection_type", other)),
        }
    }
}

impl std::fmt::Display for CollectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated, immutable metadata shared by every record in a batch.
///
/// Fields are only reachable through getters; the builder is the one way to
/// produce a value, so out-of-vocabulary metadata never reaches a batch.
///
/// ```compile_fail
/// use observation_protocol::BatchMetadata;
///
/// let meta = BatchMetadata {
///     transducer: Some("radar".to_string()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchMetadata {
    // contributor
    username: Option<String>,
    key_id: Option<String>,
    email: Option<String>,
    fullname: Option<String>,
    contributor_metadata: Option<Map<String, Value>>,

    // source
    organization_name: Option<String>,
    organization_type: Option<String>,
    series_name: Option<String>,

    // collectionMethod
    transducer: Option<String>,
    platform: Option<String>,
    recognition: Option<String>,

    observed_at: Option<ObservedAt>,
}

macro_rules! string_getters {
    ($($field:ident),* $(,)?) => {
        $(
            pub fn $field(&self) -> Option<&str> {
                self.$field.as_deref()
            }
        )*
    };
}

/// A truthy string: set and non-empty.
fn truthy(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

impl BatchMetadata {
    pub fn builder() -> BatchMetadataBuilder {
        BatchMetadataBuilder::default()
    }

    string_getters!(
        username,
        key_id,
        email,
        fullname,
        organization_name,
        organization_type,
        series_name,
        transducer,
        platform,
        recognition,
    );

    /// Free-form contributor details. Kept, never serialized.
    pub fn contributor_metadata(&self) -> Option<&Map<String, Value>> {
        self.contributor_metadata.as_ref()
    }

    pub fn observed_at(&self) -> Option<&ObservedAt> {
        self.observed_at.as_ref()
    }

    /// Check every vocabulary-controlled field.
    pub fn validate(&self) -> ObservationResult<()> {
        ControlledVocabulary::validate("organization_type", self.organization_type())?;
        ControlledVocabulary::validate("transducer", self.transducer())?;
        ControlledVocabulary::validate("recognition", self.recognition())?;
        Ok(())
    }

    /// The contributor group, if any of its fields is truthy.
    pub fn contributor(&self) -> Option<Contributor> {
        let group = Contributor {
            username: truthy(&self.username),
            key_id: truthy(&self.key_id),
            email: truthy(&self.email),
            fullname: truthy(&self.fullname),
        };
        (!group.is_empty()).then_some(group)
    }

    /// The source group, if any of its fields is truthy.
    pub fn source(&self) -> Option<Source> {
        let group = Source {
            organization_name: truthy(&self.organization_name),
            organization_type: truthy(&self.organization_type),
            series_name: truthy(&self.series_name),
        };
        (!group.is_empty()).then_some(group)
    }

    /// The collection method group, if any of its fields is truthy.
    pub fn collection_method(&self) -> Option<CollectionMethod> {
        let group = CollectionMethod {
            transducer: truthy(&self.transducer),
            platform: truthy(&self.platform),
            recognition: truthy(&self.recognition),
        };
        (!group.is_empty()).then_some(group)
    }

    /// Assemble the batch-level part of a wire document.
    pub fn to_doc(&self) -> ObservationDocument {
        ObservationDocument {
            contributor: self.contributor(),
            source: self.source(),
            collection_method: self.collection_method(),
            observed_at: self.observed_at.as_ref().map(ObservedAt::to_wire_string),
            ..Default::default()
        }
    }
}

/// Builder for [`BatchMetadata`]. Vocabulary checks run in [`build`].
///
/// [`build`]: BatchMetadataBuilder::build
#[derive(Debug, Clone, Default)]
pub struct BatchMetadataBuilder {
    inner: BatchMetadata,
}

macro_rules! string_setters {
    ($($field:ident),* $(,)?) => {
        $(
            pub fn $field(mut self, value: impl Into<String>) -> Self {
                self.inner.$field = Some(value.into());
                self
            }
        )*
    };
}

impl BatchMetadataBuilder {
    string_setters!(
        username,
        key_id,
        email,
        fullname,
        organization_name,
        organization_type,
        series_name,
        transducer,
        platform,
        recognition,
    );

    pub fn contributor_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.inner.contributor_metadata = Some(metadata);
        self
    }

    /// Set when the batch was observed. Unparsable strings are kept raw.
    pub fn observed_at(mut self, observed_at: impl Into<ObservedAt>) -> Self {
        self.inner.observed_at = Some(observed_at.into());
        self
    }

    /// Set a field by name from a loosely typed value.
    ///
    /// Null leaves the field unset. String fields reject non-strings with a
    /// type error; unknown names are a lookup error.
    pub fn set(mut self, field: &str, value: &Value) -> ObservationResult<Self> {
        let slot = match field {
            "username" => &mut self.inner.username,
            "key_id" => &mut self.inner.key_id,
            "email" => &mut self.inner.email,
            "fullname" => &mut self.inner.fullname,
            "organization_name" => &mut self.inner.organization_name,
            "organization_type" => &mut self.inner.organization_type,
            "series_name" => &mut self.inner.series_name,
            "transducer" => &mut self.inner.transducer,
            "platform" => &mut self.inner.platform,
            "recognition" => &mut self.inner.recognition,
            "contributor_metadata" => {
                match value {
                    Value::Null => {}
                    Value::Object(map) => self.inner.contributor_metadata = Some(map.clone()),
                    _ => return Err(ObservationError::wrong_type(field, "dict")),
                }
                return Ok(self);
            }
            "observed_at" => {
                match value {
                    Value::Null => {}
                    Value::String(s) => self.inner.observed_at = Some(ObservedAt::lenient(s.as_str())),
                    _ => return Err(ObservationError::wrong_type(field, "str or datetime")),
                }
                return Ok(self);
            }
            other => return Err(ObservationError::UnknownField(other.to_string())),
        };

        if let Some(s) = ControlledVocabulary::validate_value(field, value)? {
            *slot = Some(s);
        }
        Ok(self)
    }

    /// Validate every vocabulary-controlled field and produce the metadata.
    pub fn build(self) -> ObservationResult<BatchMetadata> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}
