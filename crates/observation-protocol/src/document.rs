//! Wire document posted to the observations endpoint.
//!
//! ```text
//! {
//!   "contributor": {...},
//!   "source": {...},
//!   "collectionMethod": {...},
//!   "observedAt": "2024-06-01T08:00:00Z",
//!   "nodes": [ ... ]            // or "readings"
//! }
//! ```
//!
//! Unset groups and fields are left out entirely, never sent as null.

use serde::Serialize;

use crate::metadata::CollectionType;
use crate::records::WireItem;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Contributor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
}

impl Contributor {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.key_id.is_none()
            && self.email.is_none()
            && self.fullname.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Source {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_name: Option<String>,
}

impl Source {
    pub fn is_empty(&self) -> bool {
        self.organization_name.is_none()
            && self.organization_type.is_none()
            && self.series_name.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CollectionMethod {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transducer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognition: Option<String>,
}

impl CollectionMethod {
    pub fn is_empty(&self) -> bool {
        self.transducer.is_none() && self.platform.is_none() && self.recognition.is_none()
    }
}

/// A complete observations document.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObservationDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributor: Option<Contributor>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_method: Option<CollectionMethod>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<WireItem>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub readings: Option<Vec<WireItem>>,
}

impl ObservationDocument {
    /// Attach the item list under the key for `collection_type`.
    pub fn with_items(mut self, collection_type: CollectionType, items: Vec<WireItem>) -> Self {
        match collection_type {
            CollectionType::Nodes => self.nodes = Some(items),
            CollectionType::Readings => self.readings = Some(items),
        }
        self
    }

    /// The item list stored under `collection_type`, if any.
    pub fn items(&self, collection_type: CollectionType) -> Option<&[WireItem]> {
        match collection_type {
            CollectionType::Nodes => self.nodes.as_deref(),
            CollectionType::Readings => self.readings.as_deref(),
        }
    }

    /// Number of items across both collections.
    pub fn item_count(&self) -> usize {
        self.nodes.as_ref().map_or(0, Vec::len) + self.readings.as_ref().map_or(0, Vec::len)
    }
}
