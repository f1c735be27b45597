//! Totality observation protocol types.
//!
//! This crate defines the records a client submits to the Totality
//! observations service and the JSON document they are posted in:
//!
//! - [`NodeId`] - composite node identifiers keyed by registry code
//! - [`Node`] / [`Reading`] - observation records, unified as [`Observation`]
//! - [`BatchMetadata`] - contributor, source and collection method details
//! - [`ObservationDocument`] - the posted body
//!
//! # Example
//!
//! ```rust
//! use observation_protocol::{Node, NodeId, Record};
//!
//! let id = NodeId::new().with("node_type", "facility").unwrap();
//! let node = Node::new(id, 34.0, -120.0).unwrap();
//! let doc = node.to_doc().unwrap();
//! assert_eq!(doc.nodes.map(|n| n.len()), Some(1));
//! ```

pub mod document;
pub mod geojson;
pub mod metadata;
pub mod node_id;
pub mod records;

// Re-export commonly used types
pub use document::{CollectionMethod, Contributor, ObservationDocument, Source};
pub use geojson::{Feature, Geometry, Location, Shape};
pub use metadata::{BatchMetadata, BatchMetadataBuilder, CollectionType};
pub use node_id::{NodeId, NodeIdField};
pub use records::{
    Node, NodeItem, NodeType, Observation, Reading, ReadingValue, Record, RecordBase, WireItem,
};

pub use observation_common::{ErrorKind, ObservationError, ObservationResult, ObservedAt};

/// Media types used in requests.
pub mod media_types {
    /// JSON media type
    pub const JSON: &str = "application/json";
}
