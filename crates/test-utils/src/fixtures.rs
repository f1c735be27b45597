//! Common test fixtures for observation tests.
//!
//! Pre-defined records and metadata representing the scenarios the
//! observations service sees most often.

use std::io::Write;

use observation_protocol::{BatchMetadata, Node, NodeId};
use serde_json::json;
use tempfile::NamedTempFile;

/// Well-known (lat, lon) pairs.
pub mod coords {
    /// Bakersfield, CA
    pub const BAKERSFIELD: (f64, f64) = (35.37, -119.02);

    /// Quick-start location
    pub const CENTRAL_COAST: (f64, f64) = (34.0, -120.0);

    /// Null Island
    pub const ORIGIN: (f64, f64) = (0.0, 0.0);

    /// Latitude out of range
    pub const INVALID: (f64, f64) = (95.0, 10.0);
}

/// A node identifier with only `node_type` set.
pub fn node_id(node_type: &str) -> NodeId {
    NodeId::new()
        .with("node_type", node_type)
        .expect("node_type is a registered field")
}

/// A fully populated administrative-area identifier.
pub fn admin_node_id() -> NodeId {
    NodeId::from_pairs([
        ("000", json!("admin")),
        ("027", json!(6)),
        ("028", json!("Kern County")),
        ("020", json!("gadm")),
    ])
    .expect("all fields are registered")
}

/// A facility node at the central coast fixture location.
pub fn facility_node() -> Node {
    let (lat, lon) = coords::CENTRAL_COAST;
    Node::new(node_id("facility"), lat, lon).expect("fixture node is valid")
}

/// Metadata with every group populated.
pub fn full_metadata() -> BatchMetadata {
    BatchMetadata::builder()
        .username("system")
        .key_id("key-0001")
        .email("ops@example.org")
        .fullname("Field Operations")
        .organization_name("Example Water District")
        .organization_type("government agency")
        .series_name("reservoir-survey-2024")
        .transducer("camera - visible")
        .platform("fixed-wing drone")
        .recognition("perception - human")
        .observed_at("2024-06-01T08:00:00Z")
        .build()
        .expect("fixture metadata is valid")
}

/// Write `contents` to a temporary YAML file that lives as long as the handle.
pub fn temp_yaml(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}
