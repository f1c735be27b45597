//! YAML manifest of nodes to submit.
//!
//! ```yaml
//! metadata:
//!   username: system
//!   organization_type: company
//! nodes:
//!   - node_id: { node_type: facility, common_name: Pump House 3 }
//!     lat: 34.0
//!     lon: -120.0
//!     observed_at: 2024-06-01T08:00:00Z
//!     data: { capacity_m3: 1200 }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

use totality_client::{BatchMetadata, Node, NodeId, ObservationResult, Record};

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Batch metadata fields by name
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeEntry {
    /// Identifier fields keyed by code or name
    pub node_id: Map<String, Value>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub observed_at: Option<String>,
    #[serde(default)]
    pub shape: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Build validated batch metadata from the `metadata` section.
    pub fn batch_metadata(&self) -> ObservationResult<BatchMetadata> {
        self.metadata
            .iter()
            .try_fold(BatchMetadata::builder(), |builder, (field, value)| {
                builder.set(field, value)
            })?
            .build()
    }

    /// Build every node, stopping at the first invalid entry.
    pub fn build_nodes(&self) -> Result<Vec<Node>> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, entry)| entry.to_node().with_context(|| format!("nodes[{}]", i)))
            .collect()
    }
}

impl NodeEntry {
    pub fn to_node(&self) -> ObservationResult<Node> {
        let node_id = NodeId::from_pairs(self.node_id.iter().map(|(k, v)| (k, v.clone())))?;
        let mut node = Node::new(node_id, self.lat, self.lon)?;

        if let Some(observed_at) = &self.observed_at {
            node.base_mut().set_observed_at(observed_at.as_str())?;
        }
        if let Some(shape) = &self.shape {
            node.set_shape_value(shape.clone())?;
        }
        if let Some(data) = &self.data {
            node.set_data_value(data.clone())?;
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::temp_yaml;
    use totality_client::{ErrorKind, NodeType};

    const MANIFEST: &str = r#"
metadata:
  username: system
  organization_type: company
  transducer: camera - visible
nodes:
  - node_id: { node_type: facility, "035": Pump House 3 }
    lat: 34.0
    lon: -120.0
    observed_at: 2024-06-01T08:00:00Z
    data: { capacity_m3: 1200 }
  - node_id: { node_type: admin, admin_level: 2 }
    lat: 35.4
    lon: -119.0
    shape:
      type: Feature
      geometry: { type: Point, coordinates: [-119.0, 35.4] }
      properties: {}
"#;

    #[test]
    fn test_load_manifest() {
        let file = temp_yaml(MANIFEST);
        let manifest = Manifest::load(file.path()).unwrap();

        let metadata = manifest.batch_metadata().unwrap();
        assert_eq!(metadata.organization_type(), Some("company"));

        let nodes = manifest.build_nodes().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].node_type(), NodeType::Facility);
        assert!(nodes[0].base().observed_at().is_some());
        assert!(nodes[0].data().is_some());
        assert_eq!(nodes[1].node_type(), NodeType::Admin);
        assert!(nodes[1].shape().is_some());
    }

    #[test]
    fn test_invalid_vocabulary_is_rejected() {
        let manifest = Manifest::parse("metadata:\n  organization_type: pirate\n").unwrap();
        let err = manifest.batch_metadata().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_unknown_metadata_field_is_rejected() {
        let manifest = Manifest::parse("metadata:\n  colour: blue\n").unwrap();
        assert_eq!(manifest.batch_metadata().unwrap_err().kind(), ErrorKind::Lookup);
    }

    #[test]
    fn test_bad_node_reports_index() {
        let manifest = Manifest::parse(
            "nodes:\n  - node_id: { node_type: facility }\n    lat: 1\n    lon: 1\n  - node_id: { node_type: spaceship }\n    lat: 1\n    lon: 1\n",
        )
        .unwrap();
        let err = manifest.build_nodes().unwrap_err();
        assert!(format!("{:#}", err).contains("nodes[1]"));
    }
}
