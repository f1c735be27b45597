//! Record generators for batch-size and flush-policy tests.

use observation_protocol::{Node, NodeId, NodeType};
use serde_json::json;

/// Creates `count` distinct facility nodes spread along a line of latitude.
///
/// Node `i` sits at longitude `-120 + i * 0.01` and carries `catalog_id = i`,
/// so the order of items in a posted document can be checked.
///
/// # Example
///
/// ```
/// use test_utils::generate_nodes;
///
/// let nodes = generate_nodes(3);
/// assert_eq!(nodes.len(), 3);
/// ```
pub fn generate_nodes(count: usize) -> Vec<Node> {
    (0..count)
        .map(|i| {
            let id = NodeId::new()
                .with("node_type", "facility")
                .and_then(|id| id.with("catalog_id", i as u64))
                .expect("registered fields");
            Node::new(id, 35.0, -120.0 + i as f64 * 0.01).expect("coordinates in range")
        })
        .collect()
}

/// Creates one node of every node type.
pub fn one_of_each_node_type() -> Vec<Node> {
    NodeType::ALL
        .iter()
        .map(|t| {
            let id = NodeId::new()
                .with("node_type", t.as_str())
                .and_then(|id| id.with("common_name", json!(format!("{} fixture", t.as_str()))))
                .expect("registered fields");
            Node::new(id, 10.0, 10.0).expect("coordinates in range")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_nodes_are_distinct() {
        let nodes = generate_nodes(20);
        assert_eq!(nodes.len(), 20);
        assert_ne!(nodes[0].node_id(), nodes[1].node_id());
    }

    #[test]
    fn test_one_of_each() {
        let types: Vec<_> = one_of_each_node_type().iter().map(|n| n.node_type()).collect();
        assert_eq!(types, NodeType::ALL.to_vec());
    }
}
