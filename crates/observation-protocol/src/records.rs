//! Observation records: nodes and readings.
//!
//! Every record carries a location, an optional observation time and a weak
//! reference to the metadata of the batch it belongs to. Each variant knows
//! how to render itself as a wire item; setters validate on assignment so a
//! record is never half-valid.

use std::str::FromStr;
use std::sync::{Arc, Weak};

use serde::Serialize;
use serde_json::{Map, Value};

use observation_common::{ObservationError, ObservationResult, ObservedAt};

use crate::document::ObservationDocument;
use crate::geojson::{Location, Shape};
use crate::metadata::{BatchMetadata, CollectionType};
use crate::node_id::NodeId;

/// Allowed node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Facility,
    Admin,
    Resource,
    Reservoir,
    Process,
}

impl NodeType {
    pub const ALL: [NodeType; 5] = [
        NodeType::Facility,
        NodeType::Admin,
        NodeType::Resource,
        NodeType::Reservoir,
        NodeType::Process,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Facility => "facility",
            NodeType::Admin => "admin",
            NodeType::Resource => "resource",
            NodeType::Reservoir => "reservoir",
            NodeType::Process => "process",
        }
    }

    /// Interpret the `node_type` slot of a node identifier.
    fn from_value(value: &Value) -> ObservationResult<Self> {
        match value {
            Value::String(s) => s.parse(),
            _ => Err(ObservationError::wrong_type("node_type", "str")),
        }
    }
}

impl FromStr for NodeType {
    type Err = ObservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ObservationError::invalid("node_type", s))
    }
}

/// Fields every record shares.
#[derive(Debug, Clone)]
pub struct RecordBase {
    location: Location,
    observed_at: Option<ObservedAt>,
    collection: Option<Weak<BatchMetadata>>,
}

impl RecordBase {
    fn new(lat: f64, lon: f64) -> ObservationResult<Self> {
        Ok(Self {
            location: Location::new(lat, lon)?,
            observed_at: None,
            collection: None,
        })
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn observed_at(&self) -> Option<&ObservedAt> {
        self.observed_at.as_ref()
    }

    pub fn set_location(&mut self, lat: f64, lon: f64) -> ObservationResult<()> {
        self.location = Location::new(lat, lon)?;
        Ok(())
    }

    /// Set the observation time. Strings must be valid ISO 8601.
    pub fn set_observed_at(&mut self, observed_at: impl Into<ObservedAt>) -> ObservationResult<()> {
        match observed_at.into() {
            ObservedAt::Raw(s) => Err(ObservationError::invalid("observed_at", s)),
            parsed => {
                self.observed_at = Some(parsed);
                Ok(())
            }
        }
    }

    pub fn clear_observed_at(&mut self) {
        self.observed_at = None;
    }

    /// Point this record at the metadata of the batch that holds it.
    pub fn attach(&mut self, metadata: &Arc<BatchMetadata>) {
        self.collection = Some(Arc::downgrade(metadata));
    }

    pub fn is_attached(&self) -> bool {
        self.collection.is_some()
    }

    /// Batch-level document for this record.
    ///
    /// Unattached records get an empty document; records whose batch has
    /// since been dropped are an error.
    fn collection_doc(&self) -> ObservationResult<ObservationDocument> {
        match &self.collection {
            None => Ok(ObservationDocument::default()),
            Some(weak) => weak
                .upgrade()
                .map(|meta| meta.to_doc())
                .ok_or(ObservationError::DetachedRecord),
        }
    }
}

/// Behavior shared by every observation record.
pub trait Record {
    /// Shared record fields.
    fn base(&self) -> &RecordBase;

    fn base_mut(&mut self) -> &mut RecordBase;

    /// Collection this kind of record belongs in.
    fn collection_type(&self) -> CollectionType;

    /// Render as a wire item.
    fn to_item(&self) -> ObservationResult<WireItem>;

    /// Render a one-record document with the batch metadata merged in.
    fn to_doc(&self) -> ObservationResult<ObservationDocument> {
        let doc = self.base().collection_doc()?;
        Ok(doc.with_items(self.collection_type(), vec![self.to_item()?]))
    }
}

/// Wire form of a node.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeItem {
    pub location: Location,
    pub node_type: NodeType,
    pub node_id: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<ObservedAt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<Shape>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

/// A rendered record, ready to be placed in a document.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum WireItem {
    Node(NodeItem),
}

/// A place or thing being observed.
#[derive(Debug, Clone)]
pub struct Node {
    base: RecordBase,
    node_type: NodeType,
    node_id: NodeId,
    shape: Option<Shape>,
    data: Option<Map<String, Value>>,
}

impl Node {
    /// Create a node. Its type is taken from the identifier's `node_type`.
    pub fn new(node_id: NodeId, lat: f64, lon: f64) -> ObservationResult<Self> {
        let node_type = NodeType::from_value(node_id.node_type()?)?;
        Ok(Self {
            base: RecordBase::new(lat, lon)?,
            node_type,
            node_id,
            shape: None,
            data: None,
        })
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    pub fn data(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref()
    }

    pub fn set_node_type(&mut self, node_type: &str) -> ObservationResult<()> {
        self.node_type = node_type.parse()?;
        Ok(())
    }

    /// Replace the identifier, re-deriving the node type from it.
    pub fn set_node_id(&mut self, node_id: NodeId) -> ObservationResult<()> {
        self.node_type = NodeType::from_value(node_id.node_type()?)?;
        self.node_id = node_id;
        Ok(())
    }

    pub fn set_shape(&mut self, shape: impl Into<Shape>) {
        self.shape = Some(shape.into());
    }

    /// Set the shape from a JSON value (a Feature or any object).
    pub fn set_shape_value(&mut self, value: Value) -> ObservationResult<()> {
        self.shape = Some(Shape::from_value(value)?);
        Ok(())
    }

    pub fn set_data(&mut self, data: Map<String, Value>) {
        self.data = Some(data);
    }

    /// Set free-form data from a JSON value, which must be an object.
    pub fn set_data_value(&mut self, value: Value) -> ObservationResult<()> {
        match value {
            Value::Object(map) => {
                self.data = Some(map);
                Ok(())
            }
            _ => Err(ObservationError::wrong_type("data", "dict")),
        }
    }

    /// Services are not part of the node format yet; always fails.
    pub fn set_services(&mut self, _services: Vec<Value>) -> ObservationResult<()> {
        Err(ObservationError::NotImplemented(
            "node services are not supported".to_string(),
        ))
    }
}

impl Record for Node {
    fn base(&self) -> &RecordBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RecordBase {
        &mut self.base
    }

    fn collection_type(&self) -> CollectionType {
        CollectionType::Nodes
    }

    fn to_item(&self) -> ObservationResult<WireItem> {
        Ok(WireItem::Node(NodeItem {
            location: self.base.location,
            node_type: self.node_type,
            node_id: self.node_id.to_dict(),
            observed_at: self.base.observed_at.clone(),
            shape: self.shape.clone().filter(|s| !s.is_empty()),
            data: self.data.clone().filter(|d| !d.is_empty()),
        }))
    }
}

/// A measured value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReadingValue {
    Number(f64),
    /// Integers keep full 64-bit precision.
    Integer(i64),
    Text(String),
}

impl From<f64> for ReadingValue {
    fn from(v: f64) -> Self {
        ReadingValue::Number(v)
    }
}

impl From<i64> for ReadingValue {
    fn from(v: i64) -> Self {
        ReadingValue::Integer(v)
    }
}

impl From<&str> for ReadingValue {
    fn from(v: &str) -> Self {
        ReadingValue::Text(v.to_string())
    }
}

impl From<String> for ReadingValue {
    fn from(v: String) -> Self {
        ReadingValue::Text(v)
    }
}

/// A measurement taken at a location.
///
/// The service does not define a reading item format yet, so readings can
/// be built but not rendered.
#[derive(Debug, Clone)]
pub struct Reading {
    base: RecordBase,
    unit: String,
    value: ReadingValue,
}

impl Reading {
    pub fn new(
        lat: f64,
        lon: f64,
        unit: impl Into<String>,
        value: impl Into<ReadingValue>,
    ) -> ObservationResult<Self> {
        Ok(Self {
            base: RecordBase::new(lat, lon)?,
            unit: unit.into(),
            value: value.into(),
        })
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn value(&self) -> &ReadingValue {
        &self.value
    }

    pub fn set_unit(&mut self, unit: impl Into<String>) {
        self.unit = unit.into();
    }

    pub fn set_value(&mut self, value: impl Into<ReadingValue>) {
        self.value = value.into();
    }
}

impl Record for Reading {
    fn base(&self) -> &RecordBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RecordBase {
        &mut self.base
    }

    fn collection_type(&self) -> CollectionType {
        CollectionType::Readings
    }

    fn to_item(&self) -> ObservationResult<WireItem> {
        Err(ObservationError::NotImplemented(
            "reading serialization is not supported".to_string(),
        ))
    }
}

/// Any observation record.
#[derive(Debug, Clone)]
pub enum Observation {
    Node(Node),
    Reading(Reading),
}

impl Observation {
    /// Short name of the record kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Observation::Node(_) => "node",
            Observation::Reading(_) => "reading",
        }
    }
}

impl Record for Observation {
    fn base(&self) -> &RecordBase {
        match self {
            Observation::Node(n) => n.base(),
            Observation::Reading(r) => r.base(),
        }
    }

    fn base_mut(&mut self) -> &mut RecordBase {
        match self {
            Observation::Node(n) => n.base_mut(),
            Observation::Reading(r) => r.base_mut(),
        }
    }

    fn collection_type(&self) -> CollectionType {
        match self {
            Observation::Node(n) => n.collection_type(),
            Observation::Reading(r) => r.collection_type(),
        }
    }

    fn to_item(&self) -> ObservationResult<WireItem> {
        match self {
            Observation::Node(n) => n.to_item(),
            Observation::Reading(r) => r.to_item(),
        }
    }
}

impl From<Node> for Observation {
    fn from(node: Node) -> Self {
        Observation::Node(node)
    }
}

impl From<Reading> for Observation {
    fn from(reading: Reading) -> Self {
        Observation::Reading(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use observation_common::ErrorKind;
    use serde_json::json;

    fn facility() -> NodeId {
        NodeId::new().with("node_type", "facility").unwrap()
    }

    #[test]
    fn test_node_item_minimal() {
        let node = Node::new(facility(), 34.0, -120.0).unwrap();
        let item = serde_json::to_value(node.to_item().unwrap()).unwrap();

        assert_eq!(
            item,
            json!({
                "location": {"type": "Point", "coordinates": [-120.0, 34.0]},
                "nodeType": "facility",
                "nodeId": {"000 Node Type": "facility"}
            })
        );
    }

    #[test]
    fn test_node_item_optional_fields() {
        let mut node = Node::new(facility(), 34.0, -120.0).unwrap();
        node.base_mut().set_observed_at("2024-06-01T08:00:00Z").unwrap();
        node.set_data_value(json!({"capacity_mw": 250})).unwrap();
        node.set_shape_value(json!({"outline": "fenced lot"})).unwrap();

        let item = serde_json::to_value(node.to_item().unwrap()).unwrap();
        assert_eq!(item["observedAt"], json!("2024-06-01T08:00:00Z"));
        assert_eq!(item["data"], json!({"capacity_mw": 250}));
        assert_eq!(item["shape"], json!({"outline": "fenced lot"}));
    }

    #[test]
    fn test_empty_data_and_shape_are_omitted() {
        let mut node = Node::new(facility(), 34.0, -120.0).unwrap();
        node.set_data(Map::new());
        node.set_shape_value(json!({})).unwrap();

        let item = serde_json::to_value(node.to_item().unwrap()).unwrap();
        assert!(item.get("data").is_none());
        assert!(item.get("shape").is_none());
    }

    #[test]
    fn test_node_requires_node_type() {
        let id = NodeId::new().with("kind", "power_plant").unwrap();
        let err = Node::new(id, 0.0, 0.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lookup);
        assert_eq!(err.to_string(), "NodeId component 000 Node Type is not set");
    }

    #[test]
    fn test_node_type_vocabulary() {
        let id = NodeId::new().with("node_type", "factory").unwrap();
        let err = Node::new(id, 0.0, 0.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let id = NodeId::new().with("node_type", 3).unwrap();
        let err = Node::new(id, 0.0, 0.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);

        for t in NodeType::ALL {
            let id = NodeId::new().with("000", t.as_str()).unwrap();
            assert_eq!(Node::new(id, 0.0, 0.0).unwrap().node_type(), t);
        }
    }

    #[test]
    fn test_services_fail_and_node_stays_usable() {
        let mut node = Node::new(facility(), 34.0, -120.0).unwrap();
        let err = node.set_services(vec![json!("pump")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);

        node.set_node_type("reservoir").unwrap();
        assert!(node.to_item().is_ok());
    }

    #[test]
    fn test_setters_fail_fast() {
        let mut node = Node::new(facility(), 34.0, -120.0).unwrap();

        let err = node.set_data_value(json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);

        let err = node.base_mut().set_observed_at("last tuesday").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(node.base().observed_at().is_none());

        let err = node.base_mut().set_location(120.0, 0.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(node.base().location().lat(), 34.0);

        let err = node.set_node_type("warehouse").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(node.node_type(), NodeType::Facility);
    }

    #[test]
    fn test_reading_to_item_not_implemented() {
        let reading = Reading::new(34.0, -120.0, "degC", 21.5).unwrap();
        let err = reading.to_item().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);

        let err = reading.to_doc().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);
    }

    #[test]
    fn test_to_doc_unattached_and_attached() {
        let mut node = Node::new(facility(), 34.0, -120.0).unwrap();
        let doc = serde_json::to_value(node.to_doc().unwrap()).unwrap();
        assert!(doc.get("contributor").is_none());
        assert_eq!(doc["nodes"].as_array().unwrap().len(), 1);

        let meta = Arc::new(BatchMetadata::builder().username("system").build().unwrap());
        node.base_mut().attach(&meta);
        let doc = serde_json::to_value(node.to_doc().unwrap()).unwrap();
        assert_eq!(doc["contributor"], json!({"username": "system"}));
        assert!(doc.get("readings").is_none());
    }

    #[test]
    fn test_to_doc_after_batch_dropped() {
        let mut node = Node::new(facility(), 34.0, -120.0).unwrap();
        let meta = Arc::new(BatchMetadata::default());
        node.base_mut().attach(&meta);
        drop(meta);

        let err = node.to_doc().unwrap_err();
        assert!(matches!(err, ObservationError::DetachedRecord));
    }

    #[test]
    fn test_large_integer_reading_keeps_precision() {
        let big = (1_i64 << 53) + 1;
        let reading = Reading::new(1.0, 2.0, "count", big).unwrap();
        assert_eq!(reading.value(), &ReadingValue::Integer(big));
        assert_eq!(serde_json::to_value(reading.value()).unwrap(), json!(9007199254740993_i64));
        assert_eq!(serde_json::to_value(ReadingValue::from(2.5)).unwrap(), json!(2.5));
    }
}
