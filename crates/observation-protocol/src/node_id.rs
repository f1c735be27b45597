//! Composite node identifiers.
//!
//! A node is identified by a handful of hierarchical fields drawn from a
//! fixed registry. Each field has a short numeric code (e.g. "000") and a
//! canonical name (e.g. "node_type"); either may be used to address it.
//! On the wire the identifier becomes a mapping keyed by the full label,
//! `"<code> <Title Cased Name>"`.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use observation_common::{ObservationError, ObservationResult};

/// A field in the node identifier registry, ordered by code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeIdField {
    NodeType,
    Kind,
    Catalog,
    CatalogTitle,
    AdminLevel,
    AdminName,
    CatalogId,
    CommonName,
}

impl NodeIdField {
    /// Every registered field, in code order.
    pub const ALL: [NodeIdField; 8] = [
        NodeIdField::NodeType,
        NodeIdField::Kind,
        NodeIdField::Catalog,
        NodeIdField::CatalogTitle,
        NodeIdField::AdminLevel,
        NodeIdField::AdminName,
        NodeIdField::CatalogId,
        NodeIdField::CommonName,
    ];

    /// The short registry code.
    pub fn code(&self) -> &'static str {
        match self {
            NodeIdField::NodeType => "000",
            NodeIdField::Kind => "010",
            NodeIdField::Catalog => "020",
            NodeIdField::CatalogTitle => "022",
            NodeIdField::AdminLevel => "027",
            NodeIdField::AdminName => "028",
            NodeIdField::CatalogId => "030",
            NodeIdField::CommonName => "035",
        }
    }

    /// The canonical snake_case name.
    pub fn name(&self) -> &'static str {
        match self {
            NodeIdField::NodeType => "node_type",
            NodeIdField::Kind => "kind",
            NodeIdField::Catalog => "catalog",
            NodeIdField::CatalogTitle => "catalog_title",
            NodeIdField::AdminLevel => "admin_level",
            NodeIdField::AdminName => "admin_name",
            NodeIdField::CatalogId => "catalog_id",
            NodeIdField::CommonName => "common_name",
        }
    }

    /// The full human-readable label, e.g. "000 Node Type".
    pub fn label(&self) -> String {
        format!("{} {}", self.code(), title_case(self.name()))
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.code() == code)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Resolve a code or a canonical name to its field.
    pub fn resolve(key: &str) -> ObservationResult<Self> {
        Self::from_code(key)
            .or_else(|| Self::from_name(key))
            .ok_or_else(|| ObservationError::UnknownField(key.to_string()))
    }
}

impl FromStr for NodeIdField {
    type Err = ObservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

impl std::fmt::Display for NodeIdField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// "catalog_title" -> "Catalog Title"
fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Composite identifier for a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeId {
    fields: BTreeMap<NodeIdField, Value>,
}

impl NodeId {
    /// Create an empty identifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an identifier from (code-or-name, value) pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> ObservationResult<Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut id = Self::new();
        for (key, value) in pairs {
            id.set(key.as_ref(), value)?;
        }
        Ok(id)
    }

    /// Set a field by code or name, consuming and returning the identifier.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> ObservationResult<Self> {
        self.set(key, value)?;
        Ok(self)
    }

    /// Set a field by code or name.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> ObservationResult<()> {
        let field = NodeIdField::resolve(key)?;
        self.set_field(field, value);
        Ok(())
    }

    /// Set a field by its registry entry.
    pub fn set_field(&mut self, field: NodeIdField, value: impl Into<Value>) {
        self.fields.insert(field, value.into());
    }

    /// Read a field by code or name.
    pub fn get(&self, key: &str) -> ObservationResult<&Value> {
        let field = NodeIdField::resolve(key)?;
        self.get_field(field)
            .ok_or_else(|| ObservationError::FieldNotSet(field.label()))
    }

    /// Read a field by its registry entry, if set.
    pub fn get_field(&self, field: NodeIdField) -> Option<&Value> {
        self.fields.get(&field)
    }

    /// The `node_type` component.
    pub fn node_type(&self) -> ObservationResult<&Value> {
        self.get(NodeIdField::NodeType.name())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over the set fields in code order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeIdField, &Value)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }

    /// Render to a mapping from full label to value.
    pub fn to_dict(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(field, value)| (field.label(), value.clone()))
            .collect()
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_dict().serialize(serializer)
    }
}
