//! GeoJSON types for observation locations and node shapes.
//!
//! Locations are always emitted as a GeoJSON `Point`. Node shapes may be a
//! full GeoJSON `Feature` or an arbitrary mapping the caller already holds.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc7946>

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use observation_common::{ObservationError, ObservationResult};

/// GeoJSON geometry types accepted in node shapes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    /// A point geometry.
    Point {
        /// Coordinates as [longitude, latitude].
        coordinates: [f64; 2],
    },

    /// A line string geometry.
    LineString {
        /// Array of [longitude, latitude] coordinate pairs.
        coordinates: Vec<[f64; 2]>,
    },

    /// A polygon geometry.
    Polygon {
        /// Array of linear rings (first is exterior, rest are holes).
        coordinates: Vec<Vec<[f64; 2]>>,
    },

    /// A multi-polygon geometry, common for administrative areas.
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
}

impl Geometry {
    /// Create a point geometry.
    pub fn point(lon: f64, lat: f64) -> Self {
        Geometry::Point {
            coordinates: [lon, lat],
        }
    }

    /// Create a line string geometry.
    pub fn line_string(coordinates: Vec<[f64; 2]>) -> Self {
        Geometry::LineString { coordinates }
    }

    /// Create a polygon geometry.
    pub fn polygon(coordinates: Vec<Vec<[f64; 2]>>) -> Self {
        Geometry::Polygon { coordinates }
    }
}

/// A validated longitude/latitude pair, serialized as a GeoJSON Point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    lon: f64,
    lat: f64,
}

impl Location {
    /// Create a location, rejecting coordinates outside WGS84 bounds.
    pub fn new(lat: f64, lon: f64) -> ObservationResult<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ObservationError::invalid("lat", lat));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(ObservationError::invalid("lon", lon));
        }
        Ok(Self { lon, lat })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// The GeoJSON geometry for this location.
    pub fn to_geometry(&self) -> Geometry {
        Geometry::point(self.lon, self.lat)
    }
}

impl Serialize for Location {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_geometry().serialize(serializer)
    }
}

/// A GeoJSON Feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    /// Optional feature identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// The geometry of this feature.
    pub geometry: Option<Geometry>,

    /// Free-form properties.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Create a feature wrapping a geometry.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            type_: "Feature".to_string(),
            id: None,
            geometry: Some(geometry),
            properties: Map::new(),
        }
    }

    /// Set the feature ID.
    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// The shape of a node: either a GeoJSON Feature or a raw mapping.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Shape {
    Feature(Feature),
    Raw(Map<String, Value>),
}

impl Shape {
    /// Interpret a JSON value as a shape.
    ///
    /// Objects tagged `"type": "Feature"` must be well-formed features; any
    /// other object is kept as a raw mapping. Non-objects are rejected.
    pub fn from_value(value: Value) -> ObservationResult<Self> {
        let Value::Object(map) = value else {
            return Err(ObservationError::wrong_type("shape", "Feature or dict"));
        };

        if map.get("type").and_then(Value::as_str) == Some("Feature") {
            let feature = serde_json::from_value(Value::Object(map))
                .map_err(|_| ObservationError::wrong_type("shape", "Feature or dict"))?;
            return Ok(Shape::Feature(feature));
        }

        Ok(Shape::Raw(map))
    }

    /// Whether the shape carries no content at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Shape::Feature(_) => false,
            Shape::Raw(map) => map.is_empty(),
        }
    }
}

impl From<Feature> for Shape {
    fn from(feature: Feature) -> Self {
        Shape::Feature(feature)
    }
}
