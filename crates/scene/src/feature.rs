//! Cell features as sourced from the per-field GeoJSON tiles.
//!
//! Only polygonal geometry is modeled; cells are H3 hexagons and prescription
//! zones are convex hulls, both of which arrive as `Polygon` or `MultiPolygon`.
//! Positions are 2D `[lon, lat]` in degrees.

use std::collections::BTreeMap;

use foundation::math::estimate_acres;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::attribute::Attribute;

/// Property key holding the cell's spatial index.
pub const CELL_ID_KEY: &str = "h3_index";
/// Property key holding the owning field's name.
pub const FIELD_NAME_KEY: &str = "field_name";

pub type Position = [f64; 2];
pub type Ring = Vec<Position>;

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureError {
    Json(String),
    MissingFeatures,
}

impl std::fmt::Display for FeatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureError::Json(msg) => write!(f, "invalid feature collection: {msg}"),
            FeatureError::MissingFeatures => write!(f, "feature collection has no features array"),
        }
    }
}

impl std::error::Error for FeatureError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    pub fn polygon(outer: Ring) -> Self {
        Geometry::Polygon(vec![outer])
    }

    /// Polygons as slices of rings; the first ring of each is the outer boundary.
    pub fn polygons(&self) -> Vec<&[Ring]> {
        match self {
            Geometry::Polygon(rings) => vec![rings.as_slice()],
            Geometry::MultiPolygon(polys) => polys.iter().map(|p| p.as_slice()).collect(),
        }
    }

    /// Outer boundary of the first polygon.
    pub fn outer_ring(&self) -> Option<&Ring> {
        match self {
            Geometry::Polygon(rings) => rings.first(),
            Geometry::MultiPolygon(polys) => polys.first().and_then(|p| p.first()),
        }
    }

    /// Planar-approximated area in acres: outer rings minus holes.
    pub fn acres(&self) -> f64 {
        let mut total = 0.0;
        for rings in self.polygons() {
            for (i, ring) in rings.iter().enumerate() {
                let a = estimate_acres(ring);
                if i == 0 {
                    total += a;
                } else {
                    total -= a;
                }
            }
        }
        total.max(0.0)
    }
}

/// Free-form property bag. Numeric attributes and string tags share one map so
/// unknown keys survive a round trip to the tile service untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, Value>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64).filter(|v| v.is_finite())
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn attribute(&self, attribute: Attribute) -> Option<f64> {
        self.number(attribute.column())
    }

    pub fn set_number(&mut self, key: impl Into<String>, value: f64) {
        let value = serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number);
        self.0.insert(key.into(), value);
    }

    pub fn set_attribute(&mut self, attribute: Attribute, value: f64) {
        self.set_number(attribute.column(), value);
    }

    pub fn set_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), Value::String(value.into()));
    }

    pub fn field_name(&self) -> Option<&str> {
        self.text(FIELD_NAME_KEY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CellFeature {
    /// Native GeoJSON feature id. Numeric ids are kept in their decimal form.
    #[serde(default, deserialize_with = "native_id")]
    pub id: Option<String>,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Properties,
}

impl CellFeature {
    pub fn new(geometry: Geometry, properties: Properties) -> Self {
        Self {
            id: None,
            geometry,
            properties,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The spatial index (`h3_index`) when present and non-empty.
    pub fn cell_id(&self) -> Option<&str> {
        self.properties
            .text(CELL_ID_KEY)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn value(&self, attribute: Attribute) -> Option<f64> {
        self.properties.attribute(attribute)
    }
}

fn native_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<CellFeature>,
}

#[derive(Deserialize)]
struct RawCollection {
    features: Option<Vec<CellFeature>>,
}

impl FeatureCollection {
    pub fn new(features: Vec<CellFeature>) -> Self {
        Self { features }
    }

    pub fn from_json(text: &str) -> Result<Self, FeatureError> {
        let raw: RawCollection =
            serde_json::from_str(text).map_err(|e| FeatureError::Json(e.to_string()))?;
        Self::from_raw(raw)
    }

    pub fn from_value(value: Value) -> Result<Self, FeatureError> {
        let raw: RawCollection =
            serde_json::from_value(value).map_err(|e| FeatureError::Json(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawCollection) -> Result<Self, FeatureError> {
        let features = raw.features.ok_or(FeatureError::MissingFeatures)?;
        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
