//! Feature-info response parsing.
//!
//! Responses are GeoJSON-like feature collections. Attribute order is kept
//! exactly as the service sent it.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Scalar attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Number(f64),
}

impl PropertyValue {
    fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => PropertyValue::Text(s),
            Value::Number(n) => match n.as_f64() {
                Some(f) => PropertyValue::Number(f),
                None => PropertyValue::Text(n.to_string()),
            },
            // Non-scalars keep their JSON text rather than being dropped.
            other => PropertyValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(s) => f.write_str(s),
            PropertyValue::Number(n) => fmt_number(*n, f),
        }
    }
}

// Plain digits inside [1e-6, 1e21), exponent form outside, the way a browser
// prints numbers.
fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let magnitude = n.abs();
    if !n.is_finite() || magnitude == 0.0 || (1e-6..1e21).contains(&magnitude) {
        return write!(f, "{n}");
    }
    let exp = format!("{n:e}");
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => write!(f, "{mantissa}e+{power}"),
        _ => f.write_str(&exp),
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    pub identifier: String,
    pub geometry_type: String,
    pub properties: Vec<(String, PropertyValue)>,
}

impl FeatureRecord {
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}

pub const UNKNOWN_GEOMETRY: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed feature collection: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Deserialize)]
struct RawCollection {
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
}

impl From<RawFeature> for FeatureRecord {
    fn from(raw: RawFeature) -> Self {
        let identifier = match raw.id {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let geometry_type = raw
            .geometry
            .map(|g| g.kind)
            .unwrap_or_else(|| UNKNOWN_GEOMETRY.to_string());
        let properties = raw
            .properties
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, PropertyValue::from_json(v)))
            .collect();
        FeatureRecord {
            identifier,
            geometry_type,
            properties,
        }
    }
}

/// Parses every feature of a collection, in service order.
pub fn parse_feature_collection(body: &str) -> Result<Vec<FeatureRecord>, ParseError> {
    let raw: RawCollection =
        serde_json::from_str(body).map_err(|e| ParseError(e.to_string()))?;
    Ok(raw.features.into_iter().map(FeatureRecord::from).collect())
}
