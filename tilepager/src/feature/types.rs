use crate::coord::GeoExtent;
use std::collections::BTreeMap;
use std::fmt;

/// Typed attribute value carried by a feature.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
}

impl AttributeValue {
    /// Numeric view of the value. Strings are parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::String(s) => s.trim().parse().ok(),
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Double(d) => Some(*d),
            AttributeValue::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => write!(f, "{}", s),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Double(d) => write!(f, "{}", d),
            AttributeValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

pub type Attributes = BTreeMap<String, AttributeValue>;

/// Feature geometry in profile units (`[x, y]` pairs).
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point([f64; 2]),
    LineString(Vec<[f64; 2]>),
    /// Outer ring. A closing point equal to the first is optional.
    Polygon(Vec<[f64; 2]>),
}

impl Geometry {
    pub fn points(&self) -> &[[f64; 2]] {
        match self {
            Geometry::Point(p) => std::slice::from_ref(p),
            Geometry::LineString(points) | Geometry::Polygon(points) => points,
        }
    }

    pub fn bounds(&self) -> GeoExtent {
        let mut extent = GeoExtent::empty();
        for [x, y] in self.points() {
            extent.expand_to_include(*x, *y);
        }
        extent
    }

    /// Average of the vertices. `None` for an empty geometry.
    pub fn centroid(&self) -> Option<[f64; 2]> {
        let points = self.points();
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), [x, y]| (sx + x, sy + y));
        Some([sx / n, sy / n])
    }
}

/// One vector feature as read from a source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeature {
    pub id: u64,
    pub geometry: Geometry,
    pub attributes: Attributes,
}

impl RawFeature {
    pub fn new(id: u64, geometry: Geometry) -> Self {
        Self {
            id,
            geometry,
            attributes: Attributes::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn double(&self, name: &str) -> Option<f64> {
        self.attr(name).and_then(AttributeValue::as_f64)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(AttributeValue::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_accessors() {
        let feature = RawFeature::new(7, Geometry::Point([1.0, 2.0]))
            .with_attr("height", 12.5)
            .with_attr("levels", 3i64)
            .with_attr("model", "oak_tree")
            .with_attr("text_height", "4.5");

        assert_eq!(feature.double("height"), Some(12.5));
        assert_eq!(feature.double("levels"), Some(3.0));
        assert_eq!(feature.double("text_height"), Some(4.5));
        assert_eq!(feature.string("model"), Some("oak_tree"));
        assert_eq!(feature.string("height"), None);
        assert!(feature.attr("missing").is_none());
    }

    #[test]
    fn test_geometry_centroid_and_bounds() {
        let square = Geometry::Polygon(vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]);
        assert_eq!(square.centroid(), Some([1.0, 1.0]));
        assert_eq!(square.bounds(), GeoExtent::new(0.0, 0.0, 2.0, 2.0));

        assert_eq!(Geometry::LineString(Vec::new()).centroid(), None);
    }

    #[test]
    fn test_attribute_display() {
        assert_eq!(AttributeValue::from("a").to_string(), "a");
        assert_eq!(AttributeValue::from(true).to_string(), "true");
        assert_eq!(AttributeValue::from(3i64).to_string(), "3");
    }
}
