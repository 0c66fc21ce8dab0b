use super::{
    local_frame, matrix, ContentError, ContentFactory, ContentItem, ContentPrimitive,
    InstancePlacement, LocalFrame, Style,
};
use crate::coord::TileKey;
use crate::feature::{Geometry, RawFeature};
use crate::resource::ResourceDescriptor;
use std::collections::HashMap;

/// Batching tag of extruded walls.
pub const TAG_WALLS: &str = "walls";
/// Batching tag of flat roofs.
pub const TAG_ROOFS: &str = "roofs";
/// Batching tag of line ribbons.
pub const TAG_LINES: &str = "lines";

const DEFAULT_RIBBON_WIDTH: f64 = 2.0;

/// Default content factory.
///
/// - Polygons become prisms: one wall quad per ring edge plus a flat roof.
///   Height comes from the style's height attribute, falling back to the
///   style default, and never drops below the style minimum.
/// - Points carrying the style's model attribute become instance
///   placements, optionally rotated by `heading` (degrees) and scaled by
///   `scale`.
/// - Line strings become flat ribbons of `width` metres.
#[derive(Debug, Clone)]
pub struct ExtrusionFactory {
    model_tags: HashMap<String, Vec<String>>,
    ribbon_width: f64,
}

impl Default for ExtrusionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtrusionFactory {
    pub fn new() -> Self {
        Self {
            model_tags: HashMap::new(),
            ribbon_width: DEFAULT_RIBBON_WIDTH,
        }
    }

    /// Tags attached to placements of `uri` (used for LOD-bin matching).
    pub fn with_model_tags<I, S>(mut self, uri: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model_tags
            .insert(uri.into(), tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_ribbon_width(mut self, width: f64) -> Self {
        self.ribbon_width = width;
        self
    }

    fn place_model(
        &self,
        feature: &RawFeature,
        point: [f64; 2],
        frame: &LocalFrame,
        style: &Style,
    ) -> Result<Vec<ContentItem>, ContentError> {
        let Some(attribute) = style.model_attribute.as_deref() else {
            return Ok(Vec::new());
        };
        let Some(value) = feature.attr(attribute) else {
            return Ok(Vec::new());
        };
        let uri = match value.as_str() {
            Some(uri) if !uri.trim().is_empty() => uri.trim(),
            _ => {
                return Err(ContentError::MissingAttribute {
                    feature_id: feature.id,
                    attribute: attribute.to_string(),
                })
            }
        };

        let tags = self.model_tags.get(uri).cloned().unwrap_or_default();
        let [x, y] = frame.to_local(point);
        let heading = feature.double("heading").unwrap_or(0.0).to_radians();
        let scale = feature.double("scale").unwrap_or(1.0);

        Ok(vec![ContentItem::Instance(InstancePlacement {
            descriptor: ResourceDescriptor::new(uri).with_tags(tags),
            matrix: matrix::placement(x, y, 0.0, heading, scale),
            feature_id: Some(feature.id),
        })])
    }

    fn extrude(
        &self,
        feature: &RawFeature,
        ring: &[[f64; 2]],
        frame: &LocalFrame,
        style: &Style,
    ) -> Result<Vec<ContentItem>, ContentError> {
        let mut ring: Vec<[f64; 2]> = ring.to_vec();
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if ring.len() < 3 {
            return Err(ContentError::InvalidGeometry {
                feature_id: feature.id,
                reason: format!("polygon ring has {} distinct points", ring.len()),
            });
        }

        let height = style
            .height_attribute
            .as_deref()
            .and_then(|attr| feature.double(attr))
            .unwrap_or(style.default_height)
            .max(style.min_height) as f32;

        let local: Vec<[f32; 2]> = ring
            .iter()
            .map(|p| {
                let [x, y] = frame.to_local(*p);
                [x as f32, y as f32]
            })
            .collect();

        let mut walls = ContentPrimitive::new(TAG_WALLS);
        walls.skin = style.wall_skin.clone();
        walls.feature_id = Some(feature.id);
        for (i, a) in local.iter().enumerate() {
            let b = local[(i + 1) % local.len()];
            walls.push_quad(
                [a[0], a[1], 0.0],
                [b[0], b[1], 0.0],
                [b[0], b[1], height],
                [a[0], a[1], height],
            );
        }

        let mut roof = ContentPrimitive::new(TAG_ROOFS);
        roof.feature_id = Some(feature.id);
        let base = roof.vertices.len() as u32;
        roof.vertices
            .extend(local.iter().map(|p| [p[0], p[1], height]));
        for i in 1..(local.len() as u32 - 1) {
            roof.indices.extend_from_slice(&[base, base + i, base + i + 1]);
        }

        Ok(vec![ContentItem::Primitive(walls), ContentItem::Primitive(roof)])
    }

    fn ribbon(
        &self,
        feature: &RawFeature,
        line: &[[f64; 2]],
        frame: &LocalFrame,
    ) -> Result<Vec<ContentItem>, ContentError> {
        if line.len() < 2 {
            return Err(ContentError::InvalidGeometry {
                feature_id: feature.id,
                reason: "line string needs at least two points".to_string(),
            });
        }
        let half = (feature.double("width").unwrap_or(self.ribbon_width) * 0.5) as f32;

        let mut ribbon = ContentPrimitive::new(TAG_LINES);
        ribbon.feature_id = Some(feature.id);
        for pair in line.windows(2) {
            let [ax, ay] = frame.to_local(pair[0]);
            let [bx, by] = frame.to_local(pair[1]);
            let (dx, dy) = ((bx - ax) as f32, (by - ay) as f32);
            let len = (dx * dx + dy * dy).sqrt();
            if len <= f32::EPSILON {
                continue;
            }
            let (nx, ny) = (-dy / len * half, dx / len * half);
            let (ax, ay, bx, by) = (ax as f32, ay as f32, bx as f32, by as f32);
            ribbon.push_quad(
                [ax + nx, ay + ny, 0.0],
                [ax - nx, ay - ny, 0.0],
                [bx - nx, by - ny, 0.0],
                [bx + nx, by + ny, 0.0],
            );
        }

        if ribbon.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![ContentItem::Primitive(ribbon)])
    }
}

impl ContentFactory for ExtrusionFactory {
    fn compile(
        &self,
        feature: &RawFeature,
        key: &TileKey,
        style: Option<&Style>,
    ) -> Result<Vec<ContentItem>, ContentError> {
        let fallback = Style::new("default");
        let style = style.unwrap_or(&fallback);
        let frame = local_frame(key);

        match &feature.geometry {
            Geometry::Point(point) => self.place_model(feature, *point, &frame, style),
            Geometry::LineString(line) => self.ribbon(feature, line, &frame),
            Geometry::Polygon(ring) => self.extrude(feature, ring, &frame, style),
        }
    }
}
