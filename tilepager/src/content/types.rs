use super::Style;
use crate::coord::TileKey;
use crate::feature::RawFeature;
use crate::resource::ResourceDescriptor;
use thiserror::Error;

/// Column-major 4x4 transform.
pub type Mat4 = [f64; 16];

/// Small helpers for [`Mat4`].
pub mod matrix {
    use super::Mat4;

    #[rustfmt::skip]
    pub const IDENTITY: Mat4 = [
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ];

    pub fn translation(x: f64, y: f64, z: f64) -> Mat4 {
        let mut m = IDENTITY;
        m[12] = x;
        m[13] = y;
        m[14] = z;
        m
    }

    /// Rotation about +Z by `radians`, then uniform `scale`, then translation.
    pub fn placement(x: f64, y: f64, z: f64, radians: f64, scale: f64) -> Mat4 {
        let (s, c) = radians.sin_cos();
        let mut m = translation(x, y, z);
        m[0] = c * scale;
        m[1] = s * scale;
        m[4] = -s * scale;
        m[5] = c * scale;
        m[10] = scale;
        m
    }

    pub fn translation_of(m: &Mat4) -> [f64; 3] {
        [m[12], m[13], m[14]]
    }
}

const METERS_PER_DEGREE: f64 = 111_320.0;

/// Equirectangular tangent frame at a tile's centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    pub origin: [f64; 2],
    meters_per_x: f64,
    meters_per_y: f64,
}

impl LocalFrame {
    /// Profile coordinates to local metres.
    pub fn to_local(&self, [x, y]: [f64; 2]) -> [f64; 2] {
        [
            (x - self.origin[0]) * self.meters_per_x,
            (y - self.origin[1]) * self.meters_per_y,
        ]
    }

    /// Local-to-world transform (translation to the origin, in profile units).
    pub fn local_to_world(&self) -> Mat4 {
        matrix::translation(self.origin[0], self.origin[1], 0.0)
    }
}

/// Builds the local frame of a tile.
pub fn local_frame(key: &TileKey) -> LocalFrame {
    let (cx, cy) = key.extent().centroid();
    LocalFrame {
        origin: [cx, cy],
        meters_per_x: METERS_PER_DEGREE * cy.to_radians().cos(),
        meters_per_y: METERS_PER_DEGREE,
    }
}

/// Indexed triangle soup with a batching tag.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentPrimitive {
    pub tag: String,
    pub vertices: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub skin: Option<ResourceDescriptor>,
    pub feature_id: Option<u64>,
}

impl ContentPrimitive {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            vertices: Vec::new(),
            indices: Vec::new(),
            skin: None,
            feature_id: None,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Appends a triangle, adding its three vertices.
    pub fn push_triangle(&mut self, a: [f32; 3], b: [f32; 3], c: [f32; 3]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&[a, b, c]);
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    /// Appends a quad as two triangles sharing four vertices.
    pub fn push_quad(&mut self, a: [f32; 3], b: [f32; 3], c: [f32; 3], d: [f32; 3]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&[a, b, c, d]);
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

/// A model instance to be drawn at `matrix`.
#[derive(Debug, Clone, PartialEq)]
pub struct InstancePlacement {
    pub descriptor: ResourceDescriptor,
    pub matrix: Mat4,
    pub feature_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    Primitive(ContentPrimitive),
    Instance(InstancePlacement),
}

/// Errors raised while generating content for a single feature.
///
/// These are per-feature: the builder records them as warnings and moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContentError {
    #[error("feature {feature_id} has invalid geometry: {reason}")]
    InvalidGeometry { feature_id: u64, reason: String },

    #[error("feature {feature_id} is missing attribute '{attribute}'")]
    MissingAttribute { feature_id: u64, attribute: String },
}

/// Turns features into content items.
pub trait ContentFactory: Send + Sync {
    fn compile(
        &self,
        feature: &RawFeature,
        key: &TileKey,
        style: Option<&Style>,
    ) -> Result<Vec<ContentItem>, ContentError>;
}
