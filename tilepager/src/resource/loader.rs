use super::ResourceDescriptor;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while loading a shared sub-resource.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("invalid resource {uri}: {reason}")]
    Invalid { uri: String, reason: String },

    #[error("resource load canceled")]
    Canceled,
}

/// Decoded raster.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    /// RGBA8 texels, row-major.
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Solid-colour image.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let texels = (width as usize) * (height as usize);
        Self {
            width,
            height,
            pixels: rgba.repeat(texels),
        }
    }
}

/// Mesh prototype that can be instanced.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    pub vertices: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub skin: Option<ResourceDescriptor>,
}

impl ModelData {
    /// Axis aligned box of `size` metres sitting on the origin.
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;
        let vertices = vec![
            [-h, -h, 0.0],
            [h, -h, 0.0],
            [h, h, 0.0],
            [-h, h, 0.0],
            [-h, -h, size],
            [h, -h, size],
            [h, h, size],
            [-h, h, size],
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1, 0, 3, 2, // bottom
            4, 5, 6, 4, 6, 7, // top
            0, 1, 5, 0, 5, 4,
            1, 2, 6, 1, 6, 5,
            2, 3, 7, 2, 7, 6,
            3, 0, 4, 3, 4, 7,
        ];
        Self {
            vertices,
            indices,
            skin: None,
        }
    }

    pub fn with_skin(mut self, skin: ResourceDescriptor) -> Self {
        self.skin = Some(skin);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourcePayload {
    Image(ImageData),
    Model(ModelData),
}

/// A loaded resource as held by the [`super::ResourceCache`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedResource {
    pub descriptor: ResourceDescriptor,
    pub payload: ResourcePayload,
}

impl LoadedResource {
    pub fn as_model(&self) -> Option<&ModelData> {
        match &self.payload {
            ResourcePayload::Model(model) => Some(model),
            ResourcePayload::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageData> {
        match &self.payload {
            ResourcePayload::Image(image) => Some(image),
            ResourcePayload::Model(_) => None,
        }
    }
}

/// Loads shared sub-resources by descriptor.
///
/// Loads may be slow; callers serialize them per descriptor.
pub trait ResourceLoader: Send + Sync {
    fn load(&self, descriptor: &ResourceDescriptor) -> Result<LoadedResource, LoadError>;
}

/// In-memory resource catalog keyed by URI.
///
/// Counts loads per URI so callers can observe deduplication.
#[derive(Default)]
pub struct CatalogLoader {
    entries: HashMap<String, ResourcePayload>,
    loads: Mutex<HashMap<String, usize>>,
}

impl CatalogLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, uri: impl Into<String>, model: ModelData) -> Self {
        self.entries.insert(uri.into(), ResourcePayload::Model(model));
        self
    }

    pub fn with_image(mut self, uri: impl Into<String>, image: ImageData) -> Self {
        self.entries.insert(uri.into(), ResourcePayload::Image(image));
        self
    }

    /// Number of times `uri` was loaded.
    pub fn load_count(&self, uri: &str) -> usize {
        self.loads.lock().get(uri).copied().unwrap_or(0)
    }

    /// Total loads across all URIs.
    pub fn total_loads(&self) -> usize {
        self.loads.lock().values().sum()
    }
}

impl ResourceLoader for CatalogLoader {
    fn load(&self, descriptor: &ResourceDescriptor) -> Result<LoadedResource, LoadError> {
        let payload = self
            .entries
            .get(descriptor.uri())
            .cloned()
            .ok_or_else(|| LoadError::NotFound(descriptor.to_string()))?;
        *self
            .loads
            .lock()
            .entry(descriptor.uri().to_string())
            .or_insert(0) += 1;
        Ok(LoadedResource {
            descriptor: descriptor.clone(),
            payload,
        })
    }
}
