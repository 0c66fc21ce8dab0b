use crate::resource::{ImageData, LoadError, ModelData, ResourceDescriptor};
use serde::{Deserialize, Serialize};

/// Indexed triangles drawn with one texture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawBatch {
    pub vertices: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub texture: Option<ResourceDescriptor>,
}

impl DrawBatch {
    pub fn new(texture: Option<ResourceDescriptor>) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            texture,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Appends geometry, rebasing its indices onto this batch.
    pub fn append(&mut self, vertices: &[[f32; 3]], indices: &[u32]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(vertices);
        self.indices.extend(indices.iter().map(|i| i + base));
    }
}

/// Compiled, draw-ready form of a model prototype.
///
/// One chonk is shared by every placement of the model in every resident
/// tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chonk {
    descriptor: ResourceDescriptor,
    batches: Vec<DrawBatch>,
    radius: f32,
}

impl Chonk {
    /// Compiles a model prototype.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Invalid`] for models without triangles or with
    /// out-of-range indices.
    pub fn from_model(descriptor: &ResourceDescriptor, model: &ModelData) -> Result<Self, LoadError> {
        let invalid = |reason: &str| LoadError::Invalid {
            uri: descriptor.to_string(),
            reason: reason.to_string(),
        };
        if model.indices.len() < 3 || model.vertices.is_empty() {
            return Err(invalid("model has no triangles"));
        }
        if model
            .indices
            .iter()
            .any(|&i| i as usize >= model.vertices.len())
        {
            return Err(invalid("index out of range"));
        }

        let radius = model
            .vertices
            .iter()
            .map(|[x, y, z]| (x * x + y * y + z * z).sqrt())
            .fold(0.0f32, f32::max);

        let mut batch = DrawBatch::new(model.skin.clone());
        batch.append(&model.vertices, &model.indices);

        Ok(Self {
            descriptor: descriptor.clone(),
            batches: vec![batch],
            radius,
        })
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    pub fn batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    pub fn vertex_count(&self) -> usize {
        self.batches.iter().map(DrawBatch::vertex_count).sum()
    }

    /// Radius of the sphere around the model origin enclosing all vertices.
    pub fn radius(&self) -> f32 {
        self.radius
    }
}

/// Compiled texture shared through the texture arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaTexture {
    pub descriptor: ResourceDescriptor,
    pub width: u32,
    pub height: u32,
    pub texels: Vec<u8>,
}

impl ArenaTexture {
    pub fn from_image(descriptor: &ResourceDescriptor, image: &ImageData) -> Self {
        Self {
            descriptor: descriptor.clone(),
            width: image.width,
            height: image.height,
            texels: image.pixels.clone(),
        }
    }

    pub fn byte_size(&self) -> usize {
        self.texels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chonk_from_cube() {
        let d = ResourceDescriptor::new("box");
        let chonk = Chonk::from_model(&d, &ModelData::cube(2.0)).unwrap();
        assert_eq!(chonk.descriptor(), &d);
        assert_eq!(chonk.vertex_count(), 8);
        assert_eq!(chonk.batches()[0].triangle_count(), 12);
        // Farthest corner is (1, 1, 2).
        assert!((chonk.radius() - 6.0f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_chonk_rejects_empty_model() {
        let model = ModelData {
            vertices: Vec::new(),
            indices: Vec::new(),
            skin: None,
        };
        let err = Chonk::from_model(&ResourceDescriptor::new("empty"), &model).unwrap_err();
        assert!(matches!(err, LoadError::Invalid { .. }));
    }

    #[test]
    fn test_chonk_rejects_bad_indices() {
        let model = ModelData {
            vertices: vec![[0.0; 3]; 3],
            indices: vec![0, 1, 3],
            skin: None,
        };
        assert!(Chonk::from_model(&ResourceDescriptor::new("bad"), &model).is_err());
    }

    #[test]
    fn test_chonk_carries_model_skin() {
        let skin = ResourceDescriptor::new("bark");
        let model = ModelData::cube(1.0).with_skin(skin.clone());
        let chonk = Chonk::from_model(&ResourceDescriptor::new("tree"), &model).unwrap();
        assert_eq!(chonk.batches()[0].texture, Some(skin));
    }

    #[test]
    fn test_batch_append_rebases_indices() {
        let mut batch = DrawBatch::new(None);
        batch.append(&[[0.0; 3]; 3], &[0, 1, 2]);
        batch.append(&[[1.0; 3]; 3], &[0, 2, 1]);
        assert_eq!(batch.indices, vec![0, 1, 2, 3, 5, 4]);
        assert_eq!(batch.vertex_count(), 6);
    }

    #[test]
    fn test_arena_texture_from_image() {
        let image = ImageData::solid(4, 4, [255, 0, 0, 255]);
        let texture = ArenaTexture::from_image(&ResourceDescriptor::new("red"), &image);
        assert_eq!(texture.byte_size(), 64);
        assert_eq!((texture.width, texture.height), (4, 4));
    }
}
