use super::{ArenaTexture, Chonk, DrawBatch, RenderState};
use crate::content::{matrix, Mat4, RenderHints};
use crate::coord::TileKey;
use crate::resource::{ResourceDescriptor, SharedHandle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where a compiled tile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOrigin {
    Built,
    DurableCache,
}

impl fmt::Display for TileOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileOrigin::Built => write!(f, "built"),
            TileOrigin::DurableCache => write!(f, "cache"),
        }
    }
}

/// Merged primitives sharing a tag.
#[derive(Debug, Clone)]
pub struct GeometryBatch {
    pub tag: String,
    pub batch: DrawBatch,
    pub state: Option<Arc<RenderState>>,
    pub min_range: f32,
    pub max_range: f32,
    /// Number of features that contributed geometry.
    pub feature_count: usize,
}

/// One placement of a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub matrix: Mat4,
    pub feature_id: Option<u64>,
}

/// All placements of one model in a tile.
#[derive(Debug, Clone)]
pub struct InstanceGroup {
    pub descriptor: ResourceDescriptor,
    pub chonk: Arc<Chonk>,
    pub instances: Vec<Instance>,
    pub min_range: f32,
    pub max_range: f32,
}

/// Drawable content of a tile.
#[derive(Debug, Clone)]
pub struct TileContent {
    pub local_to_world: Mat4,
    /// Visibility range of the whole tile.
    pub range: f32,
    pub batches: Vec<GeometryBatch>,
    pub instance_groups: Vec<InstanceGroup>,
    pub render: RenderHints,
    pub feature_count: usize,
}

impl Default for TileContent {
    fn default() -> Self {
        Self {
            local_to_world: matrix::IDENTITY,
            range: 0.0,
            batches: Vec::new(),
            instance_groups: Vec::new(),
            render: RenderHints::default(),
            feature_count: 0,
        }
    }
}

impl TileContent {
    /// True when no feature produced anything drawable.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty() && self.instance_groups.is_empty()
    }

    pub fn placement_count(&self) -> usize {
        self.instance_groups.iter().map(|g| g.instances.len()).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.batches.iter().map(|b| b.batch.vertex_count()).sum()
    }

    pub fn instance_group(&self, descriptor: &ResourceDescriptor) -> Option<&InstanceGroup> {
        self.instance_groups
            .iter()
            .find(|g| &g.descriptor == descriptor)
    }
}

/// Strong references a tile keeps to shared objects.
#[derive(Debug, Clone, Default)]
pub struct TileResources {
    /// Resource cache entries used while compiling. Empty for cached tiles.
    pub handles: Vec<SharedHandle>,
    pub chonks: Vec<Arc<Chonk>>,
    pub textures: Vec<Arc<ArenaTexture>>,
}

impl TileResources {
    pub fn len(&self) -> usize {
        self.handles.len() + self.chonks.len() + self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn chonk(&self, descriptor: &ResourceDescriptor) -> Option<&Arc<Chonk>> {
        self.chonks.iter().find(|c| c.descriptor() == descriptor)
    }

    pub fn texture(&self, descriptor: &ResourceDescriptor) -> Option<&Arc<ArenaTexture>> {
        self.textures.iter().find(|t| &t.descriptor == descriptor)
    }
}

/// Result of building one tile.
#[derive(Debug, Clone)]
pub struct CompiledTile {
    pub name: String,
    pub cache_key: String,
    pub key: Option<TileKey>,
    pub content: TileContent,
    pub resources: TileResources,
    pub origin: TileOrigin,
    pub warnings: Vec<String>,
}

impl CompiledTile {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_from_cache(&self) -> bool {
        self.origin == TileOrigin::DurableCache
    }
}
