//! Merging a tile's content items into batches and instance groups.

use super::CompilerSettings;
use crate::compiled::{Chonk, DrawBatch, GeometryBatch, Instance, InstanceGroup, RenderState};
use crate::content::{ContentPrimitive, InstancePlacement, Style};
use crate::manager::StateCache;
use crate::resource::ResourceDescriptor;
use std::collections::HashMap;
use std::sync::Arc;

/// Batches are keyed by tag and texture: one draw state per batch.
type BatchKey = (String, Option<ResourceDescriptor>);

struct OpenBatch {
    key: BatchKey,
    batch: DrawBatch,
    features: Vec<u64>,
}

/// Accumulates one tile's primitives and placements.
pub(super) struct TileAssembly<'a> {
    settings: &'a CompilerSettings,
    range: f32,
    batches: Vec<OpenBatch>,
    /// Index of the batch currently accepting geometry for a key.
    open: HashMap<BatchKey, usize>,
    groups: Vec<InstanceGroup>,
    group_index: HashMap<ResourceDescriptor, usize>,
}

impl<'a> TileAssembly<'a> {
    pub fn new(settings: &'a CompilerSettings, range: f32) -> Self {
        Self {
            settings,
            range,
            batches: Vec::new(),
            open: HashMap::new(),
            groups: Vec::new(),
            group_index: HashMap::new(),
        }
    }

    /// Merges a primitive into the open batch for its tag and texture,
    /// starting a new batch when the vertex budget would be exceeded.
    ///
    /// `texture` is the resolved skin; `None` draws untextured.
    pub fn add_primitive(&mut self, primitive: ContentPrimitive, texture: Option<ResourceDescriptor>) {
        if primitive.is_empty() {
            return;
        }
        let key: BatchKey = (primitive.tag.clone(), texture.clone());
        let budget = self.settings.max_verts_per_batch;

        let existing = self.open.get(&key).copied();
        let index = match existing {
            Some(i)
                if self.batches[i].batch.vertex_count() + primitive.vertex_count() <= budget =>
            {
                i
            }
            _ => {
                self.batches.push(OpenBatch {
                    key: key.clone(),
                    batch: DrawBatch::new(texture),
                    features: Vec::new(),
                });
                let i = self.batches.len() - 1;
                self.open.insert(key, i);
                i
            }
        };

        let open = &mut self.batches[index];
        open.batch.append(&primitive.vertices, &primitive.indices);
        if let Some(id) = primitive.feature_id {
            if open.features.last() != Some(&id) {
                open.features.push(id);
            }
        }
    }

    /// Adds a placement to the group of its model.
    pub fn add_placement(&mut self, placement: InstancePlacement, chonk: Arc<Chonk>) {
        let instance = Instance {
            matrix: placement.matrix,
            feature_id: placement.feature_id,
        };
        if let Some(&i) = self.group_index.get(&placement.descriptor) {
            self.groups[i].instances.push(instance);
            return;
        }
        let (min_range, max_range) = self
            .settings
            .lod_bin_for_tags(placement.descriptor.tags())
            .ranges(self.range);
        self.group_index
            .insert(placement.descriptor.clone(), self.groups.len());
        self.groups.push(InstanceGroup {
            descriptor: placement.descriptor,
            chonk,
            instances: vec![instance],
            min_range,
            max_range,
        });
    }

    /// Closes the assembly, attaching shared render states.
    pub fn finish(
        self,
        style: Option<&Style>,
        states: &StateCache,
    ) -> (Vec<GeometryBatch>, Vec<InstanceGroup>) {
        let (transparent, two_sided, render_bin) = match style {
            Some(style) => (
                style.render.transparent,
                style.render.backface_culling == Some(false),
                style.render.render_bin.clone(),
            ),
            None => (false, false, None),
        };

        let batches = self
            .batches
            .into_iter()
            .map(|open| {
                let (tag, texture) = open.key;
                let (min_range, max_range) =
                    self.settings.lod_bin_for_tag(&tag).ranges(self.range);
                let state = states.share(RenderState {
                    texture,
                    transparent,
                    two_sided,
                    render_bin: render_bin.clone(),
                });
                GeometryBatch {
                    tag,
                    batch: open.batch,
                    state: Some(state),
                    min_range,
                    max_range,
                    feature_count: open.features.len(),
                }
            })
            .collect();

        (batches, self.groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::LodBin;
    use crate::content::matrix;
    use crate::resource::ModelData;

    fn triangle(tag: &str, feature_id: u64) -> ContentPrimitive {
        let mut p = ContentPrimitive::new(tag);
        p.feature_id = Some(feature_id);
        p.push_triangle([0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        p
    }

    fn placement(uri: &str) -> InstancePlacement {
        InstancePlacement {
            descriptor: ResourceDescriptor::new(uri).with_tags(["tree"]),
            matrix: matrix::IDENTITY,
            feature_id: None,
        }
    }

    #[test]
    fn test_primitives_merge_per_tag() {
        let settings = CompilerSettings::default();
        let mut assembly = TileAssembly::new(&settings, 100.0);
        for id in 0..10 {
            assembly.add_primitive(triangle("walls", id), None);
        }
        assembly.add_primitive(triangle("roofs", 0), None);

        let states = StateCache::new();
        let (batches, groups) = assembly.finish(None, &states);
        assert_eq!(batches.len(), 2);
        assert!(groups.is_empty());
        assert_eq!(batches[0].batch.vertex_count(), 30);
        assert_eq!(batches[0].feature_count, 10);
        assert_eq!(states.len(), 1, "both batches share one state");
    }

    #[test]
    fn test_vertex_budget_splits_batches() {
        let settings = CompilerSettings::default().with_max_verts_per_batch(7);
        let mut assembly = TileAssembly::new(&settings, 100.0);
        for id in 0..5 {
            assembly.add_primitive(triangle("walls", id), None);
        }
        let (batches, _) = assembly.finish(None, &StateCache::new());
        let sizes: Vec<usize> = batches.iter().map(|b| b.batch.vertex_count()).collect();
        assert_eq!(sizes, vec![6, 6, 3]);
    }

    #[test]
    fn test_textures_split_batches() {
        let settings = CompilerSettings::default();
        let mut assembly = TileAssembly::new(&settings, 100.0);
        assembly.add_primitive(triangle("walls", 1), Some(ResourceDescriptor::new("brick")));
        assembly.add_primitive(triangle("walls", 2), None);
        let states = StateCache::new();
        let (batches, _) = assembly.finish(None, &states);
        assert_eq!(batches.len(), 2);
        assert_eq!(states.len(), 2);
    }

    #[test]
    fn test_placements_group_by_descriptor_with_lod_range() {
        let settings = CompilerSettings::default().with_lod_bin(LodBin::new("tree", 0.5));
        let chonk = Arc::new(
            Chonk::from_model(&ResourceDescriptor::new("oak_tree"), &ModelData::cube(1.0)).unwrap(),
        );
        let mut assembly = TileAssembly::new(&settings, 1000.0);
        assembly.add_placement(placement("oak_tree"), chonk.clone());
        assembly.add_placement(placement("oak_tree"), chonk.clone());
        assembly.add_placement(placement("pine"), chonk);

        let (_, groups) = assembly.finish(None, &StateCache::new());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].instances.len(), 2);
        assert!((groups[0].max_range - 500.0).abs() < 1e-3);
    }

    #[test]
    fn test_style_render_hints_reach_state() {
        let settings = CompilerSettings::default();
        let mut assembly = TileAssembly::new(&settings, 100.0);
        assembly.add_primitive(triangle("walls", 1), None);
        let mut style = Style::for_level(2);
        style.render.backface_culling = Some(false);
        style.render.transparent = true;

        let (batches, _) = assembly.finish(Some(&style), &StateCache::new());
        let state = batches[0].state.as_ref().unwrap();
        assert!(state.two_sided);
        assert!(state.transparent);
    }
}
