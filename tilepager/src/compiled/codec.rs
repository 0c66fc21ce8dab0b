//! Durable blob encoding of compiled tiles.
//!
//! Layout: 4 magic bytes, a little-endian `u16` format version, then a
//! `bincode` body. Decoding routes every shared object back through the
//! session's caches so a tile read from disk shares chonks, textures and
//! render states with tiles built in memory.

use super::{
    ArenaTexture, Chonk, CompiledTile, DrawBatch, GeometryBatch, Instance, InstanceGroup,
    RenderState, TileContent, TileOrigin, TileResources,
};
use crate::content::{Mat4, RenderHints};
use crate::coord::TileKey;
use crate::manager::CacheManager;
use crate::resource::ResourceDescriptor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub const MAGIC: &[u8; 4] = b"TPGT";
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = MAGIC.len() + 2;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("blob is too short ({0} bytes)")]
    TooShort(usize),

    #[error("blob does not start with the tile magic")]
    BadMagic,

    #[error("unsupported tile format version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },

    #[error("failed to encode tile: {0}")]
    Encode(String),

    #[error("failed to decode tile body: {0}")]
    Decode(String),
}

#[derive(Serialize, Deserialize)]
struct BatchRecord {
    tag: String,
    batch: DrawBatch,
    state: Option<RenderState>,
    min_range: f32,
    max_range: f32,
    feature_count: usize,
}

#[derive(Serialize, Deserialize)]
struct GroupRecord {
    chonk: Chonk,
    instances: Vec<Instance>,
    min_range: f32,
    max_range: f32,
}

#[derive(Serialize, Deserialize)]
struct TileRecord {
    name: String,
    cache_key: String,
    key: Option<TileKey>,
    local_to_world: Mat4,
    range: f32,
    batches: Vec<BatchRecord>,
    groups: Vec<GroupRecord>,
    textures: Vec<ArenaTexture>,
    render: RenderHints,
    feature_count: usize,
}

/// Serializes a tile into a self-describing blob.
pub fn encode_tile(tile: &CompiledTile) -> Result<Vec<u8>, CodecError> {
    let content = &tile.content;
    let record = TileRecord {
        name: tile.name.clone(),
        cache_key: tile.cache_key.clone(),
        key: tile.key,
        local_to_world: content.local_to_world,
        range: content.range,
        batches: content
            .batches
            .iter()
            .map(|b| BatchRecord {
                tag: b.tag.clone(),
                batch: b.batch.clone(),
                state: b.state.as_deref().cloned(),
                min_range: b.min_range,
                max_range: b.max_range,
                feature_count: b.feature_count,
            })
            .collect(),
        groups: content
            .instance_groups
            .iter()
            .map(|g| GroupRecord {
                chonk: (*g.chonk).clone(),
                instances: g.instances.clone(),
                min_range: g.min_range,
                max_range: g.max_range,
            })
            .collect(),
        textures: tile
            .resources
            .textures
            .iter()
            .map(|t| (**t).clone())
            .collect(),
        render: content.render.clone(),
        feature_count: content.feature_count,
    };

    let body = bincode::serialize(&record).map_err(|e| CodecError::Encode(e.to_string()))?;
    let mut blob = Vec::with_capacity(HEADER_LEN + body.len());
    blob.extend_from_slice(MAGIC);
    blob.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    blob.extend_from_slice(&body);
    Ok(blob)
}

/// Deserializes a blob, consolidating shared objects through `manager`.
///
/// The resource cache is not populated.
pub fn decode_tile(bytes: &[u8], manager: &CacheManager) -> Result<CompiledTile, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::TooShort(bytes.len()));
    }
    if &bytes[..MAGIC.len()] != MAGIC {
        return Err(CodecError::BadMagic);
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion {
            found: version,
            expected: FORMAT_VERSION,
        });
    }

    let record: TileRecord = bincode::deserialize(&bytes[HEADER_LEN..])
        .map_err(|e| CodecError::Decode(e.to_string()))?;

    let resident = manager.resident();
    let mut resources = TileResources::default();

    for texture in record.textures {
        let descriptor = texture.descriptor.clone();
        resources
            .textures
            .push(resident.textures.consolidate(&descriptor, texture));
    }

    let instance_groups = record
        .groups
        .into_iter()
        .map(|g| {
            let descriptor: ResourceDescriptor = g.chonk.descriptor().clone();
            let chonk = resident.chonks.consolidate(&descriptor, g.chonk);
            if !resources.chonks.iter().any(|c| Arc::ptr_eq(c, &chonk)) {
                resources.chonks.push(Arc::clone(&chonk));
            }
            InstanceGroup {
                descriptor,
                chonk,
                instances: g.instances,
                min_range: g.min_range,
                max_range: g.max_range,
            }
        })
        .collect();

    let batches = record
        .batches
        .into_iter()
        .map(|b| GeometryBatch {
            tag: b.tag,
            batch: b.batch,
            state: b.state.map(|s| manager.states().share(s)),
            min_range: b.min_range,
            max_range: b.max_range,
            feature_count: b.feature_count,
        })
        .collect();

    Ok(CompiledTile {
        name: record.name,
        cache_key: record.cache_key,
        key: record.key,
        content: TileContent {
            local_to_world: record.local_to_world,
            range: record.range,
            batches,
            instance_groups,
            render: record.render,
            feature_count: record.feature_count,
        },
        resources,
        origin: TileOrigin::DurableCache,
        warnings: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::matrix;
    use crate::coord::TileProfile;
    use crate::resource::{CatalogLoader, ModelData};

    fn create_test_tile(manager: &CacheManager) -> CompiledTile {
        let d = ResourceDescriptor::new("oak_tree");
        let chonk = manager
            .resident()
            .chonks
            .get_or_create(&d, || Chonk::from_model(&d, &ModelData::cube(2.0)).unwrap());
        let mut batch = DrawBatch::new(None);
        batch.append(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], &[0, 1, 2]);
        let key = TileProfile::global_geodetic().tile_key(2, 1, 1).unwrap();

        CompiledTile {
            name: key.to_string(),
            cache_key: key.cache_key(),
            key: Some(key),
            content: TileContent {
                range: 500.0,
                batches: vec![GeometryBatch {
                    tag: "walls".to_string(),
                    batch,
                    state: Some(manager.states().share(RenderState::default())),
                    min_range: 0.0,
                    max_range: 500.0,
                    feature_count: 1,
                }],
                instance_groups: vec![InstanceGroup {
                    descriptor: d,
                    chonk: chonk.clone(),
                    instances: vec![Instance {
                        matrix: matrix::translation(1.0, 2.0, 0.0),
                        feature_id: Some(4),
                    }],
                    min_range: 0.0,
                    max_range: 250.0,
                }],
                feature_count: 2,
                ..Default::default()
            },
            resources: TileResources {
                chonks: vec![chonk],
                ..Default::default()
            },
            origin: TileOrigin::Built,
            warnings: vec!["ignored".to_string()],
        }
    }

    fn create_test_manager() -> CacheManager {
        CacheManager::new(Arc::new(CatalogLoader::new()))
    }

    #[test]
    fn test_decoded_tile_shares_live_objects() {
        let manager = create_test_manager();
        let tile = create_test_tile(&manager);
        let blob = encode_tile(&tile).unwrap();
        assert_eq!(&blob[..4], MAGIC);

        let decoded = decode_tile(&blob, &manager).unwrap();
        assert_eq!(decoded.origin, TileOrigin::DurableCache);
        assert_eq!(decoded.cache_key, "2_1_1");
        assert_eq!(decoded.key, tile.key);
        assert!(decoded.warnings.is_empty());
        assert_eq!(decoded.content.placement_count(), 1);
        assert!(Arc::ptr_eq(
            &decoded.content.instance_groups[0].chonk,
            &tile.content.instance_groups[0].chonk
        ));
        assert!(Arc::ptr_eq(
            decoded.content.batches[0].state.as_ref().unwrap(),
            tile.content.batches[0].state.as_ref().unwrap()
        ));
        assert!(decoded.resources.handles.is_empty());
    }

    #[test]
    fn test_decode_publishes_chonk_when_none_is_live() {
        let writer = create_test_manager();
        let blob = encode_tile(&create_test_tile(&writer)).unwrap();

        let reader = create_test_manager();
        let decoded = decode_tile(&blob, &reader).unwrap();
        let d = ResourceDescriptor::new("oak_tree");
        let live = reader.resident().chonks.get(&d).unwrap();
        assert!(Arc::ptr_eq(&live, &decoded.resources.chonks[0]));
        assert!(reader.resources().is_empty());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let manager = create_test_manager();
        let err = decode_tile(b"NOPE\x01\x00rest", &manager).unwrap_err();
        assert!(matches!(err, CodecError::BadMagic));
    }

    #[test]
    fn test_rejects_other_version() {
        let manager = create_test_manager();
        let mut blob = encode_tile(&create_test_tile(&manager)).unwrap();
        blob[4] = 9;
        let err = decode_tile(&blob, &manager).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnsupportedVersion {
                found: 9,
                expected: FORMAT_VERSION
            }
        ));
    }

    #[test]
    fn test_rejects_truncated_body() {
        let manager = create_test_manager();
        let blob = encode_tile(&create_test_tile(&manager)).unwrap();
        let err = decode_tile(&blob[..blob.len() / 2], &manager).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
        assert!(matches!(
            decode_tile(b"TP", &manager).unwrap_err(),
            CodecError::TooShort(2)
        ));
    }
}
