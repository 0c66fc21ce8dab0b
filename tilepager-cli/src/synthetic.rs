//! Deterministic demo content for the CLI.
//!
//! Every tile gets the same features on every run: a mix of extruded
//! buildings, oak trees and streetlamps scattered over its extent.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tilepager::content::{Style, StyleSheet};
use tilepager::coord::TileKey;
use tilepager::feature::{FeatureCursor, FeatureSource, FilterChain, Geometry, RawFeature, SourceError};
use tilepager::resource::{CatalogLoader, ImageData, ModelData, ResourceDescriptor};
use tokio_util::sync::CancellationToken;

/// Footprint edge of a generated building, in degrees.
const BUILDING_SIZE_DEG: f64 = 0.0002;

pub struct SyntheticSource {
    features_per_tile: usize,
    cursors_created: AtomicUsize,
}

impl SyntheticSource {
    pub fn new(features_per_tile: usize) -> Self {
        Self {
            features_per_tile,
            cursors_created: AtomicUsize::new(0),
        }
    }

    pub fn cursors_created(&self) -> usize {
        self.cursors_created.load(Ordering::Relaxed)
    }

    fn features_for(&self, key: &TileKey) -> Vec<RawFeature> {
        let extent = key.extent();
        let mut rng = SplitMix::new(key.level(), key.x(), key.y());
        let id_base = (u64::from(key.level()) << 56) | (u64::from(key.x()) << 28) | u64::from(key.y());

        (0..self.features_per_tile)
            .map(|i| {
                let x = extent.xmin + extent.width() * (0.05 + 0.9 * rng.next_f64());
                let y = extent.ymin + extent.height() * (0.05 + 0.9 * rng.next_f64());
                let id = id_base.wrapping_add(i as u64);
                match i % 3 {
                    0 => {
                        let s = BUILDING_SIZE_DEG.min(extent.width() * 0.01);
                        RawFeature::new(
                            id,
                            Geometry::Polygon(vec![[x, y], [x + s, y], [x + s, y + s], [x, y + s]]),
                        )
                        .with_attr("height", 5.0 + 35.0 * rng.next_f64())
                    }
                    1 => RawFeature::new(id, Geometry::Point([x, y]))
                        .with_attr("model", "oak_tree")
                        .with_attr("heading", 360.0 * rng.next_f64()),
                    _ => RawFeature::new(id, Geometry::Point([x, y])).with_attr("model", "streetlamp"),
                }
            })
            .collect()
    }
}

impl FeatureSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn create_cursor(
        &self,
        key: &TileKey,
        filters: &FilterChain,
        cancel: &CancellationToken,
    ) -> Result<FeatureCursor, SourceError> {
        if cancel.is_cancelled() {
            return Err(SourceError::Canceled);
        }
        self.cursors_created.fetch_add(1, Ordering::Relaxed);
        Ok(filters.filter_cursor(Box::new(self.features_for(key).into_iter())))
    }
}

/// Models and textures referenced by the synthetic features.
pub fn synthetic_loader() -> Arc<CatalogLoader> {
    Arc::new(
        CatalogLoader::new()
            .with_model("oak_tree", ModelData::cube(6.0).with_skin(ResourceDescriptor::new("bark")))
            .with_model("streetlamp", ModelData::cube(0.5))
            .with_image("bark", ImageData::solid(4, 4, [90, 60, 30, 255]))
            .with_image("brick", ImageData::solid(4, 4, [180, 70, 50, 255])),
    )
}

/// Style sheet covering exactly `level`.
pub fn synthetic_styles(level: u32) -> StyleSheet {
    StyleSheet::new().with_style(Style::for_level(level).with_wall_skin(ResourceDescriptor::new("brick")))
}

/// SplitMix64 seeded from the tile address.
struct SplitMix(u64);

impl SplitMix {
    fn new(level: u32, x: u32, y: u32) -> Self {
        Self(
            u64::from(level)
                .wrapping_mul(0x9E37_79B9_7F4A_7C15)
                ^ u64::from(x).wrapping_mul(0xBF58_476D_1CE4_E5B9)
                ^ u64::from(y).wrapping_mul(0x94D0_49BB_1331_11EB),
        )
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilepager::coord::TileProfile;

    #[test]
    fn test_features_are_deterministic_and_inside() {
        let key = TileProfile::global_geodetic().tile_key(3, 2, 1).unwrap();
        let source = SyntheticSource::new(9);
        let a = source.features_for(&key);
        let b = source.features_for(&key);
        assert_eq!(a.len(), 9);
        assert_eq!(a, b);
        for feature in &a {
            let [x, y] = feature.geometry.centroid().unwrap();
            assert!(key.extent().contains(x, y));
        }
    }

    #[test]
    fn test_cursor_counts() {
        let key = TileProfile::global_geodetic().tile_key(1, 0, 0).unwrap();
        let source = SyntheticSource::new(3);
        let cursor = source
            .create_cursor(&key, &FilterChain::new(), &CancellationToken::new())
            .unwrap();
        assert_eq!(cursor.count(), 3);
        assert_eq!(source.cursors_created(), 1);
    }
}
