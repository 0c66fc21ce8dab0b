use super::{FeatureCursor, FeatureSource, FilterChain, RawFeature, SourceError};
use crate::coord::{GeoExtent, TileKey, TileProfile};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Feature source backed by an in-memory list.
///
/// A feature belongs to the tile whose extent contains its centroid, so each
/// feature is produced by exactly one tile per level, including features on
/// the outer border of the profile. The source counts the
/// cursors it creates, which makes it useful for observing cache hits.
pub struct MemoryFeatureSource {
    name: String,
    features: Vec<RawFeature>,
    bounds: GeoExtent,
    open: AtomicBool,
    cursors_created: AtomicUsize,
}

impl MemoryFeatureSource {
    pub fn new(name: impl Into<String>, features: Vec<RawFeature>) -> Self {
        Self {
            name: name.into(),
            features,
            bounds: *TileProfile::global_geodetic().extent(),
            open: AtomicBool::new(true),
            cursors_created: AtomicUsize::new(0),
        }
    }

    /// Profile whose tiles will request features. Defaults to global geodetic.
    pub fn with_profile(mut self, profile: &TileProfile) -> Self {
        self.bounds = *profile.extent();
        self
    }

    /// Opens or closes the source. A closed source refuses cursors.
    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    /// Number of cursors handed out so far.
    pub fn cursors_created(&self) -> usize {
        self.cursors_created.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FeatureSource for MemoryFeatureSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_cursor(
        &self,
        key: &TileKey,
        filters: &FilterChain,
        cancel: &CancellationToken,
    ) -> Result<FeatureCursor, SourceError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(SourceError::NotOpen(self.name.clone()));
        }
        if cancel.is_cancelled() {
            return Err(SourceError::Canceled);
        }
        self.cursors_created.fetch_add(1, Ordering::SeqCst);

        let extent = *key.extent();
        let matched: Vec<RawFeature> = self
            .features
            .iter()
            .filter(|feature| {
                feature
                    .geometry
                    .centroid()
                    .is_some_and(|[x, y]| extent.contains_within(x, y, &self.bounds))
            })
            .cloned()
            .collect();

        trace!(
            source = %self.name,
            tile = %key,
            features = matched.len(),
            "Opened memory cursor"
        );

        Ok(filters.filter_cursor(Box::new(matched.into_iter())))
    }
}
