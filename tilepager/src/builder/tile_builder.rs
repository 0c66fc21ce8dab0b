use super::assembly::TileAssembly;
use super::resolve::Resolver;
use super::{BuildError, Session};
use crate::cache::CacheSettings;
use crate::compiled::{decode_tile, encode_tile, CompiledTile, TileContent, TileOrigin};
use crate::content::{local_frame, ContentFactory, ContentItem};
use crate::coord::TileKey;
use crate::feature::{FeatureSource, FilterChain, SourceError};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Visibility range as a multiple of the tile's bounding radius.
pub const DEFAULT_RANGE_FACTOR: f32 = 6.0;

/// Builds compiled tiles from features.
///
/// A builder is cheap to clone and shared by all workers of a director.
///
/// # Example
///
/// ```ignore
/// let builder = TileBuilder::new()
///     .with_session(session)
///     .with_feature_source(source)
///     .with_content_factory(Arc::new(ExtrusionFactory::new()))
///     .with_cache(CacheSettings::new(bin, CachePolicy::read_write()));
///
/// let tile = builder.build(&key, &CancellationToken::new())?;
/// ```
#[derive(Clone)]
pub struct TileBuilder {
    session: Option<Arc<Session>>,
    source: Option<Arc<dyn FeatureSource>>,
    factory: Option<Arc<dyn ContentFactory>>,
    filters: FilterChain,
    cache: Option<CacheSettings>,
    range_factor: f32,
    verbose_warnings: bool,
}

impl Default for TileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TileBuilder {
    pub fn new() -> Self {
        Self {
            session: None,
            source: None,
            factory: None,
            filters: FilterChain::new(),
            cache: None,
            range_factor: DEFAULT_RANGE_FACTOR,
            verbose_warnings: false,
        }
    }

    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_feature_source(mut self, source: Arc<dyn FeatureSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_content_factory(mut self, factory: Arc<dyn ContentFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn with_filters(mut self, filters: FilterChain) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_range_factor(mut self, range_factor: f32) -> Self {
        self.range_factor = range_factor;
        self
    }

    /// Logs every tile warning at WARN level once the tile completes.
    pub fn with_verbose_warnings(mut self, verbose: bool) -> Self {
        self.verbose_warnings = verbose;
        self
    }

    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    pub fn cache(&self) -> Option<&CacheSettings> {
        self.cache.as_ref()
    }

    pub fn range_factor(&self) -> f32 {
        self.range_factor
    }

    /// Visibility range of a tile.
    pub fn range_for(&self, key: &TileKey) -> f32 {
        key.bounding_radius() as f32 * self.range_factor
    }

    /// Builds the tile for `key`, stored under `key.cache_key()`.
    pub fn build(&self, key: &TileKey, cancel: &CancellationToken) -> Result<CompiledTile, BuildError> {
        self.build_as(&key.to_string(), &key.cache_key(), key, cancel)
    }

    /// Builds the tile for `key` under an explicit name and cache key.
    pub fn build_as(
        &self,
        name: &str,
        cache_key: &str,
        key: &TileKey,
        cancel: &CancellationToken,
    ) -> Result<CompiledTile, BuildError> {
        let (session, source, factory) = self.check_config()?;
        if cancel.is_cancelled() {
            return Err(BuildError::Canceled);
        }
        let started = Instant::now();

        if let Some(tile) = self.read_from_cache(session, name, cache_key) {
            debug!(tile = %name, elapsed_ms = started.elapsed().as_millis() as u64, "Tile read from durable cache");
            return Ok(tile);
        }

        let manager = session.manager();
        let style = session.styles().style_for_level(key.level());
        let range = self.range_for(key);

        let cursor = source
            .create_cursor(key, &self.filters, cancel)
            .map_err(|e| match e {
                SourceError::Canceled => BuildError::Canceled,
                other => BuildError::SourceUnavailable(other.to_string()),
            })?;

        let mut resolver = Resolver::new(manager, cancel);
        let mut assembly = TileAssembly::new(session.settings(), range);
        let mut warnings = Vec::new();
        let mut feature_count = 0;

        for feature in cursor {
            if cancel.is_cancelled() {
                debug!(tile = %name, features = feature_count, "Tile build canceled during iteration");
                return Err(BuildError::Canceled);
            }
            let items = match factory.compile(&feature, key, style) {
                Ok(items) => items,
                Err(e) => {
                    warnings.push(e.to_string());
                    continue;
                }
            };
            if !items.is_empty() {
                feature_count += 1;
            }
            for item in items {
                match item {
                    ContentItem::Primitive(primitive) => {
                        let texture = match &primitive.skin {
                            Some(skin) => resolver.texture(skin)?.map(|t| t.descriptor.clone()),
                            None => None,
                        };
                        assembly.add_primitive(primitive, texture);
                    }
                    ContentItem::Instance(placement) => {
                        if let Some(chonk) = resolver.chonk(&placement.descriptor)? {
                            assembly.add_placement(placement, chonk);
                        }
                    }
                }
            }
        }

        let (batches, instance_groups) = assembly.finish(style, manager.states());
        let (resources, resolve_warnings) = resolver.finish();
        warnings.extend(resolve_warnings);

        let tile = CompiledTile {
            name: name.to_string(),
            cache_key: cache_key.to_string(),
            key: Some(*key),
            content: TileContent {
                local_to_world: local_frame(key).local_to_world(),
                range,
                batches,
                instance_groups,
                render: style.map(|s| s.render.clone()).unwrap_or_default(),
                feature_count,
            },
            resources,
            origin: TileOrigin::Built,
            warnings,
        };

        if cancel.is_cancelled() {
            return Err(BuildError::Canceled);
        }
        self.write_to_cache(&tile);

        if self.verbose_warnings {
            for warning in &tile.warnings {
                warn!(tile = %name, "{}", warning);
            }
        }
        info!(
            tile = %name,
            features = feature_count,
            batches = tile.content.batches.len(),
            placements = tile.content.placement_count(),
            warnings = tile.warnings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Built tile"
        );
        Ok(tile)
    }

    fn check_config(
        &self,
    ) -> Result<(&Arc<Session>, &Arc<dyn FeatureSource>, &Arc<dyn ContentFactory>), BuildError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| BuildError::SourceUnavailable("no session".to_string()))?;
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| BuildError::SourceUnavailable("no feature source".to_string()))?;
        let factory = self
            .factory
            .as_ref()
            .ok_or_else(|| BuildError::SourceUnavailable("no content factory".to_string()))?;
        Ok((session, source, factory))
    }

    fn read_from_cache(&self, session: &Session, name: &str, cache_key: &str) -> Option<CompiledTile> {
        let cache = self.cache.as_ref().filter(|c| c.reads_enabled())?;

        let blob = match cache.bin.read(cache_key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(e) => {
                let err = BuildError::CacheIo(e.to_string());
                warn!(tile = %name, bin = %cache.bin.id(), error = %err, "Durable read failed, building instead");
                return None;
            }
        };

        if cache.policy.is_expired(blob.last_modified) {
            debug!(tile = %name, "Durable entry expired");
            return None;
        }

        match decode_tile(&blob.data, session.manager()) {
            Ok(tile) => Some(tile),
            Err(e) => {
                warn!(tile = %name, error = %e, "Undecodable durable entry, building instead");
                None
            }
        }
    }

    fn write_to_cache(&self, tile: &CompiledTile) {
        let Some(cache) = self.cache.as_ref().filter(|c| c.writes_enabled()) else {
            return;
        };
        if tile.is_empty() {
            debug!(tile = %tile.name, "Not caching empty tile");
            return;
        }

        let result = encode_tile(tile)
            .map_err(|e| BuildError::CacheIo(e.to_string()))
            .and_then(|blob| {
                cache
                    .bin
                    .write(&tile.cache_key, &blob)
                    .map_err(|e| BuildError::CacheIo(e.to_string()))
            });
        match result {
            Ok(()) => debug!(tile = %tile.name, key = %tile.cache_key, "Wrote tile to durable cache"),
            Err(e) => warn!(tile = %tile.name, error = %e, "Skipping durable write"),
        }
    }
}
