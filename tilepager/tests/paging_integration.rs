//! End-to-end paging behavior through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tilepager::builder::{Session, TileBuilder};
use tilepager::cache::{CacheBin, CachePolicy, CacheSettings, DiskCacheBin, MemoryCacheBin};
use tilepager::compiled::{Chonk, TileOrigin};
use tilepager::content::{ExtrusionFactory, StyleSheet};
use tilepager::coord::{TileKey, TileProfile};
use tilepager::director::{PagerConfig, PagingDirector, PagingError};
use tilepager::feature::{
    FeatureCursor, FeatureSource, FilterChain, Geometry, MemoryFeatureSource, RawFeature,
    SourceError,
};
use tilepager::manager::CacheManager;
use tilepager::resource::{CatalogLoader, ModelData, ResourceDescriptor};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Fixtures
// ============================================================================

fn key(level: u32, x: u32, y: u32) -> TileKey {
    TileProfile::global_geodetic().tile_key(level, x, y).unwrap()
}

/// Two oak trees and one building inside tile 2/1/1.
fn scenario_features() -> Vec<RawFeature> {
    vec![
        RawFeature::new(1, Geometry::Point([-120.0, 20.0])).with_attr("model", "oak_tree"),
        RawFeature::new(2, Geometry::Point([-110.0, 25.0])).with_attr("model", "oak_tree"),
        RawFeature::new(
            3,
            Geometry::Polygon(vec![
                [-100.0, 30.0],
                [-99.999, 30.0],
                [-99.999, 30.001],
                [-100.0, 30.001],
            ]),
        )
        .with_attr("height", 15.0),
    ]
}

/// One streetlamp at the center of each key.
fn streetlamp_features(keys: &[TileKey]) -> Vec<RawFeature> {
    keys.iter()
        .enumerate()
        .map(|(i, key)| {
            let (x, y) = key.extent().centroid();
            RawFeature::new(i as u64, Geometry::Point([x, y])).with_attr("model", "streetlamp")
        })
        .collect()
}

fn create_loader() -> Arc<CatalogLoader> {
    Arc::new(
        CatalogLoader::new()
            .with_model("oak_tree", ModelData::cube(4.0))
            .with_model("streetlamp", ModelData::cube(1.0)),
    )
}

fn create_builder(
    loader: Arc<CatalogLoader>,
    source: Arc<dyn FeatureSource>,
) -> (Arc<CacheManager>, TileBuilder) {
    let manager = Arc::new(CacheManager::new(loader));
    let session = Arc::new(Session::new(manager.clone(), StyleSheet::new()));
    let builder = TileBuilder::new()
        .with_session(session)
        .with_feature_source(source)
        .with_content_factory(Arc::new(ExtrusionFactory::new()));
    (manager, builder)
}

/// Wraps a source and cancels the build once `after` features were read.
struct CancelAfter {
    inner: MemoryFeatureSource,
    after: usize,
    read: Arc<AtomicUsize>,
    armed: bool,
}

impl FeatureSource for CancelAfter {
    fn name(&self) -> &str {
        "cancel-after"
    }

    fn create_cursor(
        &self,
        key: &TileKey,
        filters: &FilterChain,
        cancel: &CancellationToken,
    ) -> Result<FeatureCursor, SourceError> {
        let cursor = self.inner.create_cursor(key, filters, cancel)?;
        if !self.armed {
            return Ok(cursor);
        }
        let after = self.after;
        let read = self.read.clone();
        let cancel = cancel.clone();
        Ok(Box::new(cursor.inspect(move |_| {
            if read.fetch_add(1, Ordering::SeqCst) + 1 >= after {
                cancel.cancel();
            }
        })))
    }
}

// ============================================================================
// Sharing
// ============================================================================

#[test]
fn test_concurrent_tiles_compile_shared_model_once() {
    let keys: Vec<TileKey> = (0..50).map(|i| key(4, i % 25, i / 25)).collect();
    let loader = create_loader();
    let source = Arc::new(MemoryFeatureSource::new("lamps", streetlamp_features(&keys)));
    let (manager, builder) = create_builder(loader.clone(), source);
    let director = PagingDirector::new(builder, PagerConfig::default().with_workers(8)).unwrap();

    let pending: Vec<_> = keys.iter().map(|k| director.request(*k)).collect();
    let tiles: Vec<_> = pending.into_iter().map(|p| p.wait().unwrap()).collect();

    let lamp = ResourceDescriptor::new("streetlamp");
    assert_eq!(loader.load_count("streetlamp"), 1);
    assert_eq!(manager.resident().chonks.stats().creations, 1);

    let first: &Arc<Chonk> = tiles[0].resources.chonk(&lamp).unwrap();
    for tile in &tiles {
        assert_eq!(tile.content.placement_count(), 1);
        assert!(Arc::ptr_eq(first, tile.resources.chonk(&lamp).unwrap()));
    }
    assert_eq!(director.resident_count(), 50);
}

#[test]
fn test_scenario_tile_two_trees() {
    let loader = create_loader();
    let source = Arc::new(MemoryFeatureSource::new("scenario", scenario_features()));
    let (manager, builder) = create_builder(loader.clone(), source.clone());
    let bin = Arc::new(MemoryCacheBin::new("scenario", 16 * 1024 * 1024));
    let builder = builder.with_cache(CacheSettings::new(bin.clone(), CachePolicy::read_write()));
    let director = PagingDirector::new(builder, PagerConfig::default().with_workers(2)).unwrap();

    let tile = director.request(key(2, 1, 1)).wait().unwrap();
    let oak = ResourceDescriptor::new("oak_tree");

    assert_eq!(tile.origin, TileOrigin::Built);
    assert_eq!(tile.content.feature_count, 3);
    assert_eq!(manager.resources().len(), 1);
    assert!(manager.resources().contains(&oak));
    assert_eq!(manager.resident().chonks.live_count(), 1);
    assert_eq!(tile.content.instance_groups.len(), 1);
    assert_eq!(tile.content.instance_group(&oak).unwrap().instances.len(), 2);
    assert!(bin.read("2_1_1").unwrap().is_some());
    assert_eq!(source.cursors_created(), 1);

    // Same key again comes from the bin.
    drop(tile);
    let again = director.request(key(2, 1, 1)).wait().unwrap();
    assert!(again.is_from_cache());
    assert_eq!(source.cursors_created(), 1);
    assert_eq!(again.content.instance_group(&oak).unwrap().instances.len(), 2);
}

#[test]
fn test_concurrent_requests_same_key_make_once() {
    let loader = create_loader();
    let source = Arc::new(MemoryFeatureSource::new("scenario", scenario_features()));
    let (manager, builder) = create_builder(loader.clone(), source.clone());
    let director = Arc::new(PagingDirector::new(builder, PagerConfig::default().with_workers(4)).unwrap());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let director = director.clone();
            thread::spawn(move || director.request(key(2, 1, 1)).wait().unwrap())
        })
        .collect();
    let tiles: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(loader.load_count("oak_tree"), 1);
    assert_eq!(manager.resident().chonks.stats().creations, 1);
    assert!(source.cursors_created() <= 16);
    assert_eq!(director.resident_count(), 16);
    drop(tiles);
    assert_eq!(director.resident_count(), 0);
}

// ============================================================================
// Weak arena
// ============================================================================

#[test]
fn test_release_only_tile_recreates_model() {
    let loader = create_loader();
    let source = Arc::new(MemoryFeatureSource::new("scenario", scenario_features()));
    let (manager, builder) = create_builder(loader.clone(), source);
    let oak = ResourceDescriptor::new("oak_tree");
    let cancel = CancellationToken::new();

    let tile = builder.build(&key(2, 1, 1), &cancel).unwrap();
    assert!(manager.resident().chonks.get(&oak).is_some());

    drop(tile);
    assert!(manager.resident().chonks.get(&oak).is_none());

    let mut made = 0;
    let model = ModelData::cube(4.0);
    let chonk = manager.resident().chonks.get_or_create(&oak, || {
        made += 1;
        Chonk::from_model(&oak, &model).unwrap()
    });
    assert_eq!(made, 1);
    assert_eq!(chonk.descriptor(), &oak);
    assert_eq!(manager.resident().chonks.stats().creations, 2);
}

// ============================================================================
// Durable cache
// ============================================================================

#[test]
fn test_second_build_from_disk_bin() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let bin = Arc::new(DiskCacheBin::open(temp_dir.path(), "tiles", None).unwrap());
    let loader = create_loader();
    let source = Arc::new(MemoryFeatureSource::new("scenario", scenario_features()));
    let (_manager, builder) = create_builder(loader, source.clone());
    let builder = builder.with_cache(CacheSettings::new(bin.clone(), CachePolicy::read_write()));
    let cancel = CancellationToken::new();

    let first = builder.build(&key(2, 1, 1), &cancel).unwrap();
    assert!(!first.is_from_cache());
    let second = builder.build(&key(2, 1, 1), &cancel).unwrap();
    assert!(second.is_from_cache());
    assert_eq!(source.cursors_created(), 1);
    assert_eq!(second.content.placement_count(), first.content.placement_count());
    assert_eq!(bin.entry_count(), 1);

    // A fresh handle on the same directory sees the entry.
    let reopened = DiskCacheBin::open(temp_dir.path(), "tiles", None).unwrap();
    assert!(reopened.read("2_1_1").unwrap().is_some());
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn test_cancel_during_iteration_then_rebuild() {
    let loader = create_loader();
    let read = Arc::new(AtomicUsize::new(0));
    let canceling = Arc::new(CancelAfter {
        inner: MemoryFeatureSource::new("scenario", scenario_features()),
        after: 2,
        read: read.clone(),
        armed: true,
    });
    let (manager, builder) = create_builder(loader.clone(), canceling);

    let err = builder.build(&key(2, 1, 1), &CancellationToken::new()).unwrap_err();
    assert_eq!(err, tilepager::builder::BuildError::Canceled);
    assert!(read.load(Ordering::SeqCst) >= 1);

    let plain = Arc::new(CancelAfter {
        inner: MemoryFeatureSource::new("scenario", scenario_features()),
        after: 0,
        read,
        armed: false,
    });
    let session = builder.session().unwrap().clone();
    let rebuilt = TileBuilder::new()
        .with_session(session)
        .with_feature_source(plain)
        .with_content_factory(Arc::new(ExtrusionFactory::new()))
        .build(&key(2, 1, 1), &CancellationToken::new())
        .unwrap();

    assert_eq!(rebuilt.content.placement_count(), 2);
    // The resource loaded before cancellation is reused.
    assert_eq!(loader.load_count("oak_tree"), 1);
    assert_eq!(manager.resources().len(), 1);
}

#[test]
fn test_director_cancel_then_fresh_request() {
    let loader = create_loader();
    let source = Arc::new(MemoryFeatureSource::new("scenario", scenario_features()));
    let (_manager, builder) = create_builder(loader, source);
    let director = PagingDirector::new(builder, PagerConfig::default().with_workers(1)).unwrap();

    let pending = director.request(key(2, 1, 1));
    let canceled = director.cancel(&key(2, 1, 1));
    let result = pending.wait();
    if canceled {
        assert_eq!(result.unwrap_err(), PagingError::Canceled);
    }

    let tile = director.request(key(2, 1, 1)).wait().unwrap();
    assert_eq!(tile.content.placement_count(), 2);
}

// ============================================================================
// Idle release
// ============================================================================

#[test]
fn test_idle_release_exactly_once() {
    let loader = create_loader();
    let source = Arc::new(MemoryFeatureSource::new("scenario", scenario_features()));
    let (manager, builder) = create_builder(loader.clone(), source);
    let director = PagingDirector::new(builder, PagerConfig::default().with_workers(2)).unwrap();

    let a = director.request(key(2, 1, 1)).wait().unwrap();
    let b = director.request(key(2, 1, 1)).wait().unwrap();
    assert_eq!(director.resident_count(), 2);

    for _ in 0..3 {
        assert!(director.tick().released.is_none());
    }
    drop(a);
    assert!(director.tick().released.is_none());
    assert_eq!(manager.resources().len(), 1);

    director.release(b);
    assert!(director.tick().released.is_some());
    assert!(director.tick().released.is_none());
    assert_eq!(manager.resources().len(), 0);
    assert_eq!(manager.stats().releases, 1);

    // A second cycle releases again, and reloads what it needs.
    let c = director.request(key(2, 1, 1)).wait().unwrap();
    assert_eq!(loader.load_count("oak_tree"), 2);
    drop(c);
    assert!(director.tick().released.is_some());
    assert_eq!(director.stats().releases, 2);
}

#[test]
fn test_wait_timeout_cancels_build() {
    struct Stalled;

    impl FeatureSource for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        fn create_cursor(
            &self,
            _key: &TileKey,
            _filters: &FilterChain,
            cancel: &CancellationToken,
        ) -> Result<FeatureCursor, SourceError> {
            while !cancel.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            Err(SourceError::Canceled)
        }
    }

    let (_manager, builder) = create_builder(create_loader(), Arc::new(Stalled));
    let director = PagingDirector::new(builder, PagerConfig::default().with_workers(1)).unwrap();

    let err = director
        .request(key(2, 1, 1))
        .wait_timeout(Duration::from_millis(20))
        .unwrap_err();
    assert_eq!(err, PagingError::TimedOut(Duration::from_millis(20)));

    // The worker is freed by the cancellation and can serve other keys.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while director.stats().in_flight > 0 && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(director.stats().in_flight, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_recv() {
    let source = Arc::new(MemoryFeatureSource::new("scenario", scenario_features()));
    let (_manager, builder) = create_builder(create_loader(), source);
    let director = PagingDirector::new(builder, PagerConfig::default().with_workers(1)).unwrap();

    let tile = director.request(key(2, 1, 1)).recv().await.unwrap();
    assert_eq!(tile.cache_key, "2_1_1");
    drop(tile);
    director.shutdown();
}
