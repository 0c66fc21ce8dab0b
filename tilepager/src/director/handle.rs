//! Handles given to tile consumers.

use super::PagingError;
use crate::compiled::CompiledTile;
use crate::coord::TileKey;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio_util::sync::CancellationToken;

/// Counts tiles currently held by consumers.
#[derive(Debug, Default)]
pub struct Residency {
    count: AtomicUsize,
    detected: AtomicBool,
}

impl Residency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// True if a tile was handed out since the last call.
    pub(super) fn take_detected(&self) -> bool {
        self.detected.swap(false, Ordering::SeqCst)
    }

    pub(super) fn is_detected(&self) -> bool {
        self.detected.load(Ordering::SeqCst)
    }
}

/// A tile held by a consumer.
///
/// The residency count goes up when the handle is created and down when it
/// is dropped, so releasing a tile is simply dropping its handle.
pub struct ResidentTile {
    tile: Arc<CompiledTile>,
    residency: Arc<Residency>,
}

impl ResidentTile {
    pub(super) fn new(tile: Arc<CompiledTile>, residency: &Arc<Residency>) -> Self {
        residency.count.fetch_add(1, Ordering::SeqCst);
        residency.detected.store(true, Ordering::SeqCst);
        Self {
            tile,
            residency: Arc::clone(residency),
        }
    }

    /// Shared compiled tile. Coalesced requesters see the same object.
    pub fn tile(&self) -> &Arc<CompiledTile> {
        &self.tile
    }
}

impl Deref for ResidentTile {
    type Target = CompiledTile;

    fn deref(&self) -> &CompiledTile {
        &self.tile
    }
}

impl Drop for ResidentTile {
    fn drop(&mut self) {
        self.residency.count.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for ResidentTile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResidentTile")
            .field("name", &self.tile.name)
            .field("origin", &self.tile.origin)
            .finish()
    }
}

pub(super) type TileResult = Result<ResidentTile, PagingError>;

/// Outstanding tile request.
pub struct PendingTile {
    key: TileKey,
    rx: oneshot::Receiver<TileResult>,
    cancel: CancellationToken,
}

impl PendingTile {
    pub(super) fn new(key: TileKey, rx: oneshot::Receiver<TileResult>, cancel: CancellationToken) -> Self {
        Self { key, rx, cancel }
    }

    pub fn key(&self) -> &TileKey {
        &self.key
    }

    /// Cancels the build backing this request.
    ///
    /// Coalesced requesters of the same key share the build and are
    /// canceled with it. A later request for the key starts a fresh build.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Blocks until the tile is ready.
    ///
    /// Must not be called from inside an async runtime; use
    /// [`recv`](Self::recv) there.
    pub fn wait(self) -> TileResult {
        self.rx.blocking_recv().unwrap_or(Err(PagingError::ShutDown))
    }

    /// Blocks for at most `timeout`, canceling the build when it expires.
    pub fn wait_timeout(mut self, timeout: Duration) -> TileResult {
        let deadline = Instant::now() + timeout;
        let mut backoff = Duration::from_micros(100);
        loop {
            match self.rx.try_recv() {
                Ok(result) => return result,
                Err(TryRecvError::Closed) => return Err(PagingError::ShutDown),
                Err(TryRecvError::Empty) => {}
            }
            let now = Instant::now();
            if now >= deadline {
                self.cancel.cancel();
                return Err(PagingError::TimedOut(timeout));
            }
            thread::sleep(backoff.min(deadline - now));
            backoff = (backoff * 2).min(Duration::from_millis(5));
        }
    }

    /// Awaits the tile.
    pub async fn recv(self) -> TileResult {
        self.rx.await.unwrap_or(Err(PagingError::ShutDown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiled::{TileContent, TileOrigin, TileResources};
    use crate::coord::TileProfile;

    fn create_test_tile() -> Arc<CompiledTile> {
        Arc::new(CompiledTile {
            name: "0/0/0".to_string(),
            cache_key: "0_0_0".to_string(),
            key: None,
            content: TileContent::default(),
            resources: TileResources::default(),
            origin: TileOrigin::Built,
            warnings: Vec::new(),
        })
    }

    fn create_test_key() -> TileKey {
        TileProfile::global_geodetic().tile_key(0, 0, 0).unwrap()
    }

    #[test]
    fn test_resident_tile_counts() {
        let residency = Arc::new(Residency::new());
        let tile = create_test_tile();

        let a = ResidentTile::new(tile.clone(), &residency);
        let b = ResidentTile::new(tile, &residency);
        assert_eq!(residency.count(), 2);
        assert!(residency.is_detected());
        assert_eq!(a.name, "0/0/0");

        drop(a);
        assert_eq!(residency.count(), 1);
        drop(b);
        assert_eq!(residency.count(), 0);
        assert!(residency.take_detected());
        assert!(!residency.take_detected());
    }

    #[test]
    fn test_dropping_unreceived_result_releases() {
        let residency = Arc::new(Residency::new());
        let (tx, rx) = oneshot::channel();
        let pending = PendingTile::new(create_test_key(), rx, CancellationToken::new());
        tx.send(Ok(ResidentTile::new(create_test_tile(), &residency)))
            .unwrap();
        assert_eq!(residency.count(), 1);
        drop(pending);
        assert_eq!(residency.count(), 0);
    }

    #[test]
    fn test_wait_timeout_cancels() {
        let (_tx, rx) = oneshot::channel::<TileResult>();
        let cancel = CancellationToken::new();
        let pending = PendingTile::new(create_test_key(), rx, cancel.clone());
        let err = pending.wait_timeout(Duration::from_millis(10)).unwrap_err();
        assert_eq!(err, PagingError::TimedOut(Duration::from_millis(10)));
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_closed_channel_is_shutdown() {
        let (tx, rx) = oneshot::channel::<TileResult>();
        drop(tx);
        let pending = PendingTile::new(create_test_key(), rx, CancellationToken::new());
        assert_eq!(pending.wait().unwrap_err(), PagingError::ShutDown);
    }

    #[tokio::test]
    async fn test_recv() {
        let residency = Arc::new(Residency::new());
        let (tx, rx) = oneshot::channel();
        let pending = PendingTile::new(create_test_key(), rx, CancellationToken::new());
        tx.send(Ok(ResidentTile::new(create_test_tile(), &residency)))
            .unwrap();
        let tile = pending.recv().await.unwrap();
        assert_eq!(tile.cache_key, "0_0_0");
    }
}
