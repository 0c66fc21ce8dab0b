use super::handle::{Residency, ResidentTile, TileResult};
use super::stats::{DirectorCounters, DirectorStats};
use super::{PagingError, PendingTile};
use crate::builder::{BuildError, TileBuilder};
use crate::compiled::CompiledTile;
use crate::coord::TileKey;
use crate::manager::{CacheManager, ReleaseSummary};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default idle time before an unreferenced shared resource is evicted.
pub const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(10);

/// Default interval between housekeeping ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Runtime configuration of a [`PagingDirector`].
#[derive(Debug, Clone, PartialEq)]
pub struct PagerConfig {
    /// Number of tile worker threads.
    pub workers: usize,
    /// Tile visibility range as a multiple of its bounding radius.
    pub range_factor: f32,
    pub tick_interval: Duration,
    /// Idle time before unreferenced shared resources are evicted.
    pub max_idle: Duration,
    pub verbose_warnings: bool,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            range_factor: crate::builder::DEFAULT_RANGE_FACTOR,
            tick_interval: DEFAULT_TICK_INTERVAL,
            max_idle: DEFAULT_MAX_IDLE,
            verbose_warnings: false,
        }
    }
}

impl PagerConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = max_idle;
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }
}

/// Worker count matching the available cores, at least one.
pub fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

/// Outcome of one [`PagingDirector::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Stale shared resources evicted.
    pub evicted: usize,
    /// Present when the director went idle and released its caches.
    pub released: Option<ReleaseSummary>,
}

struct WorkItem {
    key: TileKey,
    id: u64,
    cancel: CancellationToken,
}

struct InFlight {
    id: u64,
    cancel: CancellationToken,
    waiters: Vec<oneshot::Sender<TileResult>>,
}

struct Shared {
    builder: TileBuilder,
    manager: Option<Arc<CacheManager>>,
    level_range: Option<(u32, u32)>,
    max_idle: Duration,
    residency: Arc<Residency>,
    in_flight: DashMap<TileKey, InFlight>,
    failures: DashMap<TileKey, String>,
    active_builds: AtomicUsize,
    next_id: AtomicU64,
    counters: DirectorCounters,
    /// Serializes build dispatch and hand-off with the idle release check.
    lifecycle: Mutex<()>,
    shutdown: CancellationToken,
}

/// Pages compiled tiles in and out for a host.
///
/// ```text
/// request(key) ──► in-flight? ──yes──► join waiters
///                      │no
///                      ▼
///               work queue ──► tile-worker-N ──► TileBuilder::build
///                                                     │
///          PendingTile ◄── ResidentTile per waiter ◄──┘
/// ```
///
/// Consumers hold [`ResidentTile`]s. When the last one is dropped the
/// director is idle, and the next [`tick`](Self::tick) releases every shared
/// cache of the session in one step.
pub struct PagingDirector {
    shared: Arc<Shared>,
    sender: Mutex<Option<Sender<WorkItem>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    config: PagerConfig,
}

impl PagingDirector {
    /// Starts the worker pool.
    ///
    /// `builder` is reconfigured with the range factor and warning verbosity
    /// from `config`.
    pub fn new(builder: TileBuilder, config: PagerConfig) -> io::Result<Self> {
        let builder = builder
            .with_range_factor(config.range_factor)
            .with_verbose_warnings(config.verbose_warnings);
        let manager = builder.session().map(|s| Arc::clone(s.manager()));
        let level_range = builder.session().and_then(|s| s.styles().level_range());

        let shared = Arc::new(Shared {
            builder,
            manager,
            level_range,
            max_idle: config.max_idle,
            residency: Arc::new(Residency::new()),
            in_flight: DashMap::new(),
            failures: DashMap::new(),
            active_builds: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
            counters: DirectorCounters::default(),
            lifecycle: Mutex::new(()),
            shutdown: CancellationToken::new(),
        });

        let (tx, rx) = mpsc::channel::<WorkItem>();
        let rx = Arc::new(Mutex::new(rx));
        let worker_count = config.workers.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        for i in 0..worker_count {
            let shared = Arc::clone(&shared);
            let rx = Arc::clone(&rx);
            let handle = thread::Builder::new()
                .name(format!("tile-worker-{}", i))
                .spawn(move || worker_loop(shared, rx))?;
            workers.push(handle);
        }

        info!(
            workers = worker_count,
            range_factor = config.range_factor,
            max_idle_ms = config.max_idle.as_millis() as u64,
            "Paging director started"
        );

        Ok(Self {
            shared,
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            config,
        })
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    /// Shared caches of the session, if the builder has one.
    pub fn manager(&self) -> Option<&Arc<CacheManager>> {
        self.shared.manager.as_ref()
    }

    /// Levels the style sheet covers; `None` means unrestricted.
    pub fn level_range(&self) -> Option<(u32, u32)> {
        self.shared.level_range
    }

    /// Requests the tile for `key`.
    ///
    /// Concurrent requests for the same key share a single build; each
    /// requester receives its own [`ResidentTile`].
    pub fn request(&self, key: TileKey) -> PendingTile {
        let shared = &self.shared;
        DirectorCounters::bump(&shared.counters.requested);
        let (tx, rx) = oneshot::channel();

        if let Some(error) = self.refusal(&key) {
            DirectorCounters::bump(&shared.counters.refused);
            debug!(tile = %key, error = %error, "Tile request refused");
            let _ = tx.send(Err(error));
            return PendingTile::new(key, rx, CancellationToken::new());
        }

        let _guard = shared.lifecycle.lock();
        let (id, cancel) = match shared.in_flight.entry(key) {
            Entry::Occupied(mut entry) if !entry.get().cancel.is_cancelled() => {
                entry.get_mut().waiters.push(tx);
                DirectorCounters::bump(&shared.counters.coalesced);
                let cancel = entry.get().cancel.clone();
                return PendingTile::new(key, rx, cancel);
            }
            Entry::Occupied(mut entry) => {
                // Canceled through a PendingTile but still running; its
                // worker finds the entry superseded when it completes.
                let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
                let cancel = shared.shutdown.child_token();
                let stale = entry.insert(InFlight {
                    id,
                    cancel: cancel.clone(),
                    waiters: vec![tx],
                });
                for waiter in stale.waiters {
                    let _ = waiter.send(Err(PagingError::Canceled));
                }
                DirectorCounters::bump(&shared.counters.canceled);
                debug!(tile = %key, build = stale.id, "Canceled tile build superseded");
                (id, cancel)
            }
            Entry::Vacant(entry) => {
                let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
                let cancel = shared.shutdown.child_token();
                entry.insert(InFlight {
                    id,
                    cancel: cancel.clone(),
                    waiters: vec![tx],
                });
                (id, cancel)
            }
        };

        shared.active_builds.fetch_add(1, Ordering::SeqCst);
        let item = WorkItem {
            key,
            id,
            cancel: cancel.clone(),
        };
        let sent = match self.sender.lock().as_ref() {
            Some(sender) => sender.send(item).is_ok(),
            None => false,
        };
        if !sent {
            shared.active_builds.fetch_sub(1, Ordering::SeqCst);
            if let Some((_, entry)) = shared.in_flight.remove(&key) {
                for waiter in entry.waiters {
                    let _ = waiter.send(Err(PagingError::ShutDown));
                }
            }
        } else {
            debug!(tile = %key, build = id, "Tile build queued");
        }
        PendingTile::new(key, rx, cancel)
    }

    fn refusal(&self, key: &TileKey) -> Option<PagingError> {
        let shared = &self.shared;
        if shared.shutdown.is_cancelled() {
            return Some(PagingError::ShutDown);
        }
        if shared.failures.contains_key(key) {
            return Some(PagingError::PermanentlyFailed {
                key: key.to_string(),
            });
        }
        match shared.level_range {
            Some((min, max)) if key.level() < min || key.level() > max => {
                Some(PagingError::OutOfRange {
                    key: key.to_string(),
                    min,
                    max,
                })
            }
            _ => None,
        }
    }

    /// Cancels the in-flight build for `key`.
    ///
    /// Waiters receive [`PagingError::Canceled`]; a later request starts a
    /// fresh build. Returns false if nothing was in flight.
    pub fn cancel(&self, key: &TileKey) -> bool {
        let shared = &self.shared;
        let _guard = shared.lifecycle.lock();
        match shared.in_flight.remove(key) {
            Some((_, entry)) => {
                entry.cancel.cancel();
                for waiter in entry.waiters {
                    let _ = waiter.send(Err(PagingError::Canceled));
                }
                DirectorCounters::bump(&shared.counters.canceled);
                debug!(tile = %key, build = entry.id, "Tile build canceled");
                true
            }
            None => false,
        }
    }

    /// Gives a tile back. Same as dropping it.
    pub fn release(&self, tile: ResidentTile) {
        drop(tile);
    }

    /// Tiles currently held by consumers.
    pub fn resident_count(&self) -> usize {
        self.shared.residency.count()
    }

    /// Forgets permanent failures, e.g. after a configuration change.
    pub fn reset_failures(&self) -> usize {
        let count = self.shared.failures.len();
        self.shared.failures.clear();
        if count > 0 {
            info!(count, "Permanent tile failures reset");
        }
        count
    }

    /// Periodic maintenance.
    ///
    /// Evicts stale shared resources, then releases all shared caches if
    /// every tile handed out since the last release has been given back and
    /// no build is running.
    pub fn tick(&self) -> TickReport {
        let shared = &self.shared;
        let Some(manager) = shared.manager.as_ref() else {
            return TickReport::default();
        };
        let evicted = manager.expire(shared.max_idle);

        let _guard = shared.lifecycle.lock();
        let idle = shared.active_builds.load(Ordering::SeqCst) == 0
            && shared.residency.count() == 0
            && shared.residency.take_detected();
        if !idle {
            return TickReport {
                evicted,
                released: None,
            };
        }

        let summary = manager.release();
        DirectorCounters::bump(&shared.counters.releases);
        debug!(releases = shared.counters.releases.load(Ordering::Relaxed), "Director went idle");
        TickReport {
            evicted,
            released: Some(summary),
        }
    }

    pub fn stats(&self) -> DirectorStats {
        let shared = &self.shared;
        DirectorStats::from_counters(
            &shared.counters,
            shared.residency.count(),
            shared.in_flight.len(),
            shared.failures.len(),
        )
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    /// Cancels all builds and stops the workers.
    ///
    /// Pending requests receive [`PagingError::ShutDown`]. Tiles already
    /// handed out stay valid.
    pub fn shutdown(&self) {
        let shared = &self.shared;
        if shared.shutdown.is_cancelled() && self.sender.lock().is_none() {
            return;
        }
        shared.shutdown.cancel();
        drop(self.sender.lock().take());

        let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in workers {
            if handle.join().is_err() {
                warn!("Tile worker exited abnormally");
            }
        }

        let _guard = shared.lifecycle.lock();
        let keys: Vec<TileKey> = shared.in_flight.iter().map(|e| *e.key()).collect();
        for key in keys {
            if let Some((_, entry)) = shared.in_flight.remove(&key) {
                for waiter in entry.waiters {
                    let _ = waiter.send(Err(PagingError::ShutDown));
                }
            }
        }
        info!("Paging director shut down");
    }
}

impl Drop for PagingDirector {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<Shared>, rx: Arc<Mutex<Receiver<WorkItem>>>) {
    loop {
        let item = {
            let receiver = rx.lock();
            receiver.recv()
        };
        match item {
            Ok(item) => shared.run(item),
            Err(_) => break,
        }
    }
    debug!("Tile worker stopping");
}

impl Shared {
    fn run(&self, item: WorkItem) {
        let started = Instant::now();
        let result = if item.cancel.is_cancelled() {
            Err(PagingError::Canceled)
        } else {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                self.builder.build(&item.key, &item.cancel)
            }));
            match outcome {
                Ok(Ok(tile)) => Ok(Arc::new(tile)),
                Ok(Err(BuildError::Canceled)) => Err(PagingError::Canceled),
                Ok(Err(e)) => Err(PagingError::Build(e)),
                Err(payload) => Err(PagingError::WorkerPanicked(panic_message(payload))),
            }
        };
        self.complete(item, result, started);
    }

    fn complete(&self, item: WorkItem, result: Result<Arc<CompiledTile>, PagingError>, started: Instant) {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let _guard = self.lifecycle.lock();

        // A canceled or superseded build no longer owns the entry.
        let entry = self
            .in_flight
            .remove_if(&item.key, |_, entry| entry.id == item.id)
            .map(|(_, entry)| entry);

        match &result {
            Ok(tile) => {
                DirectorCounters::bump(&self.counters.completed);
                debug!(
                    tile = %item.key,
                    origin = %tile.origin,
                    elapsed_ms,
                    "Tile build completed"
                );
            }
            Err(PagingError::Canceled) => {
                if entry.is_some() {
                    DirectorCounters::bump(&self.counters.canceled);
                }
                debug!(tile = %item.key, elapsed_ms, "Tile build stopped after cancellation");
            }
            Err(PagingError::Build(BuildError::SourceUnavailable(reason))) => {
                DirectorCounters::bump(&self.counters.failed);
                self.failures.insert(item.key, reason.clone());
                warn!(tile = %item.key, reason = %reason, "Tile failed permanently");
            }
            Err(PagingError::WorkerPanicked(message)) => {
                DirectorCounters::bump(&self.counters.failed);
                DirectorCounters::bump(&self.counters.panics);
                warn!(tile = %item.key, panic = %message, "Tile build panicked");
            }
            Err(e) => {
                DirectorCounters::bump(&self.counters.failed);
                warn!(tile = %item.key, error = %e, "Tile build failed");
            }
        }

        if let Some(entry) = entry {
            for waiter in entry.waiters {
                let delivery = match &result {
                    Ok(tile) => Ok(ResidentTile::new(Arc::clone(tile), &self.residency)),
                    Err(e) => Err(e.clone()),
                };
                // A dropped receiver drops its ResidentTile here.
                let _ = waiter.send(delivery);
            }
        }

        self.active_builds.fetch_sub(1, Ordering::SeqCst);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
