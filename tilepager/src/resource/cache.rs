use super::{LoadError, LoadedResource, ResourceDescriptor, ResourceLoader};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Strong reference to a cached resource.
pub type SharedHandle = Arc<LoadedResource>;

/// One descriptor's entry. The mutex serializes loading of this descriptor.
struct Slot {
    value: Mutex<Option<SharedHandle>>,
    last_touched: Mutex<Instant>,
}

impl Slot {
    fn new() -> Self {
        Self {
            value: Mutex::new(None),
            last_touched: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_touched.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_touched.lock().elapsed()
    }
}

/// Snapshot of [`ResourceCache`] counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub loads: u64,
    pub load_failures: u64,
    pub evictions: u64,
}

impl ResourceCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Keyed store of shared sub-resources.
///
/// Lookups share a read lock over the slot map; the write lock is only held
/// long enough to insert a new empty slot. Loading happens under the slot's
/// own mutex, so a descriptor loads once while other descriptors load in
/// parallel. A failed or canceled load leaves the slot empty and the next
/// caller retries.
pub struct ResourceCache {
    loader: Arc<dyn ResourceLoader>,
    slots: RwLock<HashMap<ResourceDescriptor, Arc<Slot>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
    evictions: AtomicU64,
}

impl ResourceCache {
    pub fn new(loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            loader,
            slots: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            load_failures: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns the cached resource for `descriptor`, loading it if needed.
    ///
    /// Concurrent callers for the same descriptor block on the slot while
    /// the first one loads, then share its result.
    ///
    /// # Errors
    ///
    /// Returns the loader's error, or [`LoadError::Canceled`] when `cancel`
    /// fired before the load started.
    pub fn get_or_load(
        &self,
        descriptor: &ResourceDescriptor,
        cancel: &CancellationToken,
    ) -> Result<SharedHandle, LoadError> {
        if cancel.is_cancelled() {
            return Err(LoadError::Canceled);
        }

        let slot = self.slot_for(descriptor);
        let mut value = slot.value.lock();

        if let Some(handle) = value.as_ref() {
            slot.touch();
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(handle));
        }

        // We may have waited behind another loader that failed.
        if cancel.is_cancelled() {
            return Err(LoadError::Canceled);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        match self.loader.load(descriptor) {
            Ok(loaded) => {
                let handle = Arc::new(loaded);
                *value = Some(Arc::clone(&handle));
                slot.touch();
                self.loads.fetch_add(1, Ordering::Relaxed);
                debug!(resource = %descriptor, "Loaded shared resource");
                Ok(handle)
            }
            Err(e) => {
                self.load_failures.fetch_add(1, Ordering::Relaxed);
                warn!(resource = %descriptor, error = %e, "Failed to load shared resource");
                Err(e)
            }
        }
    }

    fn slot_for(&self, descriptor: &ResourceDescriptor) -> Arc<Slot> {
        if let Some(slot) = self.slots.read().get(descriptor) {
            return Arc::clone(slot);
        }
        Arc::clone(
            self.slots
                .write()
                .entry(descriptor.clone())
                .or_insert_with(|| Arc::new(Slot::new())),
        )
    }

    /// Returns the resource if it is already loaded. Never loads.
    pub fn get(&self, descriptor: &ResourceDescriptor) -> Option<SharedHandle> {
        let slot = Arc::clone(self.slots.read().get(descriptor)?);
        let value = slot.value.lock();
        value.as_ref().map(|handle| {
            slot.touch();
            Arc::clone(handle)
        })
    }

    /// Refreshes the timestamp of one entry. Returns false if absent.
    pub fn touch(&self, descriptor: &ResourceDescriptor) -> bool {
        match self.slots.read().get(descriptor) {
            Some(slot) => {
                slot.touch();
                true
            }
            None => false,
        }
    }

    /// Refreshes every entry that is still referenced outside the cache.
    ///
    /// Returns the number of entries touched.
    pub fn touch_referenced(&self) -> usize {
        let slots = self.slots.read();
        let mut touched = 0;
        for slot in slots.values() {
            let referenced = slot
                .value
                .try_lock()
                .map(|value| value.as_ref().is_some_and(|h| Arc::strong_count(h) > 1))
                // A slot locked by a loader is in use.
                .unwrap_or(true);
            if referenced {
                slot.touch();
                touched += 1;
            }
        }
        touched
    }

    /// Removes entries idle for at least `max_idle` that nobody references.
    ///
    /// Entries currently being loaded, or held by a compiled tile, survive.
    /// Returns the number of entries removed.
    pub fn evict_stale(&self, max_idle: Duration) -> usize {
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|_, slot| {
            // Another thread holds this slot (mid-load or mid-lookup).
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            let idle = slot.idle_for() >= max_idle;
            match slot.value.lock().as_ref() {
                Some(handle) => !(idle && Arc::strong_count(handle) == 1),
                None => !idle,
            }
        });
        let evicted = before - slots.len();
        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
            debug!(evicted, remaining = slots.len(), "Evicted stale resources");
        }
        evicted
    }

    /// Drops every entry. Outstanding handles stay valid.
    pub fn clear(&self) -> usize {
        let mut slots = self.slots.write();
        let count = slots.len();
        slots.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Returns true if a loaded entry exists for `descriptor`.
    pub fn contains(&self, descriptor: &ResourceDescriptor) -> bool {
        self.slots
            .read()
            .get(descriptor)
            .is_some_and(|slot| slot.value.lock().is_some())
    }

    pub fn stats(&self) -> ResourceCacheStats {
        ResourceCacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
