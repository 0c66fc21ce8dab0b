//! Weakly held, deduplicated compiled objects.
//!
//! A [`ResidentArena`] maps a [`ResourceDescriptor`] to a `Weak` reference
//! of its compiled form. Compiled tiles are the strong owners; the arena only
//! finds objects, it never keeps them alive. Once the last tile using an
//! object is dropped, the next lookup compiles it again.
//!
//! Creation runs with the arena mutex held, so two tiles racing for the same
//! descriptor observe one compile and share its result.

use crate::compiled::{ArenaTexture, Chonk};
use crate::resource::ResourceDescriptor;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

/// Snapshot of one arena's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Entries in the map, dead or alive.
    pub entries: usize,
    /// Entries whose object is still alive.
    pub live: usize,
    pub creations: u64,
    pub reuses: u64,
    pub pruned: u64,
}

/// Descriptor to `Weak<T>` dedup table.
pub struct ResidentArena<T> {
    name: &'static str,
    entries: Mutex<HashMap<ResourceDescriptor, Weak<T>>>,
    creations: AtomicU64,
    reuses: AtomicU64,
    pruned: AtomicU64,
}

impl<T> ResidentArena<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
            creations: AtomicU64::new(0),
            reuses: AtomicU64::new(0),
            pruned: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the live object for `descriptor`, creating it with `make` if
    /// there is none.
    pub fn get_or_create<F>(&self, descriptor: &ResourceDescriptor, make: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        match self.try_get_or_create(descriptor, || Ok::<T, Infallible>(make())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible form of [`get_or_create`](Self::get_or_create).
    ///
    /// A failing factory publishes nothing; the next caller tries again.
    pub fn try_get_or_create<F, E>(&self, descriptor: &ResourceDescriptor, make: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut entries = self.entries.lock();

        if let Some(existing) = entries.get(descriptor).and_then(Weak::upgrade) {
            self.reuses.fetch_add(1, Ordering::Relaxed);
            return Ok(existing);
        }

        let created = Arc::new(make()?);

        // Would have to grow on this insert; drop dead entries first.
        if entries.len() == entries.capacity() {
            let pruned = Self::prune_locked(&mut entries);
            self.pruned.fetch_add(pruned as u64, Ordering::Relaxed);
        }
        entries.insert(descriptor.clone(), Arc::downgrade(&created));
        self.creations.fetch_add(1, Ordering::Relaxed);
        trace!(arena = self.name, resource = %descriptor, "Published compiled object");

        Ok(created)
    }

    /// Publishes `value` unless a live object already exists, in which case
    /// the existing one is returned and `value` is dropped.
    pub fn consolidate(&self, descriptor: &ResourceDescriptor, value: T) -> Arc<T> {
        self.get_or_create(descriptor, || value)
    }

    /// Returns the live object, if any. Never creates.
    pub fn get(&self, descriptor: &ResourceDescriptor) -> Option<Arc<T>> {
        self.entries.lock().get(descriptor).and_then(Weak::upgrade)
    }

    /// Removes entries whose object has been dropped.
    pub fn prune(&self) -> usize {
        let pruned = Self::prune_locked(&mut self.entries.lock());
        self.pruned.fetch_add(pruned as u64, Ordering::Relaxed);
        pruned
    }

    fn prune_locked(entries: &mut HashMap<ResourceDescriptor, Weak<T>>) -> usize {
        let before = entries.len();
        entries.retain(|_, weak| weak.strong_count() > 0);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn stats(&self) -> ArenaStats {
        let entries = self.entries.lock();
        ArenaStats {
            entries: entries.len(),
            live: entries.values().filter(|w| w.strong_count() > 0).count(),
            creations: self.creations.load(Ordering::Relaxed),
            reuses: self.reuses.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
        }
    }
}

/// The two arenas shared by every tile of a paging session.
pub struct ResidentData {
    pub chonks: ResidentArena<Chonk>,
    pub textures: ResidentArena<ArenaTexture>,
}

impl ResidentData {
    pub fn new() -> Self {
        Self {
            chonks: ResidentArena::new("chonks"),
            textures: ResidentArena::new("textures"),
        }
    }

    /// Prunes both arenas. Returns the number of dead entries removed.
    pub fn prune(&self) -> usize {
        self.chonks.prune() + self.textures.prune()
    }
}

impl Default for ResidentData {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    fn d(uri: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(uri)
    }

    #[test]
    fn test_returns_same_object_while_alive() {
        let arena: ResidentArena<String> = ResidentArena::new("test");
        let a = arena.get_or_create(&d("oak"), || "compiled".to_string());
        let b = arena.get_or_create(&d("oak"), || panic!("must reuse"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(arena.stats().creations, 1);
        assert_eq!(arena.stats().reuses, 1);
    }

    #[test]
    fn test_recreates_after_last_owner_drops() {
        let arena: ResidentArena<u32> = ResidentArena::new("test");
        let calls = AtomicUsize::new(0);
        let make = || {
            calls.fetch_add(1, Ordering::SeqCst);
            7
        };

        let first = arena.get_or_create(&d("oak"), make);
        drop(first);
        assert!(arena.get(&d("oak")).is_none());

        let _second = arena.get_or_create(&d("oak"), || {
            calls.fetch_add(1, Ordering::SeqCst);
            8
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_arena_does_not_keep_objects_alive() {
        let arena: ResidentArena<Vec<u8>> = ResidentArena::new("test");
        let value = arena.get_or_create(&d("tex"), || vec![0u8; 16]);
        let weak = Arc::downgrade(&value);
        drop(value);
        assert!(weak.upgrade().is_none());
        assert_eq!(arena.live_count(), 0);
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.prune(), 1);
        assert!(arena.is_empty());
    }

    #[test]
    fn test_concurrent_first_creation_runs_once() {
        let arena: Arc<ResidentArena<String>> = Arc::new(ResidentArena::new("test"));
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let arena = Arc::clone(&arena);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    arena.get_or_create(&d("streetlamp"), || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        "lamp".to_string()
                    })
                })
            })
            .collect();

        let results: Vec<Arc<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    }

    #[test]
    fn test_failed_creation_publishes_nothing() {
        let arena: ResidentArena<u32> = ResidentArena::new("test");
        let result: Result<Arc<u32>, &str> = arena.try_get_or_create(&d("bad"), || Err("boom"));
        assert_eq!(result.unwrap_err(), "boom");
        assert!(arena.is_empty());

        let ok: Result<Arc<u32>, &str> = arena.try_get_or_create(&d("bad"), || Ok(3));
        assert_eq!(*ok.unwrap(), 3);
    }

    #[test]
    fn test_consolidate_prefers_live_object() {
        let arena: ResidentArena<&'static str> = ResidentArena::new("test");
        let built = arena.get_or_create(&d("oak"), || "built");
        let decoded = arena.consolidate(&d("oak"), "decoded");
        assert!(Arc::ptr_eq(&built, &decoded));
        assert_eq!(*decoded, "built");
    }

    #[test]
    fn test_resident_data_prunes_both_arenas() {
        let data = ResidentData::new();
        assert_eq!(data.chonks.name(), "chonks");
        assert_eq!(data.textures.name(), "textures");
        assert_eq!(data.prune(), 0);
    }
}
