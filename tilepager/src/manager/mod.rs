//! Session-wide cache aggregate.
//!
//! A [`CacheManager`] bundles every cache shared between the tiles of one
//! paging session under a single release lifecycle:
//!
//! ```text
//! CacheManager
//! ├── ResourceCache   strong, evicted when stale and unreferenced
//! ├── ResidentData    weak, chonk + texture arenas
//! └── StateCache      strong, shared render states
//! ```
//!
//! The manager is constructed per session and injected into the builder and
//! the director; there is no process-wide instance.

mod state_cache;

pub use state_cache::StateCache;

use crate::arena::{ArenaStats, ResidentData};
use crate::resource::{ResourceCache, ResourceCacheStats, ResourceLoader};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// What a bulk release dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseSummary {
    pub resources: usize,
    pub states: usize,
    pub arena_entries: usize,
}

/// Point-in-time view of all caches.
#[derive(Debug, Clone, Default)]
pub struct CacheManagerStats {
    pub resources: ResourceCacheStats,
    pub chonks: ArenaStats,
    pub textures: ArenaStats,
    pub states: usize,
    pub releases: u64,
}

pub struct CacheManager {
    resources: ResourceCache,
    resident: ResidentData,
    states: StateCache,
    releases: AtomicU64,
}

impl CacheManager {
    pub fn new(loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            resources: ResourceCache::new(loader),
            resident: ResidentData::new(),
            states: StateCache::new(),
            releases: AtomicU64::new(0),
        }
    }

    pub fn resources(&self) -> &ResourceCache {
        &self.resources
    }

    pub fn resident(&self) -> &ResidentData {
        &self.resident
    }

    pub fn states(&self) -> &StateCache {
        &self.states
    }

    /// Refreshes referenced resources and evicts stale ones.
    ///
    /// Returns the number of resources evicted.
    pub fn expire(&self, max_idle: Duration) -> usize {
        let touched = self.resources.touch_referenced();
        let evicted = self.resources.evict_stale(max_idle);
        if evicted > 0 {
            debug!(touched, evicted, "Expired idle shared resources");
        }
        evicted
    }

    /// Clears the resource and state caches and prunes the arenas.
    ///
    /// Only safe when no tile is resident; the director guarantees that.
    pub fn release(&self) -> ReleaseSummary {
        let summary = ReleaseSummary {
            resources: self.resources.clear(),
            states: self.states.clear(),
            arena_entries: self.resident.prune(),
        };
        self.releases.fetch_add(1, Ordering::Relaxed);
        info!(
            resources = summary.resources,
            states = summary.states,
            arena_entries = summary.arena_entries,
            "Released shared caches"
        );
        summary
    }

    pub fn stats(&self) -> CacheManagerStats {
        CacheManagerStats {
            resources: self.resources.stats(),
            chonks: self.resident.chonks.stats(),
            textures: self.resident.textures.stats(),
            states: self.states.len(),
            releases: self.releases.load(Ordering::Relaxed),
        }
    }
}
