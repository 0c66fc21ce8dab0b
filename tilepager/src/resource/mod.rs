//! Shared sub-resources and the cache that loads them.
//!
//! Heavyweight inputs to tile compilation (model prototypes, skin images)
//! are named by a [`ResourceDescriptor`] and loaded through a
//! [`ResourceLoader`]. The [`ResourceCache`] makes sure a descriptor is
//! loaded at most once while anyone still uses it.
//!
//! # Architecture
//!
//! ```text
//!  worker A ─┐                       ┌──────────────────────────┐
//!            │ get_or_load(D)        │ RwLock<HashMap<D, Slot>> │
//!  worker B ─┼──────────────────────►│   read lock: find slot   │
//!            │                       │   write lock: new slot   │
//!  worker C ─┘                       └────────────┬─────────────┘
//!                                                 │ per-slot mutex
//!                                                 ▼
//!                                     ResourceLoader::load(D)  (once)
//! ```
//!
//! Entries are strongly owned by the cache. A periodic
//! [`ResourceCache::evict_stale`] drops entries that have been idle past a
//! threshold and are no longer referenced by any compiled tile.

mod cache;
mod descriptor;
mod loader;

pub use cache::{ResourceCache, ResourceCacheStats, SharedHandle};
pub use descriptor::ResourceDescriptor;
pub use loader::{
    CatalogLoader, ImageData, LoadError, LoadedResource, ModelData, ResourceLoader,
    ResourcePayload,
};
