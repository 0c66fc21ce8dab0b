//! Durable cache bins for built tiles.
//!
//! A bin is an external key to blob store addressed by the tile cache key
//! (`"{level}_{x}_{y}"` or an explicit name). Access is gated by a
//! [`CachePolicy`]: reads can be disabled, writes can be disabled and
//! entries can expire.
//!
//! Implementations:
//! - [`DiskCacheBin`] - one directory per bin, atomic write-then-rename
//! - [`MemoryCacheBin`] - size-bounded in-memory bin with LRU eviction
//! - [`NoOpCacheBin`] - never stores anything

mod disk;
mod memory;
mod path;
mod stats;
mod r#trait;
mod types;

pub use disk::DiskCacheBin;
pub use memory::MemoryCacheBin;
pub use path::{bin_directory, blob_path, validate_key, BLOB_EXTENSION};
pub use r#trait::{CacheBin, NoOpCacheBin};
pub use stats::{BinStats, BinStatsSnapshot};
pub use types::{CacheError, CachePolicy, CacheSettings, CachedBlob};
