//! Bin trait definition for dependency injection.

use super::types::{CacheError, CachedBlob};
use super::BinStatsSnapshot;

/// Key to blob store for built tiles.
///
/// Writing an existing key overwrites it. Implementations must be safe to
/// call from several worker threads at once.
pub trait CacheBin: Send + Sync {
    /// Bin identifier, used in paths and logs.
    fn id(&self) -> &str;

    /// Reads a blob. `Ok(None)` is a plain miss.
    fn read(&self, key: &str) -> Result<Option<CachedBlob>, CacheError>;

    fn write(&self, key: &str, data: &[u8]) -> Result<(), CacheError>;

    /// Removes an entry. Returns true if it existed.
    fn remove(&self, key: &str) -> Result<bool, CacheError>;

    fn clear(&self) -> Result<(), CacheError>;

    fn entry_count(&self) -> usize;

    fn size_bytes(&self) -> usize;

    fn stats(&self) -> BinStatsSnapshot;
}

/// Bin that never stores anything.
///
/// Every read misses and every write is silently dropped.
#[derive(Debug, Default)]
pub struct NoOpCacheBin;

impl NoOpCacheBin {
    pub fn new() -> Self {
        Self
    }
}

impl CacheBin for NoOpCacheBin {
    fn id(&self) -> &str {
        "noop"
    }

    fn read(&self, _key: &str) -> Result<Option<CachedBlob>, CacheError> {
        Ok(None)
    }

    fn write(&self, _key: &str, _data: &[u8]) -> Result<(), CacheError> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    fn clear(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn entry_count(&self) -> usize {
        0
    }

    fn size_bytes(&self) -> usize {
        0
    }

    fn stats(&self) -> BinStatsSnapshot {
        BinStatsSnapshot::default()
    }
}
