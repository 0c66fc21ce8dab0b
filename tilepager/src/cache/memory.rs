//! In-memory bin with LRU eviction.

use super::{BinStats, BinStatsSnapshot, CacheBin, CacheError, CachedBlob};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Instant, SystemTime};
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    data: Vec<u8>,
    written: SystemTime,
    last_accessed: Instant,
}

struct Inner {
    entries: HashMap<String, Entry>,
    size_bytes: usize,
}

/// Size-bounded bin held in memory.
///
/// When a write would exceed the limit, least recently used entries are
/// evicted first. A blob larger than the whole limit is not stored.
pub struct MemoryCacheBin {
    id: String,
    max_size_bytes: usize,
    inner: Mutex<Inner>,
    stats: BinStats,
}

impl MemoryCacheBin {
    pub fn new(id: impl Into<String>, max_size_bytes: usize) -> Self {
        Self {
            id: id.into(),
            max_size_bytes,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                size_bytes: 0,
            }),
            stats: BinStats::new(),
        }
    }

    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    fn evict_until_fits(&self, inner: &mut Inner, incoming: usize) -> u64 {
        let mut evicted = 0;
        while inner.size_bytes + incoming > self.max_size_bytes {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(key, _)| key.clone());
            let Some(key) = oldest else { break };
            if let Some(entry) = inner.entries.remove(&key) {
                inner.size_bytes -= entry.data.len();
                evicted += 1;
            }
        }
        evicted
    }
}

impl CacheBin for MemoryCacheBin {
    fn id(&self) -> &str {
        &self.id
    }

    fn read(&self, key: &str) -> Result<Option<CachedBlob>, CacheError> {
        let mut inner = self.inner.lock();
        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed = Instant::now();
                self.stats.record_hit();
                Ok(Some(CachedBlob {
                    data: entry.data.clone(),
                    last_modified: entry.written,
                }))
            }
            None => {
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<(), CacheError> {
        if data.len() > self.max_size_bytes {
            self.stats.record_write_failure();
            return Err(CacheError::InvalidConfig(format!(
                "blob of {} bytes exceeds bin limit of {} bytes",
                data.len(),
                self.max_size_bytes
            )));
        }

        let mut inner = self.inner.lock();
        if let Some(previous) = inner.entries.remove(key) {
            inner.size_bytes -= previous.data.len();
        }
        let evicted = self.evict_until_fits(&mut inner, data.len());
        if evicted > 0 {
            self.stats.record_evictions(evicted);
            debug!(bin = %self.id, evicted, "Evicted blobs from memory bin");
        }

        inner.size_bytes += data.len();
        inner.entries.insert(
            key.to_string(),
            Entry {
                data: data.to_vec(),
                written: SystemTime::now(),
                last_accessed: Instant::now(),
            },
        );
        self.stats.record_write();
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let mut inner = self.inner.lock();
        match inner.entries.remove(key) {
            Some(entry) => {
                inner.size_bytes -= entry.data.len();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn clear(&self) -> Result<(), CacheError> {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.size_bytes = 0;
        Ok(())
    }

    fn entry_count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    fn size_bytes(&self) -> usize {
        self.inner.lock().size_bytes
    }

    fn stats(&self) -> BinStatsSnapshot {
        let inner = self.inner.lock();
        self.stats.snapshot(inner.entries.len(), inner.size_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_write_then_read() {
        let bin = MemoryCacheBin::new("test", 1024);
        bin.write("2_1_1", &[1, 2, 3]).unwrap();
        let blob = bin.read("2_1_1").unwrap().unwrap();
        assert_eq!(blob.data, vec![1, 2, 3]);
        assert!(bin.read("2_1_2").unwrap().is_none());
        assert_eq!(bin.stats().hits, 1);
        assert_eq!(bin.stats().misses, 1);
    }

    #[test]
    fn test_overwrite_replaces_and_keeps_size() {
        let bin = MemoryCacheBin::new("test", 1024);
        bin.write("k", &[0; 100]).unwrap();
        bin.write("k", &[1; 40]).unwrap();
        assert_eq!(bin.entry_count(), 1);
        assert_eq!(bin.size_bytes(), 40);
        assert_eq!(bin.read("k").unwrap().unwrap().data, vec![1; 40]);
    }

    #[test]
    fn test_lru_eviction() {
        let bin = MemoryCacheBin::new("test", 250);
        bin.write("a", &[0; 100]).unwrap();
        thread::sleep(Duration::from_millis(2));
        bin.write("b", &[0; 100]).unwrap();
        thread::sleep(Duration::from_millis(2));
        // Touch "a" so "b" becomes the least recently used entry.
        bin.read("a").unwrap();
        thread::sleep(Duration::from_millis(2));
        bin.write("c", &[0; 100]).unwrap();

        assert!(bin.read("a").unwrap().is_some());
        assert!(bin.read("b").unwrap().is_none());
        assert!(bin.read("c").unwrap().is_some());
        assert_eq!(bin.stats().evictions, 1);
        assert!(bin.size_bytes() <= 250);
    }

    #[test]
    fn test_oversized_blob_is_rejected() {
        let bin = MemoryCacheBin::new("test", 10);
        assert!(bin.write("big", &[0; 11]).is_err());
        assert_eq!(bin.entry_count(), 0);
        assert_eq!(bin.stats().write_failures, 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let bin = MemoryCacheBin::new("test", 1024);
        bin.write("a", &[0; 10]).unwrap();
        bin.write("b", &[0; 10]).unwrap();
        assert!(bin.remove("a").unwrap());
        assert!(!bin.remove("a").unwrap());
        assert_eq!(bin.size_bytes(), 10);
        bin.clear().unwrap();
        assert_eq!(bin.entry_count(), 0);
        assert_eq!(bin.size_bytes(), 0);
    }
}
