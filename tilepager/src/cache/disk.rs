//! Disk-backed bin.
//!
//! Each bin owns one directory. Writes go to a temporary file that is then
//! renamed over the target, so a reader never sees a half-written blob. The
//! in-memory index is rebuilt by scanning the directory when the bin opens.

use super::path::{bin_directory, blob_path, key_from_path};
use super::{BinStats, BinStatsSnapshot, CacheBin, CacheError, CachedBlob};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tracing::{debug, info, warn};

struct Index {
    /// key -> blob size in bytes
    entries: HashMap<String, u64>,
    size_bytes: u64,
}

/// Bin storing one file per tile under `<cache_dir>/<bin_id>/`.
pub struct DiskCacheBin {
    id: String,
    cache_dir: PathBuf,
    max_size_bytes: Option<u64>,
    index: Mutex<Index>,
    temp_counter: AtomicU64,
    stats: BinStats,
}

impl DiskCacheBin {
    /// Opens (creating if needed) the bin directory and indexes its blobs.
    ///
    /// # Arguments
    ///
    /// * `cache_dir` - Root cache directory shared by all bins
    /// * `bin_id` - Directory name of this bin
    /// * `max_size_bytes` - Optional size limit enforced after each write
    pub fn open(
        cache_dir: impl AsRef<Path>,
        bin_id: impl Into<String>,
        max_size_bytes: Option<u64>,
    ) -> Result<Self, CacheError> {
        let id = bin_id.into();
        let cache_dir = cache_dir.as_ref().to_path_buf();
        let dir = bin_directory(&cache_dir, &id);
        fs::create_dir_all(&dir)?;

        let index = Self::scan(&dir)?;
        info!(
            bin = %id,
            path = %dir.display(),
            entries = index.entries.len(),
            size_bytes = index.size_bytes,
            "Opened disk cache bin"
        );

        Ok(Self {
            id,
            cache_dir,
            max_size_bytes,
            index: Mutex::new(index),
            temp_counter: AtomicU64::new(0),
            stats: BinStats::new(),
        })
    }

    pub fn directory(&self) -> PathBuf {
        bin_directory(&self.cache_dir, &self.id)
    }

    fn scan(dir: &Path) -> Result<Index, CacheError> {
        let mut index = Index {
            entries: HashMap::new(),
            size_bytes: 0,
        };
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(key) = key_from_path(&path) else {
                continue;
            };
            if let Ok(metadata) = fs::metadata(&path) {
                index.size_bytes += metadata.len();
                index.entries.insert(key, metadata.len());
            }
        }
        Ok(index)
    }

    fn temp_path(&self, target: &Path) -> PathBuf {
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(format!(".{}.{}.tmp", std::process::id(), n));
        target.with_file_name(name)
    }

    fn write_atomic(&self, target: &Path, data: &[u8]) -> io::Result<()> {
        let temp = self.temp_path(target);
        let result = (|| {
            let mut file = fs::File::create(&temp)?;
            file.write_all(data)?;
            file.sync_all()?;
            fs::rename(&temp, target)
        })();
        if result.is_err() {
            let _ = fs::remove_file(&temp);
        }
        result
    }

    /// Evicts oldest blobs until the bin is at 90% of its limit.
    ///
    /// Returns the number of blobs removed. No-op without a limit. Blobs that
    /// cannot be removed are logged and skipped.
    pub fn evict_if_over_limit(&self) -> usize {
        self.evict_over_limit(None)
    }

    fn evict_over_limit(&self, keep: Option<&str>) -> usize {
        let Some(limit) = self.max_size_bytes else {
            return 0;
        };
        let mut index = self.index.lock();
        if index.size_bytes <= limit {
            return 0;
        }
        let target = limit / 10 * 9;

        let mut candidates: Vec<(String, SystemTime)> = index
            .entries
            .keys()
            .filter(|key| Some(key.as_str()) != keep)
            .filter_map(|key| {
                let path = blob_path(&self.cache_dir, &self.id, key).ok()?;
                let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
                Some((key.clone(), modified))
            })
            .collect();
        candidates.sort_by_key(|(_, modified)| *modified);

        let mut evicted = 0;
        for (key, _) in candidates {
            if index.size_bytes <= target {
                break;
            }
            let path = match blob_path(&self.cache_dir, &self.id, &key) {
                Ok(path) => path,
                Err(e) => {
                    warn!(bin = %self.id, key = %key, error = %e, "Failed to evict blob");
                    continue;
                }
            };
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(bin = %self.id, key = %key, error = %e, "Failed to evict blob");
                    continue;
                }
            }
            if let Some(size) = index.entries.remove(&key) {
                index.size_bytes = index.size_bytes.saturating_sub(size);
                evicted += 1;
            }
        }

        if evicted > 0 {
            self.stats.record_evictions(evicted as u64);
            debug!(bin = %self.id, evicted, size_bytes = index.size_bytes, "Evicted blobs from disk bin");
        }
        evicted
    }
}

impl CacheBin for DiskCacheBin {
    fn id(&self) -> &str {
        &self.id
    }

    fn read(&self, key: &str) -> Result<Option<CachedBlob>, CacheError> {
        let path = blob_path(&self.cache_dir, &self.id, key)?;
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.stats.record_miss();
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let last_modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .unwrap_or_else(|_| SystemTime::now());
        self.stats.record_hit();
        Ok(Some(CachedBlob {
            data,
            last_modified,
        }))
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<(), CacheError> {
        let path = blob_path(&self.cache_dir, &self.id, key)?;
        if let Err(e) = fs::create_dir_all(self.directory()).and_then(|_| self.write_atomic(&path, data)) {
            self.stats.record_write_failure();
            return Err(e.into());
        }

        {
            let mut index = self.index.lock();
            let size = data.len() as u64;
            if let Some(previous) = index.entries.insert(key.to_string(), size) {
                index.size_bytes = index.size_bytes.saturating_sub(previous);
            }
            index.size_bytes += size;
        }
        self.stats.record_write();
        // The blob is stored; eviction trouble is logged, not reported.
        self.evict_over_limit(Some(key));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let path = blob_path(&self.cache_dir, &self.id, key)?;
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let mut index = self.index.lock();
        match index.entries.remove(key) {
            Some(size) => {
                index.size_bytes = index.size_bytes.saturating_sub(size);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn clear(&self) -> Result<(), CacheError> {
        let dir = self.directory();
        let mut index = self.index.lock();
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        index.entries.clear();
        index.size_bytes = 0;
        info!(bin = %self.id, "Cleared disk cache bin");
        Ok(())
    }

    fn entry_count(&self) -> usize {
        self.index.lock().entries.len()
    }

    fn size_bytes(&self) -> usize {
        self.index.lock().size_bytes as usize
    }

    fn stats(&self) -> BinStatsSnapshot {
        let index = self.index.lock();
        self.stats
            .snapshot(index.entries.len(), index.size_bytes as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_bin(temp: &TempDir) -> DiskCacheBin {
        DiskCacheBin::open(temp.path(), "buildings", None).unwrap()
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let bin = create_test_bin(&temp);
        bin.write("2_1_1", b"tile").unwrap();

        let blob = bin.read("2_1_1").unwrap().unwrap();
        assert_eq!(blob.data, b"tile");
        assert!(temp.path().join("buildings/2_1_1.tpg").exists());
        assert_eq!(bin.entry_count(), 1);
        assert_eq!(bin.size_bytes(), 4);
    }

    #[test]
    fn test_missing_key_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let bin = create_test_bin(&temp);
        assert!(bin.read("9_9_9").unwrap().is_none());
        assert_eq!(bin.stats().misses, 1);
    }

    #[test]
    fn test_overwrite() {
        let temp = TempDir::new().unwrap();
        let bin = create_test_bin(&temp);
        bin.write("k", b"first").unwrap();
        bin.write("k", b"2nd").unwrap();
        assert_eq!(bin.read("k").unwrap().unwrap().data, b"2nd");
        assert_eq!(bin.entry_count(), 1);
        assert_eq!(bin.size_bytes(), 3);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let temp = TempDir::new().unwrap();
        let bin = create_test_bin(&temp);
        bin.write("a", b"x").unwrap();
        bin.write("b", b"y").unwrap();
        let names: Vec<String> = fs::read_dir(bin.directory())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.ends_with(".tpg")));
    }

    #[test]
    fn test_index_rebuilt_on_open() {
        let temp = TempDir::new().unwrap();
        {
            let bin = create_test_bin(&temp);
            bin.write("1_0_0", &[0; 10]).unwrap();
            bin.write("1_1_0", &[0; 20]).unwrap();
        }
        fs::write(temp.path().join("buildings/stray.txt"), b"ignored").unwrap();

        let reopened = create_test_bin(&temp);
        assert_eq!(reopened.entry_count(), 2);
        assert_eq!(reopened.size_bytes(), 30);
    }

    #[test]
    fn test_invalid_key() {
        let temp = TempDir::new().unwrap();
        let bin = create_test_bin(&temp);
        assert!(matches!(
            bin.write("../escape", b"x"),
            Err(CacheError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_remove_and_clear() {
        let temp = TempDir::new().unwrap();
        let bin = create_test_bin(&temp);
        bin.write("a", b"1").unwrap();
        bin.write("b", b"2").unwrap();
        assert!(bin.remove("a").unwrap());
        assert!(!bin.remove("a").unwrap());
        bin.clear().unwrap();
        assert_eq!(bin.entry_count(), 0);
        assert!(bin.read("b").unwrap().is_none());
        assert!(bin.directory().exists());
    }

    #[test]
    fn test_eviction_over_limit() {
        let temp = TempDir::new().unwrap();
        let bin = DiskCacheBin::open(temp.path(), "small", Some(100)).unwrap();
        bin.write("a", &[0; 40]).unwrap();
        bin.write("b", &[0; 40]).unwrap();
        bin.write("c", &[0; 40]).unwrap();
        assert!(bin.size_bytes() <= 90);
        assert!(bin.stats().evictions >= 1);
        assert!(bin.entry_count() < 3);
    }

    #[test]
    fn test_oversized_write_is_kept_until_next_write() {
        let temp = TempDir::new().unwrap();
        let bin = DiskCacheBin::open(temp.path(), "small", Some(100)).unwrap();

        bin.write("big", &[7; 150]).unwrap();
        assert_eq!(bin.read("big").unwrap().unwrap().data, vec![7; 150]);
        assert_eq!(bin.stats().write_failures, 0);

        bin.write("next", &[1; 10]).unwrap();
        assert!(bin.read("big").unwrap().is_none());
        assert!(bin.read("next").unwrap().is_some());
        assert_eq!(bin.evict_if_over_limit(), 0);
    }
}
