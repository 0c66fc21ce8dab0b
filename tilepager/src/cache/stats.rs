//! Bin statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters kept by a bin.
#[derive(Debug, Default)]
pub struct BinStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    write_failures: AtomicU64,
    evictions: AtomicU64,
}

impl BinStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    /// Snapshot including the caller's current size figures.
    pub fn snapshot(&self, entries: usize, size_bytes: usize) -> BinStatsSnapshot {
        BinStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries,
            size_bytes,
        }
    }
}

/// Point-in-time bin statistics for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub write_failures: u64,
    pub evictions: u64,
    pub entries: usize,
    pub size_bytes: usize,
}

impl BinStatsSnapshot {
    /// Fraction of reads that hit (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Format statistics as a human-readable string.
    pub fn format(&self, bin_id: &str) -> String {
        format!(
            r#"Cache bin: {}
  Entries:        {}
  Size:           {:.2} MB
  Hits:           {}
  Misses:         {}
  Hit Rate:       {:.1}%
  Writes:         {}
  Write Failures: {}
  Evictions:      {}"#,
            bin_id,
            self.entries,
            self.size_bytes as f64 / 1_048_576.0,
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.writes,
            self.write_failures,
            self.evictions,
        )
    }
}
