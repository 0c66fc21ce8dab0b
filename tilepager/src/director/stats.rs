use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters of a director.
#[derive(Debug, Default)]
pub(super) struct DirectorCounters {
    pub requested: AtomicU64,
    pub coalesced: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub canceled: AtomicU64,
    pub refused: AtomicU64,
    pub releases: AtomicU64,
    pub panics: AtomicU64,
}

impl DirectorCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time director statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectorStats {
    /// Tiles currently held by consumers.
    pub resident: usize,
    /// Builds running or queued.
    pub in_flight: usize,
    pub requested: u64,
    /// Requests that joined an existing build.
    pub coalesced: u64,
    pub completed: u64,
    pub failed: u64,
    pub canceled: u64,
    /// Requests refused before building (out of range, failed, shut down).
    pub refused: u64,
    /// Bulk cache releases on entering idle.
    pub releases: u64,
    pub panics: u64,
    pub permanent_failures: usize,
}

impl DirectorStats {
    pub(super) fn from_counters(
        counters: &DirectorCounters,
        resident: usize,
        in_flight: usize,
        permanent_failures: usize,
    ) -> Self {
        Self {
            resident,
            in_flight,
            requested: counters.requested.load(Ordering::Relaxed),
            coalesced: counters.coalesced.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            canceled: counters.canceled.load(Ordering::Relaxed),
            refused: counters.refused.load(Ordering::Relaxed),
            releases: counters.releases.load(Ordering::Relaxed),
            panics: counters.panics.load(Ordering::Relaxed),
            permanent_failures,
        }
    }
}

impl fmt::Display for DirectorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "resident={} in_flight={} requested={} coalesced={} completed={} failed={} canceled={} releases={}",
            self.resident,
            self.in_flight,
            self.requested,
            self.coalesced,
            self.completed,
            self.failed,
            self.canceled,
            self.releases
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_counters() {
        let counters = DirectorCounters::default();
        DirectorCounters::bump(&counters.requested);
        DirectorCounters::bump(&counters.requested);
        DirectorCounters::bump(&counters.coalesced);

        let stats = DirectorStats::from_counters(&counters, 3, 1, 0);
        assert_eq!(stats.requested, 2);
        assert_eq!(stats.coalesced, 1);
        assert_eq!(stats.resident, 3);
        assert!(stats.to_string().contains("resident=3"));
    }
}
