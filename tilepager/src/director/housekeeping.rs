//! Background ticking of a [`PagingDirector`].

use super::PagingDirector;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// How often stats are logged, in ticks.
const STATS_EVERY_TICKS: u64 = 20;

/// Thread that calls [`PagingDirector::tick`] at the configured interval
/// and periodically logs cache statistics.
///
/// Stops when dropped.
pub struct Housekeeping {
    thread_handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl Housekeeping {
    pub fn start(director: Arc<PagingDirector>) -> io::Result<Self> {
        let interval = director.config().tick_interval;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let thread_handle = thread::Builder::new()
            .name("pager-housekeeping".to_string())
            .spawn(move || Self::run_loop(director, interval, shutdown_clone))?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            shutdown,
        })
    }

    fn run_loop(director: Arc<PagingDirector>, interval: Duration, shutdown: Arc<AtomicBool>) {
        let check_interval = interval.min(Duration::from_millis(100));
        let mut next_tick = Instant::now() + interval;
        let mut ticks: u64 = 0;

        loop {
            if shutdown.load(Ordering::Relaxed) || director.is_shut_down() {
                debug!("Housekeeping received shutdown signal");
                break;
            }
            if Instant::now() >= next_tick {
                director.tick();
                ticks += 1;
                if ticks % STATS_EVERY_TICKS == 0 {
                    Self::log_stats(&director);
                }
                next_tick = Instant::now() + interval;
            }
            thread::sleep(check_interval);
        }
    }

    fn log_stats(director: &PagingDirector) {
        let stats = director.stats();
        match director.manager() {
            Some(manager) => {
                let caches = manager.stats();
                info!(
                    resident = stats.resident,
                    in_flight = stats.in_flight,
                    completed = stats.completed,
                    failed = stats.failed,
                    resources = caches.resources.entries,
                    resource_hit_rate = format!("{:.1}%", caches.resources.hit_rate() * 100.0),
                    chonks = caches.chonks.live,
                    textures = caches.textures.live,
                    states = caches.states,
                    releases = caches.releases,
                    "Paging stats"
                );
            }
            None => info!(%stats, "Paging stats"),
        }
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Housekeeping {
    fn drop(&mut self) {
        self.stop();
    }
}
