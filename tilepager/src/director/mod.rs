//! Tile paging for a host.
//!
//! The [`PagingDirector`] owns a pool of `tile-worker-N` threads that run
//! [`TileBuilder`](crate::builder::TileBuilder) builds. It coalesces
//! concurrent requests for the same key, supports per-tile cancellation,
//! remembers permanent failures and tracks how many tiles consumers hold.
//! When that count returns to zero the next tick releases the session's
//! shared caches.

mod error;
mod handle;
mod housekeeping;
mod paging;
mod stats;

pub use error::PagingError;
pub use handle::{PendingTile, Residency, ResidentTile};
pub use housekeeping::Housekeeping;
pub use paging::{
    default_workers, PagerConfig, PagingDirector, TickReport, DEFAULT_MAX_IDLE, DEFAULT_TICK_INTERVAL,
};
pub use stats::DirectorStats;
