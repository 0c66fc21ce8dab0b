use crate::builder::BuildError;
use std::time::Duration;
use thiserror::Error;

/// Errors delivered to tile requesters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PagingError {
    /// An earlier build of this key failed in a way retrying cannot fix.
    #[error("tile {key} previously failed permanently")]
    PermanentlyFailed { key: String },

    #[error("tile {key} is outside the styled level range {min}..={max}")]
    OutOfRange { key: String, min: u32, max: u32 },

    #[error("tile request canceled")]
    Canceled,

    #[error("tile request timed out after {0:?}")]
    TimedOut(Duration),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("tile worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("paging director is shut down")]
    ShutDown,
}
