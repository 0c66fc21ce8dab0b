use super::{FilterChain, RawFeature};
use crate::coord::TileKey;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Forward-only stream of features for one tile.
pub type FeatureCursor = Box<dyn Iterator<Item = RawFeature> + Send>;

/// Errors a feature source can report when asked for a cursor.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("feature source '{0}' is not open")]
    NotOpen(String),

    #[error("failed to query features for tile {key}: {reason}")]
    Query { key: String, reason: String },

    #[error("feature query canceled")]
    Canceled,
}

/// Provider of raw features.
///
/// Implementations must be shareable across worker threads. Every call to
/// [`create_cursor`](Self::create_cursor) returns an independent cursor.
pub trait FeatureSource: Send + Sync {
    /// Human-readable source name used in logs.
    fn name(&self) -> &str;

    /// Opens a cursor over the features belonging to `key`.
    ///
    /// The filter chain is applied by the source so that filtered features
    /// never reach the builder.
    fn create_cursor(
        &self,
        key: &TileKey,
        filters: &FilterChain,
        cancel: &CancellationToken,
    ) -> Result<FeatureCursor, SourceError>;
}
