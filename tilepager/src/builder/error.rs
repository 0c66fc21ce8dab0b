//! Error types for tile builds.

use thiserror::Error;

/// Errors produced by [`super::TileBuilder::build`].
///
/// `ResourceMissing` and `CacheIo` never fail a build on their own: the
/// former becomes a tile warning, the latter degrades to a cache miss or a
/// skipped write. They are still typed so callers can format them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Missing feature source, content factory or session, or the source
    /// refused to open. Not worth retrying until configuration changes.
    #[error("tile source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("shared resource '{descriptor}' is missing: {reason}")]
    ResourceMissing { descriptor: String, reason: String },

    #[error("tile build canceled")]
    Canceled,

    #[error("durable cache I/O failed: {0}")]
    CacheIo(String),
}

impl BuildError {
    /// True if building the same key again may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, BuildError::SourceUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(!BuildError::SourceUnavailable("no source".into()).is_retryable());
        assert!(BuildError::Canceled.is_retryable());
        assert!(BuildError::CacheIo("disk full".into()).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = BuildError::ResourceMissing {
            descriptor: "oak_tree".into(),
            reason: "not found".into(),
        };
        assert_eq!(err.to_string(), "shared resource 'oak_tree' is missing: not found");
    }
}
