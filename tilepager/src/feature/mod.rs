//! Raw vector features and the sources that produce them.
//!
//! A [`FeatureSource`] hands the builder a fresh [`FeatureCursor`] per tile.
//! Cursors are forward-only and consumed once; restarting means asking the
//! source for a new cursor. A [`FilterChain`] runs over every feature before
//! the builder sees it.

mod filter;
mod memory;
mod source;
mod types;

pub use filter::{AttributeFilter, FeatureFilter, FilterChain};
pub use memory::MemoryFeatureSource;
pub use source::{FeatureCursor, FeatureSource, SourceError};
pub use types::{AttributeValue, Attributes, Geometry, RawFeature};
