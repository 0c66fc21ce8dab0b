//! Per-feature content generation.
//!
//! A [`ContentFactory`] turns one [`RawFeature`](crate::feature::RawFeature)
//! into drawable primitives and model placements. The builder merges the
//! primitives of a tile into batches and groups placements by model.
//!
//! Coordinates produced here are metres in a local frame centred on the
//! tile centroid; [`local_frame`] converts profile units into that frame.

mod extrusion;
mod style;
mod types;

pub use extrusion::{ExtrusionFactory, TAG_LINES, TAG_ROOFS, TAG_WALLS};
pub use style::{RenderBin, RenderHints, Style, StyleSheet};
pub use types::{
    local_frame, matrix, ContentError, ContentFactory, ContentItem, ContentPrimitive,
    InstancePlacement, LocalFrame, Mat4,
};
