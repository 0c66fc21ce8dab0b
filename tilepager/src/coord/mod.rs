//! Quad-tree tile addressing.
//!
//! A [`TileKey`] names one cell of a [`TileProfile`]'s quad-tree by
//! `(level, x, y)` and carries the geographic extent of that cell. Keys are
//! pure values: equality, hashing and ordering only look at the address, so
//! keys created from different profiles with the same address collide.
//!
//! Rows grow southwards: `y = 0` is the northern-most row of a level.
//!
//! ```text
//! level 0 (global geodetic)       level 1
//! ┌──────────┬──────────┐         ┌────┬────┬────┬────┐
//! │  0/0/0   │  0/1/0   │         │1/0/0    ...   1/3/0│
//! │          │          │   ──►   ├────┼────┼────┼────┤
//! │          │          │         │1/0/1    ...   1/3/1│
//! └──────────┴──────────┘         └────┴────┴────┴────┘
//! ```

mod extent;
mod key;
mod profile;

pub use extent::GeoExtent;
pub use key::TileKey;
pub use profile::{ProfileError, TileProfile, MAX_LEVEL};
