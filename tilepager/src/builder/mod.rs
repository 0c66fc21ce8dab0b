//! Building one tile.
//!
//! ```text
//!            ┌──────────────┐  hit   ┌──────────────────────────────┐
//! build(T) ─►│ durable probe├───────►│ decode + consolidate through │──► CompiledTile
//!            └──────┬───────┘        │ ResidentData / StateCache    │    (origin: cache)
//!                   │ miss           └──────────────────────────────┘
//!                   ▼
//!            ┌──────────────┐ per feature ┌────────────────┐
//!            │ feature      ├────────────►│ ContentFactory │
//!            │ cursor       │             └───────┬────────┘
//!            └──────────────┘                     │ primitives / placements
//!                                                 ▼
//!            ┌──────────────┐ resolve     ┌────────────────┐
//!            │ ResourceCache│◄────────────┤ TileAssembly   │
//!            │ + arenas     │────────────►│ batches, groups│
//!            └──────────────┘             └───────┬────────┘
//!                                                 ▼
//!                                  post-process, durable write ──► CompiledTile
//! ```
//!
//! Cancellation is polled before each feature and each resource
//! resolution. A canceled build writes nothing and leaves every shared
//! entry it already published valid for the next requester.

mod assembly;
mod error;
mod resolve;
mod session;
mod settings;
mod tile_builder;

pub use error::BuildError;
pub use session::Session;
pub use settings::{CompilerSettings, LodBin, DEFAULT_MAX_VERTS_PER_BATCH};
pub use tile_builder::{TileBuilder, DEFAULT_RANGE_FACTOR};
