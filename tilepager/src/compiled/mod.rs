//! Compiled tile content and the shared objects it is made of.
//!
//! [`Chonk`]s (compiled model prototypes) and [`ArenaTexture`]s are shared
//! between tiles through the resident arenas; [`RenderState`]s are shared
//! through the state cache. A [`CompiledTile`] holds strong references to
//! everything it uses, so dropping the tile is what releases them.

mod chonk;
mod codec;
mod state;
mod tile;

pub use chonk::{ArenaTexture, Chonk, DrawBatch};
pub use codec::{decode_tile, encode_tile, CodecError, FORMAT_VERSION, MAGIC};
pub use state::RenderState;
pub use tile::{
    CompiledTile, GeometryBatch, Instance, InstanceGroup, TileContent, TileOrigin, TileResources,
};
