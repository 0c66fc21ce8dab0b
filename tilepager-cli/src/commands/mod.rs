//! CLI command implementations.
//!
//! - [`build`] - Build one tile into the durable bin
//! - [`simulate`] - Page a grid of tiles in rounds
//! - [`cache`] - Durable bin management (stats, clear)
//! - [`config`] - Configuration management (path, show, init)

pub mod build;
pub mod cache;
pub mod config;
pub mod simulate;

use crate::error::CliError;
use tilepager::coord::{TileKey, TileProfile};

/// Resolves a tile address on the global geodetic profile.
pub(crate) fn resolve_key(level: u32, x: u32, y: u32) -> Result<TileKey, CliError> {
    TileProfile::global_geodetic()
        .tile_key(level, x, y)
        .map_err(|e| CliError::InvalidTile(e.to_string()))
}
