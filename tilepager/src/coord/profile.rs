use super::{GeoExtent, TileKey};
use thiserror::Error;

/// Errors raised when addressing tiles in a profile.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    #[error("tile {x},{y} is outside level {level} ({max_x}x{max_y} tiles)")]
    OutOfBounds {
        level: u32,
        x: u32,
        y: u32,
        max_x: u32,
        max_y: u32,
    },

    #[error("level {0} exceeds the maximum supported level")]
    LevelTooDeep(u32),
}

/// Deepest level a profile will address.
pub const MAX_LEVEL: u32 = 29;

/// Root extent and root tile layout of a quad-tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileProfile {
    extent: GeoExtent,
    root_tiles_x: u32,
    root_tiles_y: u32,
}

impl TileProfile {
    pub fn new(extent: GeoExtent, root_tiles_x: u32, root_tiles_y: u32) -> Self {
        Self {
            extent,
            root_tiles_x: root_tiles_x.max(1),
            root_tiles_y: root_tiles_y.max(1),
        }
    }

    /// Whole-earth longitude/latitude profile with two root tiles.
    pub fn global_geodetic() -> Self {
        Self::new(GeoExtent::new(-180.0, -90.0, 180.0, 90.0), 2, 1)
    }

    pub fn extent(&self) -> &GeoExtent {
        &self.extent
    }

    /// Tile counts `(columns, rows)` at a level.
    pub fn num_tiles(&self, level: u32) -> (u32, u32) {
        (self.root_tiles_x << level, self.root_tiles_y << level)
    }

    /// Size `(width, height)` of one tile at a level.
    pub fn tile_dimensions(&self, level: u32) -> (f64, f64) {
        let (cols, rows) = self.num_tiles(level);
        (
            self.extent.width() / f64::from(cols),
            self.extent.height() / f64::from(rows),
        )
    }

    /// Builds the key for `(level, x, y)` with its extent.
    pub fn tile_key(&self, level: u32, x: u32, y: u32) -> Result<TileKey, ProfileError> {
        if level > MAX_LEVEL {
            return Err(ProfileError::LevelTooDeep(level));
        }
        let (max_x, max_y) = self.num_tiles(level);
        if x >= max_x || y >= max_y {
            return Err(ProfileError::OutOfBounds {
                level,
                x,
                y,
                max_x,
                max_y,
            });
        }
        let (width, height) = self.tile_dimensions(level);
        let xmin = self.extent.xmin + f64::from(x) * width;
        let ymax = self.extent.ymax - f64::from(y) * height;
        // Edge tiles end exactly on the profile bounds.
        let xmax = if x + 1 == max_x {
            self.extent.xmax
        } else {
            xmin + width
        };
        let ymin = if y + 1 == max_y {
            self.extent.ymin
        } else {
            ymax - height
        };
        Ok(TileKey::new(level, x, y, GeoExtent::new(xmin, ymin, xmax, ymax)))
    }

    /// All keys at `level` whose extent overlaps `extent`.
    pub fn keys_intersecting(&self, extent: &GeoExtent, level: u32) -> Vec<TileKey> {
        if level > MAX_LEVEL || !extent.intersects(&self.extent) {
            return Vec::new();
        }
        let (cols, rows) = self.num_tiles(level);
        let (width, height) = self.tile_dimensions(level);

        let col_of = |x: f64| ((x - self.extent.xmin) / width).floor().max(0.0) as u32;
        let row_of = |y: f64| ((self.extent.ymax - y) / height).floor().max(0.0) as u32;

        let x0 = col_of(extent.xmin).min(cols - 1);
        let x1 = col_of(extent.xmax - f64::EPSILON).min(cols - 1);
        let y0 = row_of(extent.ymax - f64::EPSILON).min(rows - 1);
        let y1 = row_of(extent.ymin).min(rows - 1);

        let mut keys = Vec::new();
        for y in y0..=y1 {
            for x in x0..=x1 {
                if let Ok(key) = self.tile_key(level, x, y) {
                    keys.push(key);
                }
            }
        }
        keys
    }
}
