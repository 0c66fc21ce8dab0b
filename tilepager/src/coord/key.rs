use super::GeoExtent;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Address of one quad-tree tile plus its geographic extent.
///
/// Two keys are equal when their `(level, x, y)` match; the extent rides
/// along for geometry queries and does not take part in comparisons.
///
/// # Example
///
/// ```
/// use tilepager::coord::TileProfile;
///
/// let profile = TileProfile::global_geodetic();
/// let key = profile.tile_key(2, 1, 1).unwrap();
/// assert_eq!(key.to_string(), "2/1/1");
/// assert_eq!(key.cache_key(), "2_1_1");
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TileKey {
    level: u32,
    x: u32,
    y: u32,
    extent: GeoExtent,
}

impl TileKey {
    /// Creates a key. Callers normally go through [`super::TileProfile::tile_key`].
    pub fn new(level: u32, x: u32, y: u32, extent: GeoExtent) -> Self {
        Self {
            level,
            x,
            y,
            extent,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn extent(&self) -> &GeoExtent {
        &self.extent
    }

    /// Key under which the built tile is stored in a durable cache bin.
    pub fn cache_key(&self) -> String {
        format!("{}_{}_{}", self.level, self.x, self.y)
    }

    /// Returns the enclosing tile one level up, or `None` at level 0.
    pub fn parent(&self) -> Option<TileKey> {
        if self.level == 0 {
            return None;
        }
        let width = self.extent.width();
        let height = self.extent.height();
        let xmin = self.extent.xmin - f64::from(self.x % 2) * width;
        let ymax = self.extent.ymax + f64::from(self.y % 2) * height;
        Some(TileKey::new(
            self.level - 1,
            self.x / 2,
            self.y / 2,
            GeoExtent::new(xmin, ymax - 2.0 * height, xmin + 2.0 * width, ymax),
        ))
    }

    /// Returns the four tiles one level down, in row-major order.
    pub fn children(&self) -> [TileKey; 4] {
        let half_w = self.extent.width() * 0.5;
        let half_h = self.extent.height() * 0.5;
        let child = |dx: u32, dy: u32| {
            let xmin = self.extent.xmin + f64::from(dx) * half_w;
            let ymax = self.extent.ymax - f64::from(dy) * half_h;
            TileKey::new(
                self.level + 1,
                self.x * 2 + dx,
                self.y * 2 + dy,
                GeoExtent::new(xmin, ymax - half_h, xmin + half_w, ymax),
            )
        };
        [child(0, 0), child(1, 0), child(0, 1), child(1, 1)]
    }

    /// Radius of the circle enclosing the tile extent.
    pub fn bounding_radius(&self) -> f64 {
        self.extent.radius()
    }

    /// Sample spacing `(dx, dy)` for a grid of `tile_size` posts per side.
    pub fn resolution(&self, tile_size: u32) -> (f64, f64) {
        let intervals = f64::from(tile_size.saturating_sub(1).max(1));
        (
            self.extent.width() / intervals,
            self.extent.height() / intervals,
        )
    }
}

impl PartialEq for TileKey {
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level && self.x == other.x && self.y == other.y
    }
}

impl Eq for TileKey {}

impl Hash for TileKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level.hash(state);
        self.x.hash(state);
        self.y.hash(state);
    }
}

impl PartialOrd for TileKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TileKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.level, self.x, self.y).cmp(&(other.level, other.x, other.y))
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.x, self.y)
    }
}
